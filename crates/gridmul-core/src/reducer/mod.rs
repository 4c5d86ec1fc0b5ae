//! Reduce stage: combine every payload routed to one output key into the
//! dense product block for that key.
//!
//! For key `(i, j)` the reducer receives A's blocks `A(i, k)` and B's blocks
//! `B(k, j)` as sparse payloads, groups them by contraction index `k`,
//! rebuilds each side as a dense block and accumulates
//! `C(i, j) = Σ_k A(i, k) · B(k, j)`. Indices present on only one side have no
//! multiplicative partner and contribute nothing, but their entries are still
//! checked for conflicting duplicates.
//!
//! Grouping state is local to one call; reductions for different keys share
//! nothing and can run in parallel.

pub mod dense;
pub mod kernel;

use std::collections::BTreeMap;

use thiserror::Error;

use crate::types::{DenseBlock, GridConfig, MatrixTag, OutputKey, ResultBlock, TaggedPayload};
use dense::{materialise, ScatterError, SparseEntry};

/// Failures of a single key's reduction.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReduceError {
    #[error("Key {key} is outside a {grid_dim}x{grid_dim} grid")]
    KeyOutOfRange { key: OutputKey, grid_dim: usize },

    #[error("Key {key}: malformed {tag} payload for k={contraction}: {reason}")]
    MalformedPayload {
        key: OutputKey,
        tag: MatrixTag,
        contraction: usize,
        reason: String,
    },

    #[error(
        "Key {key}: conflicting {tag} values at k={contraction}, inner ({inner_row}, {inner_col}): {existing} vs {incoming}"
    )]
    DuplicateCell {
        key: OutputKey,
        tag: MatrixTag,
        contraction: usize,
        inner_row: usize,
        inner_col: usize,
        existing: f64,
        incoming: f64,
    },
}

impl ReduceError {
    /// The output key whose reduction failed.
    pub fn key(&self) -> OutputKey {
        match self {
            ReduceError::KeyOutOfRange { key, .. }
            | ReduceError::MalformedPayload { key, .. }
            | ReduceError::DuplicateCell { key, .. } => *key,
        }
    }
}

type ByContraction = BTreeMap<usize, Vec<SparseEntry>>;

/// Reduce all payloads for `key` into its dense result block.
pub fn reduce(
    key: OutputKey,
    payloads: &[TaggedPayload],
    grid: &GridConfig,
) -> Result<ResultBlock, ReduceError> {
    let g = grid.grid_dim();
    if key.row >= g || key.col >= g {
        return Err(ReduceError::KeyOutOfRange { key, grid_dim: g });
    }

    let block_size = grid.block_size();
    let mut a_blocks = ByContraction::new();
    let mut b_blocks = ByContraction::new();

    for p in payloads {
        if p.contraction >= g {
            return Err(ReduceError::MalformedPayload {
                key,
                tag: p.tag,
                contraction: p.contraction,
                reason: format!("contraction index is outside [0, {g})"),
            });
        }
        if p.inner_row >= block_size || p.inner_col >= block_size {
            return Err(ReduceError::MalformedPayload {
                key,
                tag: p.tag,
                contraction: p.contraction,
                reason: format!(
                    "inner ({}, {}) is outside block size {block_size}",
                    p.inner_row, p.inner_col
                ),
            });
        }
        let side = match p.tag {
            MatrixTag::A => &mut a_blocks,
            MatrixTag::B => &mut b_blocks,
        };
        side.entry(p.contraction).or_default().push(SparseEntry {
            inner_row: p.inner_row,
            inner_col: p.inner_col,
            value: p.value,
        });
    }

    // Both sides are materialised for every k, paired or not.
    let a_dense = densify(key, MatrixTag::A, &a_blocks, block_size)?;
    let b_dense = densify(key, MatrixTag::B, &b_blocks, block_size)?;

    let mut values = grid.zero_block();
    for (k, a_k) in &a_dense {
        let Some(b_k) = b_dense.get(k) else {
            continue;
        };
        kernel::multiply_accumulate(a_k.view(), b_k.view(), values.view_mut());
    }

    Ok(ResultBlock { key, values })
}

fn densify(
    key: OutputKey,
    tag: MatrixTag,
    side: &ByContraction,
    block_size: usize,
) -> Result<BTreeMap<usize, DenseBlock>, ReduceError> {
    side.iter()
        .map(|(&k, entries)| Ok((k, dense_side(key, tag, k, entries, block_size)?)))
        .collect()
}

fn dense_side(
    key: OutputKey,
    tag: MatrixTag,
    contraction: usize,
    entries: &[SparseEntry],
    block_size: usize,
) -> Result<DenseBlock, ReduceError> {
    materialise(entries, block_size).map_err(|e| match e {
        ScatterError::OutOfBounds {
            inner_row,
            inner_col,
        } => ReduceError::MalformedPayload {
            key,
            tag,
            contraction,
            reason: format!(
                "inner ({inner_row}, {inner_col}) is outside block size {block_size}"
            ),
        },
        ScatterError::Conflict {
            inner_row,
            inner_col,
            existing,
            incoming,
        } => ReduceError::DuplicateCell {
            key,
            tag,
            contraction,
            inner_row,
            inner_col,
            existing,
            incoming,
        },
    })
}
