//! Conversions between whole matrices and the block/cell representation.
//!
//! [`assemble`] stitches the per-key result blocks back into the full product
//! matrix and refuses to do so unless every key of the grid is present
//! exactly once. [`cells_from_dense`] goes the other way, turning a dense
//! matrix into sparse input cells.

use std::collections::BTreeSet;

use ndarray::{s, Array2};
use thiserror::Error;

use crate::index::IndexError;
use crate::types::{Cell, GridConfig, MatrixTag, OutputKey, ResultBlock};

/// Errors while assembling or splitting matrices.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssemblyError {
    #[error("Incomplete grid: {} of {expected} keys missing", missing.len())]
    IncompleteGrid {
        expected: usize,
        missing: Vec<OutputKey>,
    },

    #[error("Key {0} appears more than once in the result set")]
    DuplicateKey(OutputKey),

    #[error("Key {0} is outside the grid")]
    UnknownKey(OutputKey),

    #[error("Block {key} has shape {found:?}, expected ({expected}, {expected})")]
    BlockShape {
        key: OutputKey,
        expected: usize,
        found: (usize, usize),
    },

    #[error("Matrix has shape {found:?}, expected ({expected}, {expected})")]
    MatrixShape {
        expected: usize,
        found: (usize, usize),
    },

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Check that `blocks` covers every key of the grid exactly once.
pub fn check_complete(grid: &GridConfig, blocks: &[ResultBlock]) -> Result<(), AssemblyError> {
    let g = grid.grid_dim();
    let b = grid.block_size();
    let mut seen = BTreeSet::new();

    for block in blocks {
        let key = block.key;
        if key.row >= g || key.col >= g {
            return Err(AssemblyError::UnknownKey(key));
        }
        if !seen.insert(key) {
            return Err(AssemblyError::DuplicateKey(key));
        }
        if block.values.dim() != (b, b) {
            return Err(AssemblyError::BlockShape {
                key,
                expected: b,
                found: block.values.dim(),
            });
        }
    }

    let missing: Vec<OutputKey> = grid.keys().filter(|k| !seen.contains(k)).collect();
    if !missing.is_empty() {
        return Err(AssemblyError::IncompleteGrid {
            expected: grid.key_count(),
            missing,
        });
    }
    Ok(())
}

/// Assemble the full `N x N` product from one result block per key.
pub fn assemble(grid: &GridConfig, blocks: &[ResultBlock]) -> Result<Array2<f64>, AssemblyError> {
    check_complete(grid, blocks)?;

    let n = grid.order();
    let b = grid.block_size();
    let mut matrix = Array2::<f64>::zeros((n, n));
    for block in blocks {
        let r0 = block.key.row * b;
        let c0 = block.key.col * b;
        matrix
            .slice_mut(s![r0..r0 + b, c0..c0 + b])
            .assign(&block.values);
    }
    Ok(matrix)
}

/// Split a dense matrix into sparse cells, dropping exact zeros.
pub fn cells_from_dense(
    matrix: &Array2<f64>,
    tag: MatrixTag,
    grid: &GridConfig,
) -> Result<Vec<Cell>, AssemblyError> {
    let n = grid.order();
    if matrix.dim() != (n, n) {
        return Err(AssemblyError::MatrixShape {
            expected: n,
            found: matrix.dim(),
        });
    }

    let mut cells = Vec::new();
    for ((row, col), &value) in matrix.indexed_iter() {
        if value == 0.0 {
            continue;
        }
        let pos = grid.locate(row, col)?;
        cells.push(Cell::new(
            tag,
            pos.block_row,
            pos.block_col,
            pos.inner_row,
            pos.inner_col,
            value,
        ));
    }
    Ok(cells)
}
