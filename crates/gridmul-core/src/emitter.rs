//! Map stage: fan a sparse input cell out to every output block that needs it.
//!
//! A cell of A in block `(i, k)` contributes to every product block `(i, j)`;
//! a cell of B in block `(k, j)` contributes to every `(i, j)`. Each emitted
//! payload carries the shared contraction index `k` so the reducer can pair
//! A's block-column with B's block-row.

use thiserror::Error;

use crate::types::{Cell, GridConfig, MatrixTag, OutputKey, TaggedPayload};

/// Reasons a cell cannot be routed.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmitError {
    #[error("{tag} cell block coordinate ({block_row}, {block_col}) is outside a {grid_dim}x{grid_dim} grid")]
    BlockOutOfRange {
        tag: MatrixTag,
        block_row: usize,
        block_col: usize,
        grid_dim: usize,
    },

    #[error("{tag} cell inner coordinate ({inner_row}, {inner_col}) is outside block size {block_size}")]
    InnerOutOfRange {
        tag: MatrixTag,
        inner_row: usize,
        inner_col: usize,
        block_size: usize,
    },

    #[error("{tag} cell value {value} is not finite")]
    NonFinite { tag: MatrixTag, value: f64 },
}

/// Check a cell against the grid geometry.
pub fn validate_cell(cell: &Cell, grid: &GridConfig) -> Result<(), EmitError> {
    let g = grid.grid_dim();
    if cell.block_row >= g || cell.block_col >= g {
        return Err(EmitError::BlockOutOfRange {
            tag: cell.tag,
            block_row: cell.block_row,
            block_col: cell.block_col,
            grid_dim: g,
        });
    }
    let b = grid.block_size();
    if cell.inner_row >= b || cell.inner_col >= b {
        return Err(EmitError::InnerOutOfRange {
            tag: cell.tag,
            inner_row: cell.inner_row,
            inner_col: cell.inner_col,
            block_size: b,
        });
    }
    if !cell.value.is_finite() {
        return Err(EmitError::NonFinite {
            tag: cell.tag,
            value: cell.value,
        });
    }
    Ok(())
}

/// Route one cell to the `grid_dim` output keys that consume it.
pub fn emit(cell: &Cell, grid: &GridConfig) -> Result<Vec<(OutputKey, TaggedPayload)>, EmitError> {
    validate_cell(cell, grid)?;

    let payload = |contraction| TaggedPayload {
        tag: cell.tag,
        contraction,
        inner_row: cell.inner_row,
        inner_col: cell.inner_col,
        value: cell.value,
    };

    let g = grid.grid_dim();
    let pairs = match cell.tag {
        MatrixTag::A => (0..g)
            .map(|j| (OutputKey::new(cell.block_row, j), payload(cell.block_col)))
            .collect(),
        MatrixTag::B => (0..g)
            .map(|i| (OutputKey::new(i, cell.block_col), payload(cell.block_row)))
            .collect(),
    };
    Ok(pairs)
}
