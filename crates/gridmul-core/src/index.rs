//! Mapping between global matrix coordinates and block coordinates.
//!
//! A global index `g` in `[0, N)` splits into a block coordinate
//! `g / block_size` and an inner coordinate `g % block_size`. Both the data
//! generator and result assembly go through these functions so the two ends of
//! the pipeline agree on the partitioning.

use thiserror::Error;

use crate::types::GridConfig;

/// Contract violations of the block index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IndexError {
    #[error("Block size must be positive")]
    ZeroBlockSize,

    #[error("Index {index} is outside [0, {bound})")]
    OutOfRange { index: usize, bound: usize },
}

/// Position of a global `(row, col)` coordinate inside the block grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockPosition {
    pub block_row: usize,
    pub block_col: usize,
    pub inner_row: usize,
    pub inner_col: usize,
}

/// Split a global index into `(block, inner)`.
pub fn block_of(global: usize, block_size: usize) -> Result<(usize, usize), IndexError> {
    if block_size == 0 {
        return Err(IndexError::ZeroBlockSize);
    }
    Ok((global / block_size, global % block_size))
}

/// Rebuild a global index from `(block, inner)`.
pub fn global_of(block: usize, inner: usize, block_size: usize) -> Result<usize, IndexError> {
    if block_size == 0 {
        return Err(IndexError::ZeroBlockSize);
    }
    if inner >= block_size {
        return Err(IndexError::OutOfRange {
            index: inner,
            bound: block_size,
        });
    }
    Ok(block * block_size + inner)
}

impl GridConfig {
    /// Locate a global `(row, col)` coordinate in the block grid.
    pub fn locate(&self, row: usize, col: usize) -> Result<BlockPosition, IndexError> {
        let n = self.order();
        for index in [row, col] {
            if index >= n {
                return Err(IndexError::OutOfRange { index, bound: n });
            }
        }
        let b = self.block_size();
        let (block_row, inner_row) = block_of(row, b)?;
        let (block_col, inner_col) = block_of(col, b)?;
        Ok(BlockPosition {
            block_row,
            block_col,
            inner_row,
            inner_col,
        })
    }

    /// Global `(row, col)` of a block position.
    pub fn global(&self, pos: &BlockPosition) -> Result<(usize, usize), IndexError> {
        let g = self.grid_dim();
        for index in [pos.block_row, pos.block_col] {
            if index >= g {
                return Err(IndexError::OutOfRange { index, bound: g });
            }
        }
        let b = self.block_size();
        Ok((
            global_of(pos.block_row, pos.inner_row, b)?,
            global_of(pos.block_col, pos.inner_col, b)?,
        ))
    }
}
