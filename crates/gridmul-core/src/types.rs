//! Core types shared across the gridmul pipeline.
//!
//! This module defines the data that flows between the pipeline stages: the
//! grid geometry, sparse input cells, output keys, the tagged payloads that
//! travel through the shuffle, and the dense result blocks.

use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A dense `block_size x block_size` sub-matrix.
pub type DenseBlock = Array2<f64>;

/// Errors raised when a grid geometry is not usable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("Matrix order must be positive")]
    ZeroOrder,

    #[error("Grid dimension must be positive")]
    ZeroGridDim,

    #[error("Matrix order {order} is not divisible by grid dimension {grid_dim}")]
    NotDivisible { order: usize, grid_dim: usize },
}

/// Geometry of one multiplication run: an `order x order` matrix split into a
/// `grid_dim x grid_dim` grid of square blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridConfig {
    order: usize,
    grid_dim: usize,
}

impl GridConfig {
    /// Create a grid, checking that `order` splits evenly into `grid_dim` blocks.
    pub fn new(order: usize, grid_dim: usize) -> Result<Self, GridError> {
        if order == 0 {
            return Err(GridError::ZeroOrder);
        }
        if grid_dim == 0 {
            return Err(GridError::ZeroGridDim);
        }
        if order % grid_dim != 0 {
            return Err(GridError::NotDivisible { order, grid_dim });
        }
        Ok(Self { order, grid_dim })
    }

    /// Matrix order N.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of blocks per matrix dimension (G).
    pub fn grid_dim(&self) -> usize {
        self.grid_dim
    }

    /// Side length of one block (N / G).
    pub fn block_size(&self) -> usize {
        self.order / self.grid_dim
    }

    /// Total number of output keys (G²).
    pub fn key_count(&self) -> usize {
        self.grid_dim * self.grid_dim
    }

    /// Every output key of the grid in row-major order.
    pub fn keys(&self) -> impl Iterator<Item = OutputKey> {
        let g = self.grid_dim;
        (0..g).flat_map(move |row| (0..g).map(move |col| OutputKey::new(row, col)))
    }

    /// Zero-filled block of this grid's block size.
    pub fn zero_block(&self) -> DenseBlock {
        let b = self.block_size();
        Array2::zeros((b, b))
    }
}

/// Which input matrix a cell belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MatrixTag {
    A,
    B,
}

impl MatrixTag {
    /// The single-letter code used in record files.
    pub fn as_str(&self) -> &'static str {
        match self {
            MatrixTag::A => "A",
            MatrixTag::B => "B",
        }
    }
}

impl fmt::Display for MatrixTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single non-zero matrix entry addressed by block and in-block coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cell {
    pub tag: MatrixTag,
    pub block_row: usize,
    pub block_col: usize,
    pub inner_row: usize,
    pub inner_col: usize,
    pub value: f64,
}

impl Cell {
    pub fn new(
        tag: MatrixTag,
        block_row: usize,
        block_col: usize,
        inner_row: usize,
        inner_col: usize,
        value: f64,
    ) -> Self {
        Self {
            tag,
            block_row,
            block_col,
            inner_row,
            inner_col,
            value,
        }
    }
}

/// Identifies one block `(i, j)` of the product matrix.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct OutputKey {
    /// Block-row of A (and of C).
    pub row: usize,
    /// Block-column of B (and of C).
    pub col: usize,
}

impl OutputKey {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

impl fmt::Display for OutputKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// The unit routed from the emitter to the block reducer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TaggedPayload {
    pub tag: MatrixTag,
    /// Shared block index `k`: A's block-column or B's block-row.
    pub contraction: usize,
    pub inner_row: usize,
    pub inner_col: usize,
    pub value: f64,
}

/// The dense product block for one output key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBlock {
    pub key: OutputKey,
    pub values: DenseBlock,
}

impl ResultBlock {
    /// Side length of the block.
    pub fn block_size(&self) -> usize {
        self.values.nrows()
    }

    /// Sum of all entries, used as a cheap checksum in logs.
    pub fn sum(&self) -> f64 {
        self.values.sum()
    }

    /// Iterate over the non-zero entries as `(inner_row, inner_col, value)`.
    pub fn nonzeros(&self) -> impl Iterator<Item = (usize, usize, f64)> + '_ {
        self.values
            .indexed_iter()
            .filter(|(_, v)| **v != 0.0)
            .map(|((r, c), v)| (r, c, *v))
    }
}
