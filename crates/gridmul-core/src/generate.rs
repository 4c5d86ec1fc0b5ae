//! Seeded synthetic input for benchmarks and smoke runs.
//!
//! Each position of each matrix is kept with probability `density`; kept
//! entries get a value uniformly drawn from `[1, 10)` and rounded to two
//! decimals so the written records parse back to the same value.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::index::IndexError;
use crate::types::{Cell, GridConfig, MatrixTag};

/// Errors from the synthetic generator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GenerateError {
    #[error("Density {0} is outside [0, 1]")]
    InvalidDensity(f64),

    #[error(transparent)]
    Index(#[from] IndexError),
}

/// Parameters of a synthetic input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SyntheticSpec {
    /// Fraction of non-zero positions per matrix.
    pub density: f64,
    /// RNG seed; the same seed always yields the same cells.
    pub seed: u64,
    /// Write every sampled A cell to B as well, so the run computes `A x A`.
    pub mirror: bool,
}

impl Default for SyntheticSpec {
    fn default() -> Self {
        Self {
            density: 0.2,
            seed: 0,
            mirror: false,
        }
    }
}

/// Generate sparse cells for both matrices.
pub fn generate_cells(grid: &GridConfig, spec: &SyntheticSpec) -> Result<Vec<Cell>, GenerateError> {
    if !(0.0..=1.0).contains(&spec.density) {
        return Err(GenerateError::InvalidDensity(spec.density));
    }

    let mut rng = StdRng::seed_from_u64(spec.seed);
    let mut cells = Vec::new();

    let tags: &[MatrixTag] = if spec.mirror {
        &[MatrixTag::A]
    } else {
        &[MatrixTag::A, MatrixTag::B]
    };

    for &tag in tags {
        for row in 0..grid.order() {
            for col in 0..grid.order() {
                if rng.random::<f64>() >= spec.density {
                    continue;
                }
                let value = (rng.random_range(1.0..10.0_f64) * 100.0).round() / 100.0;
                let pos = grid.locate(row, col)?;
                let cell = Cell::new(
                    tag,
                    pos.block_row,
                    pos.block_col,
                    pos.inner_row,
                    pos.inner_col,
                    value,
                );
                cells.push(cell);
                if spec.mirror {
                    cells.push(Cell {
                        tag: MatrixTag::B,
                        ..cell
                    });
                }
            }
        }
    }

    Ok(cells)
}
