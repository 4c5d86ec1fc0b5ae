//! Sparse-to-dense block materialisation.

use ndarray::Array2;

use crate::types::DenseBlock;

/// One sparse entry of a block: `(inner_row, inner_col, value)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SparseEntry {
    pub inner_row: usize,
    pub inner_col: usize,
    pub value: f64,
}

/// Why a set of entries could not be scattered into a dense block.
#[derive(Debug, Clone, PartialEq)]
pub enum ScatterError {
    /// An entry lies outside the block.
    OutOfBounds { inner_row: usize, inner_col: usize },
    /// Two entries share a position but disagree on the value.
    Conflict {
        inner_row: usize,
        inner_col: usize,
        existing: f64,
        incoming: f64,
    },
}

/// Scatter sparse entries into a zero-initialised `block_size x block_size` block.
///
/// A repeated entry with the same value is accepted once; a repeated entry
/// with a different value is a conflict.
pub fn materialise(entries: &[SparseEntry], block_size: usize) -> Result<DenseBlock, ScatterError> {
    let mut block = Array2::<f64>::zeros((block_size, block_size));
    let mut filled = Array2::<bool>::from_elem((block_size, block_size), false);

    for e in entries {
        let pos = [e.inner_row, e.inner_col];
        if e.inner_row >= block_size || e.inner_col >= block_size {
            return Err(ScatterError::OutOfBounds {
                inner_row: e.inner_row,
                inner_col: e.inner_col,
            });
        }
        if filled[pos] {
            let existing = block[pos];
            if existing.to_bits() != e.value.to_bits() {
                return Err(ScatterError::Conflict {
                    inner_row: e.inner_row,
                    inner_col: e.inner_col,
                    existing,
                    incoming: e.value,
                });
            }
            continue;
        }
        block[pos] = e.value;
        filled[pos] = true;
    }

    Ok(block)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn entry(inner_row: usize, inner_col: usize, value: f64) -> SparseEntry {
        SparseEntry {
            inner_row,
            inner_col,
            value,
        }
    }

    #[test]
    fn test_materialise_fills_missing_with_zero() {
        let block = materialise(&[entry(0, 1, 2.0), entry(1, 0, -3.0)], 2).unwrap();
        assert_eq!(block, array![[0.0, 2.0], [-3.0, 0.0]]);
    }

    #[test]
    fn test_identical_redelivery_is_accepted() {
        let block = materialise(&[entry(1, 1, 5.0), entry(1, 1, 5.0)], 2).unwrap();
        assert_eq!(block[[1, 1]], 5.0);
        assert_eq!(block.sum(), 5.0);
    }

    #[test]
    fn test_conflicting_duplicate_is_rejected() {
        let err = materialise(&[entry(0, 0, 1.0), entry(0, 0, 2.0)], 2).unwrap_err();
        assert_eq!(
            err,
            ScatterError::Conflict {
                inner_row: 0,
                inner_col: 0,
                existing: 1.0,
                incoming: 2.0
            }
        );
    }

    #[test]
    fn test_out_of_bounds_entry_is_rejected() {
        let err = materialise(&[entry(2, 0, 1.0)], 2).unwrap_err();
        assert_eq!(
            err,
            ScatterError::OutOfBounds {
                inner_row: 2,
                inner_col: 0
            }
        );
    }
}
