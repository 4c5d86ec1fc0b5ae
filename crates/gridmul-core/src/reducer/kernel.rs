//! Dense block multiply-accumulate kernel.
//!
//! The loop order is i-k-j: for each row `i` of A and each contraction column
//! `k`, the scalar `A[i, k]` scales row `k` of B into row `i` of C. The
//! innermost loop therefore walks contiguous columns of both B and C, which
//! keeps the working rows resident in cache for block sizes in the hundreds.

use ndarray::{ArrayView2, ArrayViewMut2, Zip};

use crate::types::DenseBlock;

/// Accumulate `a x b` into `c` (`c += a * b`).
///
/// Rows of `a` with a zero pivot are skipped; they contribute nothing.
///
/// # Panics
/// Panics if the shapes are not conformant (`a: m x p`, `b: p x n`, `c: m x n`).
pub fn multiply_accumulate(a: ArrayView2<f64>, b: ArrayView2<f64>, mut c: ArrayViewMut2<f64>) {
    let (m, p) = a.dim();
    let (pb, n) = b.dim();
    assert_eq!(p, pb, "Inner dimensions must agree");
    assert_eq!(c.dim(), (m, n), "Accumulator shape must be m x n");

    for i in 0..m {
        let mut c_row = c.row_mut(i);
        for k in 0..p {
            let pivot = a[[i, k]];
            if pivot == 0.0 {
                continue;
            }
            Zip::from(&mut c_row)
                .and(b.row(k))
                .for_each(|c_ij, &b_kj| *c_ij += pivot * b_kj);
        }
    }
}

/// Reference dense product, used to verify assembled results.
pub fn multiply_dense(a: &DenseBlock, b: &DenseBlock) -> DenseBlock {
    a.dot(b)
}
