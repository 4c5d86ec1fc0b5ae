//! # gridmul Core
//!
//! The algorithmic core of gridmul: multiplying two `N x N` matrices held as
//! sparse cells by splitting them into a `G x G` grid of blocks and running a
//! map / shuffle / reduce pipeline over the block grid.
//!
//! ## Pipeline
//!
//! 1. [`emitter::emit`] routes every A cell to the `G` output blocks of its
//!    block-row and every B cell to the `G` output blocks of its block-column.
//! 2. An execution engine (see the `gridmul-compute` crate) groups the emitted
//!    payloads by [`types::OutputKey`].
//! 3. [`reducer::reduce`] rebuilds dense sub-blocks per contraction index and
//!    accumulates their products into one dense [`types::ResultBlock`].
//!
//! ## Modules
//!
//! - [`types`] - Grid geometry, cells, keys, payloads and result blocks.
//! - [`index`] - Global ↔ block coordinate mapping.
//! - [`emitter`] - Map stage.
//! - [`reducer`] - Reduce stage and the dense multiply-accumulate kernel.
//! - [`job`] - Map and reduce bound to a grid, as submitted to engines.
//! - [`records`] - Text record codec for cells and result blocks.
//! - [`assembly`] - Result assembly and dense ↔ cell conversion.
//! - [`generate`] - Seeded synthetic input.

pub mod assembly;
pub mod emitter;
pub mod generate;
pub mod index;
pub mod job;
pub mod records;
pub mod reducer;
pub mod types;

pub use job::MultiplyJob;
pub use types::{Cell, GridConfig, GridError, MatrixTag, OutputKey, ResultBlock, TaggedPayload};
