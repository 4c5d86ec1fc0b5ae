//! # gridmul Compute
//!
//! Execution engines for gridmul jobs. This crate provides an
//! [`ExecutionEngine`](backend::ExecutionEngine) trait that isolates the
//! block-multiplication algorithm in `gridmul-core` from the substrate that
//! runs it.
//!
//! ## Available engines
//!
//! | Engine | Feature flag | Parallelism |
//! |--------|-------------|-------------|
//! | Serial | always | calling thread |
//! | CPU (Rayon) | `cpu` (default) | shared-memory thread pool |

pub mod backend;
pub mod serial;
pub mod shuffle;

#[cfg(feature = "cpu")]
pub mod cpu;

pub use backend::{EngineError, EngineInfo, EngineType, ExecutionEngine, JobOutput};
pub use serial::SerialEngine;

#[cfg(feature = "cpu")]
pub use cpu::CpuEngine;
