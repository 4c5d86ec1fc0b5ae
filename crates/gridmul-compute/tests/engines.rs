//! Integration tests for the execution engines.
//!
//! Every engine must produce the same blocks as a plain dense product and
//! must surface rejected cells and failing keys instead of returning a
//! partial result.

use std::sync::Arc;

use approx::assert_relative_eq;
use ndarray::Array2;

use gridmul_compute::{CpuEngine, EngineError, EngineType, ExecutionEngine, SerialEngine};
use gridmul_core::assembly::assemble;
use gridmul_core::generate::{generate_cells, SyntheticSpec};
use gridmul_core::reducer::kernel::multiply_dense;
use gridmul_core::reducer::ReduceError;
use gridmul_core::{Cell, GridConfig, MatrixTag, MultiplyJob, OutputKey};

// ─────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────

fn engines() -> Vec<Arc<dyn ExecutionEngine>> {
    vec![
        Arc::new(SerialEngine::new()),
        Arc::new(CpuEngine::new()),
        Arc::new(CpuEngine::with_threads(3).expect("pool should build")),
    ]
}

fn dense_from_cells(grid: &GridConfig, cells: &[Cell], tag: MatrixTag) -> Array2<f64> {
    let b = grid.block_size();
    let mut m = Array2::zeros((grid.order(), grid.order()));
    for c in cells.iter().filter(|c| c.tag == tag) {
        m[[c.block_row * b + c.inner_row, c.block_col * b + c.inner_col]] = c.value;
    }
    m
}

// ─────────────────────────────────────────────────────────────
// Correctness
// ─────────────────────────────────────────────────────────────

#[test]
fn test_engines_match_dense_product() {
    let grid = GridConfig::new(12, 3).unwrap();
    let spec = SyntheticSpec {
        density: 0.3,
        seed: 2024,
        mirror: false,
    };
    let cells = generate_cells(&grid, &spec).unwrap();
    let expected = multiply_dense(
        &dense_from_cells(&grid, &cells, MatrixTag::A),
        &dense_from_cells(&grid, &cells, MatrixTag::B),
    );
    let job = MultiplyJob::new(grid);

    for engine in engines() {
        let output = engine.submit(&job, &cells).unwrap();
        assert_eq!(output.rejected_cells, 0);
        assert_eq!(output.blocks.len(), grid.key_count());
        let keys: Vec<_> = output.blocks.iter().map(|b| b.key).collect();
        assert_eq!(keys, grid.keys().collect::<Vec<_>>(), "{}", engine.info().name);

        let c = assemble(&grid, &output.blocks).unwrap();
        for (x, y) in c.iter().zip(expected.iter()) {
            assert_relative_eq!(x, y, epsilon = 1e-9, max_relative = 1e-9);
        }
    }
}

#[test]
fn test_mirrored_input_squares_the_matrix() {
    let grid = GridConfig::new(6, 2).unwrap();
    let spec = SyntheticSpec {
        density: 0.5,
        seed: 9,
        mirror: true,
    };
    let cells = generate_cells(&grid, &spec).unwrap();
    let a = dense_from_cells(&grid, &cells, MatrixTag::A);
    let expected = multiply_dense(&a, &a);

    let output = SerialEngine::new().submit(&MultiplyJob::new(grid), &cells).unwrap();
    let c = assemble(&grid, &output.blocks).unwrap();
    for (x, y) in c.iter().zip(expected.iter()) {
        assert_relative_eq!(x, y, epsilon = 1e-9, max_relative = 1e-9);
    }
}

#[test]
fn test_empty_input_yields_complete_zero_grid() {
    let grid = GridConfig::new(4, 2).unwrap();
    for engine in engines() {
        let output = engine.submit(&MultiplyJob::new(grid), &[]).unwrap();
        assert_eq!(output.blocks.len(), 4);
        assert!(output.blocks.iter().all(|b| b.sum() == 0.0));
    }
}

// ─────────────────────────────────────────────────────────────
// Failure handling
// ─────────────────────────────────────────────────────────────

#[test]
fn test_out_of_range_cells_are_counted_not_fatal() {
    let grid = GridConfig::new(4, 2).unwrap();
    let cells = vec![
        Cell::new(MatrixTag::A, 0, 0, 0, 0, 2.0),
        Cell::new(MatrixTag::B, 0, 0, 0, 0, 3.0),
        Cell::new(MatrixTag::A, 2, 0, 0, 0, 1.0),
        Cell::new(MatrixTag::B, 0, 1, 0, 9, 1.0),
    ];
    for engine in engines() {
        let output = engine.submit(&MultiplyJob::new(grid), &cells).unwrap();
        assert_eq!(output.rejected_cells, 2);
        let c = assemble(&grid, &output.blocks).unwrap();
        assert_eq!(c[[0, 0]], 6.0);
        assert_eq!(c.sum(), 6.0);
    }
}

#[test]
fn test_conflicting_cells_fail_every_affected_key() {
    let grid = GridConfig::new(4, 2).unwrap();
    let cells = vec![
        Cell::new(MatrixTag::A, 1, 0, 0, 0, 1.0),
        Cell::new(MatrixTag::A, 1, 0, 0, 0, 4.0),
        Cell::new(MatrixTag::B, 0, 0, 0, 0, 1.0),
        Cell::new(MatrixTag::B, 0, 1, 0, 0, 1.0),
    ];
    for engine in engines() {
        let err = engine.submit(&MultiplyJob::new(grid), &cells).unwrap_err();
        assert_eq!(
            err.failed_keys(),
            vec![OutputKey::new(1, 0), OutputKey::new(1, 1)],
            "{}",
            engine.info().name
        );
        match err {
            EngineError::ReductionFailed { failures } => {
                assert!(failures
                    .iter()
                    .all(|f| matches!(f, ReduceError::DuplicateCell { tag: MatrixTag::A, .. })));
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn test_identical_redelivery_is_idempotent() {
    let grid = GridConfig::new(2, 1).unwrap();
    let once = vec![
        Cell::new(MatrixTag::A, 0, 0, 0, 1, 2.0),
        Cell::new(MatrixTag::B, 0, 0, 1, 0, 5.0),
    ];
    let mut twice = once.clone();
    twice.extend(once.iter().copied());

    let engine = SerialEngine::new();
    let job = MultiplyJob::new(grid);
    let a = engine.submit(&job, &once).unwrap();
    let b = engine.submit(&job, &twice).unwrap();
    assert_eq!(a.blocks, b.blocks);
    assert_eq!(a.blocks[0].values[[0, 0]], 10.0);
}

#[test]
fn test_engine_info_and_pool_validation() {
    assert_eq!(SerialEngine::new().info().engine_type, EngineType::Serial);
    let cpu = CpuEngine::with_threads(2).unwrap();
    assert_eq!(cpu.info().workers, 2);
    assert!(matches!(
        CpuEngine::with_threads(0),
        Err(EngineError::Unavailable(_))
    ));
}
