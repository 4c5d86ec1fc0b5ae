//! End-to-end properties of the emit / group / reduce pipeline.
//!
//! The grouping stage normally belongs to an execution engine; here a small
//! in-test driver groups payloads with a `BTreeMap` so the core can be checked
//! on its own.

use std::collections::BTreeMap;

use approx::assert_relative_eq;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use gridmul_core::assembly::{assemble, cells_from_dense};
use gridmul_core::emitter::emit;
use gridmul_core::index::{block_of, global_of};
use gridmul_core::records::parse_records;
use gridmul_core::reducer::kernel::multiply_dense;
use gridmul_core::reducer::reduce;
use gridmul_core::{Cell, GridConfig, MatrixTag, OutputKey, ResultBlock, TaggedPayload};

// ─────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────

fn group(grid: &GridConfig, cells: &[Cell]) -> BTreeMap<OutputKey, Vec<TaggedPayload>> {
    let mut groups: BTreeMap<OutputKey, Vec<TaggedPayload>> =
        grid.keys().map(|k| (k, Vec::new())).collect();
    for cell in cells {
        for (key, payload) in emit(cell, grid).expect("cell should be routable") {
            groups.entry(key).or_default().push(payload);
        }
    }
    groups
}

fn run_pipeline(grid: &GridConfig, cells: &[Cell]) -> Vec<ResultBlock> {
    group(grid, cells)
        .into_iter()
        .map(|(key, payloads)| reduce(key, &payloads, grid).expect("reduction should succeed"))
        .collect()
}

fn sample_matrix(n: usize, offset: f64) -> Array2<f64> {
    Array2::from_shape_fn((n, n), |(i, j)| offset + (i * n + j) as f64 * 0.5 + 1.0)
}

// ─────────────────────────────────────────────────────────────
// Block index
// ─────────────────────────────────────────────────────────────

#[test]
fn test_partition_coverage_and_inverse() {
    for (n, g) in [(4, 1), (4, 2), (4, 4), (6, 3), (12, 3), (100, 5)] {
        let grid = GridConfig::new(n, g).unwrap();
        let b = grid.block_size();
        for global in 0..n {
            let (block, inner) = block_of(global, b).unwrap();
            assert!(block < g && inner < b);
            assert_eq!(global_of(block, inner, b).unwrap(), global);
        }
    }
}

// ─────────────────────────────────────────────────────────────
// Emitter
// ─────────────────────────────────────────────────────────────

#[test]
fn test_fan_out_reaches_every_key_of_the_row() {
    let grid = GridConfig::new(8, 4).unwrap();
    let cell = Cell::new(MatrixTag::A, 2, 3, 1, 0, 1.25);
    let pairs = emit(&cell, &grid).unwrap();
    assert_eq!(pairs.len(), 4);
    for (j, (key, payload)) in pairs.into_iter().enumerate() {
        assert_eq!(key, OutputKey::new(2, j));
        assert_eq!(payload.contraction, 3);
    }
}

// ─────────────────────────────────────────────────────────────
// Reduction
// ─────────────────────────────────────────────────────────────

#[test]
fn test_identity_product_returns_a_blocks() {
    let grid = GridConfig::new(4, 2).unwrap();
    let a = Array2::from_shape_vec(
        (4, 4),
        vec![
            1.0, 2.0, 0.0, 3.0, //
            4.0, 0.0, 5.0, 6.0, //
            0.0, 7.0, 8.0, 0.0, //
            9.0, 1.5, 0.0, 2.5,
        ],
    )
    .unwrap();

    let mut cells = cells_from_dense(&a, MatrixTag::A, &grid).unwrap();
    for i in 0..4 {
        let pos = grid.locate(i, i).unwrap();
        cells.push(Cell::new(
            MatrixTag::B,
            pos.block_row,
            pos.block_col,
            pos.inner_row,
            pos.inner_col,
            1.0,
        ));
    }

    let blocks = run_pipeline(&grid, &cells);
    assert_eq!(blocks.len(), 4);
    let b = grid.block_size();
    for block in &blocks {
        let (r0, c0) = (block.key.row * b, block.key.col * b);
        let expected = a.slice(ndarray::s![r0..r0 + b, c0..c0 + b]);
        assert_eq!(block.values, expected);
    }
}

#[test]
fn test_single_matrix_input_yields_zero_blocks() {
    let grid = GridConfig::new(6, 3).unwrap();
    let a = sample_matrix(6, 0.0);

    for tag in [MatrixTag::A, MatrixTag::B] {
        let cells = cells_from_dense(&a, tag, &grid).unwrap();
        let blocks = run_pipeline(&grid, &cells);
        assert_eq!(blocks.len(), 9);
        for block in blocks {
            assert!(block.values.iter().all(|&v| v == 0.0), "key {}", block.key);
        }
    }
}

#[test]
fn test_payload_order_does_not_change_result() {
    let grid = GridConfig::new(6, 2).unwrap();
    let mut cells = cells_from_dense(&sample_matrix(6, 0.0), MatrixTag::A, &grid).unwrap();
    cells.extend(cells_from_dense(&sample_matrix(6, -4.0), MatrixTag::B, &grid).unwrap());

    let mut rng = StdRng::seed_from_u64(42);
    for (key, payloads) in group(&grid, &cells) {
        let reference = reduce(key, &payloads, &grid).unwrap();

        let mut reversed = payloads.clone();
        reversed.reverse();
        let mut shuffled = payloads.clone();
        shuffled.shuffle(&mut rng);

        for permuted in [reversed, shuffled] {
            let block = reduce(key, &permuted, &grid).unwrap();
            for (x, y) in block.values.iter().zip(reference.values.iter()) {
                assert_relative_eq!(x, y, epsilon = 1e-12, max_relative = 1e-12);
            }
        }
    }
}

#[test]
fn test_dense_round_trip_matches_standard_product() {
    let grid = GridConfig::new(6, 3).unwrap();
    let a = sample_matrix(6, 0.25);
    let b = Array2::from_shape_fn((6, 6), |(i, j)| if (i + j) % 2 == 0 { 2.0 } else { -1.5 });

    let mut cells = cells_from_dense(&a, MatrixTag::A, &grid).unwrap();
    cells.extend(cells_from_dense(&b, MatrixTag::B, &grid).unwrap());
    assert_eq!(cells.len(), 72);

    let blocks = run_pipeline(&grid, &cells);
    let c = assemble(&grid, &blocks).unwrap();
    let expected = multiply_dense(&a, &b);

    for (x, y) in c.iter().zip(expected.iter()) {
        assert_relative_eq!(x, y, max_relative = 1e-9);
    }
}

#[test]
fn test_malformed_records_are_excluded() {
    let grid = GridConfig::new(4, 2).unwrap();
    let content = "\
A,0,0,0,0,2.0
C,0,0,0,0,5.0
B,0,0,0,0,3.0
A,-1,0,0,0,7.0
B,1,1,1,1,4.0
A,1,1,1,1,0.5
";
    let batch = parse_records(content);
    assert_eq!(batch.rejected.len(), 2);

    let blocks = run_pipeline(&grid, &batch.cells);
    let c = assemble(&grid, &blocks).unwrap();
    assert_eq!(c[[0, 0]], 6.0);
    assert_eq!(c[[3, 3]], 2.0);
    assert_eq!(c.iter().filter(|&&v| v != 0.0).count(), 2);
}
