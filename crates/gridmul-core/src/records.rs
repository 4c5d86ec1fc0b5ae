//! Line-oriented cell records.
//!
//! Each non-blank line holds one cell:
//! ```text
//! <tag>,<block_row>,<block_col>,<inner_row>,<inner_col>,<value>
//! A,0,1,2,3,4.25
//! ```
//! `tag` is `A` or `B`, the four indices are unsigned integers and `value` is
//! a finite real. Records that do not match are rejected individually so one
//! bad line never poisons the rest of the input.

use std::fmt::Write as _;

use thiserror::Error;

use crate::types::{Cell, MatrixTag, ResultBlock};

/// A record that could not be turned into a cell.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("Line {line}: expected 6 comma-separated fields, found {found}")]
    FieldCount { line: usize, found: usize },

    #[error("Line {line}: unknown matrix tag '{tag}' (expected A or B)")]
    UnknownTag { line: usize, tag: String },

    #[error("Line {line}: invalid {field} '{text}'")]
    InvalidIndex {
        line: usize,
        field: &'static str,
        text: String,
    },

    #[error("Line {line}: invalid value '{text}'")]
    InvalidValue { line: usize, text: String },
}

impl RecordError {
    /// 1-based line number of the rejected record.
    pub fn line(&self) -> usize {
        match self {
            RecordError::FieldCount { line, .. }
            | RecordError::UnknownTag { line, .. }
            | RecordError::InvalidIndex { line, .. }
            | RecordError::InvalidValue { line, .. } => *line,
        }
    }
}

/// Cells parsed from a record stream plus everything that was rejected.
#[derive(Debug, Default)]
pub struct RecordBatch {
    pub cells: Vec<Cell>,
    pub rejected: Vec<RecordError>,
}

const INDEX_FIELDS: [&str; 4] = ["block_row", "block_col", "inner_row", "inner_col"];

/// Parse one record. `line` is only used for error reporting.
pub fn parse_record(text: &str, line: usize) -> Result<Cell, RecordError> {
    let parts: Vec<&str> = text.trim().split(',').map(str::trim).collect();
    if parts.len() != 6 {
        return Err(RecordError::FieldCount {
            line,
            found: parts.len(),
        });
    }

    let tag = match parts[0] {
        "A" => MatrixTag::A,
        "B" => MatrixTag::B,
        other => {
            return Err(RecordError::UnknownTag {
                line,
                tag: other.to_string(),
            })
        }
    };

    let mut idx = [0usize; 4];
    for (slot, (field, text)) in idx.iter_mut().zip(INDEX_FIELDS.iter().zip(&parts[1..5])) {
        *slot = text.parse().map_err(|_| RecordError::InvalidIndex {
            line,
            field: *field,
            text: text.to_string(),
        })?;
    }

    let value: f64 = parts[5]
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
        .ok_or_else(|| RecordError::InvalidValue {
            line,
            text: parts[5].to_string(),
        })?;

    Ok(Cell::new(tag, idx[0], idx[1], idx[2], idx[3], value))
}

/// Parse a whole record stream, skipping blank lines.
pub fn parse_records(content: &str) -> RecordBatch {
    let mut batch = RecordBatch::default();
    for (i, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_record(line, i + 1) {
            Ok(cell) => batch.cells.push(cell),
            Err(e) => batch.rejected.push(e),
        }
    }
    batch
}

/// Format a cell as a record line (no trailing newline).
pub fn format_record(cell: &Cell) -> String {
    format!(
        "{},{},{},{},{},{}",
        cell.tag, cell.block_row, cell.block_col, cell.inner_row, cell.inner_col, cell.value
    )
}

/// Format a result block as `block_row,block_col,v0,v1,...` in row-major order.
pub fn format_block(block: &ResultBlock) -> String {
    let mut out = format!("{},{}", block.key.row, block.key.col);
    for v in block.values.iter() {
        let _ = write!(out, ",{}", v);
    }
    out
}
