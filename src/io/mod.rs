//! Line-oriented text formats.
//!
//! Every format is one record per line, whitespace or comma delimited. A
//! missing or malformed token aborts the load with
//! [`StructureError::Format`](crate::errors::StructureError::Format) naming
//! the failing path and line; the affected section of the loading structure
//! is left cleared. Relation persistence is the exception: an absent pair
//! file means "untrained" and a pair file that fails to parse is logged and
//! skipped without stopping the batch.

mod structure;
mod trainer;

pub use trainer::{load_feature_collection, load_transformation_collection};

use crate::errors::{Result, StructureError};
use crate::float_types::Real;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// All lines of a text file, in order.
pub(crate) fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let mut lines = Vec::new();
    for line in BufReader::new(file).lines() {
        lines.push(line?);
    }
    Ok(lines)
}

pub(crate) fn parse_real(token: &str, path: &Path, line: usize) -> Result<Real> {
    token.trim().parse::<Real>().map_err(|_| {
        StructureError::format(path, line, format!("expected a number, got \"{token}\""))
    })
}

pub(crate) fn parse_index(token: &str, path: &Path, line: usize) -> Result<usize> {
    token.trim().parse::<usize>().map_err(|_| {
        StructureError::format(path, line, format!("expected an index, got \"{token}\""))
    })
}

/// Parse a comma-separated line of reals.
pub(crate) fn parse_csv_line(line: &str, path: &Path, number: usize) -> Result<Vec<Real>> {
    line.split(',')
        .map(|token| parse_real(token, path, number))
        .collect()
}
