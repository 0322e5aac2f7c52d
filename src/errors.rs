//! Crate-wide error type

use thiserror::Error;

/// All the failure modes surfaced by loading and training operations.
///
/// Geometric degeneracy (a label whose points cannot produce a cuboid) and
/// numerical degeneracy (near-singular covariance) are intentionally *not*
/// represented here: the former silently drops the label, the latter is
/// absorbed by regularized inversion. An untrained label pair is `None` in
/// the relation matrix, never an error.
#[derive(Error, Debug)]
pub enum StructureError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A required token is absent or malformed in a line-oriented input file.
    /// The load aborts and the affected section of the structure stays cleared.
    #[error("wrong file format: \"{path}\" line {line}: {detail}")]
    Format {
        path: String,
        line: usize,
        detail: String,
    },

    /// An operation was invoked before its prerequisite data was loaded, or
    /// with an argument outside its domain. Nothing was mutated.
    #[error("precondition violated: {0}")]
    Precondition(&'static str),
}

impl StructureError {
    pub(crate) fn format(
        path: &std::path::Path,
        line: usize,
        detail: impl Into<String>,
    ) -> Self {
        StructureError::Format {
            path: path.display().to_string(),
            line,
            detail: detail.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, StructureError>;
