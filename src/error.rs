//! Error kinds raised by model assembly, validation and translation.
//!
//! Public functions return `anyhow::Result`; the kind can be recovered with
//! `err.downcast_ref::<DragonflyError>()`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DragonflyError {
    /// Missing required argument or unrecognized enum value
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Non-planar or non-horizontal floor, self-intersection, degenerate geometry
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    /// Ratio out of bounds, window not trimmable, incoherent louver parameters
    #[error("Invalid descriptor: {0}")]
    InvalidDescriptor(String),

    /// Id collision, inconsistent elevations, non-monotonic stories
    #[error("Invalid assembly: {0}")]
    InvalidAssembly(String),

    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Referenced library object is missing
    #[error("Not found: {0}")]
    NotFound(String),

    /// Subprocess exit non-zero or file system denial
    #[error("External failure: {0}")]
    ExternalFailure(String),

    /// Non-empty validation report
    #[error("Model is invalid:\n{0}")]
    Invalid(String),
}

/// Returns the error kind carried by an `anyhow::Error`, if any.
pub fn kind(err: &anyhow::Error) -> Option<&DragonflyError> {
    err.downcast_ref::<DragonflyError>()
}
