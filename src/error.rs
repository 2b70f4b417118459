//! Error types for chunk meshing

use thiserror::Error;

/// Configuration errors reported before any sampling happens.
///
/// Numerical degeneracy and buffer exhaustion are not errors; see
/// [`EmitStatus`](crate::EmitStatus).
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum Error {
    #[error("chunk size must be a power of two between 1 and 1024, got {0}")]
    InvalidChunkSize(i32),

    #[error("cell size must be finite and positive, got {0}")]
    InvalidCellSize(f32),

    #[error("simplification threshold must be non-negative, got {0}")]
    InvalidThreshold(f32),
}

pub type Result<T> = std::result::Result<T, Error>;
