//! Error types for fedmesh-core

use thiserror::Error;

use crate::institution::InstitutionId;

/// Result alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors raised by registry and data-model operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoreError {
    #[error("Institution already registered: {0}")]
    AlreadyRegistered(InstitutionId),

    #[error("Institution not registered: {0}")]
    UnknownInstitution(InstitutionId),

    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Sample count must be positive, got {0}")]
    InvalidSampleCount(u32),

    #[error("Non-finite value at coordinate {0}")]
    NonFiniteValue(usize),

    #[error("Model version must be {expected}, got {actual}")]
    NonMonotonicVersion { expected: u64, actual: u64 },
}
