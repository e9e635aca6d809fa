//! Error taxonomy for the aggregation layer
//!
//! Admission errors are recoverable by the caller and never consume
//! budget. `FatalInvariant` marks conditions the state machine makes
//! impossible by construction; seeing one means the merge must abort.

use thiserror::Error;

use fedmesh_core::{CoreError, InstitutionId, RoundId};
use fedmesh_privacy::PrivacyError;

use crate::round::RoundState;

/// Result alias for aggregation operations
pub type RoundResult<T> = Result<T, RoundError>;

/// Errors raised by rounds and the coordinator
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RoundError {
    #[error("Round {round} not accepting submissions (state: {state:?})")]
    RoundNotAcceptingSubmissions { round: RoundId, state: RoundState },

    #[error("Duplicate submission from {institution} in {round}")]
    DuplicateSubmission {
        round: RoundId,
        institution: InstitutionId,
    },

    #[error("Unknown round: {0}")]
    UnknownRound(RoundId),

    #[error("Round {round} not ready to finalize: {admitted} admitted, quorum {quorum}")]
    RoundNotReady {
        round: RoundId,
        admitted: usize,
        quorum: usize,
    },

    #[error("Round {0} expired without quorum")]
    RoundExpired(RoundId),

    #[error("Fatal invariant violation: {0}")]
    FatalInvariant(String),

    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    #[error("Privacy error: {0}")]
    Privacy(#[from] PrivacyError),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl<T> From<std::sync::PoisonError<T>> for RoundError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        RoundError::LockPoisoned(err.to_string())
    }
}
