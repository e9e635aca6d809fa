//! Error types for fedmesh-privacy

use std::fmt;

use thiserror::Error;

use fedmesh_core::InstitutionId;

use crate::ledger::ReservationId;

/// Result alias for privacy operations
pub type PrivacyResult<T> = Result<T, PrivacyError>;

/// Which budget a failed reservation ran into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetScope {
    Global,
    Institution,
}

impl fmt::Display for BudgetScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BudgetScope::Global => write!(f, "global"),
            BudgetScope::Institution => write!(f, "institution"),
        }
    }
}

/// Errors raised by the ledger, noise mechanism and accountant
#[derive(Debug, Clone, Error, PartialEq)]
pub enum PrivacyError {
    #[error("Budget exceeded ({scope}): need ε={requested_epsilon:.4}, have ε={available_epsilon:.4}")]
    BudgetExceeded {
        scope: BudgetScope,
        requested_epsilon: f64,
        available_epsilon: f64,
    },

    #[error("Institution ineligible: {0}")]
    InstitutionIneligible(InstitutionId),

    #[error("Invalid privacy parameters: ε={epsilon}, δ={delta}")]
    InvalidPrivacyParameters { epsilon: f64, delta: f64 },

    #[error("Invalid clipping bound: {0}")]
    InvalidClippingBound(f64),

    #[error("Unknown reservation: {0}")]
    UnknownReservation(ReservationId),

    #[error("Lock poisoned: {0}")]
    LockPoisoned(String),
}

impl<T> From<std::sync::PoisonError<T>> for PrivacyError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        PrivacyError::LockPoisoned(err.to_string())
    }
}
