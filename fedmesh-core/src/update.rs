//! Gradient update records and integrity validation
//!
//! Integrity failures (wrong dimension, non-finite coordinates, zero
//! sample count) are cheap structural checks and must be raised before
//! any privacy budget is reserved for the submission.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::institution::InstitutionId;

/// Monotonically increasing aggregation-round identifier (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoundId(pub u64);

impl fmt::Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round-{}", self.0)
    }
}

/// Seconds since the Unix epoch
pub fn unix_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// A clipped+noised model delta submitted by one institution.
///
/// Immutable once recorded in a round; consumed exactly once by the merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradientUpdate {
    pub institution: InstitutionId,
    pub round: RoundId,
    /// Fixed-dimension model delta (already clipped and perturbed)
    pub vector: Vec<f64>,
    /// Declared local sample count, weights the merge
    pub sample_count: u32,
    /// Epsilon granted to this submission
    pub epsilon: f64,
    /// Delta granted to this submission
    pub delta: f64,
    pub timestamp: u64,
}

impl GradientUpdate {
    pub fn new(
        institution: InstitutionId,
        round: RoundId,
        vector: Vec<f64>,
        sample_count: u32,
        epsilon: f64,
        delta: f64,
    ) -> Self {
        Self {
            institution,
            round,
            vector,
            sample_count,
            epsilon,
            delta,
            timestamp: unix_timestamp(),
        }
    }
}

/// Structural validation of a raw submission against the model shape.
///
/// Runs before any reservation so rejected vectors never touch the ledger.
pub fn validate_submission(vector: &[f64], dimension: usize, sample_count: u32) -> CoreResult<()> {
    if vector.len() != dimension {
        return Err(CoreError::DimensionMismatch {
            expected: dimension,
            actual: vector.len(),
        });
    }
    if sample_count == 0 {
        return Err(CoreError::InvalidSampleCount(sample_count));
    }
    if let Some(idx) = vector.iter().position(|v| !v.is_finite()) {
        return Err(CoreError::NonFiniteValue(idx));
    }
    Ok(())
}
