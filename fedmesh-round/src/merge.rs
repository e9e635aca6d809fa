//! Sample-count-weighted merge
//!
//! Pure arithmetic over an admitted update set. Order-insensitivity
//! falls out of the formulation: the merge is a single coordinate-wise
//! weighted sum divided by the total weight, never a pairwise fold.

use fedmesh_core::GradientUpdate;

use crate::error::{RoundError, RoundResult};

/// Merges admitted updates into one vector, weighting each update by
/// its declared sample count: `Σ(vᵢ·nᵢ) / Σnᵢ`.
///
/// Updates reach this point already validated, so an empty set or a
/// shape mismatch here means the round state machine was bypassed.
pub fn weighted_merge<'a, I>(updates: I, dimension: usize) -> RoundResult<Vec<f64>>
where
    I: IntoIterator<Item = &'a GradientUpdate>,
{
    let mut accumulator = vec![0.0_f64; dimension];
    let mut total_weight = 0.0_f64;

    for update in updates {
        if update.vector.len() != dimension {
            return Err(RoundError::FatalInvariant(format!(
                "admitted update from {} has dimension {}, model has {}",
                update.institution,
                update.vector.len(),
                dimension
            )));
        }
        let weight = f64::from(update.sample_count);
        for (acc, &value) in accumulator.iter_mut().zip(&update.vector) {
            *acc += value * weight;
        }
        total_weight += weight;
    }

    if total_weight == 0.0 {
        return Err(RoundError::FatalInvariant(
            "merge invoked on an empty update set".to_string(),
        ));
    }

    for value in &mut accumulator {
        *value /= total_weight;
    }
    Ok(accumulator)
}

/// L2 distance between an institution's update and the merged result.
///
/// Feeds the reputation heuristic: large relative deviation marks a
/// low-quality or adversarial contribution.
pub fn deviation(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
