//! Gradient clipping and calibrated noise
//!
//! Pure function library plus a small RNG wrapper. Production callers use
//! an entropy-seeded CSPRNG; tests pin a seed for reproducibility.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::error::{PrivacyError, PrivacyResult};

/// Noise-mechanism configuration carried by the aggregation pipeline
#[derive(Debug, Clone, Copy)]
pub struct NoiseConfig {
    /// L2 clipping bound applied to every raw submission
    pub l2_bound: f64,
    /// Fixed RNG seed; only set in tests
    pub seed: Option<u64>,
}

impl Default for NoiseConfig {
    fn default() -> Self {
        Self {
            l2_bound: 1.0,
            seed: None,
        }
    }
}

/// Euclidean norm
pub fn l2_norm(vector: &[f64]) -> f64 {
    vector.iter().map(|x| x * x).sum::<f64>().sqrt()
}

/// Scales `vector` so its L2 norm does not exceed `l2_bound`.
///
/// Vectors already inside the bound pass through unchanged (scale = 1),
/// which makes the operation idempotent.
pub fn clip(vector: &[f64], l2_bound: f64) -> Vec<f64> {
    let norm = l2_norm(vector);
    if norm <= l2_bound || norm == 0.0 {
        vector.to_vec()
    } else {
        let scale = l2_bound / norm;
        vector.iter().map(|x| x * scale).collect()
    }
}

/// Gaussian-mechanism calibration:
/// `σ = l2_bound · sqrt(2 ln(1.25/δ)) / ε`
///
/// Valid only for `ε > 0` and `0 < δ < 1`.
pub fn calibrate_sigma(l2_bound: f64, epsilon: f64, delta: f64) -> PrivacyResult<f64> {
    if !(l2_bound > 0.0) || !l2_bound.is_finite() {
        return Err(PrivacyError::InvalidClippingBound(l2_bound));
    }
    if !(epsilon > 0.0) || !(delta > 0.0) || delta >= 1.0 {
        return Err(PrivacyError::InvalidPrivacyParameters { epsilon, delta });
    }
    Ok(l2_bound * (2.0_f64 * (1.25_f64 / delta).ln()).sqrt() / epsilon)
}

/// Laplace scale `b = l2_bound / ε` (pure ε-DP mechanism)
pub fn laplace_scale(l2_bound: f64, epsilon: f64) -> PrivacyResult<f64> {
    if !(l2_bound > 0.0) || !l2_bound.is_finite() {
        return Err(PrivacyError::InvalidClippingBound(l2_bound));
    }
    if !(epsilon > 0.0) {
        return Err(PrivacyError::InvalidPrivacyParameters {
            epsilon,
            delta: 0.0,
        });
    }
    Ok(l2_bound / epsilon)
}

/// Random source for noise injection.
///
/// `StdRng` is a cryptographically sound generator; `new()` seeds it from
/// OS entropy. `with_seed` exists for reproducible tests only.
pub struct NoiseGenerator {
    rng: StdRng,
}

impl NoiseGenerator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_config(config: &NoiseConfig) -> Self {
        match config.seed {
            Some(seed) => Self::with_seed(seed),
            None => Self::new(),
        }
    }

    /// Adds independent zero-mean Gaussian noise with std-dev `sigma`
    pub fn gaussian(&mut self, vector: &[f64], sigma: f64) -> PrivacyResult<Vec<f64>> {
        let normal = Normal::new(0.0, sigma).map_err(|_| PrivacyError::InvalidPrivacyParameters {
            epsilon: 0.0,
            delta: 0.0,
        })?;
        Ok(vector
            .iter()
            .map(|x| x + normal.sample(&mut self.rng))
            .collect())
    }

    /// Adds Laplace noise via inverse CDF: `-b·sign(u)·ln(1-2|u|)`
    pub fn laplace(&mut self, vector: &[f64], scale: f64) -> Vec<f64> {
        vector
            .iter()
            .map(|x| {
                let u: f64 = self.rng.r#gen::<f64>() - 0.5;
                x - scale * u.signum() * (1.0 - 2.0 * u.abs()).ln()
            })
            .collect()
    }
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clip_scales_to_bound() {
        let clipped = clip(&[3.0, 4.0], 1.0); // norm 5
        assert!((l2_norm(&clipped) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn clip_is_noop_inside_bound() {
        let clipped = clip(&[3.0, 4.0], 10.0);
        assert_eq!(clipped, vec![3.0, 4.0]);
    }

    #[test]
    fn clip_is_idempotent() {
        let once = clip(&[3.0, 4.0, 12.0], 2.0);
        let twice = clip(&once, 2.0);
        assert_eq!(once, twice);
    }

    #[test]
    fn clip_handles_zero_vector() {
        assert_eq!(clip(&[0.0, 0.0], 1.0), vec![0.0, 0.0]);
    }

    #[test]
    fn sigma_matches_closed_form() {
        let sigma = calibrate_sigma(1.0, 1.0, 1e-5).unwrap();
        let expected = (2.0_f64 * (1.25_f64 / 1e-5).ln()).sqrt();
        assert!((sigma - expected).abs() < 1e-12);
    }

    #[test]
    fn sigma_monotonic_in_epsilon_and_bound() {
        let s1 = calibrate_sigma(1.0, 0.5, 1e-5).unwrap();
        let s2 = calibrate_sigma(1.0, 1.0, 1e-5).unwrap();
        let s3 = calibrate_sigma(1.0, 2.0, 1e-5).unwrap();
        assert!(s1 > s2 && s2 > s3); // decreasing in ε

        let b1 = calibrate_sigma(0.5, 1.0, 1e-5).unwrap();
        let b2 = calibrate_sigma(2.0, 1.0, 1e-5).unwrap();
        assert!(b1 < s2 && s2 < b2); // increasing in the clipping bound
    }

    #[test]
    fn sigma_rejects_invalid_parameters() {
        assert!(calibrate_sigma(1.0, 0.0, 1e-5).is_err());
        assert!(calibrate_sigma(1.0, -1.0, 1e-5).is_err());
        assert!(calibrate_sigma(1.0, 1.0, 0.0).is_err());
        assert!(calibrate_sigma(1.0, 1.0, 1.0).is_err());
        assert!(calibrate_sigma(0.0, 1.0, 1e-5).is_err());
    }

    #[test]
    fn seeded_gaussian_is_reproducible() {
        let sigma = 0.1;
        let input = vec![1.0, 2.0, 3.0];
        let a = NoiseGenerator::with_seed(42).gaussian(&input, sigma).unwrap();
        let b = NoiseGenerator::with_seed(42).gaussian(&input, sigma).unwrap();
        assert_eq!(a, b);
        assert!(a.iter().zip(input.iter()).any(|(x, y)| (x - y).abs() > 1e-12));
    }

    #[test]
    fn laplace_perturbs_every_coordinate() {
        let mut generator = NoiseGenerator::with_seed(7);
        let out = generator.laplace(&[0.0, 0.0, 0.0], 1.0);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|v| v.is_finite()));
    }
}
