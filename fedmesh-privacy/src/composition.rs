//! Composition strategies for cumulative privacy loss
//!
//! The accountant asks a strategy for the *marginal* global cost of one
//! more submission on top of the episodes already paid for. Basic
//! composition (linear sum) is the enforcement default; tighter bounds
//! plug in behind the same trait without touching call sites.

/// One paid-for mechanism invocation: (ε, δ)
pub type Episode = (f64, f64);

/// Computes cumulative privacy loss over a sequence of episodes.
///
/// Implementations must be monotone: adding an episode never lowers the
/// composed cost.
pub trait CompositionStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Total (ε, δ) cost of the whole episode history
    fn composed_cost(&self, episodes: &[Episode]) -> (f64, f64);

    /// Cost of admitting `(epsilon, delta)` on top of `episodes`
    fn marginal_cost(&self, episodes: &[Episode], epsilon: f64, delta: f64) -> (f64, f64) {
        let (base_eps, base_delta) = self.composed_cost(episodes);
        let mut extended = episodes.to_vec();
        extended.push((epsilon, delta));
        let (new_eps, new_delta) = self.composed_cost(&extended);
        ((new_eps - base_eps).max(0.0), (new_delta - base_delta).max(0.0))
    }
}

/// Basic composition: costs sum linearly.
///
/// Loose but safe; the canonical enforcement rule.
#[derive(Debug, Clone, Copy, Default)]
pub struct BasicComposition;

impl CompositionStrategy for BasicComposition {
    fn name(&self) -> &'static str {
        "basic"
    }

    fn composed_cost(&self, episodes: &[Episode]) -> (f64, f64) {
        episodes
            .iter()
            .fold((0.0, 0.0), |(e, d), (eps, delta)| (e + eps, d + delta))
    }
}

/// Advanced composition (Dwork et al., 2010), heterogeneous form:
///
/// `ε' = sqrt(2 ln(1/δ') Σεᵢ²) + Σ εᵢ(e^εᵢ − 1)`, `δ' + Σδᵢ` total delta.
///
/// Tighter than basic for many small-ε episodes at the price of the extra
/// failure probability δ'.
#[derive(Debug, Clone, Copy)]
pub struct AdvancedComposition {
    pub delta_prime: f64,
}

impl AdvancedComposition {
    pub fn new(delta_prime: f64) -> Self {
        Self { delta_prime }
    }
}

impl CompositionStrategy for AdvancedComposition {
    fn name(&self) -> &'static str {
        "advanced"
    }

    fn composed_cost(&self, episodes: &[Episode]) -> (f64, f64) {
        if episodes.is_empty() {
            return (0.0, 0.0);
        }
        let sum_sq: f64 = episodes.iter().map(|(e, _)| e * e).sum();
        let slack: f64 = episodes.iter().map(|(e, _)| e * (e.exp() - 1.0)).sum();
        let epsilon = (2.0 * (1.0 / self.delta_prime).ln() * sum_sq).sqrt() + slack;
        let delta = self.delta_prime + episodes.iter().map(|(_, d)| d).sum::<f64>();
        (epsilon, delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_sums_linearly() {
        let episodes = vec![(0.5, 1e-5), (0.25, 1e-5), (0.25, 0.0)];
        let (eps, delta) = BasicComposition.composed_cost(&episodes);
        assert!((eps - 1.0).abs() < 1e-12);
        assert!((delta - 2e-5).abs() < 1e-18);
    }

    #[test]
    fn basic_marginal_equals_request() {
        let episodes = vec![(0.5, 1e-5)];
        let (eps, delta) = BasicComposition.marginal_cost(&episodes, 0.3, 1e-6);
        assert!((eps - 0.3).abs() < 1e-12);
        assert!((delta - 1e-6).abs() < 1e-18);
    }

    #[test]
    fn advanced_beats_basic_for_many_small_episodes() {
        let episodes: Vec<Episode> = (0..100).map(|_| (0.01, 1e-7)).collect();
        let (basic_eps, _) = BasicComposition.composed_cost(&episodes);
        let (adv_eps, _) = AdvancedComposition::new(1e-6).composed_cost(&episodes);
        assert!(adv_eps < basic_eps);
    }

    #[test]
    fn advanced_empty_history_costs_nothing() {
        let (eps, delta) = AdvancedComposition::new(1e-6).composed_cost(&[]);
        assert_eq!(eps, 0.0);
        assert_eq!(delta, 0.0);
    }

    #[test]
    fn marginal_is_nonnegative() {
        let episodes: Vec<Episode> = (0..10).map(|_| (0.5, 1e-6)).collect();
        let (eps, delta) = AdvancedComposition::new(1e-6).marginal_cost(&episodes, 0.5, 1e-6);
        assert!(eps >= 0.0);
        assert!(delta >= 0.0);
    }
}
