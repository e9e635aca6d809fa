//! Budget admission control
//!
//! Single entry point for spending privacy budget. The accountant owns
//! the ledger mutex, so eligibility, marginal-cost computation and the
//! reserve all happen under one exclusion and concurrent submissions see
//! a consistent running total.

use std::sync::Mutex;

use fedmesh_core::{InstitutionId, ParticipantRegistry, RoundId};

use crate::composition::{BasicComposition, CompositionStrategy};
use crate::error::{PrivacyError, PrivacyResult};
use crate::ledger::{
    GlobalBudget, InstitutionBudget, LedgerConfig, PrivacyLedger, ReservationId, SpendRecord,
};
use crate::noise::calibrate_sigma;

/// Successful admission: a budget hold plus the calibrated noise level
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Admission {
    pub reservation: ReservationId,
    pub sigma: f64,
}

/// Privacy accountant: composition-bound admission over the ledger
pub struct PrivacyAccountant {
    ledger: Mutex<PrivacyLedger>,
    strategy: Box<dyn CompositionStrategy>,
    l2_bound: f64,
}

impl PrivacyAccountant {
    /// Accountant with the canonical basic-composition rule
    pub fn new(config: LedgerConfig, l2_bound: f64) -> Self {
        Self::with_strategy(config, l2_bound, Box::new(BasicComposition))
    }

    /// Accountant with a caller-chosen composition strategy
    pub fn with_strategy(
        config: LedgerConfig,
        l2_bound: f64,
        strategy: Box<dyn CompositionStrategy>,
    ) -> Self {
        Self {
            ledger: Mutex::new(PrivacyLedger::new(config)),
            strategy,
            l2_bound,
        }
    }

    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Admits a submission: eligibility → parameter validation → marginal
    /// composed cost → reserve → σ.
    ///
    /// A returned hold must later be either committed (update durably
    /// recorded) or released (pipeline failed downstream).
    pub fn admit(
        &self,
        registry: &ParticipantRegistry,
        institution: InstitutionId,
        epsilon: f64,
        delta: f64,
    ) -> PrivacyResult<Admission> {
        if !registry.is_eligible(institution) {
            return Err(PrivacyError::InstitutionIneligible(institution));
        }

        // Validates (ε, δ) and the bound before anything is held
        let sigma = calibrate_sigma(self.l2_bound, epsilon, delta)?;

        let mut ledger = self.ledger.lock()?;
        let episodes = ledger.episodes();
        let (marginal_epsilon, marginal_delta) =
            self.strategy.marginal_cost(&episodes, epsilon, delta);
        let reservation =
            ledger.reserve(institution, epsilon, delta, marginal_epsilon, marginal_delta)?;

        Ok(Admission { reservation, sigma })
    }

    /// Finalizes a hold once the update is durably recorded in the round
    pub fn commit(&self, reservation: ReservationId, round: RoundId) -> PrivacyResult<SpendRecord> {
        self.ledger.lock()?.commit(reservation, round)
    }

    /// Compensating rollback for a hold whose pipeline failed
    pub fn release(&self, reservation: ReservationId) -> PrivacyResult<()> {
        self.ledger.lock()?.release(reservation)
    }

    pub fn institution_budget(&self, institution: InstitutionId) -> PrivacyResult<InstitutionBudget> {
        Ok(self.ledger.lock()?.query(institution))
    }

    pub fn global_budget(&self) -> PrivacyResult<GlobalBudget> {
        Ok(self.ledger.lock()?.query_global())
    }

    pub fn spend_history(&self) -> PrivacyResult<Vec<SpendRecord>> {
        Ok(self.ledger.lock()?.history().to_vec())
    }
}
