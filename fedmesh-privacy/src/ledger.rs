//! Persistent privacy-budget state
//!
//! The ledger is the single mutation surface for budget. Reserve places a
//! conditional hold covering both ε and δ (all-or-nothing); commit turns
//! the hold into durable spend and an audit record; release rolls the
//! hold back so failed pipelines never leak budget.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use fedmesh_core::{InstitutionId, RoundId, unix_timestamp};

use crate::composition::Episode;
use crate::error::{BudgetScope, PrivacyError, PrivacyResult};

/// Handle to a pending budget hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReservationId(pub u64);

impl fmt::Display for ReservationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rsv-{}", self.0)
    }
}

/// Budget limits and per-institution allocation rule
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub global_epsilon: f64,
    pub global_delta: f64,
    /// Fraction of the global budget any one institution may consume
    pub per_institution_fraction: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            global_epsilon: 10.0,
            global_delta: 1e-3,
            per_institution_fraction: 0.5,
        }
    }
}

/// Committed spend, kept forever for audit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpendRecord {
    pub institution: InstitutionId,
    pub round: RoundId,
    pub epsilon: f64,
    pub delta: f64,
    pub timestamp: u64,
}

/// Per-institution spent/allocated snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InstitutionBudget {
    pub allocated_epsilon: f64,
    pub allocated_delta: f64,
    pub spent_epsilon: f64,
    pub spent_delta: f64,
}

/// Global budget snapshot
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GlobalBudget {
    pub budget_epsilon: f64,
    pub budget_delta: f64,
    pub spent_epsilon: f64,
    pub spent_delta: f64,
}

#[derive(Debug, Clone, Copy, Default)]
struct InstitutionSpend {
    spent_epsilon: f64,
    spent_delta: f64,
    pending_epsilon: f64,
    pending_delta: f64,
}

#[derive(Debug, Clone, Copy)]
struct PendingHold {
    institution: InstitutionId,
    /// Requested per-submission cost (charged to the institution)
    epsilon: f64,
    delta: f64,
    /// Marginal composed cost (charged globally)
    marginal_epsilon: f64,
    marginal_delta: f64,
}

/// Privacy-budget ledger.
///
/// Callers serialize access through one lock (the accountant owns the
/// `Mutex`); every method here runs under that exclusion.
#[derive(Debug)]
pub struct PrivacyLedger {
    config: LedgerConfig,
    global_spent_epsilon: f64,
    global_spent_delta: f64,
    global_pending_epsilon: f64,
    global_pending_delta: f64,
    institutions: HashMap<InstitutionId, InstitutionSpend>,
    pending: HashMap<ReservationId, PendingHold>,
    history: Vec<SpendRecord>,
    next_reservation: u64,
}

impl PrivacyLedger {
    pub fn new(mut config: LedgerConfig) -> Self {
        // An institution can never be allocated more than the whole
        // global budget
        config.per_institution_fraction = config.per_institution_fraction.clamp(0.0, 1.0);
        Self {
            config,
            global_spent_epsilon: 0.0,
            global_spent_delta: 0.0,
            global_pending_epsilon: 0.0,
            global_pending_delta: 0.0,
            institutions: HashMap::new(),
            pending: HashMap::new(),
            history: Vec::new(),
            next_reservation: 1,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn allocated_epsilon(&self) -> f64 {
        self.config.global_epsilon * self.config.per_institution_fraction
    }

    fn allocated_delta(&self) -> f64 {
        self.config.global_delta * self.config.per_institution_fraction
    }

    /// Per-submission (ε, δ) episodes already paid for or on hold.
    ///
    /// Input for the composition strategy; includes pending holds so
    /// concurrent reservations observe a consistent running total.
    pub fn episodes(&self) -> Vec<Episode> {
        let mut out: Vec<Episode> = self
            .history
            .iter()
            .map(|r| (r.epsilon, r.delta))
            .collect();
        out.extend(self.pending.values().map(|h| (h.epsilon, h.delta)));
        out
    }

    /// Places an all-or-nothing hold on `(epsilon, delta)` for the
    /// institution and `(marginal_epsilon, marginal_delta)` globally.
    ///
    /// Either both scopes admit the hold or nothing changes.
    pub fn reserve(
        &mut self,
        institution: InstitutionId,
        epsilon: f64,
        delta: f64,
        marginal_epsilon: f64,
        marginal_delta: f64,
    ) -> PrivacyResult<ReservationId> {
        let spend = self.institutions.get(&institution).copied().unwrap_or_default();

        let inst_eps_after = spend.spent_epsilon + spend.pending_epsilon + epsilon;
        let inst_delta_after = spend.spent_delta + spend.pending_delta + delta;
        if inst_eps_after > self.allocated_epsilon() || inst_delta_after > self.allocated_delta() {
            return Err(PrivacyError::BudgetExceeded {
                scope: BudgetScope::Institution,
                requested_epsilon: epsilon,
                available_epsilon: (self.allocated_epsilon()
                    - spend.spent_epsilon
                    - spend.pending_epsilon)
                    .max(0.0),
            });
        }

        let global_eps_after =
            self.global_spent_epsilon + self.global_pending_epsilon + marginal_epsilon;
        let global_delta_after =
            self.global_spent_delta + self.global_pending_delta + marginal_delta;
        if global_eps_after > self.config.global_epsilon
            || global_delta_after > self.config.global_delta
        {
            return Err(PrivacyError::BudgetExceeded {
                scope: BudgetScope::Global,
                requested_epsilon: marginal_epsilon,
                available_epsilon: (self.config.global_epsilon
                    - self.global_spent_epsilon
                    - self.global_pending_epsilon)
                    .max(0.0),
            });
        }

        let id = ReservationId(self.next_reservation);
        self.next_reservation += 1;

        let entry = self.institutions.entry(institution).or_default();
        entry.pending_epsilon += epsilon;
        entry.pending_delta += delta;
        self.global_pending_epsilon += marginal_epsilon;
        self.global_pending_delta += marginal_delta;
        self.pending.insert(
            id,
            PendingHold {
                institution,
                epsilon,
                delta,
                marginal_epsilon,
                marginal_delta,
            },
        );
        Ok(id)
    }

    /// Finalizes a prior successful reserve and appends the audit record
    pub fn commit(&mut self, id: ReservationId, round: RoundId) -> PrivacyResult<SpendRecord> {
        let hold = self
            .pending
            .remove(&id)
            .ok_or(PrivacyError::UnknownReservation(id))?;

        let entry = self.institutions.entry(hold.institution).or_default();
        entry.pending_epsilon -= hold.epsilon;
        entry.pending_delta -= hold.delta;
        entry.spent_epsilon += hold.epsilon;
        entry.spent_delta += hold.delta;

        self.global_pending_epsilon -= hold.marginal_epsilon;
        self.global_pending_delta -= hold.marginal_delta;
        self.global_spent_epsilon += hold.marginal_epsilon;
        self.global_spent_delta += hold.marginal_delta;

        let record = SpendRecord {
            institution: hold.institution,
            round,
            epsilon: hold.epsilon,
            delta: hold.delta,
            timestamp: unix_timestamp(),
        };
        self.history.push(record.clone());
        Ok(record)
    }

    /// Compensating rollback: the hold disappears without spending
    pub fn release(&mut self, id: ReservationId) -> PrivacyResult<()> {
        let hold = self
            .pending
            .remove(&id)
            .ok_or(PrivacyError::UnknownReservation(id))?;

        let entry = self.institutions.entry(hold.institution).or_default();
        entry.pending_epsilon -= hold.epsilon;
        entry.pending_delta -= hold.delta;
        self.global_pending_epsilon -= hold.marginal_epsilon;
        self.global_pending_delta -= hold.marginal_delta;
        Ok(())
    }

    /// (allocated, spent) view for one institution
    pub fn query(&self, institution: InstitutionId) -> InstitutionBudget {
        let spend = self.institutions.get(&institution).copied().unwrap_or_default();
        InstitutionBudget {
            allocated_epsilon: self.allocated_epsilon(),
            allocated_delta: self.allocated_delta(),
            spent_epsilon: spend.spent_epsilon,
            spent_delta: spend.spent_delta,
        }
    }

    /// Global budget/spend view (committed spend only, holds excluded)
    pub fn query_global(&self) -> GlobalBudget {
        GlobalBudget {
            budget_epsilon: self.config.global_epsilon,
            budget_delta: self.config.global_delta,
            spent_epsilon: self.global_spent_epsilon,
            spent_delta: self.global_spent_delta,
        }
    }

    /// Committed spend history, oldest first
    pub fn history(&self) -> &[SpendRecord] {
        &self.history
    }

    /// Outstanding holds (should be transient)
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}
