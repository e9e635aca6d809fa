//! Participant registry: who may submit, and how trusted they are
//!
//! Eligibility is derived, never stored: an institution is eligible when
//! it is not suspended and its reputation sits at or above the configured
//! floor. Reputation deltas arrive from the aggregation layer after each
//! finalized round.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::institution::{Institution, InstitutionId};
use crate::update::unix_timestamp;

/// Registry tuning knobs
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ReputationConfig {
    /// Score assigned on registration
    pub neutral_start: f64,
    /// Minimum score to remain eligible
    pub eligibility_floor: f64,
}

impl Default for ReputationConfig {
    fn default() -> Self {
        Self {
            neutral_start: 0.5,
            eligibility_floor: 0.2,
        }
    }
}

/// Institution registry
#[derive(Debug, Clone)]
pub struct ParticipantRegistry {
    institutions: HashMap<InstitutionId, Institution>,
    config: ReputationConfig,
}

impl ParticipantRegistry {
    pub fn new(config: ReputationConfig) -> Self {
        Self {
            institutions: HashMap::new(),
            config,
        }
    }

    /// Registers a new institution with a neutral reputation
    pub fn register(&mut self, id: InstitutionId) -> CoreResult<()> {
        if self.institutions.contains_key(&id) {
            return Err(CoreError::AlreadyRegistered(id));
        }
        let record = Institution::new(id, self.config.neutral_start, unix_timestamp());
        self.institutions.insert(id, record);
        Ok(())
    }

    /// True unless unknown, suspended, or below the reputation floor
    pub fn is_eligible(&self, id: InstitutionId) -> bool {
        match self.institutions.get(&id) {
            Some(inst) => !inst.suspended && inst.reputation >= self.config.eligibility_floor,
            None => false,
        }
    }

    /// Applies a signed reputation delta, clamped to [0, 1].
    ///
    /// Returns the new score.
    pub fn update_reputation(&mut self, id: InstitutionId, delta: f64) -> CoreResult<f64> {
        let inst = self
            .institutions
            .get_mut(&id)
            .ok_or(CoreError::UnknownInstitution(id))?;
        inst.reputation = (inst.reputation + delta).clamp(0.0, 1.0);
        Ok(inst.reputation)
    }

    /// Records an admitted submission against the institution's history
    pub fn record_contribution(
        &mut self,
        id: InstitutionId,
        epsilon: f64,
        delta: f64,
    ) -> CoreResult<()> {
        let inst = self
            .institutions
            .get_mut(&id)
            .ok_or(CoreError::UnknownInstitution(id))?;
        inst.epsilon_spent += epsilon;
        inst.delta_spent += delta;
        inst.total_contributions += 1;
        inst.last_update = unix_timestamp();
        Ok(())
    }

    /// Revokes eligibility; the record stays for audit
    pub fn suspend(&mut self, id: InstitutionId) -> CoreResult<()> {
        let inst = self
            .institutions
            .get_mut(&id)
            .ok_or(CoreError::UnknownInstitution(id))?;
        inst.suspended = true;
        Ok(())
    }

    /// Restores eligibility (reputation floor still applies)
    pub fn reinstate(&mut self, id: InstitutionId) -> CoreResult<()> {
        let inst = self
            .institutions
            .get_mut(&id)
            .ok_or(CoreError::UnknownInstitution(id))?;
        inst.suspended = false;
        Ok(())
    }

    pub fn get(&self, id: InstitutionId) -> Option<&Institution> {
        self.institutions.get(&id)
    }

    pub fn contains(&self, id: InstitutionId) -> bool {
        self.institutions.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.institutions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.institutions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Institution> {
        self.institutions.values()
    }

    pub fn config(&self) -> &ReputationConfig {
        &self.config
    }
}
