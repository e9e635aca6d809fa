//! Aggregation coordinator
//!
//! Wires the registry, privacy accountant, noise mechanism, round
//! arena and model store into the submission and finalize pipelines.
//!
//! Lock order is fixed: the registry guard is dropped before the round
//! arena is taken, and the model store is only ever locked while the
//! round arena write guard is held. Reputation updates run after the
//! arena is released.

use std::collections::BTreeMap;
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{error, info, warn};

use fedmesh_core::{
    GlobalModel, GradientUpdate, Institution, InstitutionId, ModelStore, ParticipantRegistry,
    ReputationConfig, RoundId, validate_submission,
};
use fedmesh_privacy::{
    GlobalBudget, InstitutionBudget, LedgerConfig, NoiseConfig, NoiseGenerator, PrivacyAccountant,
    SpendRecord, clip,
};

use crate::error::{RoundError, RoundResult};
use crate::merge::{deviation, weighted_merge};
use crate::round::{AggregationRound, FinalizeDecision, RoundConfig, RoundState, RoundStatus};

/// Produces the attestation attached to each finalized model version.
///
/// The real authority lives outside this crate; deployments inject it
/// at construction.
pub trait SigningAuthority: Send + Sync {
    fn sign(&self, content_hash: &str) -> Vec<u8>;
}

/// Deterministic placeholder authority: SHA-256 over the content hash
pub struct StubSigner;

impl SigningAuthority for StubSigner {
    fn sign(&self, content_hash: &str) -> Vec<u8> {
        let mut hasher = Sha256::new();
        hasher.update(b"fedmesh-attest:");
        hasher.update(content_hash.as_bytes());
        hasher.finalize().to_vec()
    }
}

/// Post-round reputation heuristic.
///
/// Deviation is measured relative to the merged vector's norm so the
/// threshold is scale-free.
#[derive(Debug, Clone, Copy)]
pub struct ReputationPolicy {
    /// Relative L2 deviation above which a contribution is penalized
    pub deviation_threshold: f64,
    /// Score delta for an in-band contribution
    pub reward: f64,
    /// Score delta for an outlier contribution
    pub penalty: f64,
}

impl Default for ReputationPolicy {
    fn default() -> Self {
        Self {
            deviation_threshold: 2.0,
            reward: 0.01,
            penalty: 0.05,
        }
    }
}

/// Everything the coordinator needs to run
#[derive(Debug, Clone)]
pub struct CoordinatorConfig {
    /// Model parameter dimension; all submissions must match
    pub dimension: usize,
    /// Open the successor round as soon as a round finalizes
    pub auto_open_next: bool,
    pub round: RoundConfig,
    pub ledger: LedgerConfig,
    pub noise: NoiseConfig,
    pub reputation: ReputationConfig,
    pub policy: ReputationPolicy,
}

impl CoordinatorConfig {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            auto_open_next: true,
            round: RoundConfig::default(),
            ledger: LedgerConfig::default(),
            noise: NoiseConfig::default(),
            reputation: ReputationConfig::default(),
            policy: ReputationPolicy::default(),
        }
    }
}

/// Receipt handed back for an admitted submission
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub round: RoundId,
    pub state: RoundState,
    /// Noise level actually applied to the stored update
    pub sigma: f64,
}

/// Central coordinator over registry, budget, rounds and models
pub struct Coordinator {
    config: CoordinatorConfig,
    registry: RwLock<ParticipantRegistry>,
    accountant: PrivacyAccountant,
    rounds: RwLock<BTreeMap<RoundId, AggregationRound>>,
    models: RwLock<ModelStore>,
    noise: Mutex<NoiseGenerator>,
    signer: Box<dyn SigningAuthority>,
}

impl Coordinator {
    pub fn new(config: CoordinatorConfig) -> Self {
        Self::with_signer(config, Box::new(StubSigner))
    }

    pub fn with_signer(config: CoordinatorConfig, signer: Box<dyn SigningAuthority>) -> Self {
        let registry = ParticipantRegistry::new(config.reputation);
        let accountant = PrivacyAccountant::new(config.ledger, config.noise.l2_bound);
        let noise = NoiseGenerator::from_config(&config.noise);
        let models = ModelStore::zeroed(config.dimension);
        Self {
            config,
            registry: RwLock::new(registry),
            accountant,
            rounds: RwLock::new(BTreeMap::new()),
            models: RwLock::new(models),
            noise: Mutex::new(noise),
            signer,
        }
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    // ------------------------------------------------------------------
    // Registry surface

    pub fn register_institution(&self, id: InstitutionId) -> RoundResult<()> {
        self.registry.write()?.register(id)?;
        info!(institution = %id, "institution registered");
        Ok(())
    }

    pub fn suspend_institution(&self, id: InstitutionId) -> RoundResult<()> {
        self.registry.write()?.suspend(id)?;
        warn!(institution = %id, "institution suspended");
        Ok(())
    }

    pub fn reinstate_institution(&self, id: InstitutionId) -> RoundResult<()> {
        self.registry.write()?.reinstate(id)?;
        info!(institution = %id, "institution reinstated");
        Ok(())
    }

    pub fn institution(&self, id: InstitutionId) -> RoundResult<Option<Institution>> {
        Ok(self.registry.read()?.get(id).cloned())
    }

    // ------------------------------------------------------------------
    // Round lifecycle

    /// Opens the next round; identifiers are monotonic and 1-based
    pub fn open_round(&self) -> RoundResult<RoundId> {
        let mut rounds = self.rounds.write()?;
        let id = RoundId(rounds.last_key_value().map_or(1, |(k, _)| k.0 + 1));
        rounds.insert(id, AggregationRound::open(id, self.config.round));
        Ok(id)
    }

    /// Full submission pipeline: integrity check, budget admission,
    /// clip, noise, record. The raw vector is dropped after this call;
    /// only the perturbed update is ever stored.
    ///
    /// Any failure after admission releases the budget hold, so a
    /// rejected submission leaves the ledger exactly as it found it.
    pub fn submit_update(
        &self,
        institution: InstitutionId,
        round_id: RoundId,
        vector: &[f64],
        sample_count: u32,
        epsilon: f64,
        delta: f64,
    ) -> RoundResult<SubmissionReceipt> {
        validate_submission(vector, self.config.dimension, sample_count)?;

        // Cheap acceptance gate before any budget is held; record
        // re-checks under the same write lock to close the race window.
        {
            let mut rounds = self.rounds.write()?;
            let round = rounds
                .get_mut(&round_id)
                .ok_or(RoundError::UnknownRound(round_id))?;
            round.check_accepting(institution)?;
        }

        let admission = {
            let registry = self.registry.read()?;
            self.accountant.admit(&registry, institution, epsilon, delta)?
        };

        let perturbed = {
            let clipped = clip(vector, self.config.noise.l2_bound);
            let mut noise = match self.noise.lock() {
                Ok(guard) => guard,
                Err(err) => {
                    self.release_hold(admission.reservation);
                    return Err(RoundError::LockPoisoned(err.to_string()));
                }
            };
            match noise.gaussian(&clipped, admission.sigma) {
                Ok(vector) => vector,
                Err(err) => {
                    self.release_hold(admission.reservation);
                    return Err(err.into());
                }
            }
        };

        let update = GradientUpdate::new(
            institution,
            round_id,
            perturbed,
            sample_count,
            epsilon,
            delta,
        );

        let state = {
            let mut rounds = match self.rounds.write() {
                Ok(guard) => guard,
                Err(err) => {
                    self.release_hold(admission.reservation);
                    return Err(RoundError::LockPoisoned(err.to_string()));
                }
            };
            let round = match rounds.get_mut(&round_id) {
                Some(round) => round,
                None => {
                    drop(rounds);
                    self.release_hold(admission.reservation);
                    return Err(RoundError::UnknownRound(round_id));
                }
            };
            match round.record(update) {
                Ok(state) => state,
                Err(err) => {
                    drop(rounds);
                    self.release_hold(admission.reservation);
                    return Err(err);
                }
            }
        };

        self.accountant.commit(admission.reservation, round_id)?;
        self.registry
            .write()?
            .record_contribution(institution, epsilon, delta)?;

        if state == RoundState::Ready {
            // Submission already succeeded; a finalize failure here is
            // surfaced through logs and retried by the next caller.
            if let Err(err) = self.finalize_round(round_id) {
                error!(round = round_id.0, %err, "auto-finalize failed");
            }
        }

        Ok(SubmissionReceipt {
            round: round_id,
            state,
            sigma: admission.sigma,
        })
    }

    /// Merges a ready round into the next model version.
    ///
    /// Idempotent: repeated and racing calls all observe the version
    /// produced by the single merge.
    pub fn finalize_round(&self, round_id: RoundId) -> RoundResult<u64> {
        let (version, merged, contributions) = {
            let mut rounds = self.rounds.write()?;
            let round = rounds
                .get_mut(&round_id)
                .ok_or(RoundError::UnknownRound(round_id))?;

            match round.begin_finalize()? {
                FinalizeDecision::AlreadyFinalized(version) => return Ok(version),
                FinalizeDecision::Proceed => {}
            }

            let merged = weighted_merge(round.updates(), self.config.dimension)?;
            let contributions: Vec<(InstitutionId, Vec<f64>)> = round
                .updates()
                .map(|u| (u.institution, u.vector.clone()))
                .collect();

            let version = {
                let mut models = self.models.write()?;
                let version = models.current().version + 1;
                let model = GlobalModel::new(version, merged.clone(), round_id);
                let attestation = self.signer.sign(&model.content_hash);
                models.push(model.with_attestation(attestation))?;
                version
            };

            round.complete_finalize(version)?;

            if self.config.auto_open_next {
                let next = RoundId(rounds.last_key_value().map_or(1, |(k, _)| k.0 + 1));
                rounds.insert(next, AggregationRound::open(next, self.config.round));
            }
            (version, merged, contributions)
        };

        self.apply_reputation(&merged, &contributions)?;
        info!(round = round_id.0, version, participants = contributions.len(), "model version published");
        Ok(version)
    }

    /// Applies the deadline rule to every open round; returns the
    /// rounds that expired.
    pub fn expire_overdue(&self) -> RoundResult<Vec<RoundId>> {
        let mut rounds = self.rounds.write()?;
        let mut expired = Vec::new();
        for (id, round) in rounds.iter_mut() {
            let was_collecting = round.state() == RoundState::Collecting;
            if was_collecting && round.tick() == RoundState::Expired {
                expired.push(*id);
            }
        }
        Ok(expired)
    }

    /// Most recently opened round, if any
    pub fn latest_round(&self) -> RoundResult<Option<RoundId>> {
        Ok(self.rounds.read()?.last_key_value().map(|(k, _)| *k))
    }

    pub fn round_status(&self, round_id: RoundId) -> RoundResult<RoundStatus> {
        let rounds = self.rounds.read()?;
        rounds
            .get(&round_id)
            .map(AggregationRound::snapshot)
            .ok_or(RoundError::UnknownRound(round_id))
    }

    // ------------------------------------------------------------------
    // Model surface

    pub fn current_model(&self) -> RoundResult<GlobalModel> {
        Ok(self.models.read()?.current().clone())
    }

    pub fn model(&self, version: u64) -> RoundResult<Option<GlobalModel>> {
        Ok(self.models.read()?.get(version).cloned())
    }

    pub fn model_history(&self) -> RoundResult<Vec<GlobalModel>> {
        Ok(self.models.read()?.history().to_vec())
    }

    // ------------------------------------------------------------------
    // Budget surface

    pub fn institution_budget(&self, id: InstitutionId) -> RoundResult<InstitutionBudget> {
        Ok(self.accountant.institution_budget(id)?)
    }

    pub fn global_budget(&self) -> RoundResult<GlobalBudget> {
        Ok(self.accountant.global_budget()?)
    }

    pub fn spend_history(&self) -> RoundResult<Vec<SpendRecord>> {
        Ok(self.accountant.spend_history()?)
    }

    // ------------------------------------------------------------------

    fn release_hold(&self, reservation: fedmesh_privacy::ReservationId) {
        if let Err(err) = self.accountant.release(reservation) {
            error!(%reservation, %err, "failed to release budget hold");
        }
    }

    fn apply_reputation(
        &self,
        merged: &[f64],
        contributions: &[(InstitutionId, Vec<f64>)],
    ) -> RoundResult<()> {
        let scale = fedmesh_privacy::l2_norm(merged).max(f64::EPSILON);
        let mut registry = self.registry.write()?;
        for (institution, vector) in contributions {
            let relative = deviation(vector, merged) / scale;
            let delta = if relative > self.config.policy.deviation_threshold {
                warn!(institution = %institution, relative, "outlier contribution penalized");
                -self.config.policy.penalty
            } else {
                self.config.policy.reward
            };
            registry.update_reputation(*institution, delta)?;
        }
        Ok(())
    }
}
