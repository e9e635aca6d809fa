//! Aggregation-round state machine
//!
//! `Collecting → Ready → Finalizing → Finalized`, with `Expired` as the
//! no-model terminal. A round opens directly into `Collecting` (the
//! separate intent-registration window is collapsed into round opening;
//! implementers may split it out again without touching callers).
//!
//! Transitions are guarded: late writes, double merges and empty merges
//! are unrepresentable rather than checked after the fact. Expiry is
//! driven by a deadline `Instant` and has no effect beyond the state
//! transition itself.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fedmesh_core::{GradientUpdate, InstitutionId, RoundId};

use crate::error::{RoundError, RoundResult};

/// Round sizing and deadline configuration
#[derive(Debug, Clone, Copy)]
pub struct RoundConfig {
    /// Admitted count that moves the round to `Ready` immediately
    pub target_participants: usize,
    /// Minimum admitted count for a deadline-expired round to finalize
    pub min_quorum: usize,
    /// Collection window measured from round opening
    pub duration: Duration,
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            target_participants: 3,
            min_quorum: 2,
            duration: Duration::from_secs(3600),
        }
    }
}

/// Tagged round state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundState {
    /// Accepting submissions
    Collecting,
    /// Quorum reached; accepting nothing further
    Ready,
    /// Merge in progress
    Finalizing,
    /// Terminal: model version emitted
    Finalized,
    /// Terminal: deadline passed below quorum, no model emitted
    Expired,
}

/// Outcome of `begin_finalize`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeDecision {
    /// This caller owns the merge
    Proceed,
    /// Merge already happened; reuse the recorded version
    AlreadyFinalized(u64),
}

/// Serializable round snapshot for the audit surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundStatus {
    pub round: RoundId,
    pub state: RoundState,
    pub admitted: usize,
    pub target_participants: usize,
    pub min_quorum: usize,
    pub deadline_secs_remaining: Option<u64>,
    pub participants: Vec<InstitutionId>,
    pub result_version: Option<u64>,
}

/// One aggregation round: admitted updates keyed by institution.
///
/// Arrival order is recorded nowhere because the merge must not depend
/// on it.
#[derive(Debug)]
pub struct AggregationRound {
    id: RoundId,
    state: RoundState,
    config: RoundConfig,
    opened_at: Instant,
    updates: HashMap<InstitutionId, GradientUpdate>,
    result_version: Option<u64>,
}

impl AggregationRound {
    /// Opens a round directly into `Collecting`
    pub fn open(id: RoundId, config: RoundConfig) -> Self {
        info!(round = id.0, target = config.target_participants, "round opened");
        Self {
            id,
            state: RoundState::Collecting,
            config,
            opened_at: Instant::now(),
            updates: HashMap::new(),
            result_version: None,
        }
    }

    pub fn id(&self) -> RoundId {
        self.id
    }

    pub fn state(&self) -> RoundState {
        self.state
    }

    pub fn admitted(&self) -> usize {
        self.updates.len()
    }

    pub fn config(&self) -> &RoundConfig {
        &self.config
    }

    pub fn result_version(&self) -> Option<u64> {
        self.result_version
    }

    /// Admitted updates (order-irrelevant)
    pub fn updates(&self) -> impl Iterator<Item = &GradientUpdate> {
        self.updates.values()
    }

    pub fn update_for(&self, institution: InstitutionId) -> Option<&GradientUpdate> {
        self.updates.get(&institution)
    }

    fn is_past_deadline(&self) -> bool {
        self.opened_at.elapsed() > self.config.duration
    }

    pub fn deadline_remaining(&self) -> Option<Duration> {
        let elapsed = self.opened_at.elapsed();
        if elapsed >= self.config.duration {
            None
        } else {
            Some(self.config.duration - elapsed)
        }
    }

    /// Applies the deadline rule: an overdue `Collecting` round becomes
    /// `Ready` at or above quorum, `Expired` below it.
    ///
    /// Expiry preserves the admitted set for audit; it only stops a
    /// model from being emitted.
    pub fn tick(&mut self) -> RoundState {
        if self.state == RoundState::Collecting && self.is_past_deadline() {
            if self.updates.len() >= self.config.min_quorum {
                info!(round = self.id.0, admitted = self.updates.len(), "deadline passed at quorum, round ready");
                self.state = RoundState::Ready;
            } else {
                info!(round = self.id.0, admitted = self.updates.len(), "round expired below quorum");
                self.state = RoundState::Expired;
            }
        }
        self.state
    }

    /// Pre-reservation gate: the round must be accepting and must not
    /// already hold an update from this institution.
    pub fn check_accepting(&mut self, institution: InstitutionId) -> RoundResult<()> {
        self.tick();
        if self.state != RoundState::Collecting {
            debug!(round = self.id.0, %institution, state = ?self.state, "submission rejected");
            return Err(RoundError::RoundNotAcceptingSubmissions {
                round: self.id,
                state: self.state,
            });
        }
        if self.updates.contains_key(&institution) {
            debug!(round = self.id.0, %institution, "duplicate submission rejected");
            return Err(RoundError::DuplicateSubmission {
                round: self.id,
                institution,
            });
        }
        Ok(())
    }

    /// Records an admitted update; first submission per institution wins
    pub fn record(&mut self, update: GradientUpdate) -> RoundResult<RoundState> {
        self.check_accepting(update.institution)?;
        debug!(round = self.id.0, institution = %update.institution, "update recorded");
        self.updates.insert(update.institution, update);

        if self.updates.len() >= self.config.target_participants {
            info!(round = self.id.0, "target participation reached, round ready");
            self.state = RoundState::Ready;
        }
        Ok(self.state)
    }

    /// Claims the merge. Exactly one caller ever gets `Proceed`; the
    /// transition happens under the caller's exclusive round access.
    pub fn begin_finalize(&mut self) -> RoundResult<FinalizeDecision> {
        self.tick();
        match self.state {
            RoundState::Finalized => {
                let version = self.result_version.ok_or_else(|| {
                    RoundError::FatalInvariant(format!(
                        "{} finalized without a result version",
                        self.id
                    ))
                })?;
                Ok(FinalizeDecision::AlreadyFinalized(version))
            }
            RoundState::Ready => {
                self.state = RoundState::Finalizing;
                Ok(FinalizeDecision::Proceed)
            }
            RoundState::Collecting => Err(RoundError::RoundNotReady {
                round: self.id,
                admitted: self.updates.len(),
                quorum: self.config.min_quorum,
            }),
            RoundState::Expired => Err(RoundError::RoundExpired(self.id)),
            // Unreachable while finalize runs under exclusive access
            RoundState::Finalizing => Err(RoundError::FatalInvariant(format!(
                "{} already finalizing",
                self.id
            ))),
        }
    }

    /// Seals the round after the merge arithmetic ran exactly once
    pub fn complete_finalize(&mut self, version: u64) -> RoundResult<()> {
        if self.state != RoundState::Finalizing {
            return Err(RoundError::FatalInvariant(format!(
                "{} completed finalize from state {:?}",
                self.id, self.state
            )));
        }
        self.state = RoundState::Finalized;
        self.result_version = Some(version);
        info!(round = self.id.0, version, "round finalized");
        Ok(())
    }

    /// Audit snapshot
    pub fn snapshot(&self) -> RoundStatus {
        let mut participants: Vec<InstitutionId> = self.updates.keys().copied().collect();
        participants.sort();
        RoundStatus {
            round: self.id,
            state: self.state,
            admitted: self.updates.len(),
            target_participants: self.config.target_participants,
            min_quorum: self.config.min_quorum,
            deadline_secs_remaining: self.deadline_remaining().map(|d| d.as_secs()),
            participants,
            result_version: self.result_version,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(inst: u64, round: RoundId) -> GradientUpdate {
        GradientUpdate::new(InstitutionId(inst), round, vec![1.0, 2.0], 10, 0.5, 1e-5)
    }

    fn round(target: usize, quorum: usize, secs: u64) -> AggregationRound {
        AggregationRound::open(
            RoundId(1),
            RoundConfig {
                target_participants: target,
                min_quorum: quorum,
                duration: Duration::from_secs(secs),
            },
        )
    }

    #[test]
    fn opens_collecting() {
        let r = round(3, 2, 3600);
        assert_eq!(r.state(), RoundState::Collecting);
        assert_eq!(r.admitted(), 0);
    }

    #[test]
    fn target_reached_moves_to_ready() {
        let mut r = round(2, 2, 3600);
        assert_eq!(r.record(update(1, RoundId(1))).unwrap(), RoundState::Collecting);
        assert_eq!(r.record(update(2, RoundId(1))).unwrap(), RoundState::Ready);

        // No further writes accepted
        assert!(matches!(
            r.record(update(3, RoundId(1))),
            Err(RoundError::RoundNotAcceptingSubmissions { .. })
        ));
    }

    #[test]
    fn duplicate_submission_rejected_and_set_unchanged() {
        let mut r = round(3, 2, 3600);
        r.record(update(1, RoundId(1))).unwrap();

        let err = r.record(update(1, RoundId(1))).unwrap_err();
        assert!(matches!(err, RoundError::DuplicateSubmission { .. }));
        assert_eq!(r.admitted(), 1);
        // The first admitted update stands
        assert_eq!(r.update_for(InstitutionId(1)).unwrap().vector, vec![1.0, 2.0]);
    }

    #[test]
    fn deadline_below_quorum_expires() {
        let mut r = round(3, 2, 0);
        r.tick(); // elapsed == 0 is not past a zero deadline yet
        std::thread::sleep(Duration::from_millis(20));

        assert_eq!(r.tick(), RoundState::Expired);
        assert!(matches!(
            r.record(update(1, RoundId(1))),
            Err(RoundError::RoundNotAcceptingSubmissions { .. })
        ));
        assert!(matches!(r.begin_finalize(), Err(RoundError::RoundExpired(_))));
    }

    #[test]
    fn deadline_at_quorum_becomes_ready() {
        let mut r = round(5, 2, 1);
        r.record(update(1, RoundId(1))).unwrap();
        r.record(update(2, RoundId(1))).unwrap();

        std::thread::sleep(Duration::from_millis(1100));
        assert_eq!(r.tick(), RoundState::Ready);
        assert_eq!(r.begin_finalize().unwrap(), FinalizeDecision::Proceed);
    }

    #[test]
    fn expiry_preserves_admitted_updates() {
        let mut r = round(5, 3, 1);
        r.record(update(1, RoundId(1))).unwrap();
        std::thread::sleep(Duration::from_millis(1100));

        assert_eq!(r.tick(), RoundState::Expired);
        assert_eq!(r.admitted(), 1); // kept for audit
    }

    #[test]
    fn finalize_is_claimed_exactly_once() {
        let mut r = round(1, 1, 3600);
        r.record(update(1, RoundId(1))).unwrap();

        assert_eq!(r.begin_finalize().unwrap(), FinalizeDecision::Proceed);
        r.complete_finalize(7).unwrap();

        assert_eq!(
            r.begin_finalize().unwrap(),
            FinalizeDecision::AlreadyFinalized(7)
        );
        assert_eq!(r.result_version(), Some(7));
    }

    #[test]
    fn finalize_before_quorum_rejected() {
        let mut r = round(3, 2, 3600);
        r.record(update(1, RoundId(1))).unwrap();
        assert!(matches!(
            r.begin_finalize(),
            Err(RoundError::RoundNotReady { admitted: 1, .. })
        ));
    }

    #[test]
    fn complete_from_wrong_state_is_fatal() {
        let mut r = round(1, 1, 3600);
        r.record(update(1, RoundId(1))).unwrap();
        assert!(matches!(
            r.complete_finalize(1),
            Err(RoundError::FatalInvariant(_))
        ));
    }

    #[test]
    fn snapshot_reflects_round() {
        let mut r = round(3, 2, 3600);
        r.record(update(2, RoundId(1))).unwrap();
        r.record(update(1, RoundId(1))).unwrap();

        let status = r.snapshot();
        assert_eq!(status.admitted, 2);
        assert_eq!(status.state, RoundState::Collecting);
        assert_eq!(status.participants, vec![InstitutionId(1), InstitutionId(2)]);
        assert!(status.deadline_secs_remaining.is_some());

        // Snapshot serializes for the audit surface
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"Collecting\""));
    }
}
