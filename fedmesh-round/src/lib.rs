//! # 🛰️ fedmesh-round — Federated Aggregation
//!
//! Round lifecycle, sample-weighted merging and the coordinator that
//! drives the whole submission pipeline. Updates enter already subject
//! to budget admission and calibrated noise; this crate decides when a
//! round is ready, merges exactly once, and publishes the next global
//! model version.
//!
//! ## Arquitetura
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                Coordinator                      │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  AggregationRound state machine           │  │
//! │  │  Collecting → Ready → Finalizing →        │  │
//! │  │  Finalized | Expired                      │  │
//! │  └───────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  weighted_merge  Σ(vᵢ·nᵢ)/Σnᵢ             │  │
//! │  └───────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  ModelStore (append-only, attested)       │  │
//! │  └───────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Exemplo
//!
//! ```ignore
//! use fedmesh_round::{Coordinator, CoordinatorConfig};
//!
//! let coord = Coordinator::new(CoordinatorConfig::new(128));
//! coord.register_institution(institution)?;
//! let round = coord.open_round()?;
//! let receipt = coord.submit_update(institution, round, &gradient, 500, 0.5, 1e-5)?;
//! ```

pub mod coordinator;
pub mod error;
pub mod merge;
pub mod round;

pub use coordinator::{
    Coordinator, CoordinatorConfig, ReputationPolicy, SigningAuthority, StubSigner,
    SubmissionReceipt,
};
pub use error::{RoundError, RoundResult};
pub use merge::{deviation, weighted_merge};
pub use round::{
    AggregationRound, FinalizeDecision, RoundConfig, RoundState, RoundStatus,
};
