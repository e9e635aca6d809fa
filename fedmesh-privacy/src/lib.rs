//! # 🔒 fedmesh-privacy — Differential Privacy Core
//!
//! Budget ledger, calibrated noise and composition accounting for the
//! FedMesh aggregation engine. Every admitted submission pays for itself
//! out of a finite (ε, δ) budget; this crate is the only place that
//! budget is ever debited.
//!
//! ## Arquitetura
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │            PrivacyAccountant                    │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  CompositionStrategy (Basic | Advanced)   │  │
//! │  └───────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  Mutex<PrivacyLedger>                     │  │
//! │  │  reserve → commit | release               │  │
//! │  └───────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  Noise: clip → calibrate σ → perturb      │  │
//! │  └───────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Exemplo
//!
//! ```ignore
//! use fedmesh_privacy::{PrivacyAccountant, LedgerConfig};
//!
//! let accountant = PrivacyAccountant::new(LedgerConfig::default(), 1.0);
//! let admission = accountant.admit(&registry, institution, 0.5, 1e-5)?;
//! // ... record the noised update, then:
//! accountant.commit(admission.reservation, round_id)?;
//! ```

pub mod accountant;
pub mod composition;
pub mod error;
pub mod ledger;
pub mod noise;

pub use accountant::{Admission, PrivacyAccountant};
pub use composition::{AdvancedComposition, BasicComposition, CompositionStrategy};
pub use error::{BudgetScope, PrivacyError, PrivacyResult};
pub use ledger::{
    GlobalBudget, InstitutionBudget, LedgerConfig, PrivacyLedger, ReservationId, SpendRecord,
};
pub use noise::{NoiseConfig, NoiseGenerator, calibrate_sigma, clip, l2_norm};
