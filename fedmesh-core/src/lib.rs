//! # 🏥 fedmesh-core — Shared Federation Types
//!
//! Identity, registry and data-model types shared by the FedMesh privacy
//! and aggregation crates. Institutions are mutually distrusting parties
//! that contribute model updates without exposing raw data; this crate
//! holds everything both sides of that boundary agree on.
//!
//! ## Arquitetura
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │              fedmesh-core                       │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  InstitutionId + Institution              │  │
//! │  └───────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  ParticipantRegistry (eligibility, rep)   │  │
//! │  └───────────────────────────────────────────┘  │
//! │  ┌───────────────────────────────────────────┐  │
//! │  │  GradientUpdate | GlobalModel/ModelStore  │  │
//! │  └───────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! ## Exemplo
//!
//! ```ignore
//! use fedmesh_core::{ParticipantRegistry, InstitutionId};
//!
//! let mut registry = ParticipantRegistry::new(Default::default());
//! let id = InstitutionId::from_identity("hospital-saopaulo");
//! registry.register(id)?;
//! assert!(registry.is_eligible(id));
//! ```

pub mod error;
pub mod institution;
pub mod model;
pub mod registry;
pub mod update;

pub use error::{CoreError, CoreResult};
pub use institution::{Institution, InstitutionId};
pub use model::{GlobalModel, ModelStore, content_digest};
pub use registry::{ParticipantRegistry, ReputationConfig};
pub use update::{GradientUpdate, RoundId, unix_timestamp, validate_submission};
