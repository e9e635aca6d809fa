//! Global model versions and the append-only model store
//!
//! A model version is immutable once created. New versions supersede but
//! never overwrite older ones, so rollback and audit always have the full
//! history to work from.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{CoreError, CoreResult};
use crate::update::{RoundId, unix_timestamp};

/// One immutable version of the merged global model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GlobalModel {
    /// Monotonic version number (0 is the genesis model)
    pub version: u64,
    /// Fixed-dimension parameter vector
    pub parameters: Vec<f64>,
    /// Round that produced this version (genesis carries `RoundId(0)`)
    pub provenance: RoundId,
    /// SHA-256 over version and parameters, hex-encoded
    pub content_hash: String,
    /// Opaque attestation from the external signing authority
    pub attestation: Option<Vec<u8>>,
    pub created_at: u64,
}

impl GlobalModel {
    pub fn new(version: u64, parameters: Vec<f64>, provenance: RoundId) -> Self {
        let content_hash = content_digest(version, &parameters);
        Self {
            version,
            parameters,
            provenance,
            content_hash,
            attestation: None,
            created_at: unix_timestamp(),
        }
    }

    pub fn with_attestation(mut self, signature: Vec<u8>) -> Self {
        self.attestation = Some(signature);
        self
    }

    pub fn dimension(&self) -> usize {
        self.parameters.len()
    }
}

/// Hex digest binding a version number to its parameter vector
pub fn content_digest(version: u64, parameters: &[f64]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(version.to_be_bytes());
    for &value in parameters {
        hasher.update(value.to_be_bytes());
    }
    format!("{:x}", hasher.finalize())
}

/// Append-only history of global model versions
#[derive(Debug, Clone)]
pub struct ModelStore {
    versions: Vec<GlobalModel>,
    dimension: usize,
}

impl ModelStore {
    /// Creates the store with a genesis model (version 0)
    pub fn new(initial_parameters: Vec<f64>) -> Self {
        let dimension = initial_parameters.len();
        let genesis = GlobalModel::new(0, initial_parameters, RoundId(0));
        Self {
            versions: vec![genesis],
            dimension,
        }
    }

    /// Zero-initialized genesis of the given dimension
    pub fn zeroed(dimension: usize) -> Self {
        Self::new(vec![0.0; dimension])
    }

    /// Appends the next version; rejects gaps, regressions and shape drift
    pub fn push(&mut self, model: GlobalModel) -> CoreResult<()> {
        let expected = self.current().version + 1;
        if model.version != expected {
            return Err(CoreError::NonMonotonicVersion {
                expected,
                actual: model.version,
            });
        }
        if model.dimension() != self.dimension {
            return Err(CoreError::DimensionMismatch {
                expected: self.dimension,
                actual: model.dimension(),
            });
        }
        self.versions.push(model);
        Ok(())
    }

    /// Latest version (always present, genesis included)
    pub fn current(&self) -> &GlobalModel {
        self.versions.last().expect("store always holds genesis")
    }

    pub fn get(&self, version: u64) -> Option<&GlobalModel> {
        self.versions.get(version as usize)
    }

    /// Full ordered history, genesis first
    pub fn history(&self) -> &[GlobalModel] {
        &self.versions
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }
}
