//! Institution identity and per-institution record
//!
//! An `InstitutionId` is a 64-bit hash derived from whatever external
//! identity the hosting platform authenticates (certificate fingerprint,
//! principal, DNS name). The core never sees the identity itself.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque institution identifier (64-bit hash of an external identity)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstitutionId(pub u64);

impl InstitutionId {
    /// Derives an id from an externally authenticated identity string
    pub fn from_identity(identity: &str) -> Self {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(identity.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash[..8]);
        Self(u64::from_le_bytes(bytes))
    }

    /// Random id for tests and local development
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Inner numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Debug for InstitutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Inst({:016x})", self.0)
    }
}

impl fmt::Display for InstitutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Per-institution record kept for the lifetime of the federation.
///
/// Never deleted, only suspended, so the audit trail stays complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub id: InstitutionId,
    /// Contribution-quality score in [0, 1]
    pub reputation: f64,
    /// Cumulative epsilon committed against this institution
    pub epsilon_spent: f64,
    /// Cumulative delta committed against this institution
    pub delta_spent: f64,
    /// Admitted submissions over all rounds
    pub total_contributions: u32,
    /// Eligibility revoked (record retained)
    pub suspended: bool,
    /// Unix seconds of registration
    pub registered_at: u64,
    /// Unix seconds of the last admitted submission
    pub last_update: u64,
}

impl Institution {
    pub fn new(id: InstitutionId, reputation: f64, now: u64) -> Self {
        Self {
            id,
            reputation,
            epsilon_spent: 0.0,
            delta_spent: 0.0,
            total_contributions: 0,
            suspended: false,
            registered_at: now,
            last_update: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_is_deterministic() {
        let a = InstitutionId::from_identity("hospital-a");
        let b = InstitutionId::from_identity("hospital-a");
        let c = InstitutionId::from_identity("hospital-b");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn id_formats_as_hex() {
        let id = InstitutionId(0xDEAD_BEEF);
        assert_eq!(format!("{}", id), "00000000deadbeef");
        assert_eq!(format!("{:?}", id), "Inst(00000000deadbeef)");
    }

    #[test]
    fn new_record_starts_clean() {
        let inst = Institution::new(InstitutionId::random(), 0.5, 100);
        assert_eq!(inst.reputation, 0.5);
        assert_eq!(inst.epsilon_spent, 0.0);
        assert_eq!(inst.total_contributions, 0);
        assert!(!inst.suspended);
    }
}
