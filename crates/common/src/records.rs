//! Persisted record models shared by the gateway and its storage layer

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Proof ecosystem that produced a verification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Provider {
    /// Passport-attestation protocol (Self)
    #[serde(rename = "self")]
    SelfProtocol,
    /// zk-passport protocol
    #[serde(rename = "zkpass")]
    ZkPassport,
}

impl Provider {
    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::SelfProtocol => "self",
            Provider::ZkPassport => "zkpass",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A verified identity bound to a wallet address
///
/// Append-only: rows are created once on a successful verification and
/// never updated or deleted. The storage layer does not enforce uniqueness
/// over `(subject_id, provider)`; repeated saves create distinct rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationRecord {
    /// Stable identifier for the verified human, scoped to the provider's
    /// identifier namespace (UUID-shaped for Self, hex-shaped for zkPassport)
    pub subject_id: String,

    /// Chain address the identity is bound to. May be absent on the
    /// zk-passport path when no address was submitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wallet_address: Option<String>,

    /// Which verification ecosystem produced this record
    pub provider: Provider,

    /// When this record was created
    pub created_at: DateTime<Utc>,
}

impl VerificationRecord {
    pub fn new(subject_id: String, wallet_address: Option<String>, provider: Provider) -> Self {
        Self {
            subject_id,
            wallet_address,
            provider,
            created_at: Utc::now(),
        }
    }
}

/// A persisted [`VerificationRecord`] together with its storage row id
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredRecord {
    /// Storage-assigned row id (monotonic sequence)
    pub row_id: u64,

    #[serde(flatten)]
    pub record: VerificationRecord,
}

/// Raw proof payload retained as an evidence trail
///
/// Written right after a successful Self verification. Its existence later
/// authorizes the delegated-binding flow without re-submitting the proof.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditedSubmission {
    /// Attestation identifier the proof was submitted under
    pub attestation_id: String,

    /// The raw proof payload as submitted by the client
    pub proof: serde_json::Value,

    /// When the submission was recorded
    pub created_at: DateTime<Utc>,
}

impl AuditedSubmission {
    pub fn new(attestation_id: String, proof: serde_json::Value) -> Self {
        Self {
            attestation_id,
            proof,
            created_at: Utc::now(),
        }
    }
}
