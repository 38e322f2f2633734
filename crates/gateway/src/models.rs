//! Inbound request models
//!
//! Fields are optional at the deserialization boundary so the orchestrators
//! can report missing fields through the gateway's own error envelope
//! instead of a generic body-rejection.

use serde::Deserialize;
use serde_json::Value;

/// Body of `POST /api/verify` (Self passport-attestation flow)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelfVerifyRequest {
    pub attestation_id: Option<String>,
    pub proof: Option<Value>,
    pub public_signals: Option<Vec<Value>>,
    pub user_context_data: Option<Value>,
}

/// Body of `POST /api/verify/zkpass`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZkPassVerifyRequest {
    pub proofs: Option<Value>,

    /// Query-result blob; `result` is a legacy alias still sent by older
    /// frontends
    #[serde(alias = "result")]
    pub query_result: Option<Value>,

    pub scope: Option<String>,

    /// Client-claimed unique identifier, reconciled against the
    /// server-derived one before anything is persisted
    pub unique_identifier: Option<String>,

    pub cosmos_address: Option<String>,

    /// Defaults to true when absent
    pub dev_mode: Option<bool>,
}

/// Body of `POST /api/verify/self` (delegated binding)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DelegatedBindingRequest {
    pub cosmos_address: Option<String>,
    pub uuid: Option<String>,
}
