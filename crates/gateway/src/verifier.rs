//! External verifier capabilities
//!
//! The two proof ecosystems are opaque collaborators: the gateway hands them
//! a proof and trusts their verdict. Each is modeled as a trait so the
//! orchestrators can be exercised without the real services, plus an
//! HTTP-backed client used in production.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use attest_common::{Error, Result};

/// Attributes a passport proof selectively disclosed
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DisclosedAttributes {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuing_state: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub nationality: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub older_than: Option<u8>,
}

/// Verdict from the Self (passport-attestation) verifier
#[derive(Debug, Clone)]
pub enum SelfVerdict {
    Valid {
        /// Attributes the proof disclosed
        disclosed: DisclosedAttributes,
        /// Server-derived stable identifier for the verified human
        subject_id: String,
        /// Hex-encoded user-defined payload carrying the wallet address
        user_defined_data: String,
    },
    Invalid {
        reason: String,
    },
}

/// Verdict from the zkPassport verifier
#[derive(Debug, Clone)]
pub struct ZkPassportVerdict {
    pub verified: bool,
    pub unique_identifier: Option<String>,
    pub query_result_errors: Option<Vec<Value>>,
}

/// Self verifier capability
#[async_trait]
pub trait SelfVerifier: Send + Sync {
    async fn verify(
        &self,
        attestation_id: &str,
        proof: &Value,
        public_signals: &[Value],
        user_context_data: &Value,
    ) -> Result<SelfVerdict>;

    /// Whether the verifier is reachable, for /health reporting
    async fn ready(&self) -> bool {
        true
    }
}

/// zkPassport verifier capability
#[async_trait]
pub trait ZkPassportVerifier: Send + Sync {
    async fn verify(
        &self,
        proofs: &Value,
        query_result: &Value,
        scope: &str,
        dev_mode: bool,
    ) -> Result<ZkPassportVerdict>;
}

/// HTTP client for the Self verifier service
pub struct HttpSelfVerifier {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SelfVerifyPayload<'a> {
    attestation_id: &'a str,
    proof: &'a Value,
    public_signals: &'a [Value],
    user_context_data: &'a Value,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawSelfResponse {
    is_valid_details: RawValidity,
    #[serde(default)]
    disclose_output: Option<RawDiscloseOutput>,
    #[serde(default)]
    user_data: Option<RawUserData>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawValidity {
    is_valid: bool,
    #[serde(default)]
    reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawDiscloseOutput {
    #[serde(default)]
    expiry_date: Option<String>,
    #[serde(default)]
    issuing_state: Option<String>,
    #[serde(default)]
    nationality: Option<String>,
    #[serde(default)]
    older_than: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawUserData {
    user_identifier: String,
    #[serde(default)]
    user_defined_data: Option<String>,
}

impl HttpSelfVerifier {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl SelfVerifier for HttpSelfVerifier {
    async fn verify(
        &self,
        attestation_id: &str,
        proof: &Value,
        public_signals: &[Value],
        user_context_data: &Value,
    ) -> Result<SelfVerdict> {
        let url = format!("{}/verify", self.base_url);

        debug!("Calling Self verifier: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&SelfVerifyPayload {
                attestation_id,
                proof,
                public_signals,
                user_context_data,
            })
            .send()
            .await
            .map_err(|e| Error::VerifierUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::VerifierUnavailable(format!(
                "Self verifier returned {}",
                response.status()
            )));
        }

        let raw: RawSelfResponse = response
            .json()
            .await
            .map_err(|e| Error::VerifierUnavailable(format!("malformed verifier response: {}", e)))?;

        if !raw.is_valid_details.is_valid {
            return Ok(SelfVerdict::Invalid {
                reason: raw
                    .is_valid_details
                    .reason
                    .unwrap_or_else(|| "proof verification failed".to_string()),
            });
        }

        let user_data = raw.user_data.ok_or_else(|| {
            Error::VerifierUnavailable("valid verdict missing user data".to_string())
        })?;

        let disclosed = raw
            .disclose_output
            .map(|out| DisclosedAttributes {
                expiry_date: out.expiry_date.as_deref().and_then(parse_disclosed_date),
                issuing_state: out.issuing_state,
                nationality: out.nationality,
                older_than: out.older_than.and_then(|v| v.parse().ok()),
            })
            .unwrap_or_default();

        Ok(SelfVerdict::Valid {
            disclosed,
            subject_id: user_data.user_identifier,
            user_defined_data: user_data.user_defined_data.unwrap_or_default(),
        })
    }

    async fn ready(&self) -> bool {
        let url = format!("{}/health", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

/// HTTP client for the zkPassport verifier service
pub struct HttpZkPassportVerifier {
    base_url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ZkPassportPayload<'a> {
    proofs: &'a Value,
    query_result: &'a Value,
    scope: &'a str,
    dev_mode: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawZkPassportResponse {
    verified: bool,
    #[serde(default)]
    unique_identifier: Option<String>,
    #[serde(default)]
    query_result_errors: Option<Vec<Value>>,
}

impl HttpZkPassportVerifier {
    pub fn new(base_url: String) -> Self {
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ZkPassportVerifier for HttpZkPassportVerifier {
    async fn verify(
        &self,
        proofs: &Value,
        query_result: &Value,
        scope: &str,
        dev_mode: bool,
    ) -> Result<ZkPassportVerdict> {
        let url = format!("{}/verify", self.base_url);

        debug!("Calling zkPassport verifier: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&ZkPassportPayload {
                proofs,
                query_result,
                scope,
                dev_mode,
            })
            .send()
            .await
            .map_err(|e| Error::VerifierUnavailable(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::VerifierUnavailable(format!(
                "zkPassport verifier returned {}",
                response.status()
            )));
        }

        let raw: RawZkPassportResponse = response
            .json()
            .await
            .map_err(|e| Error::VerifierUnavailable(format!("malformed verifier response: {}", e)))?;

        Ok(ZkPassportVerdict {
            verified: raw.verified,
            unique_identifier: raw.unique_identifier,
            query_result_errors: raw.query_result_errors,
        })
    }
}

/// Disclosed expiry dates arrive either as RFC 3339 or as a bare date
fn parse_disclosed_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| Utc.from_utc_datetime(&dt))
}
