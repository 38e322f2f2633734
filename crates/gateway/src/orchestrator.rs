//! Verification workflows, one per proof ecosystem
//!
//! Each workflow computes its authoritative outcome from the verifier
//! verdict first, then attempts persistence as an advisory second phase.
//! Storage failures during that second phase are logged and reported in the
//! [`PersistenceOutcome`] but never change the already-decided response.
//! Request-shape failures and verifier rejections abort before any write.

use serde_json::Value;
use tracing::{info, warn};

use attest_common::{Error, Provider, Result, StoredRecord};

use crate::config::Config;
use crate::models::{DelegatedBindingRequest, SelfVerifyRequest, ZkPassVerifyRequest};
use crate::policy::{self, PolicyReport};
use crate::reconcile::{reconcile, Decision};
use crate::storage::RecordStore;
use crate::verifier::{DisclosedAttributes, SelfVerdict, SelfVerifier, ZkPassportVerifier};

/// Advisory result of a best-effort write
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PersistenceOutcome {
    Saved {
        #[serde(skip_serializing_if = "Option::is_none")]
        row_id: Option<u64>,
    },
    Skipped {
        reason: String,
    },
    Failed {
        reason: String,
    },
}

impl PersistenceOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, PersistenceOutcome::Saved { .. })
    }
}

/// Successful Self verification, ready to be rendered as a response
#[derive(Debug)]
pub struct SelfSuccess {
    pub subject_id: String,
    pub disclosed: DisclosedAttributes,
    pub policy: PolicyReport,
    pub audit: PersistenceOutcome,
    pub record: PersistenceOutcome,
}

/// Outcome of a zkPassport verification, echoed to the caller whether or
/// not persistence occurred
#[derive(Debug)]
pub struct ZkPassOutcome {
    pub verified: bool,
    pub client_uid: Option<String>,
    pub server_uid: Option<String>,
    pub matched: bool,
    pub query_result_errors: Option<Vec<Value>>,
    pub address: Option<String>,
    pub persistence: PersistenceOutcome,
}

/// Self (passport-attestation) verification workflow
pub async fn verify_self(
    verifier: &dyn SelfVerifier,
    store: &dyn RecordStore,
    config: &Config,
    request: SelfVerifyRequest,
) -> Result<SelfSuccess> {
    let attestation_id = match request.attestation_id.as_deref() {
        Some(id) if !id.is_empty() => id,
        _ => return Err(Error::Validation("attestationId is required".to_string())),
    };
    let proof = request
        .proof
        .as_ref()
        .ok_or_else(|| Error::Validation("proof is required".to_string()))?;
    let public_signals = match request.public_signals.as_deref() {
        Some(signals) if !signals.is_empty() => signals,
        _ => {
            return Err(Error::Validation(
                "publicSignals must be a non-empty array".to_string(),
            ))
        }
    };
    let user_context_data = request
        .user_context_data
        .as_ref()
        .ok_or_else(|| Error::Validation("userContextData is required".to_string()))?;

    // Phase one: the verifier verdict decides the response
    let verdict = tokio::time::timeout(
        config.verifier_timeout,
        verifier.verify(attestation_id, proof, public_signals, user_context_data),
    )
    .await
    .map_err(|_| Error::Timeout("Self verifier call"))??;

    let (disclosed, subject_id, user_defined_data) = match verdict {
        SelfVerdict::Invalid { reason } => {
            info!(attestation_id, %reason, "Self proof rejected");
            return Err(Error::VerifierRejected(reason));
        }
        SelfVerdict::Valid {
            disclosed,
            subject_id,
            user_defined_data,
        } => (disclosed, subject_id, user_defined_data),
    };

    let report = policy::evaluate(&disclosed, &config.policy, chrono::Utc::now());
    if config.policy.enforce && !report.passed() {
        return Err(Error::VerifierRejected(format!(
            "policy check failed: {}",
            report.failure_reason()
        )));
    }

    // Phase two: best-effort writes that cannot change the outcome
    let audit = match tokio::time::timeout(
        config.storage_timeout,
        store.save_audited_submission(&subject_id, proof),
    )
    .await
    {
        Ok(Ok(())) => PersistenceOutcome::Saved { row_id: None },
        Ok(Err(e)) => {
            warn!(subject_id, error = %e, "Audit write failed");
            PersistenceOutcome::Failed {
                reason: e.to_string(),
            }
        }
        Err(_) => {
            warn!(subject_id, "Audit write timed out");
            PersistenceOutcome::Failed {
                reason: Error::Timeout("audit write").to_string(),
            }
        }
    };

    let record = match decode_wallet_address(&user_defined_data, &config.address_prefix) {
        Ok(address) => {
            save_record(
                store,
                config,
                &subject_id,
                Some(&address),
                Provider::SelfProtocol,
            )
            .await
        }
        Err(e) => {
            // Surfaced in the outcome but does not flip the decided response
            warn!(subject_id, error = %e, "Wallet address rejected, record not saved");
            PersistenceOutcome::Skipped {
                reason: e.to_string(),
            }
        }
    };

    info!(
        subject_id,
        audit = ?audit,
        record = ?record,
        "Self verification succeeded"
    );

    Ok(SelfSuccess {
        subject_id,
        disclosed,
        policy: report,
        audit,
        record,
    })
}

/// zkPassport verification workflow
pub async fn verify_zkpass(
    verifier: &dyn ZkPassportVerifier,
    store: &dyn RecordStore,
    config: &Config,
    request: ZkPassVerifyRequest,
) -> Result<ZkPassOutcome> {
    let proofs = request
        .proofs
        .as_ref()
        .ok_or_else(|| Error::Validation("proofs is required".to_string()))?;
    let query_result = request
        .query_result
        .as_ref()
        .ok_or_else(|| Error::Validation("queryResult is required".to_string()))?;
    let scope = match request.scope.as_deref() {
        Some(s) if !s.is_empty() => s,
        _ => return Err(Error::Validation("scope is required".to_string())),
    };

    let dev_mode = request.dev_mode.unwrap_or(true);

    let verdict = tokio::time::timeout(
        config.verifier_timeout,
        verifier.verify(proofs, query_result, scope, dev_mode),
    )
    .await
    .map_err(|_| Error::Timeout("zkPassport verifier call"))??;

    let client_uid = request.unique_identifier.clone();
    let server_uid = verdict.unique_identifier.clone();

    let matched = match (client_uid.as_deref(), server_uid.as_deref()) {
        (None, _) => true,
        (Some(c), Some(s)) => c == s,
        (Some(_), None) => false,
    };

    // Persistence gate: verified and identifiers reconciled
    let persistence = match server_uid.as_deref() {
        Some(server) => match reconcile(client_uid.as_deref(), server, verdict.verified) {
            Decision::Allow => {
                save_record(
                    store,
                    config,
                    server,
                    request.cosmos_address.as_deref(),
                    Provider::ZkPassport,
                )
                .await
            }
            Decision::Deny => PersistenceOutcome::Skipped {
                reason: if verdict.verified {
                    "client identifier does not match server identifier".to_string()
                } else {
                    "proof not verified".to_string()
                },
            },
        },
        None => PersistenceOutcome::Skipped {
            reason: "verifier returned no unique identifier".to_string(),
        },
    };

    info!(
        verified = verdict.verified,
        matched,
        persistence = ?persistence,
        "zkPassport verification completed"
    );

    Ok(ZkPassOutcome {
        verified: verdict.verified,
        client_uid,
        server_uid,
        matched,
        query_result_errors: verdict.query_result_errors,
        address: request.cosmos_address,
        persistence,
    })
}

/// Delegated-binding workflow: bind a wallet to an already-audited subject
///
/// Authorization rests entirely on the audited submission written during the
/// earlier full verification; the proof itself is not re-verified. Unlike
/// the best-effort writes above, a storage failure here is surfaced, since
/// the write is the whole point of the call.
pub async fn delegated_binding(
    store: &dyn RecordStore,
    config: &Config,
    request: DelegatedBindingRequest,
) -> Result<StoredRecord> {
    let wallet = match request.cosmos_address.as_deref() {
        Some(a) if !a.is_empty() => a,
        _ => return Err(Error::Validation("cosmosAddress is required".to_string())),
    };
    let subject_id = match request.uuid.as_deref() {
        Some(u) if !u.is_empty() => u,
        _ => return Err(Error::Validation("uuid is required".to_string())),
    };

    let exists = tokio::time::timeout(
        config.storage_timeout,
        store.exists_audited_submission(subject_id),
    )
    .await
    .map_err(|_| Error::Timeout("audit lookup"))??;

    if !exists {
        return Err(Error::NotFound(format!(
            "no audited submission for {}",
            subject_id
        )));
    }

    let stored = tokio::time::timeout(
        config.storage_timeout,
        store.save_verification_record(subject_id, Some(wallet), Provider::SelfProtocol),
    )
    .await
    .map_err(|_| Error::Timeout("record write"))??;

    info!(subject_id, wallet, "Delegated binding saved");

    Ok(stored)
}

/// Best-effort record write shared by both provider flows
async fn save_record(
    store: &dyn RecordStore,
    config: &Config,
    subject_id: &str,
    wallet_address: Option<&str>,
    provider: Provider,
) -> PersistenceOutcome {
    match tokio::time::timeout(
        config.storage_timeout,
        store.save_verification_record(subject_id, wallet_address, provider),
    )
    .await
    {
        Ok(Ok(stored)) => PersistenceOutcome::Saved {
            row_id: Some(stored.row_id),
        },
        Ok(Err(e)) => {
            warn!(subject_id, %provider, error = %e, "Record write failed");
            PersistenceOutcome::Failed {
                reason: e.to_string(),
            }
        }
        Err(_) => {
            warn!(subject_id, %provider, "Record write timed out");
            PersistenceOutcome::Failed {
                reason: Error::Timeout("record write").to_string(),
            }
        }
    }
}

/// Decode the wallet address carried in the proof's user-defined data
///
/// The payload is hex-encoded text, zero-padded to a fixed width by the
/// proving frontend. The decoded address must carry the configured bech32
/// prefix.
fn decode_wallet_address(user_defined_data: &str, prefix: &str) -> Result<String> {
    let bytes = hex::decode(user_defined_data.trim_start_matches("0x"))
        .map_err(|e| Error::AddressFormat(format!("invalid hex payload: {}", e)))?;

    let text = String::from_utf8(bytes)
        .map_err(|e| Error::AddressFormat(format!("payload is not UTF-8: {}", e)))?;

    let address = text.trim_matches('\0').trim();

    if address.is_empty() {
        return Err(Error::AddressFormat("empty wallet address".to_string()));
    }

    if !address.starts_with(prefix) {
        return Err(Error::AddressFormat(format!(
            "address {} does not carry expected prefix {}",
            address, prefix
        )));
    }

    Ok(address.to_string())
}
