//! Workflow and router tests for the attestation gateway
//!
//! The verifier capabilities and the record store are replaced with
//! in-memory doubles so the persistence properties of each workflow can be
//! asserted exactly: which writes happened, how many, and with what
//! provider tag.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt; // for `oneshot`

use attest_common::{Error, Provider, Result, StoredRecord, VerificationRecord};
use attest_gateway::config::{Config, CorsConfig, PolicyConfig};
use attest_gateway::models::{DelegatedBindingRequest, SelfVerifyRequest, ZkPassVerifyRequest};
use attest_gateway::orchestrator::{self, PersistenceOutcome};
use attest_gateway::storage::RecordStore;
use attest_gateway::verifier::{
    DisclosedAttributes, SelfVerdict, SelfVerifier, ZkPassportVerdict, ZkPassportVerifier,
};
use attest_gateway::{create_router, AppState};

/// In-memory stand-in for the redis store
#[derive(Default)]
struct MemoryStore {
    records: Mutex<Vec<StoredRecord>>,
    audits: Mutex<HashMap<String, Value>>,
    fail_writes: bool,
}

impl MemoryStore {
    fn failing() -> Self {
        Self {
            fail_writes: true,
            ..Default::default()
        }
    }

    fn with_audit(attestation_id: &str) -> Self {
        let store = Self::default();
        store
            .audits
            .lock()
            .unwrap()
            .insert(attestation_id.to_string(), json!({}));
        store
    }

    fn record_count(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    fn audit_count(&self) -> usize {
        self.audits.lock().unwrap().len()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn save_verification_record(
        &self,
        subject_id: &str,
        wallet_address: Option<&str>,
        provider: Provider,
    ) -> Result<StoredRecord> {
        if self.fail_writes {
            return Err(Error::Storage("connection refused".to_string()));
        }

        let mut records = self.records.lock().unwrap();
        let stored = StoredRecord {
            row_id: records.len() as u64 + 1,
            record: VerificationRecord::new(
                subject_id.to_string(),
                wallet_address.map(|a| a.to_string()),
                provider,
            ),
        };
        records.push(stored.clone());
        Ok(stored)
    }

    async fn save_audited_submission(&self, attestation_id: &str, proof: &Value) -> Result<()> {
        if self.fail_writes {
            return Err(Error::Storage("connection refused".to_string()));
        }

        self.audits
            .lock()
            .unwrap()
            .insert(attestation_id.to_string(), proof.clone());
        Ok(())
    }

    async fn exists_audited_submission(&self, attestation_id: &str) -> Result<bool> {
        Ok(self.audits.lock().unwrap().contains_key(attestation_id))
    }
}

/// Verifier double returning a fixed verdict
struct StaticSelfVerifier {
    verdict: SelfVerdict,
}

#[async_trait]
impl SelfVerifier for StaticSelfVerifier {
    async fn verify(
        &self,
        _attestation_id: &str,
        _proof: &Value,
        _public_signals: &[Value],
        _user_context_data: &Value,
    ) -> Result<SelfVerdict> {
        Ok(self.verdict.clone())
    }
}

struct StaticZkVerifier {
    verdict: ZkPassportVerdict,
}

#[async_trait]
impl ZkPassportVerifier for StaticZkVerifier {
    async fn verify(
        &self,
        _proofs: &Value,
        _query_result: &Value,
        _scope: &str,
        _dev_mode: bool,
    ) -> Result<ZkPassportVerdict> {
        Ok(self.verdict.clone())
    }
}

fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 8086,
        redis_url: "redis://127.0.0.1:6379".to_string(),
        self_verifier_url: "http://127.0.0.1:3011".to_string(),
        zkpass_verifier_url: "http://127.0.0.1:3012".to_string(),
        address_prefix: "twilight".to_string(),
        environment: "test".to_string(),
        rejection_status: StatusCode::BAD_REQUEST,
        verifier_timeout: Duration::from_secs(5),
        storage_timeout: Duration::from_secs(5),
        policy: PolicyConfig {
            enforce: false,
            expiry_horizon_days: 365,
            excluded_countries: Default::default(),
            allowed_issuing_countries: ["FRA", "DEU"].iter().map(|s| s.to_string()).collect(),
            minimum_age: Some(18),
            ofac_check: false,
        },
        cors: CorsConfig::default(),
    }
}

fn valid_self_verdict() -> SelfVerdict {
    SelfVerdict::Valid {
        disclosed: DisclosedAttributes {
            expiry_date: Some(chrono::Utc::now() + chrono::Duration::days(400)),
            issuing_state: Some("FRA".to_string()),
            nationality: Some("FRA".to_string()),
            older_than: Some(18),
        },
        subject_id: "550e8400-e29b-41d4-a716-446655440000".to_string(),
        user_defined_data: hex::encode("twilight1qperwt9wrnkg5k9e5gzfgjppzpqhyav5j76fl39"),
    }
}

fn self_request() -> SelfVerifyRequest {
    SelfVerifyRequest {
        attestation_id: Some("att-1".to_string()),
        proof: Some(json!({"pi_a": ["1", "2"]})),
        public_signals: Some(vec![json!("42")]),
        user_context_data: Some(json!({"userDefinedData": "..."})),
    }
}

fn zkpass_request(client_uid: Option<&str>) -> ZkPassVerifyRequest {
    ZkPassVerifyRequest {
        proofs: Some(json!([{"proof": "0xabc"}])),
        query_result: Some(json!({"age": {"gte": 18}})),
        scope: Some("twilight-id".to_string()),
        unique_identifier: client_uid.map(|s| s.to_string()),
        cosmos_address: Some("twilight1abc".to_string()),
        dev_mode: None,
    }
}

// --- Self workflow ---

#[tokio::test]
async fn self_missing_fields_rejects_without_writes() {
    let store = MemoryStore::default();
    let verifier = StaticSelfVerifier {
        verdict: valid_self_verdict(),
    };
    let config = test_config();

    for request in [
        SelfVerifyRequest {
            attestation_id: None,
            ..self_request()
        },
        SelfVerifyRequest {
            proof: None,
            ..self_request()
        },
        SelfVerifyRequest {
            public_signals: Some(vec![]),
            ..self_request()
        },
        SelfVerifyRequest {
            user_context_data: None,
            ..self_request()
        },
    ] {
        let err = orchestrator::verify_self(&verifier, &store, &config, request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "got {:?}", err);
    }

    assert_eq!(store.record_count(), 0);
    assert_eq!(store.audit_count(), 0);
}

#[tokio::test]
async fn self_rejected_proof_writes_nothing() {
    let store = MemoryStore::default();
    let verifier = StaticSelfVerifier {
        verdict: SelfVerdict::Invalid {
            reason: "scope mismatch".to_string(),
        },
    };

    let err = orchestrator::verify_self(&verifier, &store, &test_config(), self_request())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::VerifierRejected(_)));
    assert_eq!(store.record_count(), 0);
    assert_eq!(store.audit_count(), 0);
}

#[tokio::test]
async fn self_valid_proof_persists_audit_and_record() {
    let store = MemoryStore::default();
    let verifier = StaticSelfVerifier {
        verdict: valid_self_verdict(),
    };

    let success = orchestrator::verify_self(&verifier, &store, &test_config(), self_request())
        .await
        .unwrap();

    assert!(success.audit.is_saved());
    assert!(success.record.is_saved());
    assert_eq!(store.audit_count(), 1);
    assert_eq!(store.record_count(), 1);

    let records = store.records.lock().unwrap();
    assert_eq!(records[0].record.provider, Provider::SelfProtocol);
    assert_eq!(
        records[0].record.subject_id,
        "550e8400-e29b-41d4-a716-446655440000"
    );
    assert_eq!(
        records[0].record.wallet_address.as_deref(),
        Some("twilight1qperwt9wrnkg5k9e5gzfgjppzpqhyav5j76fl39")
    );
}

#[tokio::test]
async fn self_bad_address_still_succeeds_but_skips_record() {
    let store = MemoryStore::default();
    let verifier = StaticSelfVerifier {
        verdict: SelfVerdict::Valid {
            disclosed: DisclosedAttributes::default(),
            subject_id: "subject-1".to_string(),
            user_defined_data: hex::encode("cosmos1notourchain"),
        },
    };

    let success = orchestrator::verify_self(&verifier, &store, &test_config(), self_request())
        .await
        .unwrap();

    // Verifier validity alone decided the response; the address failure is
    // surfaced in the persistence outcome instead of the status
    assert!(success.audit.is_saved());
    assert!(matches!(success.record, PersistenceOutcome::Skipped { .. }));
    assert_eq!(store.record_count(), 0);
    assert_eq!(store.audit_count(), 1);
}

#[tokio::test]
async fn self_storage_failure_is_best_effort() {
    let store = MemoryStore::failing();
    let verifier = StaticSelfVerifier {
        verdict: valid_self_verdict(),
    };

    let success = orchestrator::verify_self(&verifier, &store, &test_config(), self_request())
        .await
        .unwrap();

    assert!(matches!(success.audit, PersistenceOutcome::Failed { .. }));
    assert!(matches!(success.record, PersistenceOutcome::Failed { .. }));
}

#[tokio::test]
async fn self_enforced_policy_blocks_expiring_document() {
    let store = MemoryStore::default();
    let verifier = StaticSelfVerifier {
        verdict: SelfVerdict::Valid {
            disclosed: DisclosedAttributes {
                expiry_date: Some(chrono::Utc::now() + chrono::Duration::days(30)),
                issuing_state: Some("FRA".to_string()),
                nationality: None,
                older_than: None,
            },
            subject_id: "subject-1".to_string(),
            user_defined_data: hex::encode("twilight1abc"),
        },
    };

    let mut config = test_config();
    config.policy.enforce = true;

    let err = orchestrator::verify_self(&verifier, &store, &config, self_request())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::VerifierRejected(_)));
    assert!(err.to_string().contains("policy"));
    assert_eq!(store.record_count(), 0);
    assert_eq!(store.audit_count(), 0);
}

#[tokio::test]
async fn self_advisory_policy_does_not_block() {
    let store = MemoryStore::default();
    let verifier = StaticSelfVerifier {
        verdict: SelfVerdict::Valid {
            disclosed: DisclosedAttributes {
                expiry_date: Some(chrono::Utc::now() + chrono::Duration::days(30)),
                issuing_state: Some("USA".to_string()),
                nationality: None,
                older_than: None,
            },
            subject_id: "subject-1".to_string(),
            user_defined_data: hex::encode("twilight1abc"),
        },
    };

    // enforce stays false: failing checks are logged but the response and
    // the writes proceed (historical behavior, now an explicit toggle)
    let success = orchestrator::verify_self(&verifier, &store, &test_config(), self_request())
        .await
        .unwrap();

    assert_eq!(success.policy.expiry_ok, Some(false));
    assert_eq!(success.policy.country_ok, Some(false));
    assert_eq!(store.record_count(), 1);
}

// --- zkPassport workflow ---

#[tokio::test]
async fn zkpass_missing_fields_reject() {
    let store = MemoryStore::default();
    let verifier = StaticZkVerifier {
        verdict: ZkPassportVerdict {
            verified: true,
            unique_identifier: Some("0xabc".to_string()),
            query_result_errors: None,
        },
    };
    let config = test_config();

    for request in [
        ZkPassVerifyRequest {
            proofs: None,
            ..zkpass_request(None)
        },
        ZkPassVerifyRequest {
            query_result: None,
            ..zkpass_request(None)
        },
        ZkPassVerifyRequest {
            scope: None,
            ..zkpass_request(None)
        },
    ] {
        let err = orchestrator::verify_zkpass(&verifier, &store, &config, request)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    assert_eq!(store.record_count(), 0);
}

#[tokio::test]
async fn zkpass_verified_without_claim_persists_once() {
    let store = MemoryStore::default();
    let verifier = StaticZkVerifier {
        verdict: ZkPassportVerdict {
            verified: true,
            unique_identifier: Some("0xdeadbeef".to_string()),
            query_result_errors: None,
        },
    };

    let outcome =
        orchestrator::verify_zkpass(&verifier, &store, &test_config(), zkpass_request(None))
            .await
            .unwrap();

    assert!(outcome.verified);
    assert!(outcome.matched);
    assert!(outcome.persistence.is_saved());
    assert_eq!(store.record_count(), 1);

    let records = store.records.lock().unwrap();
    assert_eq!(records[0].record.provider, Provider::ZkPassport);
    assert_eq!(records[0].record.subject_id, "0xdeadbeef");
    assert_eq!(
        records[0].record.wallet_address.as_deref(),
        Some("twilight1abc")
    );
}

#[tokio::test]
async fn zkpass_identifier_mismatch_skips_persistence_but_reports_verified() {
    let store = MemoryStore::default();
    let verifier = StaticZkVerifier {
        verdict: ZkPassportVerdict {
            verified: true,
            unique_identifier: Some("0xserver".to_string()),
            query_result_errors: None,
        },
    };

    let outcome = orchestrator::verify_zkpass(
        &verifier,
        &store,
        &test_config(),
        zkpass_request(Some("0xclient")),
    )
    .await
    .unwrap();

    // Documented inconsistency: caller still sees verified=true
    assert!(outcome.verified);
    assert!(!outcome.matched);
    assert!(matches!(
        outcome.persistence,
        PersistenceOutcome::Skipped { .. }
    ));
    assert_eq!(store.record_count(), 0);
}

#[tokio::test]
async fn zkpass_unverified_never_persists() {
    let store = MemoryStore::default();
    let verifier = StaticZkVerifier {
        verdict: ZkPassportVerdict {
            verified: false,
            unique_identifier: Some("0xabc".to_string()),
            query_result_errors: Some(vec![json!({"age": "below threshold"})]),
        },
    };

    let outcome = orchestrator::verify_zkpass(
        &verifier,
        &store,
        &test_config(),
        zkpass_request(Some("0xabc")),
    )
    .await
    .unwrap();

    assert!(!outcome.verified);
    assert_eq!(store.record_count(), 0);
    assert!(outcome.query_result_errors.is_some());
}

// --- Delegated binding ---

#[tokio::test]
async fn delegated_binding_requires_prior_audit() {
    let store = MemoryStore::default();
    let config = test_config();

    let err = orchestrator::delegated_binding(
        &store,
        &config,
        DelegatedBindingRequest {
            cosmos_address: Some("twilight1abc".to_string()),
            uuid: Some("u1".to_string()),
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(store.record_count(), 0);
}

#[tokio::test]
async fn delegated_binding_with_audit_saves_one_record() {
    let store = MemoryStore::with_audit("u1");
    let config = test_config();

    let stored = orchestrator::delegated_binding(
        &store,
        &config,
        DelegatedBindingRequest {
            cosmos_address: Some("twilight1abc".to_string()),
            uuid: Some("u1".to_string()),
        },
    )
    .await
    .unwrap();

    assert_eq!(stored.record.subject_id, "u1");
    assert_eq!(stored.record.wallet_address.as_deref(), Some("twilight1abc"));
    assert_eq!(stored.record.provider, Provider::SelfProtocol);
    assert_eq!(store.record_count(), 1);
}

#[tokio::test]
async fn delegated_binding_validates_fields() {
    let store = MemoryStore::with_audit("u1");
    let config = test_config();

    let err = orchestrator::delegated_binding(
        &store,
        &config,
        DelegatedBindingRequest {
            cosmos_address: None,
            uuid: Some("u1".to_string()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    let err = orchestrator::delegated_binding(
        &store,
        &config,
        DelegatedBindingRequest {
            cosmos_address: Some("twilight1abc".to_string()),
            uuid: Some("".to_string()),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, Error::Validation(_)));

    assert_eq!(store.record_count(), 0);
}

// --- Router-level ---

fn test_app(store: MemoryStore) -> axum::Router {
    let state = AppState {
        config: test_config(),
        store: Arc::new(store),
        self_verifier: Arc::new(StaticSelfVerifier {
            verdict: valid_self_verdict(),
        }),
        zkpass_verifier: Arc::new(StaticZkVerifier {
            verdict: ZkPassportVerdict {
                verified: true,
                unique_identifier: Some("0xabc".to_string()),
                query_result_errors: None,
            },
        }),
    };

    create_router(state)
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = test_app(MemoryStore::default());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["environment"], "test");
    assert_eq!(json["verifierReady"], true);
}

#[tokio::test]
async fn test_verify_endpoint_missing_fields_is_400_envelope() {
    let app = test_app(MemoryStore::default());

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/verify")
                .header("content-type", "application/json")
                .body(Body::from(r#"{"attestationId": "att-1"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert!(json["message"].as_str().unwrap().contains("proof"));
    assert!(json["timestamp"].is_string());
}

#[tokio::test]
async fn test_verify_endpoint_success_envelope() {
    let app = test_app(MemoryStore::default());

    let body = json!({
        "attestationId": "att-1",
        "proof": {"pi_a": ["1"]},
        "publicSignals": ["42"],
        "userContextData": {}
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/verify")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["result"], true);
    assert_eq!(json["credentialSubject"]["issuingState"], "FRA");
}

#[tokio::test]
async fn test_zkpass_endpoint_echoes_reconciliation() {
    let app = test_app(MemoryStore::default());

    let body = json!({
        "proofs": [],
        "queryResult": {},
        "scope": "twilight-id",
        "uniqueIdentifier": "0xother",
        "cosmosAddress": "twilight1abc"
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/verify/zkpass")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["verified"], true);
    assert_eq!(json["match"], false);
    assert_eq!(json["clientUID"], "0xother");
    assert_eq!(json["serverUID"], "0xabc");
    assert_eq!(json["address"], "twilight1abc");
}

#[tokio::test]
async fn test_delegated_binding_endpoint_not_found() {
    let app = test_app(MemoryStore::default());

    let body = json!({
        "cosmosAddress": "twilight1abc",
        "uuid": "u1"
    });

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/verify/self")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
}
