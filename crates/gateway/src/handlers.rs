//! API request handlers for the attestation gateway

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info};

use attest_common::Error;

use crate::models::{DelegatedBindingRequest, SelfVerifyRequest, ZkPassVerifyRequest};
use crate::orchestrator;
use crate::AppState;

/// API Error type rendered as the gateway's failure envelope
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = serde_json::json!({
            "status": "error",
            "message": self.message,
            "timestamp": Utc::now().to_rfc3339(),
        });

        (self.status, Json(body)).into_response()
    }
}

/// Map a workflow error onto an HTTP status
///
/// Verifier rejections use the configured status because the two historical
/// deployment variants disagreed on 400 vs 500.
fn map_error(err: Error, rejection_status: StatusCode) -> ApiError {
    let status = match &err {
        Error::Validation(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::VerifierRejected(_) => rejection_status,
        Error::VerifierUnavailable(_) => StatusCode::BAD_GATEWAY,
        Error::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
        // Address failures degrade to a persistence outcome inside the Self
        // workflow today; this arm only fires if they are made blocking
        Error::AddressFormat(_) => StatusCode::BAD_REQUEST,
        Error::Storage(_) | Error::JsonSerialization(_) | Error::Other(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if status.is_server_error() {
        error!(error = %err, "Request failed");
    } else {
        info!(error = %err, "Request rejected");
    }

    ApiError {
        status,
        message: err.to_string(),
    }
}

/// Health check endpoint
pub async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let verifier_ready = state.self_verifier.ready().await;

    Json(serde_json::json!({
        "status": "success",
        "message": "Attestation gateway is running",
        "timestamp": Utc::now().to_rfc3339(),
        "verifierReady": verifier_ready,
        "environment": state.config.environment,
    }))
}

/// Verify a Self passport-attestation proof
pub async fn verify_self_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SelfVerifyRequest>,
) -> Response {
    info!("Received Self verification request");

    let result = orchestrator::verify_self(
        state.self_verifier.as_ref(),
        state.store.as_ref(),
        &state.config,
        payload,
    )
    .await;

    match result {
        Ok(success) => Json(serde_json::json!({
            "status": "success",
            "result": true,
            "credentialSubject": success.disclosed,
            "timestamp": Utc::now().to_rfc3339(),
        }))
        .into_response(),
        Err(err) => map_error(err, state.config.rejection_status).into_response(),
    }
}

/// Bind a wallet address to an already-audited subject
pub async fn delegated_binding_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<DelegatedBindingRequest>,
) -> Response {
    info!("Received delegated binding request");

    let result =
        orchestrator::delegated_binding(state.store.as_ref(), &state.config, payload).await;

    match result {
        Ok(stored) => Json(serde_json::json!({
            "status": "success",
            "data": stored,
        }))
        .into_response(),
        Err(err) => map_error(err, state.config.rejection_status).into_response(),
    }
}

/// Verify a zkPassport proof
pub async fn verify_zkpass_handler(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ZkPassVerifyRequest>,
) -> Response {
    info!("Received zkPassport verification request");

    let result = orchestrator::verify_zkpass(
        state.zkpass_verifier.as_ref(),
        state.store.as_ref(),
        &state.config,
        payload,
    )
    .await;

    match result {
        Ok(outcome) => Json(serde_json::json!({
            "status": "success",
            "verified": outcome.verified,
            "clientUID": outcome.client_uid,
            "serverUID": outcome.server_uid,
            "match": outcome.matched,
            "queryResultErrors": outcome.query_result_errors,
            "address": outcome.address,
            "timestamp": Utc::now().to_rfc3339(),
        }))
        .into_response(),
        Err(err) => map_error(err, state.config.rejection_status).into_response(),
    }
}
