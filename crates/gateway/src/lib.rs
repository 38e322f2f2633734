//! Identity-Attestation Gateway
//!
//! Accepts zero-knowledge identity proofs from two external ecosystems
//! (the Self passport-attestation protocol and zkPassport), delegates
//! cryptographic verification to their verifier services, applies business
//! policy checks, and persists the resulting wallet binding.
//!
//! ## Endpoints
//!
//! - `POST /api/verify` - Verify a Self passport-attestation proof
//! - `POST /api/verify/self` - Bind a wallet to an already-audited subject
//! - `POST /api/verify/zkpass` - Verify a zkPassport proof
//! - `GET /health` - Health check

pub mod config;
pub mod handlers;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod reconcile;
pub mod storage;
pub mod verifier;

use axum::{
    http::{header::CONTENT_TYPE, HeaderName, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{Config, CorsConfig, PolicyConfig};
pub use storage::{RecordStore, RedisStore};
pub use verifier::{
    HttpSelfVerifier, HttpZkPassportVerifier, SelfVerifier, ZkPassportVerifier,
};

/// Shared application state
pub struct AppState {
    pub config: Config,
    pub store: Arc<dyn RecordStore>,
    pub self_verifier: Arc<dyn SelfVerifier>,
    pub zkpass_verifier: Arc<dyn ZkPassportVerifier>,
}

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.cors);
    let shared_state = Arc::new(state);

    Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/api/verify", post(handlers::verify_self_handler))
        .route("/api/verify/self", post(handlers::delegated_binding_handler))
        .route("/api/verify/zkpass", post(handlers::verify_zkpass_handler))
        .with_state(shared_state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Build the CORS layer from configuration
///
/// With no origin allow-list the layer is permissive (development mode);
/// credentials then stay off, since a wildcard origin cannot carry them.
fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    if cors.origins.is_empty() {
        return CorsLayer::permissive();
    }

    let origins: Vec<HeaderValue> = cors
        .origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    let mut layer = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST]);

    if cors.headers.is_empty() {
        layer = layer.allow_headers([CONTENT_TYPE]);
    } else {
        let headers: Vec<HeaderName> = cors
            .headers
            .iter()
            .filter_map(|h| h.parse().ok())
            .collect();
        layer = layer.allow_headers(headers);
    }

    if cors.credentials {
        layer = layer.allow_credentials(true);
    }

    layer
}
