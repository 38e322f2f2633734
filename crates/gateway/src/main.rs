//! Attestation Gateway
//!
//! REST API accepting identity proofs and persisting wallet bindings

use anyhow::{Context, Result};
use attest_gateway::{
    create_router, AppState, Config, HttpSelfVerifier, HttpZkPassportVerifier, RedisStore,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "attest_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Configuration (loads .env if present)
    let config = Config::from_env().context("Failed to load configuration")?;

    info!("Starting Attestation Gateway");
    info!("Redis URL: {}", config.redis_url);
    info!("Self verifier: {}", config.self_verifier_url);
    info!("zkPassport verifier: {}", config.zkpass_verifier_url);
    info!("Environment: {}", config.environment);
    info!(
        "Policy enforcement: {}",
        if config.policy.enforce { "on" } else { "advisory" }
    );
    info!(
        "Verifier-side predicates: {} excluded countries, ofac={}, minimum_age={:?}",
        config.policy.excluded_countries.len(),
        config.policy.ofac_check,
        config.policy.minimum_age
    );

    // Initialize storage
    let store = RedisStore::new(&config.redis_url)
        .await
        .context("Failed to initialize storage")?;

    // Verifier capability clients
    let self_verifier = HttpSelfVerifier::new(config.self_verifier_url.clone());
    let zkpass_verifier = HttpZkPassportVerifier::new(config.zkpass_verifier_url.clone());

    let addr = config.api_address();

    // Create application state
    let state = AppState {
        config,
        store: Arc::new(store),
        self_verifier: Arc::new(self_verifier),
        zkpass_verifier: Arc::new(zkpass_verifier),
    };

    // Create router
    let app = create_router(state);

    // Bind and serve
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    info!("Attestation Gateway running on http://{}", addr);

    axum::serve(listener, app)
        .await
        .context("Server error")?;

    Ok(())
}
