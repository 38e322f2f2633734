//! Configuration management for the attestation gateway
//!
//! Loads configuration from environment variables with sensible defaults.

use anyhow::{Context, Result};
use axum::http::StatusCode;
use std::collections::HashSet;
use std::env;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// API server host
    pub host: String,

    /// API server port
    pub port: u16,

    /// Redis URL for the persistence gateway
    pub redis_url: String,

    /// Base URL of the Self (passport-attestation) verifier
    pub self_verifier_url: String,

    /// Base URL of the zkPassport verifier
    pub zkpass_verifier_url: String,

    /// Expected bech32 prefix for wallet addresses
    pub address_prefix: String,

    /// Deployment environment label reported by /health
    pub environment: String,

    /// Status code returned when a verifier rejects a proof. The two
    /// historical server variants disagreed (400 vs 500), so it is a
    /// named switch rather than a hardcoded choice.
    pub rejection_status: StatusCode,

    /// Upper bound on a single verifier capability call
    pub verifier_timeout: Duration,

    /// Upper bound on a single storage write
    pub storage_timeout: Duration,

    /// Business policy applied to disclosed attributes
    pub policy: PolicyConfig,

    /// Cross-origin settings
    pub cors: CorsConfig,
}

/// Business policy configuration, read-only after startup
#[derive(Debug, Clone)]
pub struct PolicyConfig {
    /// Whether policy failures block the success response. Historically
    /// the checks were computed and logged only; the default preserves that.
    pub enforce: bool,

    /// A document must remain valid for at least this long past now
    pub expiry_horizon_days: i64,

    /// Countries excluded at the verifier level (forwarded, not checked here)
    pub excluded_countries: HashSet<String>,

    /// Issuing-country allow-list checked in application code
    pub allowed_issuing_countries: HashSet<String>,

    /// Minimum age predicate, configured into the Self verifier only
    pub minimum_age: Option<u8>,

    /// OFAC screening predicate, delegated to the external verifier
    pub ofac_check: bool,
}

/// Cross-origin resource sharing configuration
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    /// Allowed origins; empty means permissive
    pub origins: Vec<String>,

    /// Allow cookie/auth propagation (requires an explicit origin list)
    pub credentials: bool,

    /// Custom headers to whitelist; empty falls back to common defaults
    pub headers: Vec<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if it exists (for local development)
        dotenvy::dotenv().ok();

        let rejection_status = match env::var("REJECTION_STATUS")
            .unwrap_or_else(|_| "400".to_string())
            .as_str()
        {
            "400" => StatusCode::BAD_REQUEST,
            "500" => StatusCode::INTERNAL_SERVER_ERROR,
            other => anyhow::bail!("REJECTION_STATUS must be 400 or 500, got {}", other),
        };

        let config = Config {
            host: env::var("GATEWAY_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),

            port: env::var("GATEWAY_PORT")
                .unwrap_or_else(|_| "8086".to_string())
                .parse()
                .context("Invalid GATEWAY_PORT")?,

            redis_url: env::var("REDIS_URL")
                .unwrap_or_else(|_| "redis://127.0.0.1:6379".to_string()),

            self_verifier_url: env::var("SELF_VERIFIER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:3011".to_string()),

            zkpass_verifier_url: env::var("ZKPASS_VERIFIER_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:3012".to_string()),

            address_prefix: env::var("ADDRESS_PREFIX")
                .unwrap_or_else(|_| "twilight".to_string()),

            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),

            rejection_status,

            verifier_timeout: Duration::from_secs(
                env::var("VERIFIER_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "30".to_string())
                    .parse()
                    .context("Invalid VERIFIER_TIMEOUT_SECS")?,
            ),

            storage_timeout: Duration::from_secs(
                env::var("STORAGE_TIMEOUT_SECS")
                    .unwrap_or_else(|_| "5".to_string())
                    .parse()
                    .context("Invalid STORAGE_TIMEOUT_SECS")?,
            ),

            policy: PolicyConfig::from_env()?,

            cors: CorsConfig::from_env(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.port == 0 {
            anyhow::bail!("GATEWAY_PORT must be greater than 0");
        }

        if self.address_prefix.is_empty() {
            anyhow::bail!("ADDRESS_PREFIX must not be empty");
        }

        if self.cors.credentials && self.cors.origins.is_empty() {
            anyhow::bail!("CORS_CREDENTIALS requires an explicit CORS_ORIGINS list");
        }

        Ok(())
    }

    /// Get the API server address
    pub fn api_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl PolicyConfig {
    fn from_env() -> Result<Self> {
        let minimum_age = match env::var("MINIMUM_AGE") {
            Ok(v) => Some(v.parse().context("Invalid MINIMUM_AGE")?),
            Err(_) => None,
        };

        Ok(Self {
            enforce: env_flag("ENFORCE_POLICY", false),
            expiry_horizon_days: env::var("EXPIRY_HORIZON_DAYS")
                .unwrap_or_else(|_| "365".to_string())
                .parse()
                .context("Invalid EXPIRY_HORIZON_DAYS")?,
            excluded_countries: env_list("EXCLUDED_COUNTRIES"),
            allowed_issuing_countries: env_list("ALLOWED_ISSUING_COUNTRIES"),
            minimum_age,
            ofac_check: env_flag("OFAC_CHECK", false),
        })
    }
}

impl CorsConfig {
    fn from_env() -> Self {
        Self {
            origins: env::var("CORS_ORIGINS")
                .map(|v| split_csv(&v))
                .unwrap_or_default(),
            credentials: env_flag("CORS_CREDENTIALS", false),
            headers: env::var("CORS_HEADERS")
                .map(|v| split_csv(&v))
                .unwrap_or_default(),
        }
    }
}

fn env_flag(name: &str, default: bool) -> bool {
    env::var(name)
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

fn env_list(name: &str) -> HashSet<String> {
    env::var(name)
        .map(|v| split_csv(&v).into_iter().collect())
        .unwrap_or_default()
}

fn split_csv(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
