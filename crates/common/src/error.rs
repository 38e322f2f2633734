use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Proof rejected: {0}")]
    VerifierRejected(String),

    #[error("Verifier unavailable: {0}")]
    VerifierUnavailable(String),

    #[error("Invalid wallet address: {0}")]
    AddressFormat(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
