//! Redis persistence gateway for verification records and audited proofs
//!
//! Two keyspaces: `zkpass:*` holds wallet bindings, `selfcheck:*` the raw
//! proof audit trail. Record saves are blind inserts keyed off a sequence
//! counter: calling save twice with identical arguments creates two distinct
//! rows. There is no uniqueness constraint over `(subject_id, provider)`;
//! callers must not retry blindly.

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use serde_json::Value;
use tracing::{debug, info};

use attest_common::{
    AuditedSubmission, Error, Provider, Result, StoredRecord, VerificationRecord,
};

/// Persistence capability consumed by the orchestrators
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Insert a new verification record. Not idempotent.
    async fn save_verification_record(
        &self,
        subject_id: &str,
        wallet_address: Option<&str>,
        provider: Provider,
    ) -> Result<StoredRecord>;

    /// Retain a raw proof submission as an evidence trail
    async fn save_audited_submission(&self, attestation_id: &str, proof: &Value) -> Result<()>;

    /// Existence probe by exact identifier match
    async fn exists_audited_submission(&self, attestation_id: &str) -> Result<bool>;
}

/// Redis-backed store
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Create a new storage instance
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| Error::Storage(format!("Failed to create Redis client: {}", e)))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| Error::Storage(format!("Failed to connect to Redis: {}", e)))?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }
}

fn redis_err(e: redis::RedisError) -> Error {
    Error::Storage(e.to_string())
}

#[async_trait]
impl RecordStore for RedisStore {
    async fn save_verification_record(
        &self,
        subject_id: &str,
        wallet_address: Option<&str>,
        provider: Provider,
    ) -> Result<StoredRecord> {
        let mut conn = self.conn.clone();

        let record = VerificationRecord::new(
            subject_id.to_string(),
            wallet_address.map(|a| a.to_string()),
            provider,
        );
        let json = serde_json::to_string(&record)?;

        // Sequence-keyed blind insert: duplicates are distinct rows
        let row_id: u64 = conn.incr("zkpass:seq", 1).await.map_err(redis_err)?;
        let key = format!("zkpass:row:{}", row_id);
        let _: () = conn.set(&key, &json).await.map_err(redis_err)?;

        // Secondary index by subject for lookups and observability
        let index_key = format!("zkpass:by_subject:{}:{}", provider, subject_id);
        let _: () = conn.sadd(&index_key, row_id).await.map_err(redis_err)?;

        info!(
            subject_id,
            provider = %provider,
            row_id,
            "Saved verification record"
        );

        Ok(StoredRecord { row_id, record })
    }

    async fn save_audited_submission(&self, attestation_id: &str, proof: &Value) -> Result<()> {
        let mut conn = self.conn.clone();

        let submission = AuditedSubmission::new(attestation_id.to_string(), proof.clone());
        let json = serde_json::to_string(&submission)?;

        let key = format!("selfcheck:{}", attestation_id);
        let _: () = conn.set(&key, json).await.map_err(redis_err)?;

        debug!(attestation_id, "Recorded audited proof submission");
        Ok(())
    }

    async fn exists_audited_submission(&self, attestation_id: &str) -> Result<bool> {
        let mut conn = self.conn.clone();

        let key = format!("selfcheck:{}", attestation_id);
        let exists: bool = conn.exists(&key).await.map_err(redis_err)?;
        Ok(exists)
    }
}
