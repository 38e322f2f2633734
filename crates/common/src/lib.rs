//! Shared types for the attestation gateway services

pub mod error;
pub mod records;
pub mod signature;

pub use error::{Error, Result};
pub use records::{AuditedSubmission, Provider, StoredRecord, VerificationRecord};
pub use signature::{verify_arbitrary, SignatureCheck};
