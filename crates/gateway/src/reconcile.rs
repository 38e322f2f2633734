//! Identifier reconciliation for the zk-passport flow
//!
//! Decides whether a client-claimed unique identifier may be trusted against
//! the identifier the verifier derived server-side. Exact string equality
//! only: no trimming, no case folding. A mismatch silently skips persistence
//! while the response still reports the verifier's verdict, which is the
//! documented historical behavior.

/// Whether a verification result may be persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Allow iff the proof verified and the client either claimed no identifier
/// or claimed exactly the one the verifier derived.
pub fn reconcile(client_claimed: Option<&str>, server_derived: &str, verified: bool) -> Decision {
    if !verified {
        return Decision::Deny;
    }

    match client_claimed {
        None => Decision::Allow,
        Some(claimed) if claimed == server_derived => Decision::Allow,
        Some(claimed) => {
            tracing::warn!(
                client = claimed,
                server = server_derived,
                "Identifier mismatch, skipping persistence"
            );
            Decision::Deny
        }
    }
}
