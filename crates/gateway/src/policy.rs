//! Business policy checks over disclosed attributes
//!
//! Pure predicates, no I/O. The report is always computed and logged; it
//! only gates the response when `PolicyConfig.enforce` is set.

use chrono::{DateTime, Duration, Utc};

use crate::config::PolicyConfig;
use crate::verifier::DisclosedAttributes;

/// Result of evaluating the policy predicates
///
/// `None` means the attribute needed for a check was not disclosed.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PolicyReport {
    pub expiry_ok: Option<bool>,
    pub country_ok: Option<bool>,
}

impl PolicyReport {
    /// True unless a check ran and failed
    pub fn passed(&self) -> bool {
        self.expiry_ok != Some(false) && self.country_ok != Some(false)
    }

    /// Human-readable failure summary for logs and rejection messages
    pub fn failure_reason(&self) -> String {
        let mut reasons = Vec::new();
        if self.expiry_ok == Some(false) {
            reasons.push("document expires within the required horizon");
        }
        if self.country_ok == Some(false) {
            reasons.push("issuing country not in allow-list");
        }
        reasons.join("; ")
    }
}

/// The document must remain valid for at least `horizon` past `now`
pub fn expiry_ok(expiry: DateTime<Utc>, now: DateTime<Utc>, horizon: Duration) -> bool {
    expiry > now + horizon
}

/// Membership check against the configured issuing-country allow-list
///
/// An empty allow-list admits every country.
pub fn country_ok(issuing_country: &str, policy: &PolicyConfig) -> bool {
    policy.allowed_issuing_countries.is_empty()
        || policy.allowed_issuing_countries.contains(issuing_country)
}

/// Evaluate all policy predicates over a disclosed-attribute set
pub fn evaluate(
    disclosed: &DisclosedAttributes,
    policy: &PolicyConfig,
    now: DateTime<Utc>,
) -> PolicyReport {
    let horizon = Duration::days(policy.expiry_horizon_days);

    let report = PolicyReport {
        expiry_ok: disclosed.expiry_date.map(|d| expiry_ok(d, now, horizon)),
        country_ok: disclosed
            .issuing_state
            .as_deref()
            .map(|c| country_ok(c, policy)),
    };

    tracing::info!(
        expiry_ok = ?report.expiry_ok,
        country_ok = ?report.country_ok,
        enforced = policy.enforce,
        "Policy evaluation"
    );

    report
}
