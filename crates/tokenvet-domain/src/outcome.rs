//! Verification outcome data model.
//!
//! A [`TokenOutcome`] is the unit result of checking one token against the
//! upstream identity API. Outcomes are built once and never mutated; the
//! orchestrator only aggregates them.

use serde::{Deserialize, Serialize};

/// The subset of the upstream identity document the pipeline forwards.
///
/// The upstream owns this shape; we decode the fields we care about and
/// ignore the rest. `avatar`, `email` and `phone` are present-but-nullable
/// in upstream responses, the remaining optionals may be absent entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountProfile {
    /// Unique account identifier.
    pub id: String,
    /// Display name.
    pub username: String,
    /// Name suffix / discriminator.
    pub discriminator: String,
    pub avatar: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    /// Whether the account has enhanced (multi-factor) auth enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mfa_enabled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub premium_type: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_flags: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub banner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accent_color: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl AccountProfile {
    /// Decodes an upstream response body into a profile.
    ///
    /// A malformed body is an expected failure mode, not a programming
    /// error, so this returns a tagged result instead of panicking. The
    /// error carries the serde message for diagnostics.
    pub fn from_json(body: &[u8]) -> Result<Self, String> {
        serde_json::from_slice(body).map_err(|e| format!("unexpected response shape: {e}"))
    }
}

/// Result of verifying a single token.
///
/// Exactly one of `user` (valid) or `error` (invalid) is populated. Use the
/// constructors to keep that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenOutcome {
    pub token: String,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<AccountProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TokenOutcome {
    /// Builds a valid outcome carrying the upstream profile.
    pub fn valid(token: impl Into<String>, user: AccountProfile) -> Self {
        Self {
            token: token.into(),
            valid: true,
            user: Some(user),
            error: None,
        }
    }

    /// Builds an invalid outcome carrying the failure message.
    pub fn invalid(token: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            valid: false,
            user: None,
            error: Some(error.into()),
        }
    }
}

/// Partition of batch outcomes by validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckCounts {
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
}

impl CheckCounts {
    /// Computes counts from a slice of outcomes.
    pub fn from_outcomes(outcomes: &[TokenOutcome]) -> Self {
        let valid = outcomes.iter().filter(|o| o.valid).count();
        Self {
            total: outcomes.len(),
            valid,
            invalid: outcomes.len() - valid,
        }
    }
}

/// Aggregated result of a batch run.
///
/// `results` preserves input order after truncation. Derived per request,
/// never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSummary {
    pub results: Vec<TokenOutcome>,
    pub count: CheckCounts,
    pub truncated: bool,
}
