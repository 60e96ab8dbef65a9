//! TokenVerifier trait definition.

use async_trait::async_trait;

use crate::outcome::TokenOutcome;

/// Abstract interface for checking one token against the upstream
/// identity API.
///
/// Implementations must be thread-safe (Send + Sync). The contract is
/// infallible by design: upstream rejections, malformed response bodies
/// and transport faults are all converted into invalid outcomes at this
/// boundary and never propagate as errors.
#[async_trait]
pub trait TokenVerifier: Send + Sync + 'static {
    /// Checks a single token and classifies the result.
    async fn verify(&self, token: &str) -> TokenOutcome;
}
