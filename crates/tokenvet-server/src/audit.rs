//! Audit sink adapter.
//!
//! Formats pipeline events and ships them to an external webhook. The
//! channel is strictly advisory: every payload passes through the
//! sanitizer first, and any transmission failure is logged locally and
//! swallowed. Nothing here may ever affect the verification result.

use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tracing::{debug, warn};

use tokenvet_domain::sanitize;

use crate::config::AuditSettings;

/// Maximum serialized length of the sanitized data field. Longer payloads
/// are cut at [`DETAIL_CUT`] chars and ellipsized.
const MAX_DETAIL_CHARS: usize = 1000;
const DETAIL_CUT: usize = 997;

/// Event categories the pipeline emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditKind {
    /// General informational events.
    Info,
    /// An inbound check request was received.
    Request,
    /// One token was checked (per-item, noisy).
    TokenCheck,
    /// A credential verified successfully.
    Login,
    /// A handler or pipeline stage failed.
    Error,
}

impl AuditKind {
    /// Category label used as the event title.
    pub fn label(self) -> &'static str {
        match self {
            AuditKind::Info => "INFO",
            AuditKind::Request => "REQUEST",
            AuditKind::TokenCheck => "TOKEN_CHECK",
            AuditKind::Login => "LOGIN",
            AuditKind::Error => "ERROR",
        }
    }

    /// Severity color forwarded for downstream presentation.
    pub fn color(self) -> u32 {
        match self {
            AuditKind::Info => 0x3498db,
            AuditKind::Request => 0x2ecc71,
            AuditKind::TokenCheck => 0x9b59b6,
            AuditKind::Login => 0xf1c40f,
            AuditKind::Error => 0xe74c3c,
        }
    }
}

/// One audit event: a kind, a free-text message, optional structured data.
#[derive(Debug, Clone)]
pub struct AuditEvent {
    pub kind: AuditKind,
    pub message: String,
    pub data: Option<Value>,
}

impl AuditEvent {
    pub fn new(kind: AuditKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            data: None,
        }
    }

    /// Attaches structured data; it is sanitized before transmission.
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Which event kinds are forwarded to the external sink. Kinds left off
/// stay local diagnostics.
#[derive(Debug, Clone)]
pub struct ForwardPolicy {
    pub info: bool,
    pub request: bool,
    pub token_check: bool,
    pub login: bool,
    pub error: bool,
}

impl Default for ForwardPolicy {
    fn default() -> Self {
        Self {
            info: false,
            request: true,
            token_check: false,
            login: true,
            error: true,
        }
    }
}

impl ForwardPolicy {
    fn forwards(&self, kind: AuditKind) -> bool {
        match kind {
            AuditKind::Info => self.info,
            AuditKind::Request => self.request,
            AuditKind::TokenCheck => self.token_check,
            AuditKind::Login => self.login,
            AuditKind::Error => self.error,
        }
    }
}

impl From<&AuditSettings> for ForwardPolicy {
    fn from(settings: &AuditSettings) -> Self {
        Self {
            info: settings.forward_info,
            request: settings.forward_request,
            token_check: settings.forward_token_check,
            login: settings.forward_login,
            error: settings.forward_error,
        }
    }
}

/// Best-effort webhook sink.
///
/// With no webhook URL configured the sink degrades to local logging; the
/// pipeline wiring is identical either way.
#[derive(Debug, Clone)]
pub struct WebhookAuditSink {
    client: reqwest::Client,
    webhook_url: Option<String>,
    policy: ForwardPolicy,
}

impl WebhookAuditSink {
    /// Builds a sink from audit settings, with a bounded webhook timeout.
    pub fn from_settings(settings: &AuditSettings) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(settings.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            webhook_url: settings.webhook_url.clone(),
            policy: ForwardPolicy::from(settings),
        })
    }

    /// A sink that never transmits; events become local diagnostics.
    pub fn disabled() -> Self {
        Self {
            client: reqwest::Client::new(),
            webhook_url: None,
            policy: ForwardPolicy::default(),
        }
    }

    /// Emits one event, best effort.
    ///
    /// Infallible by contract: filtered kinds and missing configuration
    /// short-circuit to local logging, and transmission failures are
    /// logged and dropped.
    pub async fn emit(&self, event: AuditEvent) {
        if !self.policy.forwards(event.kind) {
            debug!(kind = event.kind.label(), "{}", event.message);
            return;
        }

        let Some(url) = &self.webhook_url else {
            debug!(
                kind = event.kind.label(),
                "audit webhook not configured, event kept local: {}", event.message
            );
            return;
        };

        let payload = build_payload(&event, Utc::now());
        match self.client.post(url).json(&payload).send().await {
            Ok(response) if response.status().is_success() => {
                debug!(kind = event.kind.label(), "audit event forwarded");
            }
            Ok(response) => {
                warn!(
                    kind = event.kind.label(),
                    status = %response.status(),
                    "audit sink rejected event"
                );
            }
            Err(e) => {
                warn!(kind = event.kind.label(), "audit sink unreachable: {e}");
            }
        }
    }
}

/// Builds the wire payload for one event.
fn build_payload(event: &AuditEvent, timestamp: DateTime<Utc>) -> Value {
    let mut payload = json!({
        "title": event.kind.label(),
        "description": event.message,
        "color": event.kind.color(),
        "timestamp": timestamp.to_rfc3339(),
    });
    if let Some(data) = &event.data {
        payload["details"] = Value::String(format_details(data));
    }
    payload
}

/// Sanitizes and serializes event data, bounding its size.
fn format_details(data: &Value) -> String {
    let sanitized = sanitize(data);
    let serialized =
        serde_json::to_string_pretty(&sanitized).unwrap_or_else(|_| sanitized.to_string());
    if serialized.chars().count() > MAX_DETAIL_CHARS {
        let cut: String = serialized.chars().take(DETAIL_CUT).collect();
        format!("{cut}...")
    } else {
        serialized
    }
}
