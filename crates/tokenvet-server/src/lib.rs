//! tokenvet-server: verification pipeline and business logic
//!
//! This crate contains the business logic layer including:
//! - Upstream identity client (the `TokenVerifier` implementation)
//! - Batch orchestrator with pacing and truncation
//! - Audit sink adapter (sanitized, best-effort webhook)
//! - Pipeline facade tying check-one / check-many together
//! - Configuration management
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │              tokenvet-server                 │
//! ├─────────────────────────────────────────────┤
//! │  config.rs   - Configuration management     │
//! │  upstream.rs - Identity API client          │
//! │  audit.rs    - Audit sink adapter           │
//! │  handlers/   - Pipeline stages              │
//! │    batch.rs      - Paced batch orchestrator │
//! │    pipeline.rs   - Facade (check one/many)  │
//! └─────────────────────────────────────────────┘
//! ```

pub mod audit;
pub mod config;
pub mod handlers;
pub mod upstream;

// Re-exports for convenience
pub use audit::{AuditEvent, AuditKind, WebhookAuditSink};
pub use config::{ConfigLoadError, ServerConfig};
pub use handlers::batch::{BatchPolicy, BatchRunner};
pub use handlers::pipeline::TokenPipeline;
pub use upstream::UpstreamVerifier;
