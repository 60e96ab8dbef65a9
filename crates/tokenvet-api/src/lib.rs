//! tokenvet-api: HTTP API layer
//!
//! This crate provides the outward-facing surface of the service:
//! - HTTP REST endpoints via Axum
//! - Application state wiring the pipeline, store and audit sink
//! - Logging initialization
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               tokenvet-api                   │
//! ├─────────────────────────────────────────────┤
//! │  http/          - REST endpoints & state    │
//! │  observability/ - Logging setup             │
//! └─────────────────────────────────────────────┘
//! ```

pub mod http;
pub mod observability;
