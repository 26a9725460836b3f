//! Telemetry Ingestion Decision Engine
//!
//! Decides, for every incoming telemetry message, what to persist
//! (time-series history, latest-value snapshot, real-time push) and when a
//! message is exempt because a deduplication window says so.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────┐    ┌────────────────┐    ┌─────────────────────┐
//! │ RuleMsg │───▶│ TimeseriesNode │───▶│ PersistenceSettings │
//! └─────────┘    │  (orchestrate) │    │   decide() per msg  │
//!                └───────┬────────┘    └──────────┬──────────┘
//!                        │                        │
//!                        ▼                        ▼
//!              ┌──────────────────┐    ┌─────────────────────┐
//!              │ TelemetryService │    │ PersistenceStrategy │
//!              │ (external store) │    │  per-entity dedup   │
//!              └──────────────────┘    └─────────────────────┘
//! ```
//!
//! A message either short-circuits (all actions suppressed, acknowledged
//! immediately) or is decoded, paired with a resolved TTL and submitted
//! asynchronously; the submission outcome is reported back to the message
//! bus exactly once.

pub mod api;
pub mod config;
pub mod error;
pub mod node;
pub mod settings;
pub mod strategy;
pub mod ttl;

// Re-export public API
pub use api::{
    NodeContext, TelemetryService, TenantProfile, TenantProfileProvider, TimeseriesSaveRequest,
};
pub use config::{
    upgrade, PersistenceSettingsConfig, PersistenceStrategyConfig, TimeseriesNodeConfig,
    CONFIG_VERSION,
};
pub use error::{IngestError, Result};
pub use node::TimeseriesNode;
pub use settings::{PersistenceSettings, SaveDecision};
pub use strategy::PersistenceStrategy;
pub use ttl::{resolve_ttl, TenantTtlWatch};
