//! Telemetry Model Library
//!
//! Shared data model for the telemetry ingestion pipeline:
//! - Typed entity/tenant/customer identifiers
//! - Key/value samples and timestamped entries
//! - Rule-engine message envelope with metadata accessors
//! - JSON payload decoding into timestamped sample groups
//!
//! This crate is pure data + parsing; it has no runtime dependencies and no
//! knowledge of persistence or routing.

pub mod decoder;
pub mod error;
pub mod ids;
pub mod kv;
pub mod msg;

// Re-export public API
pub use decoder::{DecodedTelemetry, JsonTelemetryDecoder, TelemetryDecoder};
pub use error::{Result, TelemetryModelError};
pub use ids::{CustomerId, EntityId, TenantId};
pub use kv::{KvEntry, KvValue, TsKvEntry};
pub use msg::{MsgMetadata, MsgType, RuleMsg, METADATA_TS_KEY, METADATA_TTL_KEY};
