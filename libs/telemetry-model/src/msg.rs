//! Rule-engine message envelope
//!
//! The envelope mirrors what the surrounding message bus delivers to a rule
//! node: a type discriminator, originator/scoping identifiers, a
//! string-to-string metadata map and a UTF-8 JSON payload. The bus also
//! stamps every message with its submission time, which serves as the
//! fallback timestamp when the metadata carries none.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ids::{CustomerId, EntityId, TenantId};

/// Metadata key carrying the telemetry timestamp in milliseconds
pub const METADATA_TS_KEY: &str = "ts";

/// Metadata key carrying a per-message TTL override in seconds
pub const METADATA_TTL_KEY: &str = "TTL";

/// Message type discriminator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MsgType {
    /// Telemetry samples to be persisted
    PostTelemetryRequest,
    /// Attribute updates (handled by a different node)
    PostAttributesRequest,
    /// Entity lifecycle notification
    EntityCreated,
    /// Connectivity event
    ActivityEvent,
}

/// String-to-string message metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MsgMetadata(pub HashMap<String, String>);

impl MsgMetadata {
    /// Look up a metadata value by key
    pub fn value(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Insert a metadata value
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }
}

/// Message delivered to a rule node by the message bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleMsg {
    /// Unique message id
    pub id: Uuid,
    /// Message type discriminator
    pub msg_type: MsgType,
    /// Entity the telemetry originates from
    pub originator: EntityId,
    /// Customer scope
    pub customer_id: CustomerId,
    /// Tenant scope
    pub tenant_id: TenantId,
    /// Message metadata
    pub metadata: MsgMetadata,
    /// UTF-8 JSON payload
    pub data: String,
    /// Submission timestamp in milliseconds, stamped by the bus
    pub ts: i64,
}

impl RuleMsg {
    /// Check the message type discriminator
    pub fn is_type_of(&self, msg_type: MsgType) -> bool {
        self.msg_type == msg_type
    }

    /// Telemetry timestamp for this message: the metadata `ts` field when
    /// present and parseable, otherwise the bus submission timestamp.
    ///
    /// An unparseable `ts` field deliberately falls back instead of
    /// erroring: producing the metadata timestamp is the bus's contract,
    /// and a message that slipped through with a mangled one still gets a
    /// usable timestamp rather than failing ingestion.
    pub fn metadata_ts(&self) -> i64 {
        self.metadata
            .value(METADATA_TS_KEY)
            .and_then(|v| v.parse::<i64>().ok())
            .unwrap_or(self.ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg_with_metadata(metadata: MsgMetadata) -> RuleMsg {
        RuleMsg {
            id: Uuid::new_v4(),
            msg_type: MsgType::PostTelemetryRequest,
            originator: EntityId::random(),
            customer_id: CustomerId::random(),
            tenant_id: TenantId::random(),
            metadata,
            data: "{}".to_string(),
            ts: 1_000,
        }
    }

    #[test]
    fn test_metadata_ts_prefers_metadata_field() {
        let mut metadata = MsgMetadata::default();
        metadata.put(METADATA_TS_KEY, "5000");
        assert_eq!(msg_with_metadata(metadata).metadata_ts(), 5_000);
    }

    #[test]
    fn test_metadata_ts_falls_back_to_submission_ts() {
        assert_eq!(msg_with_metadata(MsgMetadata::default()).metadata_ts(), 1_000);
    }

    #[test]
    fn test_metadata_ts_unparseable_falls_back() {
        let mut metadata = MsgMetadata::default();
        metadata.put(METADATA_TS_KEY, "not-a-number");
        assert_eq!(msg_with_metadata(metadata).metadata_ts(), 1_000);
    }
}
