//! Typed identifiers for telemetry originators and scoping
//!
//! All identifiers are opaque UUIDs; the ingestion core never interprets
//! them, it only uses them as cache keys and request labels.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of the entity (device, asset, ...) a telemetry message
/// originates from. Used as the deduplication cache key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(pub Uuid);

/// Tenant scope identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub Uuid);

/// Customer scope identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub Uuid);

impl EntityId {
    /// Generate a random entity id (mainly useful in tests)
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl TenantId {
    /// Generate a random tenant id (mainly useful in tests)
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl CustomerId {
    /// Generate a random customer id (mainly useful in tests)
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for TenantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}
