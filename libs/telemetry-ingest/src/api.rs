//! Collaborator interfaces for the ingestion node
//!
//! The node talks to three external subsystems, all behind traits:
//! - the message bus context it reports terminal outcomes to
//! - the telemetry persistence service it submits save requests to
//! - the tenant-profile subsystem it watches for default-TTL changes
//!
//! Downstream failures are opaque `anyhow` errors; the node forwards them
//! without interpretation.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use telemetry_model::{CustomerId, EntityId, RuleMsg, TenantId, TsKvEntry};

use crate::error::IngestError;
use crate::settings::SaveDecision;

/// Save request submitted to the persistence collaborator
#[derive(Debug, Clone)]
pub struct TimeseriesSaveRequest {
    /// Tenant scope
    pub tenant_id: TenantId,
    /// Customer scope
    pub customer_id: CustomerId,
    /// Entity the samples belong to
    pub entity_id: EntityId,
    /// Flattened timestamped samples
    pub entries: Vec<TsKvEntry>,
    /// Retention in seconds
    pub ttl: u64,
    /// Which stores/notifications to touch
    pub decision: SaveDecision,
}

/// Telemetry persistence collaborator
///
/// `save_timeseries` resolves exactly once: `Ok` when every requested
/// action completed, `Err` with an opaque downstream failure otherwise.
#[async_trait]
pub trait TelemetryService: Send + Sync + 'static {
    /// Persist the request according to its decision flags
    async fn save_timeseries(&self, request: TimeseriesSaveRequest) -> Result<()>;
}

/// Message bus context a node reports terminal outcomes through
///
/// Every message handed to a node ends in exactly one `tell_success` or
/// `tell_failure` call, including the decided-not-to-persist case.
pub trait NodeContext: Send + Sync + 'static {
    /// Tenant the node instance runs under
    fn tenant_id(&self) -> TenantId;

    /// Acknowledge the message
    fn tell_success(&self, msg: RuleMsg);

    /// Fail the message with a specific error
    fn tell_failure(&self, msg: RuleMsg, error: IngestError);
}

/// Tenant profile snapshot pushed by the tenant-profile subsystem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantProfile {
    /// Default storage retention in days; the node converts to seconds
    pub default_storage_ttl_days: u64,
}

/// Tenant-profile collaborator
///
/// `watch_profile` returns a receiver that holds the current profile and
/// observes every subsequent change; dropping the receiver ends the
/// subscription.
pub trait TenantProfileProvider: Send + Sync + 'static {
    /// Subscribe to profile changes for `tenant_id`
    fn watch_profile(&self, tenant_id: TenantId) -> watch::Receiver<TenantProfile>;
}
