//! TTL resolution and the tenant-profile default watch
//!
//! Retention for one message resolves from three sources in strict
//! precedence: message metadata override, then the node's configured
//! default, and - whenever the resolved value is exactly zero - the
//! tenant-profile default. A zero therefore never means "keep forever"
//! here; an explicit `TTL: 0` override and "nothing configured" are
//! deliberately indistinguishable and both defer to the tenant default.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use telemetry_model::TenantId;

use crate::api::TenantProfileProvider;
use crate::error::{IngestError, Result};

const SECS_PER_DAY: u64 = 86_400;

/// Resolve the retention for one message.
///
/// - `metadata_ttl`: raw `TTL` metadata field, if the message carries one
/// - `node_default`: the node's configured default TTL in seconds
/// - `tenant_default`: the tenant-profile default in seconds
pub fn resolve_ttl(
    metadata_ttl: Option<&str>,
    node_default: u64,
    tenant_default: u64,
) -> Result<u64> {
    let ttl = match metadata_ttl {
        Some(value) if !value.is_empty() => {
            value.parse::<u64>().map_err(|source| IngestError::MalformedTtl {
                value: value.to_string(),
                source,
            })?
        }
        _ => node_default,
    };
    // Zero defers to the tenant default regardless of where it came from
    Ok(if ttl == 0 { tenant_default } else { ttl })
}

/// Scoped subscription to the tenant-profile default TTL
///
/// Acquired at node init, released at teardown. Holds only the most recent
/// value (last-write-wins); readers may observe a slightly stale value
/// while an update is in flight.
#[derive(Debug)]
pub struct TenantTtlWatch {
    ttl_secs: Arc<AtomicU64>,
    listener: JoinHandle<()>,
}

impl TenantTtlWatch {
    /// Subscribe to profile changes for `tenant_id`. The initial profile is
    /// applied synchronously; subsequent changes are applied by a
    /// background listener task.
    pub fn subscribe(provider: &dyn TenantProfileProvider, tenant_id: TenantId) -> Self {
        let mut receiver = provider.watch_profile(tenant_id);
        let initial_days = receiver.borrow_and_update().default_storage_ttl_days;
        let ttl_secs = Arc::new(AtomicU64::new(initial_days * SECS_PER_DAY));

        let shared = Arc::clone(&ttl_secs);
        let listener = tokio::spawn(async move {
            while receiver.changed().await.is_ok() {
                let days = receiver.borrow_and_update().default_storage_ttl_days;
                shared.store(days * SECS_PER_DAY, Ordering::Relaxed);
                debug!(%tenant_id, ttl_days = days, "Tenant profile default TTL updated");
            }
        });

        Self { ttl_secs, listener }
    }

    /// Most recently pushed tenant default, in seconds
    pub fn current_secs(&self) -> u64 {
        self.ttl_secs.load(Ordering::Relaxed)
    }

    /// End the subscription
    pub fn shutdown(&self) {
        self.listener.abort();
    }
}

impl Drop for TenantTtlWatch {
    fn drop(&mut self) {
        self.listener.abort();
    }
}
