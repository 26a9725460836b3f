//! Save-timeseries rule node
//!
//! Per-message orchestration: validate the message type, resolve the
//! telemetry timestamp, ask the persistence settings for a save decision,
//! short-circuit when nothing should happen, decode the payload, resolve
//! the TTL and submit an asynchronous save request whose completion is
//! reported back to the message bus.
//!
//! The node is invoked concurrently by the bus worker pool; everything up
//! to submission is synchronous and cheap, submission itself runs on a
//! spawned task.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info, warn};

use telemetry_model::{
    JsonTelemetryDecoder, MsgType, RuleMsg, TelemetryDecoder, TsKvEntry, METADATA_TTL_KEY,
};

use crate::api::{NodeContext, TelemetryService, TenantProfileProvider, TimeseriesSaveRequest};
use crate::config::TimeseriesNodeConfig;
use crate::error::{IngestError, Result};
use crate::settings::PersistenceSettings;
use crate::ttl::{resolve_ttl, TenantTtlWatch};

/// Rule node persisting telemetry according to its configured policy
pub struct TimeseriesNode<C: NodeContext> {
    ctx: Arc<C>,
    config: TimeseriesNodeConfig,
    settings: PersistenceSettings,
    decoder: Arc<dyn TelemetryDecoder>,
    telemetry: Arc<dyn TelemetryService>,
    tenant_ttl: TenantTtlWatch,
}

impl<C: NodeContext> TimeseriesNode<C> {
    /// Create a node from an already-parsed configuration
    pub fn new(
        ctx: Arc<C>,
        telemetry: Arc<dyn TelemetryService>,
        profiles: &dyn TenantProfileProvider,
        decoder: Arc<dyn TelemetryDecoder>,
        config: TimeseriesNodeConfig,
    ) -> Self {
        let tenant_ttl = TenantTtlWatch::subscribe(profiles, ctx.tenant_id());
        let settings = config.persistence_settings.build();
        info!(
            tenant_id = %ctx.tenant_id(),
            default_ttl = config.default_ttl,
            use_server_ts = config.use_server_ts,
            "Timeseries node initialized"
        );
        Self {
            ctx,
            config,
            settings,
            decoder,
            telemetry,
            tenant_ttl,
        }
    }

    /// Create a node from a persisted configuration document (already at
    /// the current schema version), decoding payloads as JSON
    pub fn from_document(
        ctx: Arc<C>,
        telemetry: Arc<dyn TelemetryService>,
        profiles: &dyn TenantProfileProvider,
        document: &Value,
    ) -> Result<Self> {
        let config = TimeseriesNodeConfig::from_value(document)?;
        Ok(Self::new(
            ctx,
            telemetry,
            profiles,
            Arc::new(JsonTelemetryDecoder::new()),
            config,
        ))
    }

    /// Process one inbound message. The message always reaches exactly one
    /// terminal outcome on the node context: acknowledged (possibly without
    /// any persistence side effect) or failed with a specific error.
    /// Must be called from within a Tokio runtime; submission runs on a
    /// spawned task.
    pub fn on_msg(&self, msg: RuleMsg) {
        if !msg.is_type_of(MsgType::PostTelemetryRequest) {
            let error = IngestError::UnsupportedMsgType(format!("{:?}", msg.msg_type));
            self.ctx.tell_failure(msg, error);
            return;
        }

        let ts = if self.config.use_server_ts {
            Utc::now().timestamp_millis()
        } else {
            msg.metadata_ts()
        };

        let decision = self.settings.decide(ts, msg.originator);
        if decision.is_skip_all() {
            // Common case under aggressive deduplication: acknowledge
            // without decoding the payload.
            debug!(originator = %msg.originator, ts, "All persistence actions suppressed");
            self.ctx.tell_success(msg);
            return;
        }

        let decoded = match self.decoder.decode(&msg.data, ts) {
            Ok(decoded) => decoded,
            Err(error) => {
                self.ctx.tell_failure(msg, error.into());
                return;
            }
        };
        if decoded.is_empty() {
            let error = IngestError::EmptyBody(msg.data.clone());
            self.ctx.tell_failure(msg, error);
            return;
        }

        let entries: Vec<TsKvEntry> = decoded
            .into_iter()
            .flat_map(|(group_ts, samples)| {
                samples.into_iter().map(move |sample| TsKvEntry::new(group_ts, sample))
            })
            .collect();

        let ttl = match resolve_ttl(
            msg.metadata.value(METADATA_TTL_KEY),
            self.config.default_ttl,
            self.tenant_ttl.current_secs(),
        ) {
            Ok(ttl) => ttl,
            Err(error) => {
                self.ctx.tell_failure(msg, error);
                return;
            }
        };

        let request = TimeseriesSaveRequest {
            tenant_id: msg.tenant_id,
            customer_id: msg.customer_id,
            entity_id: msg.originator,
            entries,
            ttl,
            decision,
        };

        // Fire-and-forget from the worker's perspective; the save resolves
        // exactly once on a separate task and reports the outcome.
        let ctx = Arc::clone(&self.ctx);
        let telemetry = Arc::clone(&self.telemetry);
        tokio::spawn(async move {
            match telemetry.save_timeseries(request).await {
                Ok(()) => ctx.tell_success(msg),
                Err(error) => {
                    warn!(originator = %msg.originator, %error, "Timeseries save failed");
                    ctx.tell_failure(msg, IngestError::Persistence(error));
                }
            }
        });
    }

    /// Release the tenant-profile subscription
    pub fn shutdown(&self) {
        self.tenant_ttl.shutdown();
        info!(tenant_id = %self.ctx.tenant_id(), "Timeseries node stopped");
    }

    /// Evict dedup-cache entries idle longer than `factor` windows from
    /// every deduplicating strategy this node holds. See
    /// [`crate::strategy::PersistenceStrategy::sweep_stale`].
    pub fn sweep_dedup_caches(&self, now_ms: i64, factor: u32) -> usize {
        match &self.settings {
            PersistenceSettings::Deduplicate(strategy) => strategy.sweep_stale(now_ms, factor),
            PersistenceSettings::Advanced {
                timeseries,
                latest,
                web_sockets,
            } => {
                timeseries.sweep_stale(now_ms, factor)
                    + latest.sweep_stale(now_ms, factor)
                    + web_sockets.sweep_stale(now_ms, factor)
            }
            PersistenceSettings::OnEveryMessage | PersistenceSettings::WebSocketsOnly => 0,
        }
    }
}
