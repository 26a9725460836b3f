//! Node configuration - persisted document types and version migration
//!
//! Configuration is persisted as a JSON document with camelCase keys and a
//! SCREAMING_SNAKE_CASE `type` tag on the policy unions. Unknown `type`
//! tags fail deserialization, which is how a misconfigured policy variant
//! surfaces loudly instead of being coerced to a default.
//!
//! Version history:
//! - 0: legacy `skipLatestPersistence` boolean flag
//! - 1: tagged `persistenceSettings` policy union

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{IngestError, Result};
use crate::settings::PersistenceSettings;
use crate::strategy::PersistenceStrategy;

/// Current configuration schema version
pub const CONFIG_VERSION: u32 = 1;

/// Persisted form of a single persistence strategy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersistenceStrategyConfig {
    /// Persist every message
    OnEveryMessage,
    /// Never persist
    Skip,
    /// Persist the first message per originator in each window
    Deduplicate {
        /// Window length in seconds
        #[serde(rename = "deduplicationIntervalSecs")]
        deduplication_interval_secs: u64,
    },
}

impl PersistenceStrategyConfig {
    /// Build the runtime strategy, allocating a fresh dedup cache for
    /// deduplicating strategies
    pub fn build(&self) -> PersistenceStrategy {
        match self {
            PersistenceStrategyConfig::OnEveryMessage => PersistenceStrategy::on_every_message(),
            PersistenceStrategyConfig::Skip => PersistenceStrategy::skip(),
            PersistenceStrategyConfig::Deduplicate {
                deduplication_interval_secs,
            } => PersistenceStrategy::deduplicate(*deduplication_interval_secs),
        }
    }
}

/// Persisted form of the node's persistence policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PersistenceSettingsConfig {
    /// Every message is fully persisted
    OnEveryMessage,
    /// Messages only feed real-time subscriptions
    WebSocketsOnly,
    /// One shared deduplication window gates everything
    Deduplicate {
        /// Window length in seconds
        #[serde(rename = "deduplicationIntervalSecs")]
        deduplication_interval_secs: u64,
    },
    /// Independent strategy per action
    Advanced {
        /// Strategy for time-series history writes
        timeseries: PersistenceStrategyConfig,
        /// Strategy for latest-value snapshot updates
        latest: PersistenceStrategyConfig,
        /// Strategy for web-socket notifications
        #[serde(rename = "webSockets")]
        web_sockets: PersistenceStrategyConfig,
    },
}

impl Default for PersistenceSettingsConfig {
    fn default() -> Self {
        PersistenceSettingsConfig::OnEveryMessage
    }
}

impl PersistenceSettingsConfig {
    /// Build the runtime settings, instantiating strategy state
    pub fn build(&self) -> PersistenceSettings {
        match self {
            PersistenceSettingsConfig::OnEveryMessage => PersistenceSettings::OnEveryMessage,
            PersistenceSettingsConfig::WebSocketsOnly => PersistenceSettings::WebSocketsOnly,
            PersistenceSettingsConfig::Deduplicate {
                deduplication_interval_secs,
            } => PersistenceSettings::Deduplicate(PersistenceStrategy::deduplicate(
                *deduplication_interval_secs,
            )),
            PersistenceSettingsConfig::Advanced {
                timeseries,
                latest,
                web_sockets,
            } => PersistenceSettings::Advanced {
                timeseries: timeseries.build(),
                latest: latest.build(),
                web_sockets: web_sockets.build(),
            },
        }
    }
}

/// Node configuration, immutable after node initialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TimeseriesNodeConfig {
    /// Active persistence policy
    pub persistence_settings: PersistenceSettingsConfig,
    /// Default TTL in seconds; 0 defers to the tenant-profile default
    #[serde(rename = "defaultTTL")]
    pub default_ttl: u64,
    /// Use message-processing wall-clock time instead of the message
    /// timestamp
    pub use_server_ts: bool,
}

impl Default for TimeseriesNodeConfig {
    fn default() -> Self {
        Self {
            persistence_settings: PersistenceSettingsConfig::default(),
            default_ttl: 0,
            use_server_ts: false,
        }
    }
}

impl TimeseriesNodeConfig {
    /// Deserialize a persisted configuration document. The document must
    /// already be at [`CONFIG_VERSION`]; run [`upgrade`] first when loading
    /// older versions.
    pub fn from_value(value: &Value) -> Result<Self> {
        serde_json::from_value(value.clone())
            .map_err(|e| IngestError::InvalidConfig(e.to_string()))
    }
}

/// Migrate a persisted configuration document from `from_version` to the
/// current schema, in place. Returns whether the document changed.
///
/// Fields the migration does not know about are left untouched. Invoking
/// at the current version is a no-op.
pub fn upgrade(from_version: u32, config: &mut Value) -> Result<bool> {
    match from_version {
        0 => {
            let obj = config.as_object_mut().ok_or_else(|| {
                IngestError::InvalidConfig("node configuration must be a JSON object".to_string())
            })?;
            // Both the JSON boolean true and the string "true" counted as
            // set in the legacy schema.
            let skip_latest = match obj.get("skipLatestPersistence") {
                Some(Value::Bool(b)) => *b,
                Some(Value::String(s)) => s == "true",
                _ => false,
            };
            let settings = if skip_latest {
                PersistenceSettingsConfig::Advanced {
                    timeseries: PersistenceStrategyConfig::OnEveryMessage,
                    latest: PersistenceStrategyConfig::Skip,
                    web_sockets: PersistenceStrategyConfig::OnEveryMessage,
                }
            } else {
                PersistenceSettingsConfig::OnEveryMessage
            };
            obj.insert("persistenceSettings".to_string(), serde_json::to_value(&settings)?);
            obj.remove("skipLatestPersistence");
            Ok(true)
        }
        _ => Ok(false),
    }
}
