//! Telemetry Model Error Types

use thiserror::Error;

/// Result type for model operations
pub type Result<T> = std::result::Result<T, TelemetryModelError>;

/// Telemetry model errors
#[derive(Debug, Error)]
pub enum TelemetryModelError {
    /// Payload is not valid JSON
    #[error("Invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// Payload has a shape the decoder does not accept
    #[error("Unsupported payload shape: {0}")]
    UnsupportedPayload(String),

    /// A sample value could not be mapped to a typed scalar
    #[error("Unsupported value for key '{key}': {reason}")]
    UnsupportedValue {
        /// Telemetry key the value belongs to
        key: String,
        /// Human-readable rejection reason
        reason: String,
    },

    /// A timestamp field could not be parsed as integer milliseconds
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
