//! Ingestion Error Types

use thiserror::Error;

/// Result type for ingestion operations
pub type Result<T> = std::result::Result<T, IngestError>;

/// Ingestion errors
///
/// Every failed message terminates with exactly one of these; the node
/// itself keeps running and processes subsequent messages normally.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Message is not a telemetry post request
    #[error("Unsupported msg type: {0}")]
    UnsupportedMsgType(String),

    /// Payload decoded to zero samples
    #[error("Msg body is empty: {0}")]
    EmptyBody(String),

    /// The TTL metadata field is not an integer
    #[error("Invalid TTL value '{value}': {source}")]
    MalformedTtl {
        /// The offending metadata value
        value: String,
        /// Underlying parse failure
        #[source]
        source: std::num::ParseIntError,
    },

    /// Payload could not be decoded
    #[error("Failed to decode telemetry payload: {0}")]
    Decode(#[from] telemetry_model::TelemetryModelError),

    /// Persisted node configuration does not match any known shape.
    /// This is a deployment defect, not a per-message condition.
    #[error("Invalid node configuration: {0}")]
    InvalidConfig(String),

    /// The downstream persistence collaborator reported a failure.
    /// Opaque to this core; forwarded without interpretation.
    #[error("Timeseries persistence failed: {0}")]
    Persistence(anyhow::Error),
}

impl From<serde_json::Error> for IngestError {
    fn from(err: serde_json::Error) -> Self {
        IngestError::InvalidConfig(err.to_string())
    }
}
