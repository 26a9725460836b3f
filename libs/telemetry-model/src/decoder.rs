//! Telemetry payload decoding
//!
//! Turns a raw UTF-8 JSON payload into sample groups keyed by timestamp.
//! Accepted shapes:
//! - `{"temperature": 21.5, "enabled": true}` - samples at the default
//!   timestamp
//! - `{"ts": 1700000000000, "values": {"temperature": 21.5}}` - samples at
//!   an explicit timestamp
//! - an array of either of the above
//!
//! Whole JSON numbers decode as `Long`, fractional numbers as `Double`,
//! nested objects and arrays are kept as structured `Json` values. Null
//! values are rejected.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::{Result, TelemetryModelError};
use crate::kv::{KvEntry, KvValue};

/// Decoded payload: sample groups keyed by timestamp (milliseconds)
pub type DecodedTelemetry = BTreeMap<i64, Vec<KvEntry>>;

/// Turns a raw payload plus a resolved default timestamp into timestamped
/// sample groups. An empty result means the payload carried no samples;
/// callers decide whether that is an error.
pub trait TelemetryDecoder: Send + Sync {
    /// Decode `payload` into sample groups, attributing samples without an
    /// explicit timestamp to `default_ts`.
    fn decode(&self, payload: &str, default_ts: i64) -> Result<DecodedTelemetry>;
}

/// JSON decoder for the standard telemetry payload shapes
#[derive(Debug, Clone, Default)]
pub struct JsonTelemetryDecoder;

impl JsonTelemetryDecoder {
    /// Create a new JSON decoder
    pub fn new() -> Self {
        Self
    }

    fn decode_group(value: &Value, default_ts: i64, out: &mut DecodedTelemetry) -> Result<()> {
        let obj = value.as_object().ok_or_else(|| {
            TelemetryModelError::UnsupportedPayload(format!(
                "expected JSON object, got {}",
                json_type_name(value)
            ))
        })?;

        // Explicit-timestamp form: {"ts": ..., "values": {...}}
        if let (Some(ts_value), Some(values)) = (obj.get("ts"), obj.get("values")) {
            let ts = ts_value
                .as_i64()
                .ok_or_else(|| TelemetryModelError::InvalidTimestamp(ts_value.to_string()))?;
            let values = values.as_object().ok_or_else(|| {
                TelemetryModelError::UnsupportedPayload(format!(
                    "'values' must be an object, got {}",
                    json_type_name(values)
                ))
            })?;
            let bucket = out.entry(ts).or_default();
            for (key, value) in values {
                bucket.push(KvEntry::new(key.clone(), decode_value(key, value)?));
            }
            return Ok(());
        }

        // Plain key/value form at the default timestamp
        let bucket = out.entry(default_ts).or_default();
        for (key, value) in obj {
            bucket.push(KvEntry::new(key.clone(), decode_value(key, value)?));
        }
        Ok(())
    }
}

impl TelemetryDecoder for JsonTelemetryDecoder {
    fn decode(&self, payload: &str, default_ts: i64) -> Result<DecodedTelemetry> {
        let parsed: Value = serde_json::from_str(payload)?;
        let mut out = DecodedTelemetry::new();
        match &parsed {
            Value::Array(groups) => {
                for group in groups {
                    Self::decode_group(group, default_ts, &mut out)?;
                }
            }
            Value::Object(_) => Self::decode_group(&parsed, default_ts, &mut out)?,
            other => {
                return Err(TelemetryModelError::UnsupportedPayload(format!(
                    "expected object or array, got {}",
                    json_type_name(other)
                )));
            }
        }
        // Drop buckets an empty "values" object produced
        out.retain(|_, samples| !samples.is_empty());
        Ok(out)
    }
}

/// Map a JSON value to a typed telemetry scalar
fn decode_value(key: &str, value: &Value) -> Result<KvValue> {
    match value {
        Value::Bool(b) => Ok(KvValue::Bool(*b)),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(KvValue::Long(i))
            } else if let Some(f) = n.as_f64() {
                Ok(KvValue::Double(f))
            } else {
                Err(TelemetryModelError::UnsupportedValue {
                    key: key.to_string(),
                    reason: format!("number out of range: {n}"),
                })
            }
        }
        Value::String(s) => Ok(KvValue::Str(s.clone())),
        Value::Object(_) | Value::Array(_) => Ok(KvValue::Json(value.clone())),
        Value::Null => Err(TelemetryModelError::UnsupportedValue {
            key: key.to_string(),
            reason: "null values are not allowed".to_string(),
        }),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
