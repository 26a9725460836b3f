//! Typed key/value samples
//!
//! A telemetry message decodes into groups of `KvEntry` samples keyed by
//! timestamp; flattening pairs each sample with its timestamp as a
//! `TsKvEntry` for submission to the persistence layer.

use serde::{Deserialize, Serialize};

/// Typed scalar (or structured) telemetry value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum KvValue {
    /// Boolean value
    Bool(bool),
    /// Integer value (whole JSON numbers)
    Long(i64),
    /// Floating point value
    Double(f64),
    /// String value
    Str(String),
    /// Structured JSON value (nested objects and arrays)
    Json(serde_json::Value),
}

impl KvValue {
    /// Short type name, used in log and error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            KvValue::Bool(_) => "bool",
            KvValue::Long(_) => "long",
            KvValue::Double(_) => "double",
            KvValue::Str(_) => "string",
            KvValue::Json(_) => "json",
        }
    }
}

/// Single key/value sample without a timestamp
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KvEntry {
    /// Telemetry key
    pub key: String,
    /// Typed value
    pub value: KvValue,
}

impl KvEntry {
    /// Create a new sample
    pub fn new(key: impl Into<String>, value: KvValue) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

/// Timestamped key/value sample
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TsKvEntry {
    /// Timestamp in milliseconds since epoch
    pub ts: i64,
    /// The sample itself
    #[serde(flatten)]
    pub entry: KvEntry,
}

impl TsKvEntry {
    /// Pair a sample with its timestamp
    pub fn new(ts: i64, entry: KvEntry) -> Self {
        Self { ts, entry }
    }
}
