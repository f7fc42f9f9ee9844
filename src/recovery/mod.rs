//! Best-effort recovery of typed records from semi-malformed text.
//!
//! The radio transport stores received uplink payloads as plain text
//! files. Two device classes, two shapes of damage:
//!
//! - **Sensor node**: one quasi-JSON object whose numeric values carry
//!   embedded unit suffixes (`"CPU":50%`) — handled by [`object`].
//! - **Compute node**: multi-line free-text system metrics straight from
//!   shell tools — handled by [`lines`].
//!
//! Both produce a [`MetricsRecord`] ready for publishing.

pub mod lines;
pub mod object;

use core::fmt;
use std::collections::BTreeMap;

// ───────────────────────────────────────────────────────────────
// Typed field values
// ───────────────────────────────────────────────────────────────

/// A recovered metric value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Float(f64),
    Int(i64),
    Text(String),
}

impl FieldValue {
    /// Render as JSON for the publish payload.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Float(v) => serde_json::json!(v),
            Self::Int(v) => serde_json::json!(v),
            Self::Text(v) => serde_json::json!(v),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Float(v) => write!(f, "{v}"),
            Self::Int(v) => write!(f, "{v}"),
            Self::Text(v) => write!(f, "{v}"),
        }
    }
}

/// Canonical field name → typed value, sorted for deterministic output.
pub type FieldMap = BTreeMap<String, FieldValue>;

/// One recovered record, ready for the publish sink.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricsRecord {
    pub device_id: String,
    pub timestamp_millis: u64,
    pub fields: FieldMap,
}

impl MetricsRecord {
    pub fn new(device_id: impl Into<String>, timestamp_millis: u64, fields: FieldMap) -> Self {
        Self {
            device_id: device_id.into(),
            timestamp_millis,
            fields,
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

/// Recovery failures. The block in question is discarded and the
/// pipeline continues; nothing here is fatal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryError {
    /// No embedded object anchor present in the input.
    NotFound,
    /// Brace depth never returned to zero before end of input.
    Unbalanced,
    /// The repaired span still failed to parse; carries the offending
    /// text for diagnostics.
    Parse(String),
}

impl fmt::Display for RecoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "embedded object not found"),
            Self::Unbalanced => write!(f, "unbalanced braces in embedded object"),
            Self::Parse(text) => write!(f, "repaired span failed to parse: {text}"),
        }
    }
}
