//! Embedded-object recovery for sensor-node metrics.
//!
//! The sensor node reports one JSON-ish object, but the values carry
//! unit suffixes straight from its display formatter (`"CPU":50%`,
//! `"Batt":3.91V`), and the object arrives wrapped in transport framing
//! noise. Recovery runs in four stages:
//!
//! 1. locate the object by its `{"CPU"` anchor;
//! 2. isolate it by brace-depth matching;
//! 3. quote every unit-bearing value so the span parses as JSON;
//! 4. flatten through a static field map, coercing each value's
//!    numeric prefix back into a number.
//!
//! Keys outside the field map are dropped, so firmware-side additions
//! never leak unvetted names into the publish payload.

use std::sync::OnceLock;

use regex::Regex;

use super::{FieldMap, FieldValue, RecoveryError};

/// Anchor locating the start of the embedded object. `CPU` is the first
/// key the sensor firmware emits, always.
pub const OBJECT_ANCHOR: &str = "{\"CPU\"";

/// Canonical field map: reported key → published field name.
const FIELD_MAP: &[(&str, &str)] = &[
    ("CPU", "cpu"),
    ("Mem", "mem"),
    ("Temp", "temp"),
    ("Uptime", "uptime"),
    ("Batt", "batt"),
    ("WiFiRSSI", "wifi_rssi"),
    ("PingRTT", "ping_rtt"),
    ("Joined", "joined"),
    ("Online", "online"),
    ("LoRaRSSI", "lora_rssi"),
    ("LoRaSNR", "lora_snr"),
    ("DataRate", "datarate"),
    ("FPort", "fport"),
];

fn unit_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // A number immediately after `"key":` followed by non-numeric,
    // non-delimiter trailing text is a unit-suffixed value.
    RE.get_or_init(|| {
        Regex::new(r#"("[A-Za-z0-9_]+":\s*)(-?\d+(?:\.\d+)?[^\d,}\]"]+)"#)
            .expect("unit pattern is valid")
    })
}

fn numeric_prefix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^-?\d+(\.\d+)?").expect("prefix pattern is valid"))
}

/// Locate and isolate the embedded object span.
///
/// Scans from the anchor tracking brace depth; the span ends where
/// depth returns to zero. Surrounding noise before the anchor and after
/// the close brace is discarded.
pub fn isolate(text: &str) -> Result<&str, RecoveryError> {
    let start = text.find(OBJECT_ANCHOR).ok_or(RecoveryError::NotFound)?;
    let mut depth = 0usize;
    for (offset, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Ok(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    Err(RecoveryError::Unbalanced)
}

/// Quote unit-bearing values so the span becomes valid JSON.
/// Clean numbers and already-quoted strings pass through untouched.
pub fn repair_units(span: &str) -> String {
    unit_pattern()
        .replace_all(span, |caps: &regex::Captures<'_>| {
            format!("{}\"{}\"", &caps[1], &caps[2])
        })
        .into_owned()
}

/// Flatten a parsed object through the field map.
///
/// String values keep only their numeric prefix when one exists
/// (`"41C"` becomes 41); strings without one stay text. Unmapped keys
/// are skipped.
pub fn flatten(obj: &serde_json::Map<String, serde_json::Value>) -> FieldMap {
    let mut fields = FieldMap::new();
    for (key, value) in obj {
        let Some(&(_, field)) = FIELD_MAP.iter().find(|(reported, _)| reported == key) else {
            continue;
        };
        fields.insert(field.to_owned(), coerce(value));
    }
    fields
}

fn coerce(value: &serde_json::Value) -> FieldValue {
    match value {
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                FieldValue::Int(i)
            } else {
                FieldValue::Float(n.as_f64().unwrap_or(0.0))
            }
        }
        serde_json::Value::String(s) => match numeric_prefix().find(s) {
            Some(m) => parse_number(m.as_str()),
            None => FieldValue::Text(s.clone()),
        },
        serde_json::Value::Bool(b) => FieldValue::Text(b.to_string()),
        other => FieldValue::Text(other.to_string()),
    }
}

fn parse_number(text: &str) -> FieldValue {
    if text.contains('.') {
        FieldValue::Float(text.parse().unwrap_or(0.0))
    } else {
        FieldValue::Int(text.parse().unwrap_or(0))
    }
}

/// Full pipeline: raw file content → published field map.
pub fn recover(raw: &str) -> Result<FieldMap, RecoveryError> {
    let span = isolate(raw)?;
    let cleaned = repair_units(span);
    let parsed: serde_json::Value = serde_json::from_str(&cleaned)
        .map_err(|_| RecoveryError::Parse(cleaned.clone()))?;
    let obj = parsed
        .as_object()
        .ok_or_else(|| RecoveryError::Parse(cleaned.clone()))?;
    Ok(flatten(obj))
}

// ── Tests ────────────────────────────────────────────────────
