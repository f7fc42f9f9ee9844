//! Line-oriented recovery for compute-node metrics.
//!
//! The compute node reports raw shell-tool output (`top`, `free`,
//! `vcgencmd`, `df`, …) concatenated into one text block. A fixed,
//! ordered pattern table maps each known line shape to one or more
//! named fields; the first matching pattern wins per line and the rest
//! are skipped. Unrecognised lines are ignored, so tool output drift
//! degrades coverage instead of breaking the parse.
//!
//! Captured values are coerced: `0x` prefix → integer from hex, plain
//! digits → integer, digits with a dot → float, anything else kept as
//! text. A second, independent pass extracts literal-prefix text fields
//! (kernel version, addresses, link state).

use std::sync::OnceLock;

use regex::Regex;

use super::{FieldMap, FieldValue};

/// The ordered line-pattern table: regex source → field names, one per
/// capture group. Order matters; the first hit per line wins.
const PATTERN_TABLE: &[(&str, &[&str])] = &[
    (r"Cpu\(s\):\s*([\d.]+) us,\s*([\d.]+) sy", &["cpu_user", "cpu_sys"]),
    (
        r"load average:\s*([\d.]+),\s*([\d.]+),\s*([\d.]+)",
        &["load1", "load5", "load15"],
    ),
    (r"CPU Current Freq:\s*(\d+)", &["cpu_freq_cur"]),
    (r"CPU Min Freq:\s*(\d+)", &["cpu_freq_min"]),
    (r"CPU Max Freq:\s*(\d+)", &["cpu_freq_max"]),
    (r"temp=([\d.]+)'C", &["cpu_temp"]),
    (
        r"Mem:\s+(\d+)\s+(\d+)\s+(\d+)",
        &["ram_total", "ram_used", "ram_free"],
    ),
    (r"Swap:\s+(\d+)\s+(\d+)", &["swap_total", "swap_used"]),
    (r"/dev/root.*\s+(\d+)%", &["disk_used_pct"]),
    (r"Network RX Bytes:\s*(\d+)", &["net_rx"]),
    (r"Network TX Bytes:\s*(\d+)", &["net_tx"]),
    (r"gpu=(\d+)", &["gpu_mem"]),
    (r"volt=([\d.]+)V", &["voltage"]),
    (r"throttled=(0x[0-9A-Fa-f]+)", &["throttled"]),
    (
        r"Uptime:\s*up\s*(\d+)\s*hours?,\s*(\d+)\s*minutes?",
        &["uptime_h", "uptime_m"],
    ),
];

/// Literal prefixes whose remainder (after the first `:`) is kept
/// verbatim as a text field.
const TEXT_PREFIXES: &[(&str, &str)] = &[
    ("Kernel:", "kernel"),
    ("IP Address:", "ip_address"),
    ("MAC Address:", "mac_address"),
    ("Interface:", "interface"),
    ("Link State:", "link_state"),
    ("Ping", "ping"),
];

fn compiled_table() -> &'static Vec<(Regex, &'static [&'static str])> {
    static TABLE: OnceLock<Vec<(Regex, &'static [&'static str])>> = OnceLock::new();
    TABLE.get_or_init(|| {
        PATTERN_TABLE
            .iter()
            .map(|&(source, fields)| {
                (Regex::new(source).expect("pattern table entry is valid"), fields)
            })
            .collect()
    })
}

/// Parse a full metrics block into a field map.
pub fn parse(block: &str) -> FieldMap {
    let mut fields = FieldMap::new();
    for line in block.lines() {
        parse_patterns(line, &mut fields);
        parse_text_fields(line, &mut fields);
    }
    fields
}

fn parse_patterns(line: &str, fields: &mut FieldMap) {
    for (pattern, names) in compiled_table() {
        let Some(caps) = pattern.captures(line) else {
            continue;
        };
        for (name, group) in names.iter().zip(caps.iter().skip(1)) {
            if let Some(value) = group {
                fields.insert((*name).to_owned(), coerce(value.as_str()));
            }
        }
        // First matching pattern wins for this line.
        break;
    }
}

fn parse_text_fields(line: &str, fields: &mut FieldMap) {
    for &(prefix, name) in TEXT_PREFIXES {
        if !line.starts_with(prefix) {
            continue;
        }
        if let Some((_, rest)) = line.split_once(':') {
            fields.insert(name.to_owned(), FieldValue::Text(rest.trim().to_owned()));
        }
    }
}

/// Hex ints, decimal ints, floats, then text, in that order.
fn coerce(value: &str) -> FieldValue {
    let trimmed = value.trim();
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        if let Ok(n) = i64::from_str_radix(hex, 16) {
            return FieldValue::Int(n);
        }
    }
    if trimmed.contains('.') {
        if let Ok(f) = trimmed.parse::<f64>() {
            return FieldValue::Float(f);
        }
    } else if let Ok(n) = trimmed.parse::<i64>() {
        return FieldValue::Int(n);
    }
    FieldValue::Text(trimmed.to_owned())
}

// ── Tests ────────────────────────────────────────────────────
