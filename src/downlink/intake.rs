//! Inbound command intake: request parsing, allowlist validation and
//! the last-accepted-command status snapshot.
//!
//! The HTTP adapter hands raw JSON bodies here; everything that can be
//! checked without touching the transport is checked here, so the
//! dispatch queue only ever sees well-formed, allowlisted commands.
//! Acceptance is acknowledged immediately with the queue ticket —
//! delivery happens later, asynchronously.

use core::fmt;
use std::sync::Mutex;

use serde::Deserialize;

use super::codec::DownlinkCommand;
use super::dispatch::Ticket;

/// Command names an external caller may request. Everything else is
/// rejected before it gets near the queue.
pub const ALLOWED_COMMANDS: [&str; 4] =
    ["reset", "set_gpio", "force_metrics_a", "force_metrics_b"];

// ───────────────────────────────────────────────────────────────
// Request parsing
// ───────────────────────────────────────────────────────────────

/// Rejection reasons for an inbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// The body is not valid JSON or misses required keys.
    Malformed,
    /// `deviceId` is empty.
    MissingDevice,
    /// `cmd` is not in [`ALLOWED_COMMANDS`].
    UnknownCommand,
    /// `set_gpio` without a `pin` field.
    MissingPin,
    /// `pin` does not fit in a byte.
    PinOutOfRange,
    /// `set_gpio` without a `state` field.
    MissingState,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed request body"),
            Self::MissingDevice => write!(f, "deviceId must not be empty"),
            Self::UnknownCommand => write!(f, "cmd not in allowlist"),
            Self::MissingPin => write!(f, "set_gpio requires a pin"),
            Self::PinOutOfRange => write!(f, "pin must be 0..=255"),
            Self::MissingState => write!(f, "set_gpio requires a state"),
        }
    }
}

/// `state` arrives as either a JSON boolean or a 0/1 integer,
/// depending on the caller; both mean the same thing.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
enum StateArg {
    Flag(bool),
    Level(u8),
}

impl StateArg {
    fn truthy(self) -> bool {
        match self {
            Self::Flag(b) => b,
            Self::Level(n) => n != 0,
        }
    }
}

/// A parsed (not yet validated) command request.
#[derive(Debug, Clone, Deserialize)]
pub struct CommandRequest {
    #[serde(rename = "deviceId")]
    pub device_id: String,
    pub cmd: String,
    #[serde(default)]
    pin: Option<u16>,
    #[serde(default)]
    state: Option<StateArg>,
}

impl CommandRequest {
    pub fn parse(body: &str) -> Result<Self, ValidationError> {
        serde_json::from_str(body).map_err(|_| ValidationError::Malformed)
    }

    /// Validate against the allowlist and build the wire command.
    pub fn to_command(&self) -> Result<DownlinkCommand, ValidationError> {
        if self.device_id.trim().is_empty() {
            return Err(ValidationError::MissingDevice);
        }
        match self.cmd.as_str() {
            "reset" => Ok(DownlinkCommand::Reset),
            "set_gpio" => {
                let pin = self.pin.ok_or(ValidationError::MissingPin)?;
                let pin = u8::try_from(pin).map_err(|_| ValidationError::PinOutOfRange)?;
                let state = self.state.ok_or(ValidationError::MissingState)?.truthy();
                Ok(DownlinkCommand::SetGpio { pin, state })
            }
            "force_metrics_a" => Ok(DownlinkCommand::ForceMetricsA),
            "force_metrics_b" => Ok(DownlinkCommand::ForceMetricsB),
            _ => Err(ValidationError::UnknownCommand),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Last-accepted status
// ───────────────────────────────────────────────────────────────

/// Snapshot of the most recently accepted command, surfaced by the
/// status endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LastAccepted {
    pub device_id: String,
    pub cmd: String,
    pub ticket: Ticket,
    pub accepted_at_ms: u64,
}

/// Shared status cell. HTTP handlers run on their own threads, so the
/// cell is a plain mutex; contention is a handful of requests a minute.
pub struct IntakeStatus {
    last: Mutex<Option<LastAccepted>>,
}

impl IntakeStatus {
    pub const fn new() -> Self {
        Self {
            last: Mutex::new(None),
        }
    }

    pub fn record(&self, request: &CommandRequest, ticket: Ticket, now_ms: u64) {
        let entry = LastAccepted {
            device_id: request.device_id.clone(),
            cmd: request.cmd.clone(),
            ticket,
            accepted_at_ms: now_ms,
        };
        if let Ok(mut guard) = self.last.lock() {
            *guard = Some(entry);
        }
    }

    pub fn snapshot(&self) -> Option<LastAccepted> {
        self.last.lock().ok().and_then(|guard| guard.clone())
    }

    /// JSON body for the status endpoint.
    pub fn to_json(&self) -> String {
        match self.snapshot() {
            Some(last) => serde_json::json!({
                "lastCommand": {
                    "deviceId": last.device_id,
                    "cmd": last.cmd,
                    "ticket": last.ticket.0,
                    "acceptedAtMs": last.accepted_at_ms,
                }
            })
            .to_string(),
            None => serde_json::json!({ "lastCommand": null }).to_string(),
        }
    }
}

impl Default for IntakeStatus {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ────────────────────────────────────────────────────
