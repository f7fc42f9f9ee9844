//! Point-to-point byte links and the wire vocabulary spoken on them.
//!
//! Two physical links terminate on the controller:
//!
//! | Link      | Peer                | Framing                          |
//! |-----------|---------------------|----------------------------------|
//! | `Compute` | Raspberry Pi        | `<RPI_METRICS>` / `<CMD_RESPONSE>` tag pairs |
//! | `Sensor`  | LilyGo IoT node     | newline-delimited lines          |
//!
//! The link protocol is plain UTF-8 text. Outbound control messages use
//! the literal `[CMD]<text>\n` prefix on the compute link and bare ASCII
//! tokens (`GET_METRICS\n`, `RESET\n`, `SET_GPIO <pin> <0|1>\n`) on the
//! sensor link.

pub mod framing;

pub use framing::FrameReassembler;

use core::fmt;

// ── Wire constants ────────────────────────────────────────────

/// Opening tag of a metrics envelope on the compute link.
pub const METRICS_OPEN: &str = "<RPI_METRICS>";
/// Closing tag of a metrics envelope on the compute link.
pub const METRICS_CLOSE: &str = "</RPI_METRICS>";
/// Opening tag of a command-response envelope on the compute link.
pub const CMD_RESPONSE_OPEN: &str = "<CMD_RESPONSE>";
/// Closing tag of a command-response envelope on the compute link.
pub const CMD_RESPONSE_CLOSE: &str = "</CMD_RESPONSE>";

/// Prefix for outbound commands on the compute link.
pub const CMD_PREFIX: &str = "[CMD]";

/// Sensor-link control token: request an immediate metrics line.
pub const TOKEN_GET_METRICS: &str = "GET_METRICS\n";
/// Sensor-link control token: reboot the sensor node.
pub const TOKEN_RESET: &str = "RESET\n";

// ── Identifiers ───────────────────────────────────────────────

/// Which physical link a chunk of bytes arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkId {
    /// UART to the compute node (Raspberry Pi).
    Compute,
    /// UART to the sensor node (LilyGo).
    Sensor,
}

impl fmt::Display for LinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compute => write!(f, "compute"),
            Self::Sensor => write!(f, "sensor"),
        }
    }
}

/// Classification of a complete reassembled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagKind {
    /// `<RPI_METRICS>` envelope.
    Metrics,
    /// `<CMD_RESPONSE>` envelope.
    CommandResponse,
    /// One newline-terminated line from a line-oriented link.
    Line,
}

/// One complete application message extracted from a link byte stream.
///
/// Constructed by [`FrameReassembler`] the instant both delimiters are
/// present in the accumulator; consumed immediately by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedBlock {
    pub source: LinkId,
    pub kind: TagKind,
    /// Message text with the tag markers stripped.
    pub body: String,
}

/// Build the on-wire envelope for a tagged message.
///
/// The counterpart of what the compute node's metrics formatter emits;
/// used when relaying locally-generated responses and in tests.
pub fn wrap_tagged(kind: TagKind, body: &str) -> String {
    match kind {
        TagKind::Metrics => format!("{METRICS_OPEN}\n{body}\n{METRICS_CLOSE}"),
        TagKind::CommandResponse => {
            format!("{CMD_RESPONSE_OPEN}\n{body}\n{CMD_RESPONSE_CLOSE}")
        }
        TagKind::Line => format!("{body}\n"),
    }
}

/// Sensor-link control token for driving a GPIO on the sensor node.
pub fn set_gpio_token(pin: u8, state: bool) -> String {
    format!("SET_GPIO {} {}\n", pin, u8::from(state))
}
