//! Port traits — the hexagonal boundary between relay logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ RelayService (domain)
//! ```
//!
//! Driven adapters (UART links, the LoRa modem, the MQTT client, GPIO)
//! implement these traits. The domain core consumes them via generics
//! and never touches hardware directly, which keeps every pipeline
//! component testable with mock adapters on the host.

use core::fmt;

use crate::app::events::RelayEvent;

// ───────────────────────────────────────────────────────────────
// Byte link port (UART to a peer node)
// ───────────────────────────────────────────────────────────────

/// Errors from [`LinkPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// The read side returned a driver-level error.
    ReadFailed,
    /// The write side returned a driver-level error or wrote short.
    WriteFailed,
    /// The port is not open.
    NotOpen,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ReadFailed => write!(f, "read failed"),
            Self::WriteFailed => write!(f, "write failed"),
            Self::NotOpen => write!(f, "link not open"),
        }
    }
}

/// Byte-oriented point-to-point link.
///
/// Reads are non-blocking: `read` returns 0 when no data is pending, so
/// a poller can service several links cooperatively without stalling.
pub trait LinkPort {
    /// Whether bytes are waiting to be read.
    fn available(&self) -> bool;

    /// Read up to `buf.len()` bytes; returns the number actually read
    /// (0 when nothing is pending).
    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;

    /// Write `data` in full.
    fn write(&mut self, data: &[u8]) -> Result<(), LinkError>;
}

// ───────────────────────────────────────────────────────────────
// Radio transport port (store-and-forward file delivery)
// ───────────────────────────────────────────────────────────────

/// Link-level failures of the radio transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportFault {
    /// A file send did not complete.
    SendFailed,
    /// Listening for an inbound file failed (distinct from a timeout,
    /// which is a normal `None`).
    ReceiveFailed,
    /// The connection handshake was refused or timed out.
    HandshakeFailed,
    /// The serial path to the modem is gone.
    LinkDown,
}

impl fmt::Display for TransportFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SendFailed => write!(f, "file send failed"),
            Self::ReceiveFailed => write!(f, "receive failed"),
            Self::HandshakeFailed => write!(f, "handshake failed"),
            Self::LinkDown => write!(f, "modem link down"),
        }
    }
}

/// The store-and-forward radio transport, consumed as a black box.
///
/// The transport guarantees message-boundary integrity for a delivered
/// file; node discovery, MAC addressing and retransmission live behind
/// this trait.
pub trait TransportPort {
    /// Perform the connection handshake with the modem.
    fn establish_connection(&mut self) -> Result<(), TransportFault>;

    /// Queue `content` for delivery as a named file.
    fn send_file(&mut self, name: &str, content: &[u8]) -> Result<(), TransportFault>;

    /// Listen for one inbound file; `Ok(None)` on timeout.
    fn receive_from_endpoint(
        &mut self,
        timeout_ms: u32,
    ) -> Result<Option<Vec<u8>>, TransportFault>;

    /// Hard-reset the modem (e.g. a GPIO pulse on its reset line).
    /// Part of the fault-recovery sequence; a follow-up
    /// [`establish_connection`](Self::establish_connection) is required.
    fn reset_link(&mut self) -> Result<(), TransportFault>;
}

/// A transport that accepts every send and never receives anything.
/// Useful as a default when no modem is attached.
pub struct NullTransport;

impl TransportPort for NullTransport {
    fn establish_connection(&mut self) -> Result<(), TransportFault> {
        Ok(())
    }

    fn send_file(&mut self, _name: &str, _content: &[u8]) -> Result<(), TransportFault> {
        Ok(())
    }

    fn receive_from_endpoint(
        &mut self,
        _timeout_ms: u32,
    ) -> Result<Option<Vec<u8>>, TransportFault> {
        Ok(None)
    }

    fn reset_link(&mut self) -> Result<(), TransportFault> {
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Publish port (message bus sink)
// ───────────────────────────────────────────────────────────────

/// Errors from [`PublishPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishError {
    /// Not connected to the broker.
    NotConnected,
    /// The broker rejected the message.
    Rejected,
}

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotConnected => write!(f, "not connected to broker"),
            Self::Rejected => write!(f, "message rejected by broker"),
        }
    }
}

/// Write-side port to the operational message bus.
///
/// Adapters register a retained `offline` last-will at connect time so
/// the bus observes device liveness without the relay's involvement.
pub trait PublishPort {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError>;
}

// ───────────────────────────────────────────────────────────────
// System port (local reset / GPIO actions)
// ───────────────────────────────────────────────────────────────

/// Local control actions a downlink command may trigger.
pub trait SystemPort {
    /// Reboot this controller. May not return on real hardware.
    fn reset_device(&mut self);

    /// Drive a GPIO output pin.
    fn set_gpio(&mut self, pin: u8, state: bool);
}

// ───────────────────────────────────────────────────────────────
// Time port
// ───────────────────────────────────────────────────────────────

/// Clock queries for timestamping records and queue entries.
pub trait TimePort {
    /// Milliseconds since the Unix epoch (wall clock), or since boot
    /// when no wall clock is synced — callers only rely on monotonicity.
    fn now_millis(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port
// ───────────────────────────────────────────────────────────────

/// The relay emits structured [`RelayEvent`]s through this port.
/// Adapters decide where they go (serial log, bus, test capture).
pub trait EventSink {
    fn emit(&mut self, event: &RelayEvent);
}
