//! Outbound relay events.
//!
//! The [`RelayService`](super::service::RelayService) and the dispatch
//! worker emit these through the [`EventSink`](super::ports::EventSink)
//! port. Adapters on the other side decide what to do with them — log
//! to serial, count, or capture in tests.

use crate::downlink::DownlinkCommand;
use crate::downlink::dispatch::DeliveryReport;
use crate::link::{LinkId, TagKind};

/// Structured events emitted by the relay core.
#[derive(Debug, Clone)]
pub enum RelayEvent {
    /// A complete block was reassembled and handed to the transport.
    BlockRelayed {
        source: LinkId,
        kind: TagKind,
        bytes: usize,
    },

    /// A downlink command was decoded and executed.
    DownlinkExecuted(DownlinkCommand),

    /// A downlink command decoded to `Unknown` and was ignored.
    DownlinkIgnored { opcode: u8, arg_count: usize },

    /// The dispatch worker finished (or gave up on) a queued command.
    Delivery(DeliveryReport),

    /// Relaying a block over the transport failed; the block is dropped.
    RelayFailed { source: LinkId, kind: TagKind },
}
