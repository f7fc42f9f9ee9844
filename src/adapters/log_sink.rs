//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured relay events to the
//! logger (UART / USB-CDC on firmware, stderr on the host). A future
//! bus-backed adapter would implement the same trait.

use log::{info, warn};

use crate::app::events::RelayEvent;
use crate::app::ports::EventSink;
use crate::downlink::dispatch::DeliveryOutcome;

/// Adapter that logs every [`RelayEvent`] to the serial console.
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &RelayEvent) {
        match event {
            RelayEvent::BlockRelayed {
                source,
                kind,
                bytes,
            } => {
                info!("RELAY | {source} {kind:?} {bytes}B");
            }
            RelayEvent::RelayFailed { source, kind } => {
                warn!("RELAY | {source} {kind:?} dropped (transport fault)");
            }
            RelayEvent::DownlinkExecuted(cmd) => {
                info!("DOWNLINK | executed {cmd:?}");
            }
            RelayEvent::DownlinkIgnored { opcode, arg_count } => {
                warn!("DOWNLINK | ignored opcode {opcode:#04x} ({arg_count} args)");
            }
            RelayEvent::Delivery(report) => match report.outcome {
                DeliveryOutcome::Delivered => {
                    info!("DISPATCH | {} delivered", report.ticket);
                }
                DeliveryOutcome::DeliveredAfterReset => {
                    info!("DISPATCH | {} delivered after modem reset", report.ticket);
                }
                DeliveryOutcome::Failed(fault) => {
                    warn!("DISPATCH | {} failed: {fault}", report.ticket);
                }
            },
        }
    }
}
