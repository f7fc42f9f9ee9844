//! Relay service — the hexagonal core.
//!
//! [`RelayService`] owns the per-link reassemblers and orchestrates the
//! two data paths of the controller role:
//!
//! ```text
//!  LinkPort (×2) ──▶ ┌───────────────────────┐ ──▶ TransportPort
//!                    │      RelayService      │
//!  TransportPort ──▶ │ reassemble · classify  │ ──▶ SystemPort / LinkPort
//!    (downlink)      └───────────────────────┘ ──▶ EventSink
//! ```
//!
//! All I/O flows through port traits injected at call sites, so the
//! whole service runs against mock adapters on the host.

use log::{info, warn};

use crate::downlink::DownlinkCommand;
use crate::link::{
    CMD_PREFIX, FrameReassembler, LinkId, TOKEN_GET_METRICS, TagKind, TaggedBlock,
};

use super::events::RelayEvent;
use super::ports::{EventSink, LinkError, LinkPort, SystemPort, TransportFault, TransportPort};

/// Per-read chunk size when draining a link.
const READ_CHUNK: usize = 256;

// ───────────────────────────────────────────────────────────────
// RelayService
// ───────────────────────────────────────────────────────────────

/// The relay core for the controller role.
pub struct RelayService {
    compute_rx: FrameReassembler,
    sensor_rx: FrameReassembler,
}

impl RelayService {
    pub fn new() -> Self {
        Self {
            compute_rx: FrameReassembler::tagged(LinkId::Compute),
            sensor_rx: FrameReassembler::lines(LinkId::Sensor),
        }
    }

    // ── Uplink path: link bytes → transport files ─────────────

    /// Drain pending bytes from `link`, reassemble complete blocks and
    /// relay each over the transport. One call services one link; the
    /// caller polls both links cooperatively.
    ///
    /// A transport fault drops the affected block (reported through the
    /// sink) but never poisons the reassembler state — partial frames
    /// survive for the next call.
    pub fn pump_link(
        &mut self,
        id: LinkId,
        link: &mut impl LinkPort,
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
    ) -> Result<(), LinkError> {
        let mut chunk = [0u8; READ_CHUNK];
        while link.available() {
            let n = link.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            let blocks = self.reassembler(id).feed(&chunk[..n]);
            for block in blocks {
                self.relay_block(&block, transport, sink);
            }
        }
        Ok(())
    }

    fn reassembler(&mut self, id: LinkId) -> &mut FrameReassembler {
        match id {
            LinkId::Compute => &mut self.compute_rx,
            LinkId::Sensor => &mut self.sensor_rx,
        }
    }

    /// Hand one complete block to the transport under its well-known
    /// file name. Sensor lines are wrapped in a minimal object so every
    /// delivered file carries the same outer shape; the wrap is textual
    /// on purpose — the recovery parser on the far side anchors on the
    /// raw inner object.
    fn relay_block(
        &mut self,
        block: &TaggedBlock,
        transport: &mut impl TransportPort,
        sink: &mut impl EventSink,
    ) {
        let name = upload_name(block.source, block.kind);
        let content = match block.kind {
            TagKind::Line => format!("{{\"metrics\":\"{}\"}}", block.body),
            TagKind::Metrics | TagKind::CommandResponse => block.body.clone(),
        };

        match transport.send_file(name, content.as_bytes()) {
            Ok(()) => {
                info!("relayed {name} ({} bytes) from {}", content.len(), block.source);
                sink.emit(&RelayEvent::BlockRelayed {
                    source: block.source,
                    kind: block.kind,
                    bytes: content.len(),
                });
            }
            Err(fault) => {
                warn!("relay of {name} failed: {fault}");
                sink.emit(&RelayEvent::RelayFailed {
                    source: block.source,
                    kind: block.kind,
                });
            }
        }
    }

    // ── Downlink path: transport files → local actions ────────

    /// One downlink listen cycle: wait up to `timeout_ms` for an
    /// inbound command file, decode and execute it. A timeout is the
    /// common case and returns `Ok(())` quietly.
    pub fn poll_downlink(
        &mut self,
        transport: &mut impl TransportPort,
        compute: &mut impl LinkPort,
        sensor: &mut impl LinkPort,
        system: &mut impl SystemPort,
        sink: &mut impl EventSink,
        timeout_ms: u32,
    ) -> Result<(), TransportFault> {
        let Some(data) = transport.receive_from_endpoint(timeout_ms)? else {
            return Ok(());
        };
        let command = DownlinkCommand::decode(&data);
        self.execute(command, compute, sensor, system, sink);
        Ok(())
    }

    /// Execute one decoded downlink command against the local ports.
    pub fn execute(
        &mut self,
        command: DownlinkCommand,
        compute: &mut impl LinkPort,
        sensor: &mut impl LinkPort,
        system: &mut impl SystemPort,
        sink: &mut impl EventSink,
    ) {
        match &command {
            DownlinkCommand::Reset => {
                info!("downlink: reset");
                sink.emit(&RelayEvent::DownlinkExecuted(command));
                // May not return on real hardware.
                system.reset_device();
                return;
            }
            DownlinkCommand::SetGpio { pin, state } => {
                info!("downlink: set_gpio {pin} = {state}");
                system.set_gpio(*pin, *state);
            }
            DownlinkCommand::ForceMetricsA => {
                info!("downlink: force compute metrics");
                let msg = format!("{CMD_PREFIX}{TOKEN_GET_METRICS}");
                if let Err(err) = compute.write(msg.as_bytes()) {
                    warn!("force compute metrics failed: {err}");
                }
            }
            DownlinkCommand::ForceMetricsB => {
                info!("downlink: force sensor metrics");
                if let Err(err) = sensor.write(TOKEN_GET_METRICS.as_bytes()) {
                    warn!("force sensor metrics failed: {err}");
                }
            }
            DownlinkCommand::Unknown { opcode, args } => {
                warn!("downlink: unknown opcode {opcode:#04x} ({} args)", args.len());
                sink.emit(&RelayEvent::DownlinkIgnored {
                    opcode: *opcode,
                    arg_count: args.len(),
                });
                return;
            }
        }
        sink.emit(&RelayEvent::DownlinkExecuted(command));
    }
}

impl Default for RelayService {
    fn default() -> Self {
        Self::new()
    }
}

/// Well-known delivery file name per (source, kind).
fn upload_name(source: LinkId, kind: TagKind) -> &'static str {
    match (source, kind) {
        (LinkId::Compute, TagKind::CommandResponse) => "response_compute.json",
        (LinkId::Compute, _) => "metrics_compute.json",
        (LinkId::Sensor, _) => "metrics_sensor.json",
    }
}

// ── Tests ────────────────────────────────────────────────────
