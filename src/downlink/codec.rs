//! Fixed-layout binary downlink command codec.
//!
//! Wire format:
//! ```text
//! ┌────────────┬──────────────────────────┐
//! │ Opcode (1B)│ Positional args (0–2 B)  │
//! └────────────┴──────────────────────────┘
//! ```
//!
//! | Opcode | Command        | Args              |
//! |--------|----------------|-------------------|
//! | `0x01` | Reset          | none              |
//! | `0x02` | SetGpio        | pin byte, state byte (truthy = non-zero) |
//! | `0x03` | ForceMetricsA  | none              |
//! | `0x04` | ForceMetricsB  | none              |
//!
//! Decoding never fails: an unrecognised opcode, or a recognised opcode
//! with insufficient trailing bytes, yields [`DownlinkCommand::Unknown`]
//! carrying the raw opcode and whatever args were present. The relay
//! logs and ignores those.

use heapless::Vec;

/// Opcode byte for [`DownlinkCommand::Reset`].
pub const OP_RESET: u8 = 0x01;
/// Opcode byte for [`DownlinkCommand::SetGpio`].
pub const OP_SET_GPIO: u8 = 0x02;
/// Opcode byte for [`DownlinkCommand::ForceMetricsA`].
pub const OP_FORCE_METRICS_A: u8 = 0x03;
/// Opcode byte for [`DownlinkCommand::ForceMetricsB`].
pub const OP_FORCE_METRICS_B: u8 = 0x04;

/// Maximum argument bytes carried by an [`DownlinkCommand::Unknown`].
pub const MAX_ARGS: usize = 8;

/// A decoded downlink command. Immutable value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownlinkCommand {
    /// Reboot the controller node.
    Reset,
    /// Drive a GPIO pin on the controller.
    SetGpio { pin: u8, state: bool },
    /// Force an immediate metrics report from the compute node.
    ForceMetricsA,
    /// Force an immediate metrics report from the sensor node.
    ForceMetricsB,
    /// Unrecognised or malformed command — logged and ignored.
    Unknown { opcode: u8, args: Vec<u8, MAX_ARGS> },
}

impl DownlinkCommand {
    /// Serialise to the wire layout.
    ///
    /// `Unknown` re-emits its raw opcode and args, so decode ∘ encode is
    /// the identity for everything the decoder can produce.
    pub fn encode(&self) -> Vec<u8, { MAX_ARGS + 1 }> {
        let mut out = Vec::new();
        match self {
            Self::Reset => {
                let _ = out.push(OP_RESET);
            }
            Self::SetGpio { pin, state } => {
                let _ = out.push(OP_SET_GPIO);
                let _ = out.push(*pin);
                let _ = out.push(u8::from(*state));
            }
            Self::ForceMetricsA => {
                let _ = out.push(OP_FORCE_METRICS_A);
            }
            Self::ForceMetricsB => {
                let _ = out.push(OP_FORCE_METRICS_B);
            }
            Self::Unknown { opcode, args } => {
                let _ = out.push(*opcode);
                let _ = out.extend_from_slice(args);
            }
        }
        out
    }

    /// Deserialise from the wire layout. Total — never panics or errors.
    ///
    /// Empty input decodes to `Unknown { opcode: 0, args: [] }`.
    pub fn decode(bytes: &[u8]) -> Self {
        let Some((&opcode, args)) = bytes.split_first() else {
            return Self::Unknown {
                opcode: 0,
                args: Vec::new(),
            };
        };

        match (opcode, args) {
            (OP_RESET, _) => Self::Reset,
            (OP_SET_GPIO, [pin, state, ..]) => Self::SetGpio {
                pin: *pin,
                // Truthy test is "any non-zero", matching the wire contract.
                state: *state != 0,
            },
            (OP_FORCE_METRICS_A, _) => Self::ForceMetricsA,
            (OP_FORCE_METRICS_B, _) => Self::ForceMetricsB,
            _ => {
                let mut kept = Vec::new();
                for &b in args.iter().take(MAX_ARGS) {
                    let _ = kept.push(b);
                }
                Self::Unknown { opcode, args: kept }
            }
        }
    }
}

// ── Tests ────────────────────────────────────────────────────
