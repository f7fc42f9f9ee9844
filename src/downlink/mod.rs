//! Downlink path — commands travelling from the backhaul gateway toward
//! the controller.
//!
//! ```text
//! HTTP request ──▶ intake (validate) ──▶ dispatch queue ──▶ codec ──▶ transport
//!                                                                        │
//! controller ◀── codec.decode ◀── receive_from_endpoint ◀────────────────┘
//! ```
//!
//! The codec is intentionally minimal (no CRC, no length prefix): the
//! store-and-forward transport already guarantees message-boundary
//! integrity for a delivered file.

pub mod codec;
pub mod dispatch;
pub mod intake;

pub use codec::DownlinkCommand;
pub use dispatch::{DeliveryOutcome, DeliveryReport, DispatchError, DispatchQueue, Ticket};
