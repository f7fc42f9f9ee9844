//! Unified error types for the fieldlink relay.
//!
//! Every subsystem error converts into the top-level [`Error`], keeping
//! error handling in the wiring layer uniform. Parsing and transport
//! errors are contained at their component boundary and become a result
//! or a log entry; only failure to open a physical link at startup is
//! fatal.

use core::fmt;

use crate::app::ports::{LinkError, PublishError, TransportFault};
use crate::downlink::dispatch::DispatchError;
use crate::downlink::intake::ValidationError;
use crate::recovery::RecoveryError;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Every fallible operation in the relay funnels into this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Link-level send/receive failure on the radio transport.
    Transport(TransportFault),
    /// A UART link could not be read or written.
    Link(LinkError),
    /// Recovery parsing failed on a received file.
    Recovery(RecoveryError),
    /// The dispatch queue rejected or failed a command.
    Dispatch(DispatchError),
    /// An inbound command request failed validation.
    Validation(ValidationError),
    /// Publishing to the message bus failed.
    Publish(PublishError),
    /// An expected input file is missing or unreadable.
    ResourceUnavailable(&'static str),
    /// Peripheral or service initialisation failed.
    Init(&'static str),
    /// Configuration is invalid.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Recovery(e) => write!(f, "recovery: {e}"),
            Self::Dispatch(e) => write!(f, "dispatch: {e}"),
            Self::Validation(e) => write!(f, "validation: {e}"),
            Self::Publish(e) => write!(f, "publish: {e}"),
            Self::ResourceUnavailable(what) => write!(f, "resource unavailable: {what}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<TransportFault> for Error {
    fn from(e: TransportFault) -> Self {
        Self::Transport(e)
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

impl From<RecoveryError> for Error {
    fn from(e: RecoveryError) -> Self {
        Self::Recovery(e)
    }
}

impl From<DispatchError> for Error {
    fn from(e: DispatchError) -> Self {
        Self::Dispatch(e)
    }
}

impl From<ValidationError> for Error {
    fn from(e: ValidationError) -> Self {
        Self::Validation(e)
    }
}

impl From<PublishError> for Error {
    fn from(e: PublishError) -> Self {
        Self::Publish(e)
    }
}

/// Relay-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
