//! Bounded command dispatch queue with a retry-once fault policy.
//!
//! Commands destined for remote nodes are enqueued by the intake layer
//! and drained by a single worker, so at most one transport operation is
//! ever in flight. The queue is strict FIFO and rejects new entries when
//! full — callers get an immediate [`DispatchError::QueueFull`] instead
//! of unbounded buffering.
//!
//! On a transport fault the worker runs one recovery cycle: brief wait,
//! [`reset_link`](crate::app::ports::TransportPort::reset_link), one
//! handshake, one resend of the *same* item. Whatever happens, the item's
//! fate comes back as a [`DeliveryReport`] on the report channel; nothing
//! is silently dropped.

use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;

use crate::app::ports::{TransportFault, TransportPort};

/// Queue depth. Matches the burst a human operator can plausibly
/// produce before the worker drains; anything deeper just delays
/// the rejection signal.
pub const QUEUE_DEPTH: usize = 8;

/// Maximum encoded command payload carried per entry.
pub const MAX_PAYLOAD: usize = 64;

// ───────────────────────────────────────────────────────────────
// Queue entry types
// ───────────────────────────────────────────────────────────────

/// Opaque handle identifying one enqueued command. Monotonic per
/// process; callers correlate it with the eventual [`DeliveryReport`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket(pub u32);

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One command waiting for (or undergoing) delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedCommand {
    /// Identifier of the destination node.
    pub target_id: String,
    /// Encoded command bytes, sent verbatim as the file content.
    pub payload: heapless::Vec<u8, MAX_PAYLOAD>,
    /// Enqueue timestamp, for queue-latency diagnostics.
    pub enqueued_at_ms: u64,
    pub ticket: Ticket,
}

/// Why an enqueue or delivery attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchError {
    /// The queue is at capacity; the command was rejected, not queued.
    QueueFull,
    /// The payload exceeds [`MAX_PAYLOAD`] bytes.
    PayloadTooLarge,
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QueueFull => write!(f, "dispatch queue full"),
            Self::PayloadTooLarge => write!(f, "payload exceeds {MAX_PAYLOAD} bytes"),
        }
    }
}

/// Terminal state of one queued command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Sent on the first attempt.
    Delivered,
    /// First attempt faulted; the reset/handshake/resend cycle succeeded.
    DeliveredAfterReset,
    /// Both the first attempt and the single retry failed.
    Failed(TransportFault),
}

/// Outcome notification for one [`Ticket`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryReport {
    pub ticket: Ticket,
    pub outcome: DeliveryOutcome,
}

// ───────────────────────────────────────────────────────────────
// The queue
// ───────────────────────────────────────────────────────────────

/// Bounded FIFO command queue plus its report back-channel.
///
/// Designed to live in a `static`: `new` is `const`, all interior state
/// sits behind `embassy-sync` channels and an atomic ticket counter.
pub struct DispatchQueue {
    commands: Channel<CriticalSectionRawMutex, QueuedCommand, QUEUE_DEPTH>,
    reports: Channel<CriticalSectionRawMutex, DeliveryReport, QUEUE_DEPTH>,
    next_ticket: AtomicU32,
}

impl DispatchQueue {
    pub const fn new() -> Self {
        Self {
            commands: Channel::new(),
            reports: Channel::new(),
            next_ticket: AtomicU32::new(1),
        }
    }

    /// Queue `payload` for delivery to `target_id`.
    ///
    /// Returns the ticket to watch for on the report channel, or
    /// [`DispatchError::QueueFull`] when the queue is at capacity —
    /// the reject-new policy keeps already-accepted work untouched.
    pub fn enqueue(
        &self,
        target_id: &str,
        payload: &[u8],
        now_ms: u64,
    ) -> Result<Ticket, DispatchError> {
        let mut stored = heapless::Vec::new();
        stored
            .extend_from_slice(payload)
            .map_err(|()| DispatchError::PayloadTooLarge)?;

        let ticket = Ticket(self.next_ticket.fetch_add(1, Ordering::Relaxed));
        let entry = QueuedCommand {
            target_id: target_id.to_owned(),
            payload: stored,
            enqueued_at_ms: now_ms,
            ticket,
        };
        self.commands
            .try_send(entry)
            .map_err(|_| DispatchError::QueueFull)?;
        Ok(ticket)
    }

    /// Worker side: wait for the next command.
    pub async fn next_command(&self) -> QueuedCommand {
        self.commands.receive().await
    }

    /// Worker side: non-blocking poll for the next command.
    pub fn try_next_command(&self) -> Option<QueuedCommand> {
        self.commands.try_receive().ok()
    }

    /// Publish a delivery report. If the caller side has stopped
    /// draining, the oldest unread report is discarded to make room —
    /// reports inform, they must never wedge the worker.
    pub fn report(&self, report: DeliveryReport) {
        if self.reports.try_send(report).is_err() {
            let _ = self.reports.try_receive();
            let _ = self.reports.try_send(report);
        }
    }

    /// Caller side: non-blocking poll for a report.
    pub fn try_next_report(&self) -> Option<DeliveryReport> {
        self.reports.try_receive().ok()
    }

    /// Caller side: wait for a report.
    pub async fn next_report(&self) -> DeliveryReport {
        self.reports.receive().await
    }
}

impl Default for DispatchQueue {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Worker delivery step
// ───────────────────────────────────────────────────────────────

/// File name the transport delivers a command under.
pub fn command_file_name(target_id: &str) -> String {
    format!("cmd_{target_id}.bin")
}

/// Deliver one command through `transport`, applying the retry-once
/// fault policy. Synchronous on purpose: the worker task owns the
/// transport exclusively, and `wait` is injected so tests advance
/// instantly while the firmware worker sleeps for real.
pub fn process_one<T: TransportPort>(
    transport: &mut T,
    cmd: &QueuedCommand,
    fault_wait_ms: u32,
    wait: &mut impl FnMut(u32),
) -> DeliveryReport {
    let name = command_file_name(&cmd.target_id);

    let outcome = match transport.send_file(&name, &cmd.payload) {
        Ok(()) => DeliveryOutcome::Delivered,
        Err(first_fault) => {
            log::warn!(
                "dispatch {}: send to {} faulted ({first_fault}), resetting modem",
                cmd.ticket,
                cmd.target_id
            );
            wait(fault_wait_ms);
            recover_and_resend(transport, &name, &cmd.payload)
                .map_or_else(DeliveryOutcome::Failed, |()| {
                    DeliveryOutcome::DeliveredAfterReset
                })
        }
    };

    if let DeliveryOutcome::Failed(fault) = outcome {
        log::error!(
            "dispatch {}: giving up on {} after retry ({fault})",
            cmd.ticket,
            cmd.target_id
        );
    }

    DeliveryReport {
        ticket: cmd.ticket,
        outcome,
    }
}

/// One recovery cycle: modem reset, one handshake, one resend.
fn recover_and_resend<T: TransportPort>(
    transport: &mut T,
    name: &str,
    payload: &[u8],
) -> Result<(), TransportFault> {
    transport.reset_link()?;
    transport.establish_connection()?;
    transport.send_file(name, payload)
}

// ── Tests ────────────────────────────────────────────────────
