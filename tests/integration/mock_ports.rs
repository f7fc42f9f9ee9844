//! Mock port adapters for integration tests.
//!
//! Every mock records its full call history so tests can assert on
//! ordering and content without touching real hardware or network.

use fieldlink::app::events::RelayEvent;
use fieldlink::app::ports::{
    EventSink, LinkError, LinkPort, PublishError, PublishPort, SystemPort, TimePort,
    TransportFault, TransportPort,
};

// ── Byte link ────────────────────────────────────────────────

/// Link whose inbound bytes come from a canned script.
pub struct MockLink {
    inbound: Vec<u8>,
    pub written: Vec<u8>,
}

#[allow(dead_code)]
impl MockLink {
    pub fn new() -> Self {
        Self {
            inbound: Vec::new(),
            written: Vec::new(),
        }
    }

    pub fn push_inbound(&mut self, bytes: &[u8]) {
        self.inbound.extend_from_slice(bytes);
    }
}

impl LinkPort for MockLink {
    fn available(&self) -> bool {
        !self.inbound.is_empty()
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        let n = buf.len().min(self.inbound.len());
        buf[..n].copy_from_slice(&self.inbound[..n]);
        self.inbound.drain(..n);
        Ok(n)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), LinkError> {
        self.written.extend_from_slice(data);
        Ok(())
    }
}

// ── Transport ────────────────────────────────────────────────

/// What happened on the transport, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportCall {
    Connect,
    Send { name: String, content: Vec<u8> },
    Reset,
}

/// Transport with scriptable send failures and a canned inbound file.
pub struct MockTransport {
    pub calls: Vec<TransportCall>,
    pub inbound: Vec<Vec<u8>>,
    /// Number of upcoming `send_file` calls that fault.
    pub fail_sends: usize,
}

#[allow(dead_code)]
impl MockTransport {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            inbound: Vec::new(),
            fail_sends: 0,
        }
    }

    pub fn sent_files(&self) -> Vec<(&str, &[u8])> {
        self.calls
            .iter()
            .filter_map(|call| match call {
                TransportCall::Send { name, content } => {
                    Some((name.as_str(), content.as_slice()))
                }
                _ => None,
            })
            .collect()
    }
}

impl TransportPort for MockTransport {
    fn establish_connection(&mut self) -> Result<(), TransportFault> {
        self.calls.push(TransportCall::Connect);
        Ok(())
    }

    fn send_file(&mut self, name: &str, content: &[u8]) -> Result<(), TransportFault> {
        if self.fail_sends > 0 {
            self.fail_sends -= 1;
            return Err(TransportFault::SendFailed);
        }
        self.calls.push(TransportCall::Send {
            name: name.to_owned(),
            content: content.to_vec(),
        });
        Ok(())
    }

    fn receive_from_endpoint(
        &mut self,
        _timeout_ms: u32,
    ) -> Result<Option<Vec<u8>>, TransportFault> {
        if self.inbound.is_empty() {
            Ok(None)
        } else {
            Ok(Some(self.inbound.remove(0)))
        }
    }

    fn reset_link(&mut self) -> Result<(), TransportFault> {
        self.calls.push(TransportCall::Reset);
        Ok(())
    }
}

// ── System / clock / sink / publish ──────────────────────────

#[derive(Default)]
pub struct MockSystem {
    pub resets: usize,
    pub gpio: Vec<(u8, bool)>,
}

impl SystemPort for MockSystem {
    fn reset_device(&mut self) {
        self.resets += 1;
    }

    fn set_gpio(&mut self, pin: u8, state: bool) {
        self.gpio.push((pin, state));
    }
}

#[derive(Default)]
pub struct CaptureSink {
    pub events: Vec<RelayEvent>,
}

impl EventSink for CaptureSink {
    fn emit(&mut self, event: &RelayEvent) {
        self.events.push(event.clone());
    }
}

#[derive(Default)]
pub struct MockPublish {
    pub messages: Vec<(String, String, bool)>,
}

impl PublishPort for MockPublish {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError> {
        self.messages
            .push((topic.to_owned(), payload.to_owned(), retain));
        Ok(())
    }
}

pub struct FixedClock(pub u64);

impl TimePort for FixedClock {
    fn now_millis(&self) -> u64 {
        self.0
    }
}
