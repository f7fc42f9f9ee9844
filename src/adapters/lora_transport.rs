//! UART-attached LoRa modem transport (firmware only).
//!
//! The modem is a companion board running its own store-and-forward
//! firmware; this adapter speaks its line-oriented serial control
//! protocol and implements [`TransportPort`] on top:
//!
//! ```text
//! → CONN\n                          ← OK\n
//! → SEND <name> <len>\n<bytes>      ← OK\n | ERR\n
//! → RECV\n                          ← FILE <len>\n<bytes> | NONE\n
//! ```
//!
//! The modem's hardware reset line is a GPIO held low for 100 ms; after
//! a reset the connection handshake must be repeated.

use core::time::Duration;
use std::time::Instant;

use esp_idf_svc::hal::delay::{FreeRtos, TickType};
use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_svc::hal::uart::UartDriver;
use log::{info, warn};

use crate::app::ports::{TransportFault, TransportPort};

const HANDSHAKE_TIMEOUT_MS: u32 = 3000;
const SEND_ACK_TIMEOUT_MS: u32 = 5000;
const RESET_PULSE_MS: u32 = 100;
const MAX_LINE: usize = 128;

/// Store-and-forward transport over the modem's serial control protocol.
pub struct LoraModem<'d> {
    uart: UartDriver<'d>,
    reset_pin: PinDriver<'d, AnyOutputPin, Output>,
}

impl<'d> LoraModem<'d> {
    pub fn new(uart: UartDriver<'d>, reset_pin: PinDriver<'d, AnyOutputPin, Output>) -> Self {
        Self { uart, reset_pin }
    }

    fn write_all(&mut self, data: &[u8]) -> Result<(), TransportFault> {
        let mut written = 0;
        while written < data.len() {
            let n = self
                .uart
                .write(&data[written..])
                .map_err(|_| TransportFault::LinkDown)?;
            if n == 0 {
                return Err(TransportFault::LinkDown);
            }
            written += n;
        }
        Ok(())
    }

    /// Read one `\n`-terminated line within `timeout_ms`. `Ok(None)` on
    /// timeout; oversized lines fault the link.
    fn read_line(&mut self, timeout_ms: u32) -> Result<Option<String>, TransportFault> {
        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
        let mut line = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }
            let ticks = TickType::from(remaining).ticks();
            match self.uart.read(&mut byte, ticks) {
                Ok(0) => {}
                Ok(_) => {
                    if byte[0] == b'\n' {
                        return Ok(Some(String::from_utf8_lossy(&line).trim().to_owned()));
                    }
                    if line.len() >= MAX_LINE {
                        return Err(TransportFault::ReceiveFailed);
                    }
                    line.push(byte[0]);
                }
                Err(_) => return Err(TransportFault::LinkDown),
            }
        }
    }

    fn read_exact(&mut self, buf: &mut [u8], timeout_ms: u32) -> Result<(), TransportFault> {
        let deadline = Instant::now() + Duration::from_millis(u64::from(timeout_ms));
        let mut filled = 0;
        while filled < buf.len() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(TransportFault::ReceiveFailed);
            }
            let ticks = TickType::from(remaining).ticks();
            match self.uart.read(&mut buf[filled..], ticks) {
                Ok(0) => {}
                Ok(n) => filled += n,
                Err(_) => return Err(TransportFault::LinkDown),
            }
        }
        Ok(())
    }
}

impl TransportPort for LoraModem<'_> {
    fn establish_connection(&mut self) -> Result<(), TransportFault> {
        self.write_all(b"CONN\n")?;
        match self.read_line(HANDSHAKE_TIMEOUT_MS)? {
            Some(reply) if reply == "OK" => {
                info!("modem handshake complete");
                Ok(())
            }
            Some(reply) => {
                warn!("modem handshake rejected: {reply}");
                Err(TransportFault::HandshakeFailed)
            }
            None => Err(TransportFault::HandshakeFailed),
        }
    }

    fn send_file(&mut self, name: &str, content: &[u8]) -> Result<(), TransportFault> {
        let header = format!("SEND {name} {}\n", content.len());
        self.write_all(header.as_bytes())?;
        self.write_all(content)?;
        match self.read_line(SEND_ACK_TIMEOUT_MS)? {
            Some(reply) if reply == "OK" => Ok(()),
            _ => Err(TransportFault::SendFailed),
        }
    }

    fn receive_from_endpoint(
        &mut self,
        timeout_ms: u32,
    ) -> Result<Option<Vec<u8>>, TransportFault> {
        self.write_all(b"RECV\n")?;
        let Some(header) = self.read_line(timeout_ms)? else {
            return Ok(None);
        };
        if header == "NONE" {
            return Ok(None);
        }
        let len = header
            .strip_prefix("FILE ")
            .and_then(|rest| rest.trim().parse::<usize>().ok())
            .ok_or(TransportFault::ReceiveFailed)?;

        let mut content = vec![0u8; len];
        self.read_exact(&mut content, timeout_ms)?;
        Ok(Some(content))
    }

    fn reset_link(&mut self) -> Result<(), TransportFault> {
        // Active-low reset pulse; the modem reboots into its idle state.
        self.reset_pin
            .set_low()
            .map_err(|_| TransportFault::LinkDown)?;
        FreeRtos::delay_ms(RESET_PULSE_MS);
        self.reset_pin
            .set_high()
            .map_err(|_| TransportFault::LinkDown)?;
        info!("modem reset pulse issued");
        Ok(())
    }
}
