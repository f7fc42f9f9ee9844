//! UART link + local system adapters (firmware only).
//!
//! [`UartLink`] implements [`LinkPort`] over an ESP-IDF UART driver:
//! non-blocking reads so the poller can service both links
//! cooperatively, blocking writes because control tokens are a handful
//! of bytes.
//!
//! [`EspSystem`] implements [`SystemPort`]: device reset through
//! `esp_restart`, GPIO writes through a transient pin driver so the
//! commanded pin does not have to be known at wiring time.

use esp_idf_svc::hal::delay::NON_BLOCK;
use esp_idf_svc::hal::gpio::{AnyOutputPin, PinDriver};
use esp_idf_svc::hal::uart::UartDriver;
use log::{info, warn};

use crate::app::ports::{LinkError, LinkPort, SystemPort};

// ───────────────────────────────────────────────────────────────
// UART link
// ───────────────────────────────────────────────────────────────

/// One point-to-point UART link.
pub struct UartLink<'d> {
    uart: UartDriver<'d>,
}

impl<'d> UartLink<'d> {
    pub fn new(uart: UartDriver<'d>) -> Self {
        Self { uart }
    }
}

impl LinkPort for UartLink<'_> {
    fn available(&self) -> bool {
        self.uart.remaining_read().is_ok_and(|n| n > 0)
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        self.uart
            .read(buf, NON_BLOCK)
            .map_err(|_| LinkError::ReadFailed)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), LinkError> {
        let mut written = 0;
        while written < data.len() {
            let n = self
                .uart
                .write(&data[written..])
                .map_err(|_| LinkError::WriteFailed)?;
            if n == 0 {
                return Err(LinkError::WriteFailed);
            }
            written += n;
        }
        Ok(())
    }
}

// ───────────────────────────────────────────────────────────────
// Local system actions
// ───────────────────────────────────────────────────────────────

/// System port backed by ESP-IDF primitives.
pub struct EspSystem;

impl EspSystem {
    pub fn new() -> Self {
        Self
    }
}

impl Default for EspSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl SystemPort for EspSystem {
    fn reset_device(&mut self) {
        info!("restarting device");
        unsafe { esp_idf_svc::sys::esp_restart() };
    }

    fn set_gpio(&mut self, pin: u8, state: bool) {
        // Pin number arrives over the air; claim the pin transiently
        // instead of pre-owning every possible output at wiring time.
        let pin = unsafe { AnyOutputPin::new(i32::from(pin)) };
        match PinDriver::output(pin) {
            Ok(mut driver) => {
                let result = if state {
                    driver.set_high()
                } else {
                    driver.set_low()
                };
                if let Err(err) = result {
                    warn!("gpio write failed: {err}");
                }
            }
            Err(err) => warn!("gpio claim failed: {err}"),
        }
    }
}
