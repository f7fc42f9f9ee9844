//! System clock adapter.
//!
//! Implements [`TimePort`] for record timestamps and queue bookkeeping.
//!
//! - **`espidf` feature** — wall clock via `gettimeofday` when synced,
//!   with a fallback to the monotonic `esp_timer` before NTP sync.
//! - **host** — `SystemTime` relative to the Unix epoch.

use crate::app::ports::TimePort;

/// Wall-clock timestamps are only trusted after this instant; anything
/// earlier means the clock was never synced.
#[cfg(feature = "espidf")]
const EPOCH_2020_SECS: i64 = 1_577_836_800;

/// Clock adapter for both roles.
pub struct SystemClock;

impl SystemClock {
    pub fn new() -> Self {
        Self
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "espidf")]
impl TimePort for SystemClock {
    fn now_millis(&self) -> u64 {
        use core::ptr;

        let mut tv = esp_idf_svc::sys::timeval {
            tv_sec: 0,
            tv_usec: 0,
        };
        let synced = unsafe { esp_idf_svc::sys::gettimeofday(&mut tv, ptr::null_mut()) } == 0
            && tv.tv_sec >= EPOCH_2020_SECS;
        if synced {
            tv.tv_sec as u64 * 1000 + tv.tv_usec as u64 / 1000
        } else {
            // Monotonic microseconds since boot; callers only rely on
            // monotonicity before the wall clock syncs.
            (unsafe { esp_idf_svc::sys::esp_timer_get_time() }) as u64 / 1000
        }
    }
}

#[cfg(not(feature = "espidf"))]
impl TimePort for SystemClock {
    fn now_millis(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |d| d.as_millis() as u64)
    }
}
