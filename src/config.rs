//! Relay configuration parameters
//!
//! All tunable parameters for the fieldlink relay. One structure covers
//! both roles; `role` selects which wiring `main` builds, and the
//! fields the other role does not use are simply ignored.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which half of the pipeline this process runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelayRole {
    /// Field side: UART link pollers + downlink listener.
    Controller,
    /// Backhaul side: file watchers + publisher + command intake.
    Gateway,
}

/// Core relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub role: RelayRole,

    // --- Device identity ---
    /// Published identifier of the compute node.
    pub compute_device_id: String,
    /// Published identifier of the sensor node.
    pub sensor_device_id: String,

    // --- Controller: link polling ---
    /// Link poll interval (milliseconds).
    pub link_poll_interval_ms: u32,
    /// Downlink listen budget per cycle (milliseconds). Kept short:
    /// the listen call is synchronous and shares the executor with the
    /// link pollers.
    pub downlink_timeout_ms: u32,

    // --- Gateway: network & publishing ---
    /// WiFi station credentials.
    pub wifi_ssid: String,
    pub wifi_password: String,
    /// Message broker URL, e.g. `mqtt://192.168.4.1:1883`.
    pub broker_url: String,
    /// Topic base for metrics and status topics.
    pub topic_base: String,
    /// Directory the transport drops received files into.
    pub results_dir: String,
    /// Watcher poll interval (milliseconds).
    pub watch_interval_ms: u32,

    // --- Gateway: dispatch ---
    /// Wait before the modem reset on a transport fault (milliseconds).
    pub fault_wait_ms: u32,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            role: RelayRole::Controller,

            // Identity
            compute_device_id: "COMPUTE-001".to_owned(),
            sensor_device_id: "SENSOR-001".to_owned(),

            // Controller timing
            link_poll_interval_ms: 50, // 20 Hz, matches the UART duty cycle
            downlink_timeout_ms: 200,

            // Gateway
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            broker_url: "mqtt://localhost:1883".to_owned(),
            topic_base: "fieldnet".to_owned(),
            results_dir: "results".to_owned(),
            watch_interval_ms: 1000, // 1 Hz, far below the radio duty cycle

            // Dispatch
            fault_wait_ms: 500,
        }
    }
}

impl RelayConfig {
    /// Reject configurations the runtime cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.compute_device_id.is_empty() || self.sensor_device_id.is_empty() {
            return Err(Error::Config("device ids must not be empty"));
        }
        if self.topic_base.is_empty() || self.topic_base.contains('/') {
            return Err(Error::Config("topic_base must be a single non-empty level"));
        }
        if self.link_poll_interval_ms == 0 || self.watch_interval_ms == 0 {
            return Err(Error::Config("poll intervals must be non-zero"));
        }
        if self.role == RelayRole::Gateway && self.broker_url.is_empty() {
            return Err(Error::Config("gateway role requires a broker_url"));
        }
        Ok(())
    }

    /// Path of the received compute-node metrics file.
    pub fn compute_metrics_path(&self) -> String {
        format!("{}/metrics_compute.json", self.results_dir)
    }

    /// Path of the received sensor-node metrics file.
    pub fn sensor_metrics_path(&self) -> String {
        format!("{}/metrics_sensor.json", self.results_dir)
    }
}
