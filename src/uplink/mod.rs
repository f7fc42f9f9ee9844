//! Uplink publishing: topic scheme, payload building and device
//! status announcements on the operational message bus.
//!
//! Topic scheme, per device:
//! ```text
//! <base>/<device_id>/metrics   recovered metrics records
//! <base>/<device_id>/status    "online"/"offline", retained
//! ```
//!
//! The offline status doubles as the broker-registered last-will, so
//! liveness flips without the relay's involvement when the connection
//! drops.

use crate::app::ports::{PublishError, PublishPort};
use crate::recovery::MetricsRecord;

pub const STATUS_ONLINE: &str = "online";
pub const STATUS_OFFLINE: &str = "offline";

/// Topic for a device's metrics records.
pub fn metrics_topic(base: &str, device_id: &str) -> String {
    format!("{base}/{device_id}/metrics")
}

/// Topic for a device's retained status flag.
pub fn status_topic(base: &str, device_id: &str) -> String {
    format!("{base}/{device_id}/status")
}

/// Serialise one record into the metrics payload: `device_id`, `ts`
/// and the recovered fields as one flat object. Keys serialise in
/// sorted order, so records with the same content compare byte-equal.
pub fn metrics_payload(record: &MetricsRecord) -> String {
    let mut obj = serde_json::Map::new();
    obj.insert(
        "device_id".to_owned(),
        serde_json::json!(record.device_id),
    );
    obj.insert("ts".to_owned(), serde_json::json!(record.timestamp_millis));
    for (name, value) in &record.fields {
        obj.insert(name.clone(), value.to_json());
    }
    serde_json::Value::Object(obj).to_string()
}

/// Publisher tying the topic scheme to a [`PublishPort`].
pub struct Uplink<'a, P: PublishPort> {
    sink: &'a mut P,
    topic_base: String,
}

impl<'a, P: PublishPort> Uplink<'a, P> {
    pub fn new(sink: &'a mut P, topic_base: impl Into<String>) -> Self {
        Self {
            sink,
            topic_base: topic_base.into(),
        }
    }

    /// Publish one recovered record.
    pub fn publish_metrics(&mut self, record: &MetricsRecord) -> Result<(), PublishError> {
        let topic = metrics_topic(&self.topic_base, &record.device_id);
        let payload = metrics_payload(record);
        self.sink.publish(&topic, &payload, false)?;
        log::info!("published {topic} ({} fields)", record.fields.len());
        Ok(())
    }

    /// Announce a device online. Retained, so late subscribers see it.
    pub fn announce_online(&mut self, device_id: &str) -> Result<(), PublishError> {
        let topic = status_topic(&self.topic_base, device_id);
        self.sink.publish(&topic, STATUS_ONLINE, true)
    }

    /// Announce a device offline (mirrors the last-will payload).
    pub fn announce_offline(&mut self, device_id: &str) -> Result<(), PublishError> {
        let topic = status_topic(&self.topic_base, device_id);
        self.sink.publish(&topic, STATUS_OFFLINE, true)
    }
}

// ── Tests ────────────────────────────────────────────────────
