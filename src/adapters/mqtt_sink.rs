//! MQTT publish sink (firmware only).
//!
//! Implements [`PublishPort`] over the ESP-IDF MQTT client. The broker
//! connection carries a retained `offline` last-will on the compute
//! node's status topic, so the bus observes gateway death without any
//! cooperation from this side.

use esp_idf_svc::mqtt::client::{EspMqttClient, LwtConfiguration, MqttClientConfiguration, QoS};
use log::{info, warn};

use crate::app::ports::{PublishError, PublishPort};
use crate::uplink::{STATUS_OFFLINE, status_topic};

/// MQTT-backed publish sink.
pub struct MqttSink {
    client: EspMqttClient<'static>,
}

impl MqttSink {
    /// Connect to `broker_url` and register the last-will.
    ///
    /// The event pump runs in its own thread for the life of the
    /// process; it only logs, all publishing is fire-and-forget from
    /// the caller's perspective.
    pub fn connect(
        broker_url: &str,
        client_id: &str,
        topic_base: &str,
        will_device_id: &str,
    ) -> anyhow::Result<Self> {
        let will_topic = status_topic(topic_base, will_device_id);
        let config = MqttClientConfiguration {
            client_id: Some(client_id),
            lwt: Some(LwtConfiguration {
                topic: &will_topic,
                payload: STATUS_OFFLINE.as_bytes(),
                qos: QoS::AtLeastOnce,
                retain: true,
            }),
            ..Default::default()
        };

        let (client, mut connection) = EspMqttClient::new(broker_url, &config)?;

        std::thread::Builder::new()
            .name("mqtt-events".to_owned())
            .stack_size(6 * 1024)
            .spawn(move || {
                while let Ok(event) = connection.next() {
                    info!("mqtt: {:?}", event.payload());
                }
                warn!("mqtt event pump terminated");
            })?;

        info!("mqtt connected to {broker_url} (will on {will_topic})");
        Ok(Self { client })
    }
}

impl PublishPort for MqttSink {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), PublishError> {
        self.client
            .publish(topic, QoS::AtLeastOnce, retain, payload.as_bytes())
            .map(|_| ())
            .map_err(|err| {
                warn!("mqtt publish to {topic} failed: {err}");
                PublishError::Rejected
            })
    }
}
