//! Adapters — concrete implementations of the hexagonal port traits.
//!
//! | Adapter          | Implements      | Connects to                    |
//! |------------------|-----------------|--------------------------------|
//! | `log_sink`       | EventSink       | Serial log output              |
//! | `time`           | TimePort        | ESP32 system timer / host clock|
//! | `uart_link`      | LinkPort        | ESP32 UART peripherals         |
//! |                  | SystemPort      | ESP32 GPIO + software reset    |
//! | `lora_transport` | TransportPort   | UART-attached LoRa modem       |
//! | `mqtt_sink`      | PublishPort     | ESP-IDF MQTT client            |
//! | `http_intake`    | —               | ESP-IDF HTTP server (intake)   |
//!
//! The hardware-backed adapters only exist in firmware builds (the
//! `espidf` feature); host builds exercise the core through mock ports
//! in the test suites.

pub mod log_sink;
pub mod time;

#[cfg(feature = "espidf")]
pub mod http_intake;
#[cfg(feature = "espidf")]
pub mod lora_transport;
#[cfg(feature = "espidf")]
pub mod mqtt_sink;
#[cfg(feature = "espidf")]
pub mod uart_link;
