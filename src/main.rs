//! Fieldlink Relay — Main Entry Point
//!
//! Hexagonal architecture; one binary, two roles selected by config:
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  UartLink ×2    LoraModem       MqttSink      HttpIntake       │
//! │  (LinkPort)     (TransportPort) (PublishPort) (intake routes)  │
//! │  EspSystem      SystemClock     LogEventSink                   │
//! │  (SystemPort)   (TimePort)      (EventSink)                    │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │  RelayService · recovery · uplink · dispatch queue     │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```

#![deny(unused_must_use)]

use anyhow::{Context, Result};
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::gpio::PinDriver;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::hal::uart::{UartDriver, config::Config as UartConfig};
use esp_idf_svc::hal::units::Hertz;
use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs};
use esp_idf_svc::wifi::{BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{info, warn};

use fieldlink::adapters::http_intake::HttpIntake;
use fieldlink::adapters::log_sink::LogEventSink;
use fieldlink::adapters::lora_transport::LoraModem;
use fieldlink::adapters::mqtt_sink::MqttSink;
use fieldlink::adapters::time::SystemClock;
use fieldlink::adapters::uart_link::{EspSystem, UartLink};
use fieldlink::app::ports::TransportPort;
use fieldlink::config::{RelayConfig, RelayRole};
use fieldlink::downlink::dispatch::DispatchQueue;
use fieldlink::downlink::intake::IntakeStatus;
use fieldlink::tasks;

/// Shared with the HTTP intake handler threads.
static DISPATCH_QUEUE: DispatchQueue = DispatchQueue::new();
static INTAKE_STATUS: IntakeStatus = IntakeStatus::new();

const UART_BAUD: u32 = 115_200;

fn main() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("fieldlink v{} starting", env!("CARGO_PKG_VERSION"));

    let nvs = EspDefaultNvsPartition::take()?;
    let config = load_config(nvs.clone());
    config.validate()?;
    info!("role: {:?}", config.role);

    let peripherals = Peripherals::take()?;

    match config.role {
        RelayRole::Controller => run_controller(&config, peripherals),
        RelayRole::Gateway => run_gateway(&config, peripherals, nvs),
    }
}

/// Stored relay configuration, or compiled-in defaults when the NVS
/// blob is absent or unparseable.
fn load_config(nvs: EspDefaultNvsPartition) -> RelayConfig {
    let mut buf = [0u8; 1024];
    match EspNvs::new(nvs, "fieldlink", true) {
        Ok(store) => match store.get_str("config", &mut buf) {
            Ok(Some(json)) => match serde_json::from_str(json) {
                Ok(config) => {
                    info!("config loaded from NVS");
                    return config;
                }
                Err(err) => warn!("stored config unparseable ({err}), using defaults"),
            },
            Ok(None) => info!("no stored config, using defaults"),
            Err(err) => warn!("config read failed ({err}), using defaults"),
        },
        Err(err) => warn!("NVS open failed ({err}), using defaults"),
    }
    RelayConfig::default()
}

// ── Controller role ───────────────────────────────────────────

fn run_controller(config: &RelayConfig, peripherals: Peripherals) -> Result<()> {
    let uart_config = UartConfig::default().baudrate(Hertz(UART_BAUD));
    let pins = peripherals.pins;

    // Compute node on UART1, sensor node on UART2, modem on UART0.
    let compute = UartLink::new(UartDriver::new(
        peripherals.uart1,
        pins.gpio17,
        pins.gpio18,
        Option::<esp_idf_svc::hal::gpio::Gpio0>::None,
        Option::<esp_idf_svc::hal::gpio::Gpio0>::None,
        &uart_config,
    )?);
    let sensor = UartLink::new(UartDriver::new(
        peripherals.uart2,
        pins.gpio4,
        pins.gpio5,
        Option::<esp_idf_svc::hal::gpio::Gpio0>::None,
        Option::<esp_idf_svc::hal::gpio::Gpio0>::None,
        &uart_config,
    )?);
    let mut transport = modem_transport(
        peripherals.uart0,
        pins.gpio43,
        pins.gpio44,
        pins.gpio21,
        &uart_config,
    )?;

    if let Err(fault) = transport.establish_connection() {
        // The modem may still be booting; the dispatch fault path will
        // re-handshake on first use.
        warn!("initial modem handshake failed: {fault}");
    }

    tasks::run_controller(
        config,
        compute,
        sensor,
        transport,
        EspSystem::new(),
        LogEventSink::new(),
    );
    Ok(())
}

// ── Gateway role ──────────────────────────────────────────────

fn run_gateway(
    config: &RelayConfig,
    peripherals: Peripherals,
    nvs: EspDefaultNvsPartition,
) -> Result<()> {
    let sys_loop = EspSystemEventLoop::take()?;
    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: config
            .wifi_ssid
            .as_str()
            .try_into()
            .map_err(|()| anyhow::anyhow!("wifi_ssid too long"))?,
        password: config
            .wifi_password
            .as_str()
            .try_into()
            .map_err(|()| anyhow::anyhow!("wifi_password too long"))?,
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.connect().context("wifi connect")?;
    wifi.wait_netif_up()?;
    info!("wifi up");

    let publisher = MqttSink::connect(
        &config.broker_url,
        "fieldlink-gateway",
        &config.topic_base,
        &config.compute_device_id,
    )?;

    let uart_config = UartConfig::default().baudrate(Hertz(UART_BAUD));
    let pins = peripherals.pins;
    let mut transport = modem_transport(
        peripherals.uart0,
        pins.gpio43,
        pins.gpio44,
        pins.gpio21,
        &uart_config,
    )?;
    if let Err(fault) = transport.establish_connection() {
        warn!("initial modem handshake failed: {fault}");
    }

    // Keep the server alive for the life of the process.
    let _intake = HttpIntake::start(&DISPATCH_QUEUE, &INTAKE_STATUS)?;

    tasks::run_gateway(
        config,
        transport,
        publisher,
        SystemClock::new(),
        &DISPATCH_QUEUE,
        LogEventSink::new(),
    );
    Ok(())
}

// ── Shared wiring ─────────────────────────────────────────────

fn modem_transport<'d>(
    uart: esp_idf_svc::hal::uart::UART0,
    tx: esp_idf_svc::hal::gpio::Gpio43,
    rx: esp_idf_svc::hal::gpio::Gpio44,
    reset: esp_idf_svc::hal::gpio::Gpio21,
    uart_config: &UartConfig,
) -> Result<LoraModem<'d>> {
    use esp_idf_svc::hal::gpio::Pin;

    let driver = UartDriver::new(
        uart,
        tx,
        rx,
        Option::<esp_idf_svc::hal::gpio::Gpio0>::None,
        Option::<esp_idf_svc::hal::gpio::Gpio0>::None,
        uart_config,
    )?;
    let reset_pin = PinDriver::output(unsafe {
        esp_idf_svc::hal::gpio::AnyOutputPin::new(reset.pin())
    })?;
    Ok(LoraModem::new(driver, reset_pin))
}
