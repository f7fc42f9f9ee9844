//! Async task wiring — reactor-driven cooperative pipelines.
//!
//! Both roles run a single-threaded `edge-executor` with
//! `async-io-mini` reactor timers (no busy-spinning):
//!
//! ```text
//!  Controller                      Gateway
//!  ┌───────────────────────┐      ┌───────────────────────────┐
//!  │ link poll ⏱ 50ms      │      │ compute watcher ⏱ 1s      │
//!  │ downlink  ⏱ 200ms     │      │ sensor watcher  ⏱ 1s      │
//!  └───────────────────────┘      │ dispatch worker (wake)    │
//!                                 └───────────────────────────┘
//! ```
//!
//! Shared adapters live in `Rc<RefCell<…>>`; borrows never cross an
//! await point, so the executor stays deadlock-free. The dispatch
//! worker is the one wake-on-send future: it sleeps on the command
//! channel and at most one transport operation is in flight at a time.

use core::cell::RefCell;
use core::time::Duration;
use std::rc::Rc;

use log::{info, warn};

use crate::app::events::RelayEvent;
use crate::app::ports::{EventSink, LinkPort, PublishPort, SystemPort, TimePort, TransportPort};
use crate::app::service::RelayService;
use crate::config::RelayConfig;
use crate::downlink::dispatch::{self, DispatchQueue};
use crate::link::LinkId;
use crate::recovery::{self, MetricsRecord};
use crate::uplink::Uplink;
use crate::watch::FileWatcher;

/// Heartbeat interval for the housekeeping log line.
const HEARTBEAT_MS: u64 = 60_000;

fn spawn_heartbeat(executor: &edge_executor::LocalExecutor<'_, 4>, role: &'static str) {
    executor
        .spawn(async move {
            let mut ticks: u64 = 0;
            loop {
                async_io_mini::Timer::after(Duration::from_millis(HEARTBEAT_MS)).await;
                ticks += 1;
                info!("{role} alive, {ticks} min");
            }
        })
        .detach();
}

// ───────────────────────────────────────────────────────────────
// Controller role
// ───────────────────────────────────────────────────────────────

/// Run the controller pipeline. Never returns in normal operation.
pub fn run_controller(
    config: &RelayConfig,
    compute: impl LinkPort + 'static,
    sensor: impl LinkPort + 'static,
    transport: impl TransportPort + 'static,
    system: impl SystemPort + 'static,
    sink: impl EventSink + 'static,
) {
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();

    let service = Rc::new(RefCell::new(RelayService::new()));
    let compute = Rc::new(RefCell::new(compute));
    let sensor = Rc::new(RefCell::new(sensor));
    let transport = Rc::new(RefCell::new(transport));
    let system = Rc::new(RefCell::new(system));
    let sink = Rc::new(RefCell::new(sink));

    let poll_ms = u64::from(config.link_poll_interval_ms);
    let listen_ms = config.downlink_timeout_ms;

    {
        let service = service.clone();
        let compute = compute.clone();
        let sensor = sensor.clone();
        let transport = transport.clone();
        let sink = sink.clone();
        executor
            .spawn(async move {
                loop {
                    {
                        let mut svc = service.borrow_mut();
                        let mut transport = transport.borrow_mut();
                        let mut sink = sink.borrow_mut();
                        if let Err(err) = svc.pump_link(
                            LinkId::Compute,
                            &mut *compute.borrow_mut(),
                            &mut *transport,
                            &mut *sink,
                        ) {
                            warn!("compute link: {err}");
                        }
                        if let Err(err) = svc.pump_link(
                            LinkId::Sensor,
                            &mut *sensor.borrow_mut(),
                            &mut *transport,
                            &mut *sink,
                        ) {
                            warn!("sensor link: {err}");
                        }
                    }
                    async_io_mini::Timer::after(Duration::from_millis(poll_ms)).await;
                }
            })
            .detach();
    }

    {
        let service = service.clone();
        executor
            .spawn(async move {
                loop {
                    {
                        let mut svc = service.borrow_mut();
                        if let Err(fault) = svc.poll_downlink(
                            &mut *transport.borrow_mut(),
                            &mut *compute.borrow_mut(),
                            &mut *sensor.borrow_mut(),
                            &mut *system.borrow_mut(),
                            &mut *sink.borrow_mut(),
                            listen_ms,
                        ) {
                            warn!("downlink listen: {fault}");
                        }
                    }
                    async_io_mini::Timer::after(Duration::from_millis(poll_ms)).await;
                }
            })
            .detach();
    }

    spawn_heartbeat(&executor, "controller");

    info!("controller tasks started (poll {poll_ms}ms, listen {listen_ms}ms)");
    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
}

// ───────────────────────────────────────────────────────────────
// Gateway role
// ───────────────────────────────────────────────────────────────

/// Run the gateway pipeline. Never returns in normal operation.
///
/// `queue` is the static dispatch queue shared with the HTTP intake
/// adapter, which enqueues from its own handler threads.
pub fn run_gateway(
    config: &RelayConfig,
    transport: impl TransportPort + 'static,
    publisher: impl PublishPort + 'static,
    clock: impl TimePort + 'static,
    queue: &'static DispatchQueue,
    sink: impl EventSink + 'static,
) {
    let executor: edge_executor::LocalExecutor<'_, 4> = edge_executor::LocalExecutor::new();

    let transport = Rc::new(RefCell::new(transport));
    let publisher = Rc::new(RefCell::new(publisher));
    let clock = Rc::new(clock);
    let sink = Rc::new(RefCell::new(sink));

    let topic_base = config.topic_base.clone();
    let watch_ms = u64::from(config.watch_interval_ms);
    let fault_wait_ms = config.fault_wait_ms;

    // Liveness first, so late subscribers see both devices.
    {
        let mut publisher = publisher.borrow_mut();
        let mut uplink = Uplink::new(&mut *publisher, topic_base.as_str());
        for device_id in [&config.compute_device_id, &config.sensor_device_id] {
            if let Err(err) = uplink.announce_online(device_id) {
                warn!("online announcement for {device_id} failed: {err}");
            }
        }
    }

    // Compute-node watcher: free-text line recovery.
    {
        let publisher = publisher.clone();
        let clock = clock.clone();
        let topic_base = topic_base.clone();
        let device_id = config.compute_device_id.clone();
        let mut watcher = FileWatcher::new(config.compute_metrics_path());
        executor
            .spawn(async move {
                loop {
                    if let Some(content) = watcher.poll() {
                        let record = recover_compute(&content, &device_id, clock.now_millis());
                        publish_record(&publisher, &topic_base, &record);
                    }
                    async_io_mini::Timer::after(Duration::from_millis(watch_ms)).await;
                }
            })
            .detach();
    }

    // Sensor-node watcher: embedded-object recovery.
    {
        let publisher = publisher.clone();
        let clock = clock.clone();
        let topic_base = topic_base.clone();
        let device_id = config.sensor_device_id.clone();
        let mut watcher = FileWatcher::new(config.sensor_metrics_path());
        executor
            .spawn(async move {
                loop {
                    if let Some(content) = watcher.poll() {
                        match recover_sensor(&content, &device_id, clock.now_millis()) {
                            Ok(record) => publish_record(&publisher, &topic_base, &record),
                            Err(err) => warn!("sensor recovery failed: {err}"),
                        }
                    }
                    async_io_mini::Timer::after(Duration::from_millis(watch_ms)).await;
                }
            })
            .detach();
    }

    // Dispatch worker: wakes on enqueue, one delivery at a time.
    {
        executor
            .spawn(async move {
                loop {
                    let cmd = queue.next_command().await;
                    let report = dispatch::process_one(
                        &mut *transport.borrow_mut(),
                        &cmd,
                        fault_wait_ms,
                        &mut |ms| std::thread::sleep(Duration::from_millis(u64::from(ms))),
                    );
                    queue.report(report);
                    sink.borrow_mut().emit(&RelayEvent::Delivery(report));
                }
            })
            .detach();
    }

    spawn_heartbeat(&executor, "gateway");

    info!("gateway tasks started (watch {watch_ms}ms, base {topic_base})");
    futures_lite::future::block_on(executor.run(core::future::pending::<()>()));
}

// ── Recovery glue ────────────────────────────────────────────

/// Compute-node file content → record. Total: unrecognised lines just
/// reduce coverage.
fn recover_compute(content: &str, device_id: &str, now_ms: u64) -> MetricsRecord {
    let fields = recovery::lines::parse(content);
    MetricsRecord::new(device_id, now_ms, fields)
}

/// Sensor-node file content → record, or a recovery error when the
/// embedded object cannot be salvaged.
fn recover_sensor(
    content: &str,
    device_id: &str,
    now_ms: u64,
) -> Result<MetricsRecord, recovery::RecoveryError> {
    let fields = recovery::object::recover(content)?;
    Ok(MetricsRecord::new(device_id, now_ms, fields))
}

fn publish_record<P: PublishPort>(
    publisher: &Rc<RefCell<P>>,
    topic_base: &str,
    record: &MetricsRecord,
) {
    let mut publisher = publisher.borrow_mut();
    let mut uplink = Uplink::new(&mut *publisher, topic_base);
    if let Err(err) = uplink.publish_metrics(record) {
        warn!("publish for {} failed: {err}", record.device_id);
    }
}

// ── Tests ────────────────────────────────────────────────────
