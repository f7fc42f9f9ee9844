//! End-to-end controller relay scenarios: UART bytes in, transport
//! files out, downlink commands back.

use fieldlink::app::RelayService;
use fieldlink::app::events::RelayEvent;
use fieldlink::downlink::DownlinkCommand;
use fieldlink::link::{
    CMD_RESPONSE_CLOSE, CMD_RESPONSE_OPEN, LinkId, METRICS_CLOSE, METRICS_OPEN, TagKind,
};

use crate::mock_ports::{CaptureSink, MockLink, MockSystem, MockTransport, TransportCall};

#[test]
fn tag_split_across_pump_cycles_still_relays_once() {
    let wire = format!("{METRICS_OPEN}{{\"uptime\": 12}}{METRICS_CLOSE}");
    let (first, second) = wire.as_bytes().split_at(wire.len() / 2);

    let mut link = MockLink::new();
    let mut transport = MockTransport::new();
    let mut sink = CaptureSink::default();
    let mut service = RelayService::new();

    // First pump sees only half the envelope: nothing may go out.
    link.push_inbound(first);
    service
        .pump_link(LinkId::Compute, &mut link, &mut transport, &mut sink)
        .unwrap();
    assert!(transport.sent_files().is_empty());

    // Second pump completes it.
    link.push_inbound(second);
    service
        .pump_link(LinkId::Compute, &mut link, &mut transport, &mut sink)
        .unwrap();

    let sent = transport.sent_files();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].0, "metrics_compute.json");
    assert_eq!(sent[0].1, b"{\"uptime\": 12}");
}

#[test]
fn compute_and_sensor_links_relay_independently() {
    let mut compute = MockLink::new();
    let mut sensor = MockLink::new();
    let mut transport = MockTransport::new();
    let mut sink = CaptureSink::default();
    let mut service = RelayService::new();

    compute.push_inbound(
        format!("{METRICS_OPEN}{{\"load\": 0.4}}{METRICS_CLOSE}").as_bytes(),
    );
    sensor.push_inbound(b"{\"CPU\":50%, \"Temp\":\"41C\"}\n");

    service
        .pump_link(LinkId::Compute, &mut compute, &mut transport, &mut sink)
        .unwrap();
    service
        .pump_link(LinkId::Sensor, &mut sensor, &mut transport, &mut sink)
        .unwrap();

    let sent = transport.sent_files();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].0, "metrics_compute.json");
    assert_eq!(sent[1].0, "metrics_sensor.json");
    // Sensor lines get the minimal textual wrap.
    assert_eq!(
        sent[1].1,
        b"{\"metrics\":\"{\"CPU\":50%, \"Temp\":\"41C\"}\"}"
    );
}

#[test]
fn command_response_uses_its_own_file_name() {
    let wire = format!("{CMD_RESPONSE_OPEN}{{\"ok\": true}}{CMD_RESPONSE_CLOSE}");
    let mut link = MockLink::new();
    link.push_inbound(wire.as_bytes());
    let mut transport = MockTransport::new();
    let mut sink = CaptureSink::default();

    RelayService::new()
        .pump_link(LinkId::Compute, &mut link, &mut transport, &mut sink)
        .unwrap();

    let sent = transport.sent_files();
    assert_eq!(sent[0].0, "response_compute.json");
    assert!(matches!(
        sink.events[0],
        RelayEvent::BlockRelayed {
            kind: TagKind::CommandResponse,
            ..
        }
    ));
}

#[test]
fn send_fault_drops_one_block_and_later_blocks_go_through() {
    let wire = format!(
        "{METRICS_OPEN}first{METRICS_CLOSE}{METRICS_OPEN}second{METRICS_CLOSE}"
    );
    let mut link = MockLink::new();
    link.push_inbound(wire.as_bytes());
    let mut transport = MockTransport::new();
    transport.fail_sends = 1;
    let mut sink = CaptureSink::default();

    RelayService::new()
        .pump_link(LinkId::Compute, &mut link, &mut transport, &mut sink)
        .unwrap();

    let sent = transport.sent_files();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].1, b"second");
    assert!(matches!(sink.events[0], RelayEvent::RelayFailed { .. }));
    assert!(matches!(sink.events[1], RelayEvent::BlockRelayed { .. }));
}

#[test]
fn downlink_force_metrics_round_trip() {
    let mut compute = MockLink::new();
    let mut sensor = MockLink::new();
    let mut transport = MockTransport::new();
    let mut system = MockSystem::default();
    let mut sink = CaptureSink::default();
    let mut service = RelayService::new();

    // Gateway asks the compute node for fresh metrics.
    transport
        .inbound
        .push(DownlinkCommand::ForceMetricsA.encode().to_vec());
    service
        .poll_downlink(
            &mut transport,
            &mut compute,
            &mut sensor,
            &mut system,
            &mut sink,
            100,
        )
        .unwrap();
    assert_eq!(compute.written, b"[CMD]GET_METRICS\n");

    // The node answers with a command response, which relays back out.
    compute.push_inbound(
        format!("{CMD_RESPONSE_OPEN}{{\"ack\": 1}}{CMD_RESPONSE_CLOSE}").as_bytes(),
    );
    service
        .pump_link(LinkId::Compute, &mut compute, &mut transport, &mut sink)
        .unwrap();

    assert!(transport.calls.contains(&TransportCall::Send {
        name: "response_compute.json".to_owned(),
        content: b"{\"ack\": 1}".to_vec(),
    }));
}

#[test]
fn downlink_reset_and_gpio_drive_the_system_port() {
    let mut compute = MockLink::new();
    let mut sensor = MockLink::new();
    let mut transport = MockTransport::new();
    let mut system = MockSystem::default();
    let mut sink = CaptureSink::default();
    let mut service = RelayService::new();

    transport
        .inbound
        .push(DownlinkCommand::SetGpio { pin: 16, state: true }.encode().to_vec());
    transport
        .inbound
        .push(DownlinkCommand::Reset.encode().to_vec());

    for _ in 0..2 {
        service
            .poll_downlink(
                &mut transport,
                &mut compute,
                &mut sensor,
                &mut system,
                &mut sink,
                100,
            )
            .unwrap();
    }

    assert_eq!(system.gpio, [(16, true)]);
    assert_eq!(system.resets, 1);
}

#[test]
fn downlink_timeout_is_quiet() {
    let mut compute = MockLink::new();
    let mut sensor = MockLink::new();
    let mut transport = MockTransport::new();
    let mut system = MockSystem::default();
    let mut sink = CaptureSink::default();

    RelayService::new()
        .poll_downlink(
            &mut transport,
            &mut compute,
            &mut sensor,
            &mut system,
            &mut sink,
            100,
        )
        .unwrap();

    assert!(sink.events.is_empty());
    assert_eq!(system.resets, 0);
}
