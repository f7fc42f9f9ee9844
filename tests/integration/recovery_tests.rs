//! Recovery pipeline over realistic received-file content, through to
//! the published payload.

use fieldlink::recovery::{FieldValue, MetricsRecord, RecoveryError, lines, object};
use fieldlink::uplink::{Uplink, metrics_payload};

use crate::mock_ports::MockPublish;

/// Exactly what the controller relays for a sensor line: the raw
/// object wrapped textually, quotes unescaped.
const SENSOR_FILE: &str =
    "{\"metrics\":\"{\"CPU\":50%, \"Mem\":61%, \"Temp\":\"41C\", \"Batt\":3.91V, \"WiFiRSSI\":-71dBm}\"}";

const COMPUTE_FILE: &str = "\
Cpu(s): 12.5 us, 3.1 sy, 0.0 ni
load average: 0.42, 0.35, 0.28
temp=48.3'C
Mem:          3790        512       2871
throttled=0x50000
Link State: UP
";

#[test]
fn sensor_file_recovers_despite_broken_outer_json() {
    // The outer wrap is not valid JSON; recovery must anchor on the
    // inner object and still produce every field.
    assert!(serde_json::from_str::<serde_json::Value>(SENSOR_FILE).is_err());

    let fields = object::recover(SENSOR_FILE).unwrap();
    assert_eq!(fields["cpu"], FieldValue::Int(50));
    assert_eq!(fields["mem"], FieldValue::Int(61));
    assert_eq!(fields["temp"], FieldValue::Int(41));
    assert_eq!(fields["batt"], FieldValue::Float(3.91));
    assert_eq!(fields["wifi_rssi"], FieldValue::Int(-71));
}

#[test]
fn compute_file_recovers_through_the_line_table() {
    let fields = lines::parse(COMPUTE_FILE);
    assert_eq!(fields["cpu_user"], FieldValue::Float(12.5));
    assert_eq!(fields["ram_free"], FieldValue::Int(2871));
    assert_eq!(fields["throttled"], FieldValue::Int(0x50000));
    assert_eq!(fields["link_state"], FieldValue::Text("UP".to_owned()));
}

#[test]
fn recovered_record_publishes_as_flat_json() {
    let fields = object::recover(SENSOR_FILE).unwrap();
    let record = MetricsRecord::new("SENSOR-001", 1_700_000_000_000, fields);

    let mut sink = MockPublish::default();
    let mut uplink = Uplink::new(&mut sink, "fieldnet");
    uplink.publish_metrics(&record).unwrap();

    let (topic, payload, retain) = &sink.messages[0];
    assert_eq!(topic, "fieldnet/SENSOR-001/metrics");
    assert!(!retain);

    let parsed: serde_json::Value = serde_json::from_str(payload).unwrap();
    assert_eq!(parsed["device_id"], "SENSOR-001");
    assert_eq!(parsed["ts"], 1_700_000_000_000u64);
    assert_eq!(parsed["cpu"], 50);
    assert_eq!(parsed["batt"], 3.91);

    // Published payloads are byte-stable for identical records.
    assert_eq!(payload, &metrics_payload(&record));
}

#[test]
fn file_without_a_metrics_object_reports_not_found() {
    assert_eq!(
        object::recover("no object here").unwrap_err(),
        RecoveryError::NotFound
    );
}

#[test]
fn truncated_file_reports_unbalanced_braces() {
    assert_eq!(
        object::recover("{\"CPU\":50%, \"RAM\":").unwrap_err(),
        RecoveryError::Unbalanced
    );
}
