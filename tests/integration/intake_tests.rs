//! Intake-to-queue flow: the same path the HTTP handler runs, minus
//! the server itself.

use fieldlink::downlink::DownlinkCommand;
use fieldlink::downlink::dispatch::DispatchQueue;
use fieldlink::downlink::intake::{CommandRequest, IntakeStatus, ValidationError};

/// What the POST handler does with a body, without the HTTP server.
fn accept(
    queue: &DispatchQueue,
    status: &IntakeStatus,
    body: &str,
    now_ms: u64,
) -> Result<(), ValidationError> {
    let request = CommandRequest::parse(body)?;
    let command = request.to_command()?;
    let ticket = queue
        .enqueue(&request.device_id, &command.encode(), now_ms)
        .expect("queue has room");
    status.record(&request, ticket, now_ms);
    Ok(())
}

#[test]
fn accepted_request_lands_in_queue_and_status() {
    let queue = DispatchQueue::new();
    let status = IntakeStatus::new();

    accept(
        &queue,
        &status,
        r#"{"deviceId":"COMPUTE-001","cmd":"set_gpio","pin":16,"state":1}"#,
        5000,
    )
    .unwrap();

    let queued = queue.try_next_command().unwrap();
    assert_eq!(queued.target_id, "COMPUTE-001");
    assert_eq!(
        DownlinkCommand::decode(&queued.payload),
        DownlinkCommand::SetGpio { pin: 16, state: true }
    );
    assert_eq!(queued.enqueued_at_ms, 5000);

    let last = status.snapshot().unwrap();
    assert_eq!(last.cmd, "set_gpio");
    assert_eq!(last.ticket, queued.ticket);
}

#[test]
fn rejected_request_never_touches_queue_or_status() {
    let queue = DispatchQueue::new();
    let status = IntakeStatus::new();

    assert_eq!(
        accept(&queue, &status, r#"{"deviceId":"x","cmd":"rm_rf"}"#, 0),
        Err(ValidationError::UnknownCommand)
    );
    assert_eq!(
        accept(&queue, &status, "not json at all", 0),
        Err(ValidationError::Malformed)
    );

    assert!(queue.try_next_command().is_none());
    assert!(status.snapshot().is_none());
}

#[test]
fn status_json_tracks_the_latest_acceptance() {
    let queue = DispatchQueue::new();
    let status = IntakeStatus::new();
    assert_eq!(status.to_json(), r#"{"lastCommand":null}"#);

    accept(
        &queue,
        &status,
        r#"{"deviceId":"SENSOR-001","cmd":"force_metrics_b"}"#,
        1000,
    )
    .unwrap();
    accept(
        &queue,
        &status,
        r#"{"deviceId":"COMPUTE-001","cmd":"reset"}"#,
        2000,
    )
    .unwrap();

    let json: serde_json::Value = serde_json::from_str(&status.to_json()).unwrap();
    assert_eq!(json["lastCommand"]["deviceId"], "COMPUTE-001");
    assert_eq!(json["lastCommand"]["cmd"], "reset");
    assert_eq!(json["lastCommand"]["acceptedAtMs"], 2000);
}
