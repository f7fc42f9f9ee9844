//! Dispatch queue drained by a worker against a faulting transport.

use fieldlink::downlink::DownlinkCommand;
use fieldlink::downlink::dispatch::{
    DeliveryOutcome, DispatchError, DispatchQueue, QUEUE_DEPTH, process_one,
};

use crate::mock_ports::{MockTransport, TransportCall};

/// Drain every queued command through `process_one`, reporting each.
fn drain(queue: &DispatchQueue, transport: &mut MockTransport, fault_wait_ms: u32) {
    while let Some(cmd) = queue.try_next_command() {
        let report = process_one(transport, &cmd, fault_wait_ms, &mut |_| {});
        queue.report(report);
    }
}

#[test]
fn queued_commands_deliver_in_order_with_reports() {
    let queue = DispatchQueue::new();
    let mut transport = MockTransport::new();

    let t1 = queue
        .enqueue("node-a", &DownlinkCommand::Reset.encode(), 10)
        .unwrap();
    let t2 = queue
        .enqueue("node-b", &DownlinkCommand::ForceMetricsB.encode(), 20)
        .unwrap();

    drain(&queue, &mut transport, 0);

    let sent = transport.sent_files();
    assert_eq!(sent[0].0, "cmd_node-a.bin");
    assert_eq!(sent[0].1, DownlinkCommand::Reset.encode().as_slice());
    assert_eq!(sent[1].0, "cmd_node-b.bin");

    let r1 = queue.try_next_report().unwrap();
    let r2 = queue.try_next_report().unwrap();
    assert_eq!((r1.ticket, r1.outcome), (t1, DeliveryOutcome::Delivered));
    assert_eq!((r2.ticket, r2.outcome), (t2, DeliveryOutcome::Delivered));
    assert!(queue.try_next_report().is_none());
}

#[test]
fn first_fault_recovers_with_one_reset_cycle() {
    let queue = DispatchQueue::new();
    let mut transport = MockTransport::new();
    transport.fail_sends = 1;

    let ticket = queue
        .enqueue("node-a", &DownlinkCommand::Reset.encode(), 0)
        .unwrap();
    drain(&queue, &mut transport, 100);

    let report = queue.try_next_report().unwrap();
    assert_eq!(report.ticket, ticket);
    assert_eq!(report.outcome, DeliveryOutcome::DeliveredAfterReset);

    // Recovery ran exactly once: reset, handshake, resend.
    assert_eq!(
        transport.calls,
        [
            TransportCall::Reset,
            TransportCall::Connect,
            TransportCall::Send {
                name: "cmd_node-a.bin".to_owned(),
                content: DownlinkCommand::Reset.encode().to_vec(),
            },
        ]
    );
}

#[test]
fn persistent_fault_fails_the_item_but_not_the_queue() {
    let queue = DispatchQueue::new();
    let mut transport = MockTransport::new();
    transport.fail_sends = 2; // first attempt and its single retry

    queue
        .enqueue("node-a", &DownlinkCommand::Reset.encode(), 0)
        .unwrap();
    queue
        .enqueue("node-b", &DownlinkCommand::ForceMetricsA.encode(), 0)
        .unwrap();
    drain(&queue, &mut transport, 0);

    let first = queue.try_next_report().unwrap();
    assert!(matches!(first.outcome, DeliveryOutcome::Failed(_)));

    // The next item was unaffected by its predecessor's failure.
    let second = queue.try_next_report().unwrap();
    assert_eq!(second.outcome, DeliveryOutcome::Delivered);
    assert_eq!(transport.sent_files()[0].0, "cmd_node-b.bin");
}

#[test]
fn overflow_is_rejected_and_accepted_work_survives() {
    let queue = DispatchQueue::new();
    for _ in 0..QUEUE_DEPTH {
        queue
            .enqueue("node-a", &DownlinkCommand::Reset.encode(), 0)
            .unwrap();
    }
    assert_eq!(
        queue.enqueue("node-a", &DownlinkCommand::Reset.encode(), 0),
        Err(DispatchError::QueueFull)
    );

    let mut transport = MockTransport::new();
    drain(&queue, &mut transport, 0);
    assert_eq!(transport.sent_files().len(), QUEUE_DEPTH);
}
