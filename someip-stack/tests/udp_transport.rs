//! End-to-end checks of the UDP transport over the loopback interface

use std::sync::Arc;
use std::time::Duration;

use someip::definitions::{Header, Message, MessageType, ReturnCode};
use someip_stack::transport::{ChannelCallbacks, TransportEvent, UdpTransport};
use someip_stack::{TpConfig, UdpConfig};
use tokio::sync::mpsc;
use tokio::time::timeout;

fn notification(payload: Vec<u8>) -> Message {
    Message {
        header: Header {
            service_id: 0x1234,
            method_id: 0x8001,
            client_id: 0x0000,
            session_id: 0x0001,
            interface_version: 1,
            message_type: MessageType::Notification,
            return_code: ReturnCode::Ok,
        },
        payload,
    }
}

async fn bound_pair() -> (UdpTransport, UdpTransport) {
    let sender = UdpTransport::bind(
        "127.0.0.1:0".parse().unwrap(),
        UdpConfig::default(),
        TpConfig::default(),
    )
    .await
    .unwrap();
    let receiver = UdpTransport::bind(
        "127.0.0.1:0".parse().unwrap(),
        UdpConfig::default(),
        TpConfig::default(),
    )
    .await
    .unwrap();
    (sender, receiver)
}

async fn expect_message(
    events: &mut mpsc::UnboundedReceiver<TransportEvent>,
) -> Message {
    loop {
        let event = timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("no event within the deadline")
            .expect("event channel closed");
        if let TransportEvent::MessageReceived { message, .. } = event {
            return message;
        }
    }
}

#[tokio::test]
async fn small_message_passes_untouched() {
    let (sender, receiver) = bound_pair().await;
    let destination = receiver.local_addr().unwrap();

    let (event_tx, mut events) = mpsc::unbounded_channel();
    receiver.start(Arc::new(ChannelCallbacks::new(event_tx)));

    let message = notification(vec![0xDE, 0xAD, 0xBE, 0xEF]);
    sender.send_message(&message, destination).await.unwrap();

    let received = expect_message(&mut events).await;
    assert_eq!(received, message);

    receiver.stop().await;
}

#[tokio::test]
async fn oversize_message_is_segmented_and_reassembled() {
    let (sender, receiver) = bound_pair().await;
    let destination = receiver.local_addr().unwrap();

    let (event_tx, mut events) = mpsc::unbounded_channel();
    receiver.start(Arc::new(ChannelCallbacks::new(event_tx)));

    // well past one segment, exercising the TP path end to end
    let message = notification((0..5000).map(|i| (i % 251) as u8).collect());
    sender.send_message(&message, destination).await.unwrap();

    let received = expect_message(&mut events).await;
    assert_eq!(received.header, message.header);
    assert_eq!(received.payload, message.payload);
    assert_eq!(receiver.reassembler().in_progress(), 0);

    receiver.stop().await;
}

#[tokio::test]
async fn stop_reports_outstanding_reassemblies() {
    let (sender, receiver) = bound_pair().await;
    let destination = receiver.local_addr().unwrap();

    let (event_tx, mut events) = mpsc::unbounded_channel();
    receiver.start(Arc::new(ChannelCallbacks::new(event_tx)));

    // send only the first segment of an oversize message
    let message = notification((0..5000).map(|i| i as u8).collect());
    let first = someip_stack::tp::segment(message, TpConfig::default().max_segment_size)
        .unwrap()
        .next()
        .unwrap();
    sender.send_message(&first, destination).await.unwrap();

    // wait until the segment actually sits in a context
    for _ in 0..50 {
        if receiver.reassembler().in_progress() > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert_eq!(receiver.reassembler().in_progress(), 1);

    receiver.stop().await;
    let event = timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("no event within the deadline")
        .expect("event channel closed");
    assert!(matches!(event, TransportEvent::ReassemblyTimeout(_)));
}
