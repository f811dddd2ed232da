use embassy_futures::join::join;
use embassy_time::{Duration, Instant, Timer};
use mirra_api::{Message, MessagePayload, MessageType, SensorData, SensorValue};
use mirra_embedded::{Error, RadioTransport, ReceiveOptions};

mod common;
use common::mock_network::{GATEWAY, MockNetwork, NODE_A, NODE_B};

fn readout(time: u32) -> Message {
    Message::new(
        NODE_A,
        GATEWAY,
        MessagePayload::SensorData(SensorData::new(time, vec![SensorValue::new(1, 2.5)])),
    )
}

#[tokio::test]
async fn test_receive_filters_by_type_and_source() {
    let network = MockNetwork::new();
    let mut node = RadioTransport::new(network.air.radio(NODE_A), &MockNetwork::transport());
    let mut other = RadioTransport::new(network.air.radio(NODE_B), &MockNetwork::transport());
    let mut gateway = RadioTransport::new(network.air.radio(GATEWAY), &MockNetwork::transport());

    let options = ReceiveOptions::new(MessageType::TimeConfig, Duration::from_millis(500))
        .from_source(GATEWAY);

    let (received, _) = join(node.receive(&options), async {
        // Wrong source, then wrong type, then the match
        other
            .send(&Message::new(NODE_B, NODE_A, MessagePayload::TimeConfig(Default::default())))
            .await
            .unwrap();
        gateway
            .send(&Message::new(GATEWAY, NODE_A, MessagePayload::AckData))
            .await
            .unwrap();
        gateway
            .send(&Message::new(GATEWAY, NODE_A, MessagePayload::TimeConfig(Default::default())))
            .await
            .unwrap();
    })
    .await;

    let message = received.unwrap();
    assert_eq!(message.source(), GATEWAY);
    assert!(message.is_type(MessageType::TimeConfig));
}

#[tokio::test]
async fn test_receive_ignores_other_destinations() {
    let network = MockNetwork::new();
    let mut node = RadioTransport::new(network.air.radio(NODE_A), &MockNetwork::transport());
    let mut gateway = RadioTransport::new(network.air.radio(GATEWAY), &MockNetwork::transport());

    let options = ReceiveOptions::new(MessageType::All, Duration::from_millis(200));
    let (received, _) = join(node.receive(&options), async {
        gateway
            .send(&Message::new(GATEWAY, NODE_B, MessagePayload::AckData))
            .await
            .unwrap();
    })
    .await;
    assert_eq!(received, Err(Error::TimeoutError));

    let options = options.promiscuous();
    let (received, _) = join(node.receive(&options), async {
        gateway
            .send(&Message::new(GATEWAY, NODE_B, MessagePayload::AckData))
            .await
            .unwrap();
    })
    .await;
    assert_eq!(received.unwrap().dest(), NODE_B);
}

#[tokio::test]
async fn test_retry_bound() {
    let network = MockNetwork::new();
    let mut node = RadioTransport::new(network.air.radio(NODE_A), &MockNetwork::transport());

    let options = ReceiveOptions::new(MessageType::AckData, Duration::from_millis(300))
        .with_attempts(2)
        .from_source(GATEWAY);

    let start = Instant::now();
    let result = node.receive(&options).await;
    let elapsed = start.elapsed();

    assert_eq!(result, Err(Error::TimeoutError));
    assert_eq!(network.air.count(MessageType::Repeat), 2);
    assert!(elapsed >= Duration::from_millis(300));
    assert!(elapsed < Duration::from_millis(450), "took {:?}", elapsed);

    let repeats: Vec<Message> = network
        .air
        .transmitted()
        .into_iter()
        .filter(|m| m.is_type(MessageType::Repeat))
        .collect();
    assert!(repeats.iter().all(|m| m.dest() == GATEWAY));
    assert!(node.last_sent().is_none());
}

#[tokio::test]
async fn test_repeat_triggers_single_retransmission() {
    let network = MockNetwork::new();
    let mut node = RadioTransport::new(network.air.radio(NODE_A), &MockNetwork::transport());
    let mut gateway = RadioTransport::new(network.air.radio(GATEWAY), &MockNetwork::transport());

    let mut dropped = false;
    network.air.set_loss(move |message| {
        if !dropped && message.is_type(MessageType::SensorData) {
            dropped = true;
            return true;
        }
        false
    });

    let sent = readout(100);
    let (acked, received) = join(
        async {
            node.send(&sent).await.unwrap();
            node.receive(
                &ReceiveOptions::new(MessageType::AckData, Duration::from_millis(1000))
                    .from_source(GATEWAY),
            )
            .await
        },
        async {
            let options = ReceiveOptions::new(MessageType::SensorData, Duration::from_millis(400))
                .with_attempts(1)
                .from_source(NODE_A);
            let message = gateway.receive(&options).await;
            gateway
                .send(&Message::new(GATEWAY, NODE_A, MessagePayload::AckData))
                .await
                .unwrap();
            message
        },
    )
    .await;

    assert_eq!(received.unwrap(), sent);
    assert!(acked.unwrap().is_type(MessageType::AckData));
    assert_eq!(network.air.count(MessageType::Repeat), 1);
    assert_eq!(network.air.count(MessageType::SensorData), 2);
    // REPEAT is never remembered as the last message
    assert_eq!(gateway.last_sent().unwrap().message_type(), MessageType::AckData);
}

#[tokio::test]
async fn test_waiting_for_repeat_returns_after_answering_it() {
    let network = MockNetwork::new();
    let mut node = RadioTransport::new(network.air.radio(NODE_A), &MockNetwork::transport());
    let mut gateway = RadioTransport::new(network.air.radio(GATEWAY), &MockNetwork::transport());

    let start = Instant::now();
    let (drained, _) = join(
        async {
            node.send(&readout(100)).await.unwrap();
            node.receive(
                &ReceiveOptions::new(MessageType::Repeat, Duration::from_millis(1000))
                    .from_source(GATEWAY),
            )
            .await
        },
        async {
            for _ in 0..2 {
                Timer::after(Duration::from_millis(50)).await;
                gateway.send(&Message::repeat(GATEWAY, NODE_A)).await.unwrap();
            }
        },
    )
    .await;

    assert!(drained.unwrap().is_type(MessageType::Repeat));
    assert!(start.elapsed() < Duration::from_millis(500));
    assert_eq!(network.air.count(MessageType::Repeat), 2);
    // The second REPEAT found the node asleep
    assert_eq!(network.air.count(MessageType::SensorData), 2);
}

#[tokio::test]
async fn test_crc_error_skipped() {
    let network = MockNetwork::new();
    let mut node = RadioTransport::new(network.air.radio(NODE_A), &MockNetwork::transport());
    let mut gateway = RadioTransport::new(network.air.radio(GATEWAY), &MockNetwork::transport());

    network.air.set_corruption(|message| {
        message
            .as_sensor_data()
            .is_some_and(|data| data.time == 1)
    });

    let options = ReceiveOptions::new(MessageType::SensorData, Duration::from_millis(500));
    let (received, _) = join(gateway.receive(&options), async {
        node.send(&readout(1)).await.unwrap();
        node.send(&readout(2)).await.unwrap();
    })
    .await;

    assert_eq!(received.unwrap(), readout(2));
    assert_eq!(network.air.count(MessageType::Repeat), 0);
}

#[tokio::test]
async fn test_pre_listen_extends_first_slice() {
    let network = MockNetwork::new();
    let mut node = RadioTransport::new(network.air.radio(NODE_A), &MockNetwork::transport());

    let options = ReceiveOptions::new(MessageType::AckData, Duration::from_millis(100))
        .with_pre_listen(Duration::from_millis(200));

    let start = Instant::now();
    assert_eq!(node.receive(&options).await, Err(Error::TimeoutError));
    assert!(start.elapsed() >= Duration::from_millis(300));
}
