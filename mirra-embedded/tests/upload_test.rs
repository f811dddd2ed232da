use mirra_api::wire::FrameHeader;
use mirra_api::{Message, MessagePayload, SensorData, SensorValue, encode};
use mirra_embedded::mock::{MockPlatform, MockUplink};
use mirra_embedded::{Error, Gateway};

mod common;
use common::mock_network::{GATEWAY, MockNetwork, NODE_A, NODE_B, T};

fn readout(node: mirra_api::MacAddress, time: u32) -> Message {
    Message::new(
        node,
        GATEWAY,
        MessagePayload::SensorData(SensorData::new(time, vec![SensorValue::new(0x21, 3.0)])),
    )
}

fn gateway_with_readouts(network: &MockNetwork, uplink: MockUplink) -> Gateway<MockPlatform, MockUplink> {
    let mut config = MockNetwork::gateway_config();
    config.max_upload_errors = 2;
    let mut gateway = network.gateway_with(config, uplink);
    gateway.load().unwrap();

    let mut data_log = gateway.data_log();
    data_log.append(&readout(NODE_A, T + 1)).unwrap();
    data_log.append(&readout(NODE_B, T + 2)).unwrap();
    data_log.append(&readout(NODE_A, T + 3)).unwrap();
    gateway
}

#[tokio::test]
async fn test_upload_publishes_pending_readouts() {
    let network = MockNetwork::new();
    let mut gateway = gateway_with_readouts(&network, MockUplink::new());

    assert_eq!(gateway.upload_period().await.unwrap(), 3);

    let published = &gateway.uplink().published;
    assert_eq!(published.len(), 3);
    assert_eq!(
        published[0].0,
        "fornalab/B4:E6:2D:AA:BB:CC/B4:E6:2D:01:02:03"
    );
    assert_eq!(
        published[1].0,
        "fornalab/B4:E6:2D:AA:BB:CC/B4:E6:2D:04:05:06"
    );
    let frame = encode(&readout(NODE_A, T + 1));
    assert_eq!(published[0].1, frame[FrameHeader::SIZE..].to_vec());

    assert!(gateway.data_log().pending().unwrap().is_empty());
    assert_eq!(gateway.state().comm_periods, 0);

    // Nothing left to send
    assert_eq!(gateway.upload_period().await.unwrap(), 0);
    assert_eq!(gateway.uplink().published.len(), 3);
}

#[tokio::test]
async fn test_publish_failures_stay_pending() {
    let network = MockNetwork::new();
    let mut gateway = gateway_with_readouts(&network, MockUplink::failing(1));

    assert_eq!(gateway.upload_period().await.unwrap(), 2);

    let pending = gateway.data_log().pending().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].1, readout(NODE_A, T + 1));
}

#[tokio::test]
async fn test_error_bound_aborts_upload() {
    let network = MockNetwork::new();
    let mut gateway = gateway_with_readouts(&network, MockUplink::failing(100));

    assert_eq!(gateway.upload_period().await, Err(Error::UplinkFault));
    assert_eq!(gateway.uplink().failing_publishes, 98);
    assert_eq!(gateway.data_log().pending().unwrap().len(), 3);
}

#[tokio::test]
async fn test_unreachable_uplink_defers_everything() {
    let network = MockNetwork::new();
    let mut gateway = gateway_with_readouts(&network, MockUplink::refusing());

    assert_eq!(gateway.upload_period().await, Err(Error::UplinkFault));
    assert_eq!(gateway.uplink().connect_attempts, 3);
    assert!(gateway.uplink().published.is_empty());
    assert_eq!(gateway.data_log().pending().unwrap().len(), 3);
    assert_eq!(gateway.state().comm_periods, 0);
}
