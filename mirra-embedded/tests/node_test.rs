use embassy_futures::join::join;
use mirra_api::{MacAddress, SensorValue, WakeSource};
use mirra_embedded::mock::MockPlatform;
use mirra_embedded::{Error, NodeTable, Seasonal, Sensor, SensorNode};

mod common;
use common::mock_network::{FixedSensor, GATEWAY, MockNetwork, NODE_A, T};

/// Node that gives up on discovery quickly and does not retry for a day.
fn lonely_node(network: &MockNetwork, sensors: Vec<Box<dyn Sensor>>) -> SensorNode<MockPlatform> {
    let mut config = MockNetwork::node_config();
    config.discovery_timeout_ms = 50;
    config.discovery_retry_interval = 86_400;
    network.node_with(NODE_A, sensors, config)
}

#[tokio::test]
async fn test_sample_appends_readout() {
    let network = MockNetwork::new();
    let mut node = lonely_node(&network, vec![FixedSensor::boxed(1, 21.5)]);

    let plan = node.wake_and_sleep().await.unwrap();
    assert_eq!(plan.wake_at, T + 3600);
    assert_eq!(node.state().next_discovery_time, T + 86_400);
    assert!(node.data_log().read_all().unwrap().is_empty());

    node.wake_and_sleep().await.unwrap();
    assert_eq!(node.state().schedule.next_sample_time, T + 7200);

    let pending = node.data_log().pending().unwrap();
    assert_eq!(pending.len(), 1);
    let message = &pending[0].1;
    assert_eq!(message.source(), NODE_A);
    assert_eq!(message.dest(), MacAddress::BROADCAST);

    let data = message.as_sensor_data().unwrap();
    assert_eq!(data.time, T + 3600);
    assert_eq!(data.values(), &[SensorValue::with_type(0x10, 1, 21.5)]);
}

#[tokio::test]
async fn test_deep_sleep_arms_alarm() {
    let network = MockNetwork::new();
    let mut node = lonely_node(&network, vec![FixedSensor::boxed(1, 21.5)]);

    node.wake_and_sleep().await.unwrap();
    assert_eq!(node.board().clock.alarm(), Some(T + 3600));
    assert_eq!(node.board().power.deep_sleeps(), &[(WakeSource::RtcAlarm, 3600)]);
    assert_eq!(network.time.now(), T + 3600);
}

#[tokio::test]
async fn test_seasonal_sensor_gets_own_schedule() {
    let network = MockNetwork::new();
    let seasonal: Box<dyn Sensor> = Box::new(Seasonal::new(FixedSensor { id: 2, value: 1.0 }));
    let mut node = lonely_node(&network, vec![FixedSensor::boxed(1, 21.5), seasonal]);

    node.wake_and_sleep().await.unwrap();
    node.wake_and_sleep().await.unwrap();

    let state = node.state();
    assert_eq!(state.adaptive_schedule(1), None);
    let next = state.adaptive_schedule(2).unwrap();
    assert!(next > T + 3600);
    assert!(next <= T + 3600 + 2 * 86_400);

    let pending = node.data_log().pending().unwrap();
    assert_eq!(pending[0].1.as_sensor_data().unwrap().n_values(), 2);
}

#[tokio::test]
async fn test_storage_fault_formats_and_restarts() {
    let network = MockNetwork::new();
    let mut node = lonely_node(&network, vec![]);
    node.board().fs.set_faulty(true);

    assert_eq!(node.wake().await, Err(Error::StorageFault));
    assert_eq!(node.board().power.restarts(), 1);
    assert!(!node.state().initialized);

    // The format cleared the fault, the next boot proceeds
    node.wake().await.unwrap();
    assert!(node.state().initialized);
    assert_eq!(node.board().power.restarts(), 1);
}

#[tokio::test]
async fn test_gateway_first_wake_runs_discovery() {
    let network = MockNetwork::new();
    let mut gateway = network.gateway();
    let mut node = network.node(NODE_A, vec![]);

    let (plan, _) = join(gateway.wake(), node.wake()).await;
    let plan = plan.unwrap();

    assert_eq!(gateway.nodes().len(), 1);
    assert_eq!(node.state().gateway, GATEWAY);
    assert_eq!(gateway.state().next_discovery_time, T + 86_400);
    assert_eq!(plan.wake_at, T + 86_400 - 10);
}

#[tokio::test]
async fn test_gateway_drops_unreadable_node_table() {
    let network = MockNetwork::new();
    let mut gateway = network.gateway();
    let mut node = network.node(NODE_A, vec![]);
    let (plan, _) = join(gateway.wake(), node.wake()).await;
    plan.unwrap();
    assert_eq!(gateway.nodes().len(), 1);

    gateway.board().fs.write("/nodes.dat", &[0xFF; 7]);

    let plan = gateway.wake_and_sleep().await.unwrap();
    assert!(gateway.nodes().is_empty());
    assert!(gateway.state().next_discovery_time > T);
    assert_eq!(gateway.board().power.deep_sleeps().len(), 1);
    assert!(plan.wake_at > T);

    // The empty table was written back in place of the garbage
    let stored = NodeTable::load(&mut gateway.board().fs.clone(), "/nodes.dat").unwrap();
    assert!(stored.is_empty());
}
