#![allow(dead_code)]

use std::rc::Rc;

use mirra_api::{MacAddress, SensorValue};
use mirra_embedded::mock::{MockAir, MockPlatform, MockUplink, VirtualTime, mock_board};
use mirra_embedded::{
    Gateway, GatewayConfig, NodeConfig, Result, Sensor, SensorNode, TransportConfig,
};

/// Start of every scenario, a whole hour
pub const T: u32 = 1_699_999_200;

pub const GATEWAY: MacAddress = MacAddress::new([0xB4, 0xE6, 0x2D, 0xAA, 0xBB, 0xCC]);
pub const NODE_A: MacAddress = MacAddress::new([0xB4, 0xE6, 0x2D, 0x01, 0x02, 0x03]);
pub const NODE_B: MacAddress = MacAddress::new([0xB4, 0xE6, 0x2D, 0x04, 0x05, 0x06]);

pub struct MockNetwork {
    pub air: MockAir,
    pub time: Rc<VirtualTime>,
}

impl MockNetwork {
    pub fn new() -> Self {
        Self {
            air: MockAir::new(),
            time: VirtualTime::manual(T),
        }
    }

    pub fn transport() -> TransportConfig {
        TransportConfig { send_delay_ms: 5 }
    }

    pub fn gateway_config() -> GatewayConfig {
        GatewayConfig {
            transport: Self::transport(),
            comm_period_padding: 0,
            discovery_timeout_ms: 500,
            time_config_timeout_ms: 300,
            time_config_attempts: 2,
            sensor_data_timeout_ms: 400,
            sensor_data_attempts: 1,
            ..Default::default()
        }
    }

    pub fn node_config() -> NodeConfig {
        NodeConfig {
            transport: Self::transport(),
            discovery_timeout_ms: 1000,
            time_config_timeout_ms: 600,
            time_config_attempts: 1,
            sensor_data_timeout_ms: 600,
            sensor_data_attempts: 1,
            ..Default::default()
        }
    }

    pub fn gateway(&self) -> Gateway<MockPlatform, MockUplink> {
        self.gateway_with(Self::gateway_config(), MockUplink::new())
    }

    pub fn gateway_with(
        &self,
        config: GatewayConfig,
        uplink: MockUplink,
    ) -> Gateway<MockPlatform, MockUplink> {
        let board = mock_board(&self.air, &self.time, GATEWAY, &config.transport);
        Gateway::new(board, uplink, config)
    }

    pub fn node(&self, mac: MacAddress, sensors: Vec<Box<dyn Sensor>>) -> SensorNode<MockPlatform> {
        self.node_with(mac, sensors, Self::node_config())
    }

    pub fn node_with(
        &self,
        mac: MacAddress,
        sensors: Vec<Box<dyn Sensor>>,
        config: NodeConfig,
    ) -> SensorNode<MockPlatform> {
        let board = mock_board(&self.air, &self.time, mac, &config.transport);
        SensorNode::new(board, sensors, config)
    }
}

/// Sensor reporting a constant value.
pub struct FixedSensor {
    pub id: u8,
    pub value: f32,
}

impl FixedSensor {
    pub fn boxed(id: u8, value: f32) -> Box<dyn Sensor> {
        Box::new(Self { id, value })
    }
}

impl Sensor for FixedSensor {
    fn id(&self) -> u8 {
        self.id
    }

    fn setup(&mut self) -> Result<()> {
        Ok(())
    }

    fn start_measurement(&mut self) -> Result<()> {
        Ok(())
    }

    fn get_measurement(&mut self) -> Result<SensorValue> {
        Ok(SensorValue::with_type(0x10, self.id, self.value))
    }
}
