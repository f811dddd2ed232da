use std::rc::Rc;
use std::sync::Arc;

use futures::future::{join, join_all};
use mirra_api::{MacAddress, MessageType};
use mirra_embedded::mock::{MockAir, MockPlatform, VirtualTime, mock_board};
use mirra_embedded::{Gateway, Seasonal, Sensor, SensorNode, Thermistor};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::settings::Settings;
use crate::simulate::{LightSensor, SimulatedAdc};
use crate::uplink::LogUplink;

pub mod settings;
mod simulate;
mod uplink;

const GATEWAY: MacAddress = MacAddress::new([0x24, 0x6F, 0x28, 0x00, 0x00, 0x01]);

fn node_address(index: usize) -> MacAddress {
    MacAddress::new([0x24, 0x6F, 0x28, 0x10, (index >> 8) as u8, index as u8])
}

/// Runs a gateway and its nodes over a lossy shared medium until the
/// simulated horizon passes.
pub async fn run(settings: &Arc<Settings>) {
    let simulation = &settings.simulation;
    let time = VirtualTime::new(simulation.start_epoch);
    let end = simulation.start_epoch.saturating_add(simulation.horizon);

    let air = MockAir::new();
    let loss_rate = simulation.loss_rate;
    let mut rng = StdRng::seed_from_u64(simulation.seed);
    air.set_loss(move |_| rng.random_bool(loss_rate));

    let board = mock_board(&air, &time, GATEWAY, &settings.gateway.transport);
    let gateway = Gateway::new(board, LogUplink::default(), settings.gateway.clone());

    let nodes: Vec<_> = (0..simulation.nodes)
        .map(|index| {
            let mac = node_address(index);
            let board = mock_board(&air, &time, mac, &settings.node.transport);
            let sensors = sensors(&time, simulation.seed.wrapping_add(index as u64));
            SensorNode::new(board, sensors, settings.node.clone())
        })
        .collect();

    tracing::info!(
        "Simulating {} nodes for {}s from {}",
        simulation.nodes,
        simulation.horizon,
        simulation.start_epoch
    );

    let (published, _) = join(
        run_gateway(gateway, &time, end),
        join_all(nodes.into_iter().map(|node| run_node(node, &time, end))),
    )
    .await;

    tracing::info!(
        "Simulation done: {} frames on air ({} readouts, {} repeats), {} published",
        air.transmitted().len(),
        air.count(MessageType::SensorData),
        air.count(MessageType::Repeat),
        published
    );
}

fn sensors(time: &Rc<VirtualTime>, seed: u64) -> Vec<Box<dyn Sensor>> {
    vec![
        Box::new(Thermistor::new(1, 0, SimulatedAdc::new(time.clone(), seed))),
        Box::new(Seasonal::new(LightSensor::new(2, time.clone()))),
    ]
}

async fn run_gateway(
    mut gateway: Gateway<MockPlatform, LogUplink>,
    time: &Rc<VirtualTime>,
    end: u32,
) -> usize {
    while time.now() < end {
        if let Err(e) = gateway.wake_and_sleep().await {
            tracing::error!("Gateway wake failed: {}", e);
        }
    }
    gateway.uplink().published
}

async fn run_node(mut node: SensorNode<MockPlatform>, time: &Rc<VirtualTime>, end: u32) {
    while time.now() < end {
        if let Err(e) = node.wake_and_sleep().await {
            tracing::error!("Node {} wake failed: {}", node.mac_address(), e);
        }
    }

    let pending = node.data_log().pending().map(|records| records.len()).unwrap_or(0);
    tracing::info!("Node {} finished with {} readouts pending", node.mac_address(), pending);
}
