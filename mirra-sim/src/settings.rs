use std::error::Error;

use mirra_embedded::{GatewayConfig, MAX_SENSOR_NODES, NodeConfig};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logger {
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Simulation {
    /// Epoch every device clock starts at
    pub start_epoch: u32,
    /// Simulated seconds to run for
    pub horizon: u32,
    pub nodes: usize,
    /// Probability that a frame is lost on the air
    pub loss_rate: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub logger: Logger,
    pub simulation: Simulation,
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub node: NodeConfig,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("{0} nodes requested, more than one gateway can serve")]
    TooManyNodes(usize),
    #[error("loss rate {0} is not a probability")]
    InvalidLossRate(f64),
    #[error("gateway must upload after at least one comm period")]
    NoUploadPeriod,
}

impl Settings {
    pub fn new() -> Result<Self, Box<dyn Error>> {
        let settings: Settings = toml::from_str(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../",
            "configs/default.toml"
        )))?;

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.simulation.nodes > MAX_SENSOR_NODES {
            return Err(SettingsError::TooManyNodes(self.simulation.nodes));
        }
        if !(0.0..=1.0).contains(&self.simulation.loss_rate) {
            return Err(SettingsError::InvalidLossRate(self.simulation.loss_rate));
        }
        if self.gateway.upload_every == 0 {
            return Err(SettingsError::NoUploadPeriod);
        }
        Ok(())
    }
}
