mod seasonal;
mod thermistor;

pub use seasonal::*;
pub use thermistor::*;

use mirra_api::SensorValue;

use crate::error::Result;

/// A measurement source attached to a node.
///
/// Sensors are sampled in two phases so several can convert in parallel:
/// every due sensor is started, then every due sensor is read.
pub trait Sensor {
    /// Stable identifier used to track adaptive schedules
    fn id(&self) -> u8;

    /// Powers up and configures the hardware. Called on every wake.
    fn setup(&mut self) -> Result<()>;

    fn start_measurement(&mut self) -> Result<()>;

    fn get_measurement(&mut self) -> Result<SensorValue>;

    /// Seconds until this sensor wants its next sample, or `None` to follow
    /// the node's sampling grid.
    fn update_next_sample_time(&mut self, _now: u32, _interval: u32) -> Option<u32> {
        None
    }
}
