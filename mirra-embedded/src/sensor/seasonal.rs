use mirra_api::{SeasonalSchedule, SensorValue};

use super::Sensor;
use crate::error::Result;

/// Samples the wrapped sensor once a day at a time that follows the seasons,
/// e.g. a camera keyed to sunrise.
pub struct Seasonal<S: Sensor> {
    inner: S,
    schedule: SeasonalSchedule,
}

impl<S: Sensor> Seasonal<S> {
    pub fn new(inner: S) -> Self {
        Self::with_schedule(inner, SeasonalSchedule::default())
    }

    pub fn with_schedule(inner: S, schedule: SeasonalSchedule) -> Self {
        Self { inner, schedule }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

impl<S: Sensor> Sensor for Seasonal<S> {
    fn id(&self) -> u8 {
        self.inner.id()
    }

    fn setup(&mut self) -> Result<()> {
        self.inner.setup()
    }

    fn start_measurement(&mut self) -> Result<()> {
        self.inner.start_measurement()
    }

    fn get_measurement(&mut self) -> Result<SensorValue> {
        self.inner.get_measurement()
    }

    fn update_next_sample_time(&mut self, now: u32, _interval: u32) -> Option<u32> {
        Some(self.schedule.delay_until_next(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counter {
        taken: u32,
    }

    impl Sensor for Counter {
        fn id(&self) -> u8 {
            7
        }

        fn setup(&mut self) -> Result<()> {
            Ok(())
        }

        fn start_measurement(&mut self) -> Result<()> {
            self.taken += 1;
            Ok(())
        }

        fn get_measurement(&mut self) -> Result<SensorValue> {
            Ok(SensorValue::with_type(9, 0, self.taken as f32))
        }
    }

    #[test]
    fn test_seasonal_delegates_and_schedules() {
        let mut sensor = Seasonal::with_schedule(Counter { taken: 0 }, SeasonalSchedule::new([3600; 12], 0));
        assert_eq!(sensor.id(), 7);

        sensor.start_measurement().unwrap();
        assert_eq!(sensor.get_measurement().unwrap().value, 1.0);

        // Midnight: the target is one hour away
        assert_eq!(sensor.update_next_sample_time(86_400 * 100, 600), Some(3600));
        // Just after the target: tomorrow
        assert_eq!(
            sensor.update_next_sample_time(86_400 * 100 + 3601, 600),
            Some(86_400 - 1)
        );
    }

    #[test]
    fn test_plain_sensor_follows_grid() {
        let mut sensor = Counter { taken: 0 };
        assert_eq!(sensor.update_next_sample_time(0, 600), None);
    }
}
