use std::f64::consts::PI;
use std::rc::Rc;

use mirra_api::SensorValue;
use mirra_embedded::mock::VirtualTime;
use mirra_embedded::{Result, Sensor, ThermistorCalibration};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

const DAY: u32 = 86_400;

/// Sensor type id of light readings
pub const LIGHT_TYPE: u16 = 0x002;

fn day_fraction(epoch: u32) -> f64 {
    (epoch % DAY) as f64 / DAY as f64
}

pub fn simulated_temperature(day_fraction: f64) -> f64 {
    // Coldest just before sunrise, warmest mid afternoon
    let radians = (day_fraction - 0.375) * 2.0 * PI;
    12.0 + 8.0 * radians.sin()
}

pub fn simulated_lux(day_fraction: f64) -> f64 {
    const MAX_SUNLIGHT_LUX: f64 = 500.0;
    const MAX_MOONLIGHT_LUX: f64 = 5.0;

    const SUNRISE_START: f64 = 0.23;
    const SUNRISE_END: f64 = 0.25;
    const SUNSET_START: f64 = 0.73;
    const SUNSET_END: f64 = 0.75;

    if (SUNRISE_START..=SUNSET_END).contains(&day_fraction) {
        if day_fraction <= SUNRISE_END {
            let ramp = (day_fraction - SUNRISE_START) / (SUNRISE_END - SUNRISE_START);
            (ramp * PI / 2.0).sin() * MAX_SUNLIGHT_LUX
        } else if day_fraction >= SUNSET_START {
            let ramp = (day_fraction - SUNSET_START) / (SUNSET_END - SUNSET_START);
            (ramp * PI / 2.0).cos() * MAX_SUNLIGHT_LUX
        } else {
            MAX_SUNLIGHT_LUX
        }
    } else {
        let radians = day_fraction * 2.0 * PI;
        (radians + PI).cos().max(0.0) * (MAX_MOONLIGHT_LUX - 0.01) + 0.01
    }
}

/// ADC in front of an NTC divider following the simulated temperature curve.
pub struct SimulatedAdc {
    time: Rc<VirtualTime>,
    calibration: ThermistorCalibration,
    rng: StdRng,
}

impl SimulatedAdc {
    pub fn new(time: Rc<VirtualTime>, seed: u64) -> Self {
        Self {
            time,
            calibration: ThermistorCalibration::default(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn sample(&mut self) -> u16 {
        const T0: f64 = 298.15;

        let celsius =
            simulated_temperature(day_fraction(self.time.now())) + self.rng.random_range(-0.5..0.5);
        let kelvin = celsius + 273.15;

        // R = R25 * exp(B * (1/T - 1/T0)), ADC = ADC_max * R_ref / (R + R_ref)
        let calibration = &self.calibration;
        let resistance =
            calibration.r25 as f64 * (calibration.beta as f64 * (1.0 / kelvin - 1.0 / T0)).exp();
        let adc_max = calibration.adc_max_value as f64;
        let reference = calibration.reference_resistor as f64;
        (adc_max * reference / (resistance + reference)).round().clamp(1.0, adc_max) as u16
    }
}

impl embedded_io::ErrorType for SimulatedAdc {
    type Error = embedded_io::ErrorKind;
}

impl embedded_io::Read for SimulatedAdc {
    fn read(&mut self, buf: &mut [u8]) -> core::result::Result<usize, Self::Error> {
        let bytes = self.sample().to_be_bytes();
        let count = buf.len().min(bytes.len());
        buf[..count].copy_from_slice(&bytes[..count]);
        Ok(count)
    }
}

/// Light sensor reading the simulated daylight curve.
pub struct LightSensor {
    id: u8,
    time: Rc<VirtualTime>,
    lux: Option<f32>,
}

impl LightSensor {
    pub fn new(id: u8, time: Rc<VirtualTime>) -> Self {
        Self { id, time, lux: None }
    }
}

impl Sensor for LightSensor {
    fn id(&self) -> u8 {
        self.id
    }

    fn setup(&mut self) -> Result<()> {
        self.lux = None;
        Ok(())
    }

    fn start_measurement(&mut self) -> Result<()> {
        self.lux = Some(simulated_lux(day_fraction(self.time.now())) as f32);
        Ok(())
    }

    fn get_measurement(&mut self) -> Result<SensorValue> {
        let lux = self.lux.take().ok_or(mirra_embedded::Error::SensorError)?;
        Ok(SensorValue::with_type(LIGHT_TYPE, self.id, lux))
    }
}
