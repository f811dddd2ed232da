use embedded_io::Read;
use mirra_api::SensorValue;

use super::Sensor;
use crate::error::{Error, Result};

/// Sensor type id carried in the value tag
pub const TEMPERATURE_TYPE: u16 = 0x001;

#[derive(Debug, Clone, Copy)]
pub struct ThermistorCalibration {
    /// Divider resistor (ohm)
    pub reference_resistor: f32,
    /// NTC resistance at 25°C (ohm)
    pub r25: f32,
    /// Beta coefficient (K)
    pub beta: f32,
    pub adc_max_value: u16,
}

impl Default for ThermistorCalibration {
    fn default() -> Self {
        Self {
            reference_resistor: 10000.0,
            r25: 10000.0,
            beta: 3950.0,
            adc_max_value: 4095,
        }
    }
}

/// NTC thermistor behind an ADC that streams big-endian u16 samples.
pub struct Thermistor<IO>
where
    IO: Read,
{
    id: u8,
    instance: u8,
    adc: IO,
    calibration: ThermistorCalibration,
    raw: Option<u16>,
}

impl<IO> Thermistor<IO>
where
    IO: Read,
{
    pub fn new(id: u8, instance: u8, adc: IO) -> Self {
        Self::with_calibration(id, instance, adc, ThermistorCalibration::default())
    }

    pub fn with_calibration(id: u8, instance: u8, adc: IO, calibration: ThermistorCalibration) -> Self {
        Self {
            id,
            instance,
            adc,
            calibration,
            raw: None,
        }
    }

    fn raw_to_celsius(&self, raw_value: u16) -> f32 {
        const T0: f32 = 298.15;

        let adc_value = raw_value as f32;
        if adc_value == 0.0 {
            return 150.0;
        }

        // NTC_R = R_ref * (ADC_max / ADC - 1)
        let adc_max = self.calibration.adc_max_value as f32;
        let ntc_resistance = self.calibration.reference_resistor * (adc_max / adc_value - 1.0);
        if ntc_resistance <= 0.0 {
            return 150.0;
        }

        // 1/T = 1/T0 + ln(R/R0) / B
        let inv_temp = 1.0 / T0 + libm::logf(ntc_resistance / self.calibration.r25) / self.calibration.beta;
        if inv_temp <= 0.0 {
            return 150.0;
        }

        (1.0 / inv_temp - 273.15).clamp(-50.0, 150.0)
    }
}

impl<IO> Sensor for Thermistor<IO>
where
    IO: Read,
{
    fn id(&self) -> u8 {
        self.id
    }

    fn setup(&mut self) -> Result<()> {
        self.raw = None;
        Ok(())
    }

    fn start_measurement(&mut self) -> Result<()> {
        let mut buffer = [0u8; 2];
        self.adc
            .read_exact(&mut buffer)
            .map_err(|_| Error::SensorError)?;

        let raw_value = u16::from_be_bytes(buffer);
        if raw_value > self.calibration.adc_max_value {
            log::warn!("Thermistor {} reading {} out of range", self.id, raw_value);
            return Err(Error::SensorError);
        }

        self.raw = Some(raw_value);
        Ok(())
    }

    fn get_measurement(&mut self) -> Result<SensorValue> {
        let raw_value = self.raw.take().ok_or(Error::SensorError)?;
        Ok(SensorValue::with_type(
            TEMPERATURE_TYPE,
            self.instance,
            self.raw_to_celsius(raw_value),
        ))
    }
}
