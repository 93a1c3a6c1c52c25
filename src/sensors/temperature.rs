//! NTC thermistor temperature sensor (10 kOhm @ 25 C, B = 3950).
//!
//! Wired in a voltage-divider with a fixed 10 kOhm resistor, read via
//! the ESP32 ADC. The simplified Beta (Steinhart-Hart) equation converts
//! resistance to temperature.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads the thermistor channel through [`crate::drivers::adc`].
//! On host/test: reads from a static AtomicU16 for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

use crate::app::ports::SamplePort;
use crate::config::TempUnit;
use crate::error::SensorError;

#[cfg(not(target_os = "espidf"))]
static SIM_TEMP_ADC: AtomicU16 = AtomicU16::new(2048);

/// Inject a raw ADC count for host builds (2048 reads as 25.0 C).
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_temp_adc(raw: u16) {
    SIM_TEMP_ADC.store(raw, Ordering::Relaxed);
}

const R25: f32 = 10_000.0;
const BETA: f32 = 3950.0;
const T25_K: f32 = 298.15;
const R_DIVIDER: f32 = 10_000.0;
const ADC_MAX: f32 = 4095.0;
const V_REF: f32 = 3.3;

/// The thermistor behind the [`SamplePort`] boundary.
///
/// Stateless between reads, so a single instance can serve both the tick
/// loop and the on-demand HTTP path.
pub struct TemperatureSensor {
    _private: (),
}

impl TemperatureSensor {
    pub fn new() -> Self {
        Self { _private: () }
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> Result<u16, SensorError> {
        crate::drivers::adc::read_raw()
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> Result<u16, SensorError> {
        Ok(SIM_TEMP_ADC.load(Ordering::Relaxed))
    }
}

impl Default for TemperatureSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl SamplePort for TemperatureSensor {
    fn sample(&self, unit: TempUnit) -> Result<f32, SensorError> {
        let raw = self.read_adc()?;
        let celsius = adc_to_celsius(raw)?;
        Ok(unit.from_celsius(celsius))
    }
}

/// Beta-equation conversion.  Counts at either rail mean the thermistor is
/// shorted or disconnected, not a real temperature.
fn adc_to_celsius(raw: u16) -> Result<f32, SensorError> {
    let voltage = (f32::from(raw) / ADC_MAX) * V_REF;
    if voltage <= 0.01 || voltage >= (V_REF - 0.01) {
        return Err(SensorError::OutOfRange);
    }
    let r_ntc = R_DIVIDER * voltage / (V_REF - voltage);
    let inv_t = (1.0 / T25_K) + (1.0 / BETA) * (r_ntc / R25).ln();
    if inv_t <= 0.0 {
        return Err(SensorError::OutOfRange);
    }
    Ok((1.0 / inv_t) - 273.15)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn midscale_count_reads_as_reference_temperature() {
        // 2048/4095 puts the divider at R25 exactly.
        let c = adc_to_celsius(2048).unwrap();
        assert!((c - 25.0).abs() < 0.1, "got {c}");
    }

    #[test]
    fn ntc_reads_colder_as_counts_rise() {
        let cold = adc_to_celsius(3000).unwrap();
        let warm = adc_to_celsius(1000).unwrap();
        assert!(cold < 25.0 && 25.0 < warm, "cold={cold} warm={warm}");
    }

    #[test]
    fn rail_counts_are_out_of_range() {
        assert_eq!(adc_to_celsius(0), Err(SensorError::OutOfRange));
        assert_eq!(adc_to_celsius(4095), Err(SensorError::OutOfRange));
    }

    // Single test for the injectable static so parallel tests never race it.
    #[test]
    fn sim_injection_flows_through_the_port() {
        let sensor = TemperatureSensor::new();
        sim_set_temp_adc(2048);
        let c = sensor.sample(TempUnit::Celsius).unwrap();
        assert!((c - 25.0).abs() < 0.1);
        let f = sensor.sample(TempUnit::Fahrenheit).unwrap();
        assert!((f - 77.0).abs() < 0.2, "got {f}");
        sim_set_temp_adc(0);
        assert_eq!(
            sensor.sample(TempUnit::Celsius),
            Err(SensorError::OutOfRange)
        );
        sim_set_temp_adc(2048);
    }
}
