//! MQ-2 gas sensor
//!
//! The MQ-2 is a heated resistive sensor on a voltage divider with load resistor
//! `RL`; the ADS1115 samples the divider output. Concentration follows the
//! datasheet curve, a straight line in log-log space:
//!
//! ```text
//! Rs    = (Vsupply - V) / V * RL
//! ratio = Rs / R0
//! ppm   = 10 ^ ((log10(ratio) - b) / m)
//! ```
//!
//! `R0` is the sensor resistance in clean air. It is estimated once at startup from
//! stationary samples and never changes afterwards; recalibrating means calling
//! [`GasSensor::calibrate`] again explicitly.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use heapless::Vec;
use serde::Serialize;

use super::ads1115::Ads1115;
use crate::config::{GasConfig, MAX_CALIBRATION_SAMPLES};

/// Full-scale positive code of the ADS1115
const ADC_FULL_SCALE: f32 = 32767.0;

/// Severity of a gas reading, ordered from harmless to critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
#[serde(rename_all = "lowercase")]
pub enum AlertLevel {
    Normal,
    Warning,
    Danger,
    Critical,
}

impl AlertLevel {
    /// Readings at this level or above stop the robot
    pub fn requires_stop(self) -> bool {
        self >= AlertLevel::Danger
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlertLevel::Normal => "normal",
            AlertLevel::Warning => "warning",
            AlertLevel::Danger => "danger",
            AlertLevel::Critical => "critical",
        }
    }
}

/// One gas sample
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct GasReading {
    pub adc_value: i16,
    pub voltage: f32,
    pub ppm: f32,
    pub alert_status: AlertLevel,
}

/// Clean-air baseline
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct GasCalibration {
    /// Baseline resistance R0 (kΩ)
    pub r0: f32,
    pub calibrated: bool,
}

impl GasCalibration {
    pub const UNCALIBRATED: GasCalibration = GasCalibration {
        r0: 1.0,
        calibrated: false,
    };
}

/// Raw ADS1115 code to volts
pub fn adc_to_voltage(raw: i16, reference: f32) -> f32 {
    f32::from(raw) * reference / ADC_FULL_SCALE
}

/// Divider output voltage to sensor resistance, `None` when the voltage is not positive
pub fn sensor_resistance(voltage: f32, config: &GasConfig) -> Option<f32> {
    if voltage <= 0.0 {
        return None;
    }
    Some((config.supply_voltage - voltage) / voltage * config.load_resistance)
}

/// Rs/R0 to concentration on the log-log curve `(m, b)`
///
/// A non-positive ratio has no logarithm and reads as 0 ppm. A ratio so small
/// that the curve overflows saturates at `f32::MAX`.
pub fn ppm_from_ratio(ratio: f32, m: f32, b: f32) -> f32 {
    if !(ratio > 0.0) {
        return 0.0;
    }
    let ppm = libm::powf(10.0, (libm::log10f(ratio) - b) / m);
    if ppm.is_nan() {
        0.0
    } else {
        ppm.clamp(0.0, f32::MAX)
    }
}

/// Map a concentration onto the three ascending thresholds
pub fn classify(ppm: f32, config: &GasConfig) -> AlertLevel {
    if ppm >= config.critical_ppm {
        AlertLevel::Critical
    } else if ppm >= config.danger_ppm {
        AlertLevel::Danger
    } else if ppm >= config.warning_ppm {
        AlertLevel::Warning
    } else {
        AlertLevel::Normal
    }
}

/// Baseline from clean-air voltages, `None` if no sample was usable
pub fn r0_from_voltages(voltages: impl IntoIterator<Item = f32>, config: &GasConfig) -> Option<f32> {
    let (sum, count) = voltages
        .into_iter()
        .filter_map(|v| sensor_resistance(v, config))
        .fold((0.0f32, 0u32), |(sum, count), rs| (sum + rs, count + 1));
    if count == 0 {
        return None;
    }
    Some(sum / count as f32 / config.clean_air_factor)
}

/// Concentration and severity for one divider voltage
pub fn evaluate(voltage: f32, r0: f32, config: &GasConfig) -> (f32, AlertLevel) {
    let ppm = match sensor_resistance(voltage, config) {
        Some(rs) => ppm_from_ratio(rs / r0, config.curve_m, config.curve_b),
        None => 0.0,
    };
    (ppm, classify(ppm, config))
}

/// MQ-2 read through an ADS1115
pub struct GasSensor<I, D> {
    adc: Ads1115<I, D>,
    config: GasConfig,
    calibration: GasCalibration,
}

impl<I: I2c, D: DelayNs> GasSensor<I, D> {
    pub fn new(i2c: I, delay: D, address: u8, config: GasConfig) -> Self {
        Self {
            adc: Ads1115::new(i2c, delay, address),
            config,
            calibration: GasCalibration::UNCALIBRATED,
        }
    }

    pub fn calibration(&self) -> GasCalibration {
        self.calibration
    }

    /// Sample clean air and fix R0
    ///
    /// Blocks its task for `calibration_samples × (conversion + interval)`. Failed
    /// reads and non-positive voltages are skipped; if none remain the sensor stays
    /// uncalibrated and [`GasSensor::read`] keeps returning `None`.
    pub async fn calibrate(&mut self) -> GasCalibration {
        let mut voltages: Vec<f32, MAX_CALIBRATION_SAMPLES> = Vec::new();
        for _ in 0..self.config.calibration_samples.min(MAX_CALIBRATION_SAMPLES) {
            if let Some(raw) = self.sample().await {
                // Bounded by the loop count
                let _ = voltages.push(adc_to_voltage(raw, self.config.adc_reference));
            }
            self.adc.delay().delay_ms(self.config.calibration_interval_ms).await;
        }

        match r0_from_voltages(voltages.iter().copied(), &self.config) {
            Some(r0) if r0 > 0.0 => {
                self.calibration = GasCalibration { r0, calibrated: true };
                log_info!("MQ-2 calibrated, R0 = {} kOhm from {} samples", r0, voltages.len());
            }
            _ => log_warn!("MQ-2 calibration failed, {} samples read", voltages.len()),
        }
        self.calibration
    }

    /// One reading, `None` until the sensor is calibrated or when the ADC does not answer
    pub async fn read(&mut self) -> Option<GasReading> {
        if !self.calibration.calibrated {
            return None;
        }
        let adc_value = self.sample().await?;
        let voltage = adc_to_voltage(adc_value, self.config.adc_reference);
        let (ppm, alert_status) = evaluate(voltage, self.calibration.r0, &self.config);
        Some(GasReading {
            adc_value,
            voltage,
            ppm,
            alert_status,
        })
    }

    /// Raw code of the gas channel, `None` when the ADC does not answer
    async fn sample(&mut self) -> Option<i16> {
        match self.adc.read_raw(self.config.channel).await {
            Ok(raw) => Some(raw),
            Err(e) => {
                log_warn!("Gas ADC {} read failed: {:?}", e.address, e.kind);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    const GAS: GasConfig = Config::DEFAULT.gas;

    #[test]
    fn non_positive_ratio_reads_zero() {
        assert_eq!(ppm_from_ratio(0.0, GAS.curve_m, GAS.curve_b), 0.0);
        assert_eq!(ppm_from_ratio(-1.5, GAS.curve_m, GAS.curve_b), 0.0);
        assert_eq!(ppm_from_ratio(f32::NAN, GAS.curve_m, GAS.curve_b), 0.0);
    }

    #[test]
    fn ppm_does_not_increase_with_ratio() {
        let mut last = f32::INFINITY;
        let mut ratio = 1e-20f32;
        while ratio < 20.0 {
            let ppm = ppm_from_ratio(ratio, GAS.curve_m, GAS.curve_b);
            assert!(ppm <= last, "ppm rose at ratio {}", ratio);
            last = ppm;
            ratio *= 1.1;
        }
    }

    #[test]
    fn overflowing_curve_saturates_as_critical() {
        let ppm = ppm_from_ratio(1e-30, GAS.curve_m, GAS.curve_b);
        assert_eq!(ppm, f32::MAX);
        assert_eq!(classify(ppm, &GAS), AlertLevel::Critical);
    }

    #[test]
    fn ratio_one_matches_curve_intercept() {
        // log10(1) = 0, so ppm = 10^(-b/m)
        let expected = libm::powf(10.0, -GAS.curve_b / GAS.curve_m);
        assert!((ppm_from_ratio(1.0, GAS.curve_m, GAS.curve_b) - expected).abs() < 0.01);
    }

    #[test]
    fn classification_thresholds() {
        assert_eq!(classify(0.0, &GAS), AlertLevel::Normal);
        assert_eq!(classify(GAS.warning_ppm - 0.1, &GAS), AlertLevel::Normal);
        assert_eq!(classify(GAS.warning_ppm, &GAS), AlertLevel::Warning);
        assert_eq!(classify(GAS.danger_ppm, &GAS), AlertLevel::Danger);
        assert_eq!(classify(GAS.critical_ppm + 1.0, &GAS), AlertLevel::Critical);
        assert!(!AlertLevel::Warning.requires_stop());
        assert!(AlertLevel::Danger.requires_stop());
        assert!(AlertLevel::Critical.requires_stop());
    }

    #[test]
    fn resistance_needs_positive_voltage() {
        assert_eq!(sensor_resistance(0.0, &GAS), None);
        assert_eq!(sensor_resistance(-0.2, &GAS), None);
        // 1 V on a 5 V divider with 10 kΩ load: Rs = 4 / 1 * 10
        assert_eq!(sensor_resistance(1.0, &GAS), Some(40.0));
    }

    #[test]
    fn baseline_is_mean_resistance_over_clean_air_factor() {
        let r0 = r0_from_voltages([1.0, 1.0, 1.0], &GAS).unwrap_or(0.0);
        assert!((r0 - 40.0 / GAS.clean_air_factor).abs() < 1e-4);
        assert_eq!(r0_from_voltages([0.0, -1.0], &GAS), None);
    }

    #[test]
    fn clean_air_reads_normal() {
        let r0 = r0_from_voltages([1.0], &GAS).unwrap_or(1.0);
        let (ppm, level) = evaluate(1.0, r0, &GAS);
        // ratio equals the clean-air factor
        assert!(ppm < GAS.warning_ppm, "clean air gave {} ppm", ppm);
        assert_eq!(level, AlertLevel::Normal);
    }

    #[test]
    fn voltage_above_supply_reads_zero() {
        let (ppm, level) = evaluate(5.5, 4.0, &GAS);
        assert_eq!(ppm, 0.0);
        assert_eq!(level, AlertLevel::Normal);
    }
}
