//! Heading estimation from the gyro Z rate
//!
//! Yaw is the integral of the bias-corrected Z rate, in degrees, counter-clockwise
//! positive and not wrapped: heading hold compares two values of the same
//! continuous angle, so wrapping would only add a discontinuity.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use heapless::Vec;

use crate::config::{HeadingConfig, MAX_CALIBRATION_SAMPLES};
use crate::driver::mpu6050::Mpu6050;

/// Bias compensation and dead-band for the gyro Z axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OrientationEstimator {
    dead_band_dps: f32,
}

impl OrientationEstimator {
    pub fn new(dead_band_dps: f32) -> Self {
        Self { dead_band_dps }
    }

    /// Bias-corrected rate, zero inside the dead-band
    pub fn corrected_rate(&self, raw_dps: f32, bias: f32) -> f32 {
        let rate = raw_dps - bias;
        if libm::fabsf(rate) < self.dead_band_dps {
            0.0
        } else {
            rate
        }
    }

    /// Yaw after `dt` seconds at `raw_dps`
    pub fn integrate(&self, yaw: f32, raw_dps: f32, bias: f32, dt: f32) -> f32 {
        if dt <= 0.0 {
            return yaw;
        }
        yaw + self.corrected_rate(raw_dps, bias) * dt
    }
}

/// Mean of stationary rate samples, `None` for an empty set
pub fn bias_from_samples(samples: impl IntoIterator<Item = f32>) -> Option<f32> {
    let (sum, count) = samples
        .into_iter()
        .fold((0.0f32, 0u32), |(sum, count), s| (sum + s, count + 1));
    (count > 0).then(|| sum / count as f32)
}

/// Measure the gyro Z bias with the robot at rest
///
/// Must finish before navigation starts. Failed reads are skipped; `None` means no
/// sample could be read at all and the gyro should be treated as absent.
pub async fn calibrate_bias<I: I2c, D: DelayNs>(
    imu: &mut Mpu6050<I>,
    delay: &mut D,
    config: &HeadingConfig,
) -> Option<f32> {
    let mut samples: Vec<f32, MAX_CALIBRATION_SAMPLES> = Vec::new();
    for _ in 0..config.calibration_samples.min(MAX_CALIBRATION_SAMPLES) {
        match imu.read_gyro_z().await {
            Ok(rate) => {
                // Bounded by the loop count
                let _ = samples.push(rate);
            }
            Err(e) => log_warn!("Gyro sample failed during calibration: {:?}", e.kind),
        }
        delay.delay_ms(config.calibration_interval_ms).await;
    }

    let bias = bias_from_samples(samples.iter().copied());
    match bias {
        Some(bias) => log_info!("Gyro bias {} dps from {} samples", bias, samples.len()),
        None => log_error!("Gyro calibration failed, heading hold disabled"),
    }
    bias
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dead_band_rejects_noise() {
        let est = OrientationEstimator::new(0.5);
        assert_eq!(est.corrected_rate(1.3, 1.0), 0.0);
        assert_eq!(est.corrected_rate(0.7, 1.0), 0.0);
        assert_eq!(est.corrected_rate(2.0, 1.0), 1.0);
        assert_eq!(est.corrected_rate(-1.0, 1.0), -2.0);
    }

    #[test]
    fn integration_accumulates_rate() {
        let est = OrientationEstimator::new(0.5);
        let mut yaw = 0.0;
        for _ in 0..50 {
            yaw = est.integrate(yaw, 10.0, 0.0, 0.02);
        }
        assert!((yaw - 10.0).abs() < 1e-3);
    }

    #[test]
    fn stationary_noise_does_not_drift() {
        let est = OrientationEstimator::new(0.5);
        let mut yaw = 0.0;
        for i in 0..1000 {
            let noise = if i % 2 == 0 { 0.3 } else { -0.2 };
            yaw = est.integrate(yaw, 1.0 + noise, 1.0, 0.02);
        }
        assert_eq!(yaw, 0.0);
    }

    #[test]
    fn bias_is_mean() {
        assert_eq!(bias_from_samples([1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(bias_from_samples([0.0f32; 0]), None);
    }
}
