//! Fast sensors: gas and IMU at 10 Hz
//!
//! # Gas
//! The MQ-2 arrives already calibrated from startup. Each reading updates the
//! shared alert level and is applied to the emergency stop straight away, without
//! waiting for the next watchdog period. Entering the emergency publishes an alert
//! message.
//!
//! # IMU
//! Accelerometer tilt plus the integrated yaw from the navigation controller are
//! published for the dashboard. Heading itself is integrated by the navigation task.

use embassy_time::{Delay, Duration, Ticker};

use hermes_robot::control::watchdog::EmergencyChange;
use hermes_robot::driver::gas::GasSensor;
use hermes_robot::driver::mpu6050::Mpu6050;
use hermes_robot::system::telemetry::{AlertTelemetry, GasTelemetry, ImuTelemetry, GAS_EMERGENCY_ALERT};

use crate::resources::{device, I2cBusShared, SharedI2c};
use crate::shared::{publish, set_gas_alert, watchdog, with_navigator, CONFIG};

#[embassy_executor::task]
pub async fn fast_sensors_read(
    i2c_bus: &'static I2cBusShared,
    mut gas: GasSensor<SharedI2c, Delay>,
    imu_available: bool,
) {
    let mut imu = Mpu6050::new(device(i2c_bus), CONFIG.bus.imu);
    let safety = watchdog();
    let topics = CONFIG.topics;
    let mut ticker = Ticker::every(Duration::from_millis(CONFIG.schedule.fast_sensors_ms));

    loop {
        if let Some(reading) = gas.read().await {
            set_gas_alert(reading.alert_status);
            let change = with_navigator(|nav| safety.evaluate_gas(nav, Some(reading.alert_status)));
            if change == Some(EmergencyChange::Engaged) {
                publish(topics.gas_alert, &AlertTelemetry { msg: GAS_EMERGENCY_ALERT });
            }
            publish(topics.gas, &GasTelemetry { sensor_data: reading });
        }

        if imu_available {
            match imu.read().await {
                Ok(reading) => {
                    let yaw = with_navigator(|nav| nav.state().yaw).unwrap_or(0.0);
                    publish(topics.imu, &ImuTelemetry::new(&reading, yaw));
                }
                Err(e) => defmt::warn!("IMU read failed: {:?}", e.kind),
            }
        }

        ticker.next().await;
    }
}
