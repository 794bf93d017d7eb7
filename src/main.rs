//! Robot firmware entry point
//!
//! Initializes the shared bus, calibrates the gyro and the gas sensor, then spawns
//! the control tasks.

#![no_std]
#![no_main]

use embassy_executor::Spawner;
use embassy_rp::block::ImageDef;
use embassy_time::Delay;
use {defmt_rtt as _, panic_probe as _};

use hermes_robot::control::navigation::NavigationController;
use hermes_robot::control::orientation::calibrate_bias;
use hermes_robot::driver::gas::GasSensor;
use hermes_robot::driver::mpu6050::Mpu6050;

use crate::resources::{device, AssignedResources, BusResources, LinkResources, MotorResources};
use crate::shared::CONFIG;
use crate::task::{
    link::link, navigate::navigate, sensors_fast::fast_sensors_read, sensors_slow::slow_sensors_read,
    watchdog::safety_watch,
};

/// Firmware image type for bootloader
#[link_section = ".start_block"]
#[used]
pub static IMAGE_DEF: ImageDef = ImageDef::secure_exe();

/// Pin and peripheral allocation
mod resources;
/// State shared between tasks
mod shared;
/// Task implementations
mod task;

/// Firmware entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    let p = embassy_rp::init(Default::default());

    // Split the resources into separate groups for each task
    let r = split_resources!(p);

    let i2c_bus = resources::init_i2c(r.bus, &CONFIG);

    // Gyro bias must be known before navigation starts, so this runs to completion
    // before any task is spawned. A missing IMU leaves heading hold disabled.
    let mut imu = Mpu6050::new(device(i2c_bus), CONFIG.bus.imu);
    let gyro_bias = match imu.init().await {
        Ok(()) => calibrate_bias(&mut imu, &mut Delay, &CONFIG.heading).await,
        Err(e) => {
            defmt::error!("MPU6050 not found at {}: {:?}", e.address, e.kind);
            None
        }
    };
    let gyro_available = gyro_bias.is_some();

    // Same for the MQ-2 baseline: no command can reach the motors while it samples
    let mut gas = GasSensor::new(device(i2c_bus), Delay, CONFIG.bus.adc, CONFIG.gas);
    gas.calibrate().await;

    shared::init_navigator(NavigationController::new(&CONFIG, gyro_bias));
    defmt::info!("{} ready, heading hold: {}", CONFIG.device_name, gyro_available);

    // Finally spawn all the tasks
    spawner.spawn(navigate(i2c_bus, r.motors, gyro_available)).unwrap();
    spawner.spawn(safety_watch()).unwrap();
    spawner.spawn(fast_sensors_read(i2c_bus, gas, gyro_available)).unwrap();
    spawner.spawn(slow_sensors_read(i2c_bus)).unwrap();
    spawner.spawn(link(r.link)).unwrap();
}
