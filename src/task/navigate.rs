//! Navigation loop
//!
//! Runs at 50 Hz. Each tick reads the gyro Z rate, advances the navigation
//! controller by the measured time step and applies the resulting motor output.
//!
//! # Motor Output
//! The controller decides, this task only writes. The merged direction bytes and
//! the duties are only written when the output differs from the last successful
//! write, which keeps the shared bus free while the robot holds a command.

use embassy_rp::pwm::{Config as PwmConfig, Pwm, PwmOutput};
use embassy_time::{Duration, Instant, Ticker};

use hermes_robot::control::navigation::DriveOutput;
use hermes_robot::driver::motor::MotorDriver;
use hermes_robot::driver::mpu6050::Mpu6050;
use hermes_robot::driver::pcf8574::Pcf8574;

use crate::resources::{device, I2cBusShared, MotorResources};
use crate::shared::{with_navigator, CONFIG};

/// RP2350 system clock (Hz)
const SYSTEM_CLOCK_HZ: u32 = 150_000_000;
/// PWM counter wrap, 1024 steps to match the 0..=1023 duty range
const PWM_TOP: u16 = 1023;

fn pwm_config() -> PwmConfig {
    let mut config = PwmConfig::default();
    config.top = PWM_TOP;
    // 150 MHz / (1024 * 146) ≈ 1 kHz
    let divider = SYSTEM_CLOCK_HZ / (u32::from(PWM_TOP) + 1) / CONFIG.motors.pwm_frequency;
    config.divider = (divider.min(255) as u8).into();
    config
}

/// Split a slice into its A and B outputs
fn outputs(pwm: Pwm<'static>) -> Option<(PwmOutput<'static>, PwmOutput<'static>)> {
    match pwm.split() {
        (Some(a), Some(b)) => Some((a, b)),
        _ => None,
    }
}

/// Main navigation task
#[embassy_executor::task]
pub async fn navigate(i2c_bus: &'static I2cBusShared, r: MotorResources, gyro_available: bool) {
    let left = Pwm::new_output_ab(r.left_slice, r.m1_pin, r.m2_pin, pwm_config());
    let right = Pwm::new_output_ab(r.right_slice, r.m3_pin, r.m4_pin, pwm_config());
    let (Some((m1, m2)), Some((m3, m4))) = (outputs(left), outputs(right)) else {
        defmt::error!("PWM outputs unavailable, navigation disabled");
        return;
    };

    let mut motors = MotorDriver::new(
        Pcf8574::new(device(i2c_bus), CONFIG.bus.direction_expander_a),
        Pcf8574::new(device(i2c_bus), CONFIG.bus.direction_expander_b),
        [m1, m2, m3, m4],
    );
    let mut last_output = motors.stop().await.ok().map(|_| DriveOutput::Stop);

    let mut imu = Mpu6050::new(device(i2c_bus), CONFIG.bus.imu);
    let mut ticker = Ticker::every(Duration::from_millis(CONFIG.schedule.navigation_ms));
    let mut last_tick = Instant::now();

    loop {
        ticker.next().await;

        let gyro_z = if gyro_available {
            imu.read_gyro_z().await.ok()
        } else {
            None
        };

        let now = Instant::now();
        let dt = (now - last_tick).as_micros() as f32 / 1_000_000.0;
        last_tick = now;

        let Some(output) = with_navigator(|nav| nav.tick(gyro_z, dt)) else {
            continue;
        };

        if last_output != Some(output) {
            let written = match output {
                DriveOutput::Stop => motors.stop().await,
                DriveOutput::Motors(requests) => motors.apply(&requests).await,
            };
            // A failed write is retried on the next tick
            if written.is_ok() {
                last_output = Some(output);
            }
        }
    }
}
