//! Slow sensors: environment and ultrasonic range at 2 Hz
//!
//! # Signal Processing
//! Valid distances go through a 3-sample moving median before the obstacle check,
//! so a single spurious echo cannot stop the robot. Invalid readings are skipped
//! entirely: they neither enter the filter nor get published.
//!
//! # Obstacle Override
//! A filtered distance below the stop distance while FORWARD forces STOP through
//! the same controller call the watchdog uses.

use embassy_time::{Delay, Duration, Ticker};
use moving_median::MovingMedian;

use hermes_robot::driver::pcf8574::{Pcf8574, RELEASED};
use hermes_robot::driver::scd30::Scd30;
use hermes_robot::driver::ultrasonic::Ultrasonic;
use hermes_robot::system::telemetry::RadarTelemetry;

use crate::resources::{device, I2cBusShared};
use crate::shared::{publish, watchdog, with_navigator, EmbassyClock, CONFIG};

/// Size of median filter window (3 samples balances noise reduction vs. latency)
const MEDIAN_WINDOW_SIZE: usize = 3;

#[embassy_executor::task]
pub async fn slow_sensors_read(i2c_bus: &'static I2cBusShared) {
    let mut scd30 = Scd30::new(device(i2c_bus), Delay, CONFIG.bus.co2_sensor);
    if let Err(e) = scd30.start_continuous().await {
        defmt::warn!("SCD30 not responding: {:?}", e.kind);
    }

    // The echo line is an input, so every line starts released high
    let mut expander = Pcf8574::new(device(i2c_bus), CONFIG.bus.ranging_expander);
    if let Err(e) = expander.write(RELEASED).await {
        defmt::warn!("Ranging expander not responding: {:?}", e.kind);
    }
    let mut ranging = Ultrasonic::new(expander, Delay, EmbassyClock, CONFIG.ultrasonic);
    let mut median_filter = MovingMedian::<f64, MEDIAN_WINDOW_SIZE>::new();

    let safety = watchdog();
    let topics = CONFIG.topics;
    let mut ticker = Ticker::every(Duration::from_millis(CONFIG.schedule.slow_sensors_ms));

    loop {
        if let Some(reading) = scd30.read().await {
            publish(topics.environment, &reading);
        }

        if let Some(distance_cm) = ranging.measure().await.cm() {
            median_filter.add_value(f64::from(distance_cm));
            let filtered = median_filter.median() as f32;
            with_navigator(|nav| safety.check_obstacle(nav, filtered));
            publish(topics.radar, &RadarTelemetry::new(distance_cm));
        }

        ticker.next().await;
    }
}
