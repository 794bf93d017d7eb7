//! Safety watchdog task
//!
//! Evaluates the command timeout and the latest gas level once per second,
//! independently of the command path and of the sensor tasks.

use embassy_time::{Duration, Ticker};

use hermes_robot::control::watchdog::EmergencyChange;
use hermes_robot::system::telemetry::{AlertTelemetry, GAS_EMERGENCY_ALERT};

use crate::shared::{gas_alert, now_ms, publish, watchdog, with_navigator, CONFIG};

#[embassy_executor::task]
pub async fn safety_watch() {
    let safety = watchdog();
    let mut ticker = Ticker::every(Duration::from_millis(CONFIG.schedule.watchdog_ms));

    loop {
        ticker.next().await;

        let gas = gas_alert();
        let Some(report) = with_navigator(|nav| safety.evaluate(nav, now_ms(), gas)) else {
            continue;
        };
        if report.timed_out {
            defmt::warn!("Watchdog: no command for {} ms, stopped", CONFIG.safety.command_timeout_ms);
        }
        if report.emergency == EmergencyChange::Engaged {
            publish(CONFIG.topics.gas_alert, &AlertTelemetry { msg: GAS_EMERGENCY_ALERT });
        }
    }
}
