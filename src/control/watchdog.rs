//! Safety watchdog
//!
//! Runs on its own period, independent of the command path:
//! - a moving robot that has not received a command for `command_timeout_ms` stops
//! - a gas reading at danger or above holds the robot in emergency stop, and a
//!   reading at normal or warning releases it again
//!
//! The gas check is level-triggered and re-evaluated every period, so an
//! emergency never latches past the reading that caused it.

use crate::config::SafetyConfig;
use crate::driver::gas::AlertLevel;
use crate::system::state::ActiveCommand;

use super::navigation::{NavigationController, StopReason};

/// Change of the emergency flag during one evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub enum EmergencyChange {
    Unchanged,
    Engaged,
    Released,
}

/// Outcome of one watchdog period
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct WatchdogReport {
    /// The command timeout stopped the robot
    pub timed_out: bool,
    pub emergency: EmergencyChange,
}

pub struct SafetyWatchdog {
    config: SafetyConfig,
}

impl SafetyWatchdog {
    pub fn new(config: SafetyConfig) -> Self {
        Self { config }
    }

    /// Evaluate both trip conditions at `now_ms`
    ///
    /// `gas` is the latest alert level, `None` while no reading exists; the
    /// emergency flag is then left as it is.
    pub fn evaluate(&self, nav: &mut NavigationController, now_ms: u64, gas: Option<AlertLevel>) -> WatchdogReport {
        let state = nav.state();
        let silent_for = now_ms.saturating_sub(state.last_command_time);
        let timed_out = state.active_command.is_moving()
            && silent_for > self.config.command_timeout_ms
            && nav.force_stop(StopReason::CommandTimeout);

        WatchdogReport {
            timed_out,
            emergency: self.evaluate_gas(nav, gas),
        }
    }

    /// Apply one gas level to the emergency flag
    pub fn evaluate_gas(&self, nav: &mut NavigationController, gas: Option<AlertLevel>) -> EmergencyChange {
        let Some(level) = gas else {
            return EmergencyChange::Unchanged;
        };
        if self.config.gas_emergency_stop && level.requires_stop() {
            if nav.engage_emergency() {
                log_error!("Gas level {} stops the robot", level.as_str());
                return EmergencyChange::Engaged;
            }
        } else if nav.release_emergency() {
            return EmergencyChange::Released;
        }
        EmergencyChange::Unchanged
    }

    /// Abort FORWARD when the filtered distance is closer than the stop distance
    pub fn check_obstacle(&self, nav: &mut NavigationController, distance_cm: f32) -> bool {
        distance_cm < self.config.obstacle_stop_cm
            && nav.state().active_command == ActiveCommand::Forward
            && nav.force_stop(StopReason::Obstacle)
    }
}
