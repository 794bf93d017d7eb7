//! Navigation state machine
//!
//! The [`NavigationController`] owns the [`RobotState`] and the heading PID. Every
//! way of changing them is one synchronous method, so each transition is complete
//! before the calling task can yield:
//!
//! - [`NavigationController::apply_command`]: command router input
//! - [`NavigationController::tick`]: 50 Hz heading integration and motor output
//! - [`NavigationController::force_stop`]: watchdog timeout and obstacle override
//! - [`NavigationController::engage_emergency`] / [`NavigationController::release_emergency`]: gas
//!
//! # Heading lock
//! Entering FORWARD from any other command locks `target_yaw` to the current yaw
//! and resets the PID. FORWARD repeated while already in FORWARD keeps the lock,
//! so a client that resends its command does not reset the integral.
//!
//! # Steering
//! Heading error is `target_yaw - yaw` with yaw counter-clockwise positive. A
//! positive correction means the robot has drifted clockwise and must turn back
//! counter-clockwise, so the left side slows down and the right side speeds up:
//! `left = base - correction`, `right = base + correction`.

use crate::config::{Config, MotorConfig};
use crate::driver::motor::{Direction, MotorRequest, MotorRequests};
use crate::system::state::{ActiveCommand, RobotState};

use super::orientation::OrientationEstimator;
use super::pid::HeadingPid;

/// What the motor task should do this tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub enum DriveOutput {
    /// Zero duties, expanders released
    Stop,
    /// One request per motor
    Motors(MotorRequests),
}

/// Why a moving robot was stopped without a STOP command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub enum StopReason {
    CommandTimeout,
    Obstacle,
    GasEmergency,
}

/// Fixed requests of the open-loop movements, `None` for FORWARD and STOP
///
/// M1/M2 are the left side, M3/M4 the right side. Turning drives the two sides
/// in opposite directions.
pub const fn open_loop_requests(command: ActiveCommand, duty: u16) -> Option<MotorRequests> {
    let d = duty as i32;
    let (left, right) = match command {
        ActiveCommand::Backward => (Direction::Ccw, Direction::Ccw),
        ActiveCommand::Left => (Direction::Ccw, Direction::Cw),
        ActiveCommand::Right => (Direction::Cw, Direction::Ccw),
        ActiveCommand::Forward | ActiveCommand::Stop => return None,
    };
    Some([
        MotorRequest::new(d, left),
        MotorRequest::new(d, left),
        MotorRequest::new(d, right),
        MotorRequest::new(d, right),
    ])
}

/// Requests for straight driving with a steering correction
pub fn differential_requests(base: u16, correction: f32) -> MotorRequests {
    let base = f32::from(base);
    let left = (base - correction) as i32;
    let right = (base + correction) as i32;
    [
        MotorRequest::new(left, Direction::Cw),
        MotorRequest::new(left, Direction::Cw),
        MotorRequest::new(right, Direction::Cw),
        MotorRequest::new(right, Direction::Cw),
    ]
}

/// Single owner of the navigation state
pub struct NavigationController {
    state: RobotState,
    pid: HeadingPid,
    orientation: OrientationEstimator,
    motors: MotorConfig,
}

impl NavigationController {
    /// Controller for a robot at rest
    ///
    /// `gyro_bias` is the calibrated bias, `None` when the gyro is missing; heading
    /// hold then falls back to the no-op PID and FORWARD drives straight open loop.
    pub fn new(config: &Config, gyro_bias: Option<f32>) -> Self {
        Self {
            state: RobotState::initial(gyro_bias.unwrap_or(0.0)),
            pid: HeadingPid::select(gyro_bias.is_some(), &config.heading),
            orientation: OrientationEstimator::new(config.heading.dead_band_dps),
            motors: config.motors,
        }
    }

    /// Copy of the current state
    pub fn state(&self) -> RobotState {
        self.state
    }

    pub fn heading_hold_available(&self) -> bool {
        self.pid.is_active()
    }

    pub fn heading_pid(&self) -> &HeadingPid {
        &self.pid
    }

    /// Accept a decoded command at `now_ms`
    ///
    /// Always refreshes `last_command_time`. Returns the previous command.
    pub fn apply_command(&mut self, command: ActiveCommand, now_ms: u64) -> ActiveCommand {
        let previous = self.state.active_command;
        self.state.last_command_time = now_ms;

        if command == ActiveCommand::Forward && previous != ActiveCommand::Forward {
            self.lock_heading();
        }
        self.state.active_command = command;

        if previous != command {
            log_debug!("Command {} -> {}", previous.as_str(), command.as_str());
        }
        previous
    }

    /// One navigation step of `dt` seconds
    ///
    /// `gyro_z` is the raw rate, `None` when the gyro could not be read this tick;
    /// the yaw then simply holds its last value.
    pub fn tick(&mut self, gyro_z: Option<f32>, dt: f32) -> DriveOutput {
        if let Some(raw) = gyro_z {
            self.state.yaw = self.orientation.integrate(self.state.yaw, raw, self.state.gyro_bias, dt);
        }

        if self.state.emergency_stop_active {
            return DriveOutput::Stop;
        }

        match self.state.active_command {
            ActiveCommand::Stop => DriveOutput::Stop,
            ActiveCommand::Forward => {
                let correction = self.pid.compute(self.state.yaw, dt);
                DriveOutput::Motors(differential_requests(self.motors.heading_base_duty, correction))
            }
            command => match open_loop_requests(command, self.motors.open_loop_duty) {
                Some(requests) => DriveOutput::Motors(requests),
                None => DriveOutput::Stop,
            },
        }
    }

    /// Stop a moving robot, returns whether it was moving
    ///
    /// Leaves `last_command_time` alone: a stop forced by the robot is not a command.
    pub fn force_stop(&mut self, reason: StopReason) -> bool {
        if !self.state.active_command.is_moving() {
            return false;
        }
        log_warn!("Forced stop from {}: {:?}", self.state.active_command.as_str(), reason);
        self.state.active_command = ActiveCommand::Stop;
        true
    }

    /// Set the emergency flag and stop, returns whether it was newly set
    pub fn engage_emergency(&mut self) -> bool {
        self.force_stop(StopReason::GasEmergency);
        if self.state.emergency_stop_active {
            return false;
        }
        self.state.emergency_stop_active = true;
        log_error!("Emergency stop engaged");
        true
    }

    /// Clear the emergency flag, returns whether it was set
    ///
    /// The robot stays in STOP until the next command.
    pub fn release_emergency(&mut self) -> bool {
        if !self.state.emergency_stop_active {
            return false;
        }
        self.state.emergency_stop_active = false;
        log_info!("Emergency stop released");
        true
    }

    fn lock_heading(&mut self) {
        self.state.target_yaw = self.state.yaw;
        self.pid.reset();
        self.pid.set_setpoint(self.state.target_yaw);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_loop_table() {
        let duty = Config::DEFAULT.motors.open_loop_duty;
        assert_eq!(open_loop_requests(ActiveCommand::Forward, duty), None);
        assert_eq!(open_loop_requests(ActiveCommand::Stop, duty), None);

        let back = open_loop_requests(ActiveCommand::Backward, duty).expect("open-loop movement");
        assert!(back.iter().all(|r| r.direction == Direction::Ccw && r.duty == 1023));

        let left = open_loop_requests(ActiveCommand::Left, duty).expect("open-loop movement");
        assert_eq!(left[0].direction, Direction::Ccw);
        assert_eq!(left[3].direction, Direction::Cw);

        let right = open_loop_requests(ActiveCommand::Right, duty).expect("open-loop movement");
        assert_eq!(right[1].direction, Direction::Cw);
        assert_eq!(right[2].direction, Direction::Ccw);
    }

    #[test]
    fn positive_correction_speeds_up_right_side() {
        let r = differential_requests(900, 100.0);
        assert_eq!(r[0].duty, 800);
        assert_eq!(r[1].duty, 800);
        assert_eq!(r[2].duty, 1000);
        assert_eq!(r[3].duty, 1000);
        assert!(r.iter().all(|m| m.direction == Direction::Cw));
    }

    #[test]
    fn stop_tick_outputs_stop() {
        let mut nav = NavigationController::new(&Config::DEFAULT, Some(0.0));
        assert_eq!(nav.tick(Some(0.0), 0.02), DriveOutput::Stop);
    }

    #[test]
    fn missing_gyro_drives_straight() {
        let mut nav = NavigationController::new(&Config::DEFAULT, None);
        assert!(!nav.heading_hold_available());
        nav.apply_command(ActiveCommand::Forward, 10);
        let base = Config::DEFAULT.motors.heading_base_duty as i32;
        match nav.tick(None, 0.02) {
            DriveOutput::Motors(r) => assert!(r.iter().all(|m| m.duty == base)),
            DriveOutput::Stop => panic!("FORWARD without gyro must still drive"),
        }
    }
}
