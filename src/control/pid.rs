//! PID heading controller
//!
//! Works in `no_std` and does not allocate memory.

use crate::config::HeadingConfig;

/// PID controller with output and integral clamping
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pid {
    kp: f32,
    ki: f32,
    kd: f32,

    setpoint: f32,

    /// Integrator state, already scaled by `ki`
    integral: f32,
    /// Last process variable (for derivative term)
    prev_measurement: f32,

    out_limit: f32,
    int_limit: f32,

    first_update: bool,
}

impl Pid {
    /// Create a controller with symmetric limits of ±1
    pub fn new(kp: f32, ki: f32, kd: f32) -> Self {
        Self {
            kp,
            ki,
            kd,
            setpoint: 0.0,
            integral: 0.0,
            prev_measurement: 0.0,
            out_limit: 1.0,
            int_limit: 1.0,
            first_update: true,
        }
    }

    /// Clamp the output to `±limit`
    pub fn with_output_limit(mut self, limit: f32) -> Self {
        self.out_limit = limit;
        self
    }

    /// Clamp the integral term to `±limit` (anti-windup)
    pub fn with_integral_limit(mut self, limit: f32) -> Self {
        self.int_limit = limit;
        self
    }

    pub fn setpoint(&self) -> f32 {
        self.setpoint
    }

    pub fn set_setpoint(&mut self, setpoint: f32) {
        self.setpoint = setpoint;
    }

    /// Current integral term
    pub fn integral(&self) -> f32 {
        self.integral
    }

    /// Reset integrator + derivative history
    pub fn reset(&mut self) {
        self.integral = 0.0;
        self.prev_measurement = 0.0;
        self.first_update = true;
    }

    /// One control step toward the setpoint
    ///
    /// `dt` is the step in seconds. A non-positive `dt` only updates the
    /// proportional term.
    pub fn compute(&mut self, measurement: f32, dt: f32) -> f32 {
        let error = self.setpoint - measurement;

        let p = self.kp * error;

        if dt > 0.0 {
            self.integral = (self.integral + error * dt * self.ki).clamp(-self.int_limit, self.int_limit);
        }
        let i = self.integral;

        // Derivative on measurement, so a setpoint jump does not kick the output
        let d = if self.first_update || dt <= 0.0 {
            0.0
        } else {
            self.kd * (self.prev_measurement - measurement) / dt
        };
        self.first_update = false;
        self.prev_measurement = measurement;

        (p + i + d).clamp(-self.out_limit, self.out_limit)
    }
}

/// Heading controller chosen once at startup
///
/// Without a working gyro there is no heading to hold, so the robot gets
/// [`HeadingPid::Noop`], which always steers straight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HeadingPid {
    Pid(Pid),
    Noop,
}

impl HeadingPid {
    /// Real controller when `gyro_available`, no-op otherwise
    pub fn select(gyro_available: bool, config: &HeadingConfig) -> Self {
        if gyro_available {
            HeadingPid::Pid(
                Pid::new(config.kp, config.ki, config.kd)
                    .with_output_limit(config.correction_limit)
                    .with_integral_limit(config.integral_limit),
            )
        } else {
            HeadingPid::Noop
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, HeadingPid::Pid(_))
    }

    pub fn set_setpoint(&mut self, setpoint: f32) {
        if let HeadingPid::Pid(pid) = self {
            pid.set_setpoint(setpoint);
        }
    }

    pub fn reset(&mut self) {
        if let HeadingPid::Pid(pid) = self {
            pid.reset();
        }
    }

    /// Integral term of the real controller, 0 for the no-op variant
    pub fn integral(&self) -> f32 {
        match self {
            HeadingPid::Pid(pid) => pid.integral(),
            HeadingPid::Noop => 0.0,
        }
    }

    /// Steering correction for the current heading, 0 for the no-op variant
    pub fn compute(&mut self, heading: f32, dt: f32) -> f32 {
        match self {
            HeadingPid::Pid(pid) => pid.compute(heading, dt),
            HeadingPid::Noop => 0.0,
        }
    }
}
