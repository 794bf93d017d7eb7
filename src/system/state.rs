//! Navigation state
//!
//! [`RobotState`] has exactly one owner, the
//! [`NavigationController`](crate::control::navigation::NavigationController).
//! Other tasks change it only through the controller's transition methods and read
//! it through copies, so a multi-field update is never observed half done.
//!
//! # State Components
//! - Active command: the movement the robot is currently performing
//! - Yaw / target yaw: integrated heading and the heading locked for FORWARD
//! - Gyro bias: stationary Z rate measured at startup
//! - Last command time: when the last command was accepted (ms since boot)
//! - Emergency stop: set by the watchdog while gas is dangerous

/// Movement the robot is performing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub enum ActiveCommand {
    /// All motors off
    Stop,
    /// Straight ahead with heading hold
    Forward,
    /// Straight back, open loop
    Backward,
    /// Turn on the spot counter-clockwise, open loop
    Left,
    /// Turn on the spot clockwise, open loop
    Right,
}

impl ActiveCommand {
    /// Canonical name as used on the control topic
    pub fn as_str(self) -> &'static str {
        match self {
            ActiveCommand::Stop => "STOP",
            ActiveCommand::Forward => "FORWARD",
            ActiveCommand::Backward => "BACKWARD",
            ActiveCommand::Left => "LEFT",
            ActiveCommand::Right => "RIGHT",
        }
    }

    /// Whether the command drives any motor
    pub fn is_moving(self) -> bool {
        self != ActiveCommand::Stop
    }
}

/// Snapshot of the navigation state
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct RobotState {
    pub active_command: ActiveCommand,
    /// Integrated heading (degrees, counter-clockwise positive)
    pub yaw: f32,
    /// Heading held while FORWARD (degrees)
    pub target_yaw: f32,
    /// Stationary gyro Z rate subtracted before integration (°/s)
    pub gyro_bias: f32,
    /// Time of the last accepted command (ms since boot)
    pub last_command_time: u64,
    /// Forces every duty to 0 regardless of `active_command`
    pub emergency_stop_active: bool,
}

impl RobotState {
    /// Stopped, facing yaw 0, nothing received yet
    pub const fn initial(gyro_bias: f32) -> Self {
        Self {
            active_command: ActiveCommand::Stop,
            yaw: 0.0,
            target_yaw: 0.0,
            gyro_bias,
            last_command_time: 0,
            emergency_stop_active: false,
        }
    }
}
