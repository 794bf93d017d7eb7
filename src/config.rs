//! Robot configuration
//!
//! Everything the firmware needs to know about the hardware and its tuning is
//! collected in one immutable [`Config`] that is built at compile time and handed
//! to the tasks at startup. Nothing here changes while the robot is running.
//!
//! Cross-field constraints are checked by `const` assertions at the bottom of this
//! file so an inconsistent edit fails the build instead of misbehaving on the floor.

use crate::driver::motor::DIRECTION_TABLE;

/// Upper bound on calibration samples, the size of the buffers they are collected in
pub const MAX_CALIBRATION_SAMPLES: usize = 64;

/// Fixed I2C addresses of every device on the shared bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusAddresses {
    /// PCF8574 carrying the direction bits of motors 1 and 2
    pub direction_expander_a: u8,
    /// PCF8574 carrying the direction bits of motors 3 and 4
    pub direction_expander_b: u8,
    /// PCF8574 wired to the ultrasonic trigger and echo lines
    pub ranging_expander: u8,
    /// ADS1115 sampling the MQ-2 gas sensor
    pub adc: u8,
    /// SCD30 CO2 / temperature / humidity sensor
    pub co2_sensor: u8,
    /// MPU6050 accelerometer + gyroscope
    pub imu: u8,
    /// Bus clock (Hz)
    pub frequency: u32,
}

/// Motor output limits
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorConfig {
    /// Largest duty value accepted by the PWM outputs
    pub max_duty: u16,
    /// Duty used by the open-loop movements (BACKWARD, LEFT, RIGHT)
    pub open_loop_duty: u16,
    /// Nominal duty of both sides while holding heading in FORWARD
    pub heading_base_duty: u16,
    /// PWM carrier frequency (Hz)
    pub pwm_frequency: u32,
}

/// Ultrasonic ranging through the expander
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UltrasonicConfig {
    /// Expander bit driving the trigger line
    pub trigger_bit: u8,
    /// Expander bit reading the echo line
    pub echo_bit: u8,
    /// Settle time with the trigger held low before the pulse (µs)
    pub settle_us: u32,
    /// Trigger pulse width (µs), the sensor needs at least 10
    pub trigger_pulse_us: u32,
    /// Budget for each of the two echo edges (µs)
    pub edge_timeout_us: u32,
    /// Cooperative yield between two echo polls (µs)
    pub poll_yield_us: u32,
    /// Farthest distance the sensor is expected to report (cm)
    pub max_range_cm: f32,
}

impl UltrasonicConfig {
    /// Speed of sound at room temperature (cm/µs)
    pub const SPEED_OF_SOUND_CM_PER_US: f32 = 0.0343;

    /// Echo pulse width of an object at `max_range_cm` (µs)
    pub const fn max_echo_us(&self) -> u32 {
        (self.max_range_cm * 2.0 / Self::SPEED_OF_SOUND_CM_PER_US) as u32
    }

    /// A genuine echo at full range plus one poll yield of latency must fit the edge budget
    pub const fn timing_is_consistent(&self) -> bool {
        self.trigger_pulse_us >= 10 && self.max_echo_us() + self.poll_yield_us <= self.edge_timeout_us
    }
}

/// MQ-2 gas sensor read through channel `channel` of the ADS1115
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GasConfig {
    /// ADS1115 input channel
    pub channel: u8,
    /// Number of clean-air samples averaged during calibration
    pub calibration_samples: usize,
    /// Pause between two calibration samples (ms)
    pub calibration_interval_ms: u32,
    /// Heater / divider supply (V)
    pub supply_voltage: f32,
    /// Load resistor (kΩ)
    pub load_resistance: f32,
    /// Full-scale voltage of the selected ADC gain (V)
    pub adc_reference: f32,
    /// Rs/R0 of the sensor in clean air, from the datasheet curve
    pub clean_air_factor: f32,
    /// Slope of the log-log concentration curve
    pub curve_m: f32,
    /// Intercept of the log-log concentration curve
    pub curve_b: f32,
    /// Concentration from which the reading is a warning (ppm)
    pub warning_ppm: f32,
    /// Concentration from which the reading is dangerous (ppm)
    pub danger_ppm: f32,
    /// Concentration from which the reading is critical (ppm)
    pub critical_ppm: f32,
}

/// Gyro heading estimation and PID heading hold
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HeadingConfig {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
    /// Symmetric clamp on the steering correction (duty counts)
    pub correction_limit: f32,
    /// Symmetric clamp on the integral term (duty counts)
    pub integral_limit: f32,
    /// Angular rates below this magnitude are treated as zero (°/s)
    pub dead_band_dps: f32,
    /// Number of stationary gyro samples averaged into the bias
    pub calibration_samples: usize,
    /// Pause between two gyro calibration samples (ms)
    pub calibration_interval_ms: u32,
}

/// Safety overrides
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SafetyConfig {
    /// A moving robot that hears nothing for this long stops (ms)
    pub command_timeout_ms: u64,
    /// Stop and hold while the gas reading is dangerous or critical
    pub gas_emergency_stop: bool,
    /// Filtered obstacle distance that aborts a FORWARD run (cm)
    pub obstacle_stop_cm: f32,
}

/// Task periods of the cooperative schedule (ms)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    pub link_ms: u64,
    pub navigation_ms: u64,
    pub fast_sensors_ms: u64,
    pub slow_sensors_ms: u64,
    pub watchdog_ms: u64,
    /// The link counts as down after this long without an inbound line (ms)
    pub link_heartbeat_ms: u64,
}

/// Message bus topics shared with the ground station
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Topics {
    pub control: &'static str,
    pub status: &'static str,
    pub environment: &'static str,
    pub imu: &'static str,
    pub radar: &'static str,
    pub gas: &'static str,
    pub gas_alert: &'static str,
}

/// Complete robot configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Config {
    pub device_name: &'static str,
    pub bus: BusAddresses,
    pub motors: MotorConfig,
    pub ultrasonic: UltrasonicConfig,
    pub gas: GasConfig,
    pub heading: HeadingConfig,
    pub safety: SafetyConfig,
    pub schedule: ScheduleConfig,
    pub topics: Topics,
}

impl Config {
    /// The wiring and tuning of the HERMES_ROBOT_01 chassis
    pub const DEFAULT: Config = Config {
        device_name: "HERMES_ROBOT_01",
        bus: BusAddresses {
            direction_expander_a: 0x20,
            direction_expander_b: 0x21,
            ranging_expander: 0x23,
            adc: 0x48,
            co2_sensor: 0x61,
            imu: 0x68,
            frequency: 100_000,
        },
        motors: MotorConfig {
            max_duty: 1023,
            open_loop_duty: 1023,
            heading_base_duty: 900,
            pwm_frequency: 1_000,
        },
        ultrasonic: UltrasonicConfig {
            trigger_bit: 2,
            echo_bit: 1,
            settle_us: 5,
            trigger_pulse_us: 10,
            edge_timeout_us: 30_000,
            poll_yield_us: 1_000,
            max_range_cm: 400.0,
        },
        gas: GasConfig {
            channel: 0,
            calibration_samples: 10,
            calibration_interval_ms: 20,
            supply_voltage: 5.0,
            load_resistance: 10.0,
            adc_reference: 4.096,
            clean_air_factor: 9.83,
            curve_m: -0.485,
            curve_b: 1.51,
            warning_ppm: 300.0,
            danger_ppm: 1_000.0,
            critical_ppm: 2_000.0,
        },
        heading: HeadingConfig {
            kp: 2.0,
            ki: 0.5,
            kd: 0.1,
            correction_limit: 400.0,
            integral_limit: 200.0,
            dead_band_dps: 0.5,
            calibration_samples: 50,
            calibration_interval_ms: 10,
        },
        safety: SafetyConfig {
            command_timeout_ms: 2_000,
            gas_emergency_stop: true,
            obstacle_stop_cm: 20.0,
        },
        schedule: ScheduleConfig {
            link_ms: 50,
            navigation_ms: 20,
            fast_sensors_ms: 100,
            slow_sensors_ms: 500,
            watchdog_ms: 1_000,
            link_heartbeat_ms: 5_000,
        },
        topics: Topics {
            control: "hermes/control",
            status: "hermes/status",
            environment: "hermes/sensors/environment",
            imu: "hermes/sensors/imu",
            radar: "hermes/radar",
            gas: "iot/sensor/mq2/data",
            gas_alert: "iot/sensor/mq2/alert",
        },
    };

    /// Gas thresholds must be strictly ascending for the classification to make sense
    pub const fn gas_thresholds_ascending(&self) -> bool {
        self.gas.warning_ppm < self.gas.danger_ppm && self.gas.danger_ppm < self.gas.critical_ppm
    }

    /// Duties used by the navigation controller must fit the PWM range
    pub const fn duties_in_range(&self) -> bool {
        self.motors.open_loop_duty <= self.motors.max_duty && self.motors.heading_base_duty <= self.motors.max_duty
    }

    /// Both calibration phases must fit their sample buffers
    pub const fn calibration_fits(&self) -> bool {
        self.gas.calibration_samples <= MAX_CALIBRATION_SAMPLES
            && self.heading.calibration_samples <= MAX_CALIBRATION_SAMPLES
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::DEFAULT
    }
}

const _: () = assert!(Config::DEFAULT.ultrasonic.timing_is_consistent());
const _: () = assert!(Config::DEFAULT.gas_thresholds_ascending());
const _: () = assert!(Config::DEFAULT.duties_in_range());
const _: () = assert!(Config::DEFAULT.calibration_fits());
const _: () = assert!(DIRECTION_TABLE.owned_bits_are_disjoint());
