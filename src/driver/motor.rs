//! Motor driver
//!
//! Four DC motors, each with its own PWM output for speed. Direction is selected
//! through two PCF8574 expanders shared pairwise:
//!
//! | Motor | Side  | Expander | Owned bits    |
//! |-------|-------|----------|---------------|
//! | M1    | left  | A (0x20) | 0, 2, 3       |
//! | M2    | left  | A (0x20) | 4, 6, 7       |
//! | M3    | right | B (0x21) | 0, 2, 3       |
//! | M4    | right | B (0x21) | 4, 6, 7       |
//!
//! The direction lines are active low: a motor selects a direction by pulling some
//! of its own bits to 0 and leaves every other bit at 1. Because two motors share a
//! chip, the byte for a chip is always the AND of both motors' masks and is written
//! once per update. Writing per motor would let the second write release the first
//! motor's bits.
//!
//! The right-hand motors are mounted mirrored, so their clockwise and
//! counter-clockwise masks are swapped relative to the left side; "clockwise" in a
//! [`MotorRequest`] always means "drives the robot forward".

use embedded_hal::pwm::SetDutyCycle;
use embedded_hal_async::i2c::I2c;

use super::bus::BusError;
use super::pcf8574::{Pcf8574, RELEASED};

/// Number of driven wheels
pub const MOTOR_COUNT: usize = 4;

/// Largest PWM duty value
pub const MAX_DUTY: u16 = 1023;

/// Wheel rotation as seen by the chassis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub enum Direction {
    /// Drives the robot forward ("horario" in the wiring notes)
    Cw,
    /// Drives the robot backward ("antihorario")
    Ccw,
}

/// Speed and direction for one motor
///
/// `duty` may be anything a controller computes; it is clamped into
/// `0..=MAX_DUTY` right before it reaches the hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct MotorRequest {
    pub duty: i32,
    pub direction: Direction,
}

impl MotorRequest {
    pub const fn new(duty: i32, direction: Direction) -> Self {
        Self { duty, direction }
    }

    /// Motor off, direction irrelevant
    pub const STOPPED: MotorRequest = MotorRequest::new(0, Direction::Cw);
}

/// Requests for M1..M4, in that order
pub type MotorRequests = [MotorRequest; MOTOR_COUNT];

/// Clamp any computed duty into the PWM range
pub fn clamp_duty(duty: i32) -> u16 {
    duty.clamp(0, MAX_DUTY as i32) as u16
}

/// Where one motor's direction lines live and how it selects a direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionEntry {
    /// Index of the expander (0 = A, 1 = B)
    pub chip: usize,
    /// Bits of that expander reserved for this motor
    pub owned: u8,
    /// Active-low mask selecting [`Direction::Cw`]
    pub cw: u8,
    /// Active-low mask selecting [`Direction::Ccw`]
    pub ccw: u8,
}

impl DirectionEntry {
    pub const fn mask(&self, direction: Direction) -> u8 {
        match direction {
            Direction::Cw => self.cw,
            Direction::Ccw => self.ccw,
        }
    }

    /// Both masks touch only owned bits and select different line patterns
    const fn is_well_formed(&self) -> bool {
        self.chip < 2 && self.cw | self.owned == 0xFF && self.ccw | self.owned == 0xFF && self.cw != self.ccw
    }
}

/// Motor → expander bit assignment for M1..M4
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectionTable {
    pub entries: [DirectionEntry; MOTOR_COUNT],
}

impl DirectionTable {
    /// Active-low mask of `motor` (0-based) for `direction`
    pub const fn mask(&self, motor: usize, direction: Direction) -> u8 {
        self.entries[motor].mask(direction)
    }

    /// Every entry is well formed and motors sharing a chip own disjoint bits
    pub const fn owned_bits_are_disjoint(&self) -> bool {
        let mut a = 0;
        while a < MOTOR_COUNT {
            if !self.entries[a].is_well_formed() {
                return false;
            }
            let mut b = a + 1;
            while b < MOTOR_COUNT {
                let (ea, eb) = (self.entries[a], self.entries[b]);
                if ea.chip == eb.chip && ea.owned & eb.owned != 0 {
                    return false;
                }
                b += 1;
            }
            a += 1;
        }
        true
    }

    /// Output byte of expander `chip` for a full set of requests
    pub fn merged_byte(&self, chip: usize, requests: &MotorRequests) -> u8 {
        self.entries
            .iter()
            .zip(requests.iter())
            .filter(|(entry, _)| entry.chip == chip)
            .fold(RELEASED, |byte, (entry, request)| byte & entry.mask(request.direction))
    }
}

/// Wiring of the HERMES chassis
///
/// M1 and M3 keep the masks of the first wiring harness (bit 0 enables, bit 3 or 2
/// selects the direction). M2 and M4 use the same pattern in the upper nibble so
/// that no bit is shared with their chip partner.
pub const DIRECTION_TABLE: DirectionTable = DirectionTable {
    entries: [
        DirectionEntry {
            chip: 0,
            owned: 0b0000_1101,
            cw: 0b1111_0110,
            ccw: 0b1111_1010,
        },
        DirectionEntry {
            chip: 0,
            owned: 0b1101_0000,
            cw: 0b0110_1111,
            ccw: 0b1010_1111,
        },
        DirectionEntry {
            chip: 1,
            owned: 0b0000_1101,
            cw: 0b1111_1010,
            ccw: 0b1111_0110,
        },
        DirectionEntry {
            chip: 1,
            owned: 0b1101_0000,
            cw: 0b1010_1111,
            ccw: 0b0110_1111,
        },
    ],
};

/// PWM speed control plus expander direction control for the four motors
pub struct MotorDriver<I, P> {
    expanders: [Pcf8574<I>; 2],
    pwm: [P; MOTOR_COUNT],
    table: DirectionTable,
}

impl<I: I2c, P: SetDutyCycle> MotorDriver<I, P> {
    /// `expander_a` carries M1/M2, `expander_b` carries M3/M4; `pwm` is M1..M4
    pub fn new(expander_a: Pcf8574<I>, expander_b: Pcf8574<I>, pwm: [P; MOTOR_COUNT]) -> Self {
        Self {
            expanders: [expander_a, expander_b],
            pwm,
            table: DIRECTION_TABLE,
        }
    }

    /// Last byte written to expander `chip`
    pub fn direction_byte(&self, chip: usize) -> u8 {
        self.expanders[chip].output()
    }

    /// Apply one request per motor
    ///
    /// Duties are clamped and written first, then each expander receives its merged
    /// direction byte in a single write. Bus or PWM failures are logged and the
    /// remaining outputs are still updated; the first bus failure is returned so the
    /// caller can retry on its next cycle.
    pub async fn apply(&mut self, requests: &MotorRequests) -> Result<(), BusError> {
        for (index, request) in requests.iter().enumerate() {
            self.set_duty(index, clamp_duty(request.duty));
        }

        let mut result = Ok(());
        for chip in 0..self.expanders.len() {
            let byte = self.table.merged_byte(chip, requests);
            result = result.and(self.write_direction(chip, byte).await);
        }
        result
    }

    /// All duties to zero and both expanders back to their released state
    pub async fn stop(&mut self) -> Result<(), BusError> {
        for index in 0..MOTOR_COUNT {
            self.set_duty(index, 0);
        }
        let mut result = Ok(());
        for chip in 0..self.expanders.len() {
            result = result.and(self.write_direction(chip, RELEASED).await);
        }
        result
    }

    fn set_duty(&mut self, index: usize, duty: u16) {
        if self.pwm[index].set_duty_cycle_fraction(duty, MAX_DUTY).is_err() {
            log_error!("PWM write failed on motor {}", index + 1);
        }
    }

    async fn write_direction(&mut self, chip: usize, byte: u8) -> Result<(), BusError> {
        self.expanders[chip].write(byte).await.inspect_err(|e| {
            log_error!("Direction expander {} write failed: {:?}", e.address, e.kind);
        })
    }
}
