//! Shared hardware bus
//!
//! All six devices sit on one I2C bus. The firmware keeps the bus behind an
//! embassy mutex and gives every driver its own `I2cDevice` handle, so a single
//! transaction is always exclusive while different tasks interleave between
//! transactions. Drivers in this crate only see `embedded_hal_async::i2c::I2c`.
//!
//! Failures are reported as [`BusError`]; callers at the contract boundary turn
//! them into sentinel readings instead of propagating them across tasks.

use embedded_hal::i2c::{Error, ErrorKind};

/// A failed transaction with the device that did not answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct BusError {
    /// 7-bit address of the device
    pub address: u8,
    /// What the bus driver reported
    pub kind: ErrorKind,
}

impl BusError {
    /// Adapter for `map_err` that keeps the failing address
    pub fn at<E: Error>(address: u8) -> impl FnOnce(E) -> BusError {
        move |e| BusError {
            address,
            kind: e.kind(),
        }
    }
}

/// Monotonic microsecond time source
///
/// Bit-banged protocols timestamp edges with it. The firmware implements it on top
/// of `embassy_time::Instant`; tests drive a fake clock by hand.
pub trait Clock {
    /// Microseconds since an arbitrary fixed origin
    fn now_us(&self) -> u64;
}

impl<C: Clock> Clock for &C {
    fn now_us(&self) -> u64 {
        (**self).now_us()
    }
}
