//! Host-side doubles for the hardware traits
//!
//! - [`FakeTime`]: a manual clock that also implements `DelayNs` by advancing itself
//! - [`MockI2c`]: a recording bus with per-address scripted responses and NACKs
//! - [`MockPwm`]: a PWM channel that remembers its last duty

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet, VecDeque};
use std::rc::Rc;

use embedded_hal::i2c::{ErrorKind, ErrorType, NoAcknowledgeSource, Operation};
use embedded_hal::pwm::{self, SetDutyCycle};
use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;
use hermes_robot::driver::bus::Clock;

/// Monotonic fake time in nanoseconds
#[derive(Clone, Default)]
pub struct FakeTime(Rc<Cell<u64>>);

impl FakeTime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance_us(&self, us: u64) {
        self.0.set(self.0.get() + us * 1_000);
    }
}

impl Clock for FakeTime {
    fn now_us(&self) -> u64 {
        self.0.get() / 1_000
    }
}

impl DelayNs for FakeTime {
    async fn delay_ns(&mut self, ns: u32) {
        self.0.set(self.0.get() + u64::from(ns));
    }
}

/// One write seen on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusWrite {
    pub address: u8,
    pub bytes: Vec<u8>,
    pub at_us: u64,
}

/// Computes read data for an address from the write history and the current time
pub type Responder = Box<dyn FnMut(&[BusWrite], u64, &mut [u8])>;

#[derive(Default)]
struct BusState {
    writes: Vec<BusWrite>,
    queued: HashMap<u8, VecDeque<Vec<u8>>>,
    responders: HashMap<u8, Responder>,
    nack: HashSet<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockError(pub ErrorKind);

impl embedded_hal::i2c::Error for MockError {
    fn kind(&self) -> ErrorKind {
        self.0
    }
}

/// Recording I2C bus shared by every clone
///
/// Reads are served from the per-address queue first, then from the responder,
/// and read as zeros otherwise.
#[derive(Clone)]
pub struct MockI2c {
    state: Rc<RefCell<BusState>>,
    time: FakeTime,
}

impl MockI2c {
    pub fn new(time: FakeTime) -> Self {
        Self {
            state: Rc::default(),
            time,
        }
    }

    /// Queue the data of one future read from `address`
    pub fn queue_read(&self, address: u8, data: &[u8]) {
        self.state
            .borrow_mut()
            .queued
            .entry(address)
            .or_default()
            .push_back(data.to_vec());
    }

    pub fn set_responder(&self, address: u8, responder: Responder) {
        self.state.borrow_mut().responders.insert(address, responder);
    }

    /// Make `address` stop acknowledging
    pub fn fail(&self, address: u8) {
        self.state.borrow_mut().nack.insert(address);
    }

    pub fn recover(&self, address: u8) {
        self.state.borrow_mut().nack.remove(&address);
    }

    /// Every write to `address`, oldest first
    pub fn writes_to(&self, address: u8) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .writes
            .iter()
            .filter(|w| w.address == address)
            .map(|w| w.bytes.clone())
            .collect()
    }

    pub fn clear_writes(&self) {
        self.state.borrow_mut().writes.clear();
    }
}

impl ErrorType for MockI2c {
    type Error = MockError;
}

impl I2c for MockI2c {
    async fn transaction(&mut self, address: u8, operations: &mut [Operation<'_>]) -> Result<(), Self::Error> {
        let mut state = self.state.borrow_mut();
        if state.nack.contains(&address) {
            return Err(MockError(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address)));
        }
        let now = self.time.now_us();
        for op in operations.iter_mut() {
            match op {
                Operation::Write(bytes) => state.writes.push(BusWrite {
                    address,
                    bytes: bytes.to_vec(),
                    at_us: now,
                }),
                Operation::Read(buf) => {
                    if let Some(data) = state.queued.get_mut(&address).and_then(|q| q.pop_front()) {
                        let n = data.len().min(buf.len());
                        buf[..n].copy_from_slice(&data[..n]);
                    } else if let Some(mut responder) = state.responders.remove(&address) {
                        responder(&state.writes, now, buf);
                        state.responders.insert(address, responder);
                    } else {
                        buf.fill(0);
                    }
                }
            }
        }
        Ok(())
    }
}

/// PWM channel with a 0..=1023 range
#[derive(Clone, Default)]
pub struct MockPwm(Rc<Cell<u16>>);

impl MockPwm {
    pub fn duty(&self) -> u16 {
        self.0.get()
    }
}

impl pwm::ErrorType for MockPwm {
    type Error = core::convert::Infallible;
}

impl SetDutyCycle for MockPwm {
    fn max_duty_cycle(&self) -> u16 {
        1023
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        self.0.set(duty);
        Ok(())
    }
}

/// Echo line model for an HC-SR04 behind a PCF8574
///
/// The echo goes high `delay_us` after the last write to the expander (the trigger
/// falling edge) and stays high for `width_us`; `None` widths never rise.
pub fn echo_responder(address: u8, echo_bit: u8, delay_us: u64, width_us: Option<u64>) -> Responder {
    Box::new(move |writes, now, buf| {
        let triggered = writes.iter().rev().find(|w| w.address == address).map(|w| w.at_us);
        let high = match (triggered, width_us) {
            (Some(t0), Some(width)) => now >= t0 + delay_us && now < t0 + delay_us + width,
            _ => false,
        };
        let byte = if high { 0xFF } else { 0xFF & !(1 << echo_bit) };
        buf.fill(byte);
    })
}

/// Echo line that rises and never falls
pub fn stuck_high_responder(address: u8, echo_bit: u8, delay_us: u64) -> Responder {
    Box::new(move |writes, now, buf| {
        let triggered = writes.iter().rev().find(|w| w.address == address).map(|w| w.at_us);
        let high = triggered.is_some_and(|t0| now >= t0 + delay_us);
        buf.fill(if high { 0xFF } else { 0xFF & !(1 << echo_bit) });
    })
}
