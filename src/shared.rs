//! State shared between tasks
//!
//! - `NAVIGATOR`: the navigation controller. Accessed only through
//!   [`with_navigator`], a synchronous closure under a critical section, so every
//!   transition completes before the calling task can yield.
//! - `GAS_ALERT`: latest gas alert level for the watchdog
//! - `TELEMETRY`: outbound messages for the link task
//! - `LINK_UP`: whether the broker bridge is currently reachable

use core::cell::{Cell, RefCell};
use core::sync::atomic::{AtomicBool, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::channel::Channel;
use embassy_time::Instant;
use serde::Serialize;

use hermes_robot::config::Config;
use hermes_robot::control::navigation::NavigationController;
use hermes_robot::control::watchdog::SafetyWatchdog;
use hermes_robot::driver::bus::Clock;
use hermes_robot::driver::gas::AlertLevel;
use hermes_robot::system::telemetry::Message;

/// Configuration of this robot
pub const CONFIG: Config = Config::DEFAULT;

static NAVIGATOR: Mutex<CriticalSectionRawMutex, RefCell<Option<NavigationController>>> =
    Mutex::new(RefCell::new(None));

static GAS_ALERT: Mutex<CriticalSectionRawMutex, Cell<Option<AlertLevel>>> = Mutex::new(Cell::new(None));

static LINK_UP: AtomicBool = AtomicBool::new(false);

/// Outbound messages, drained by the link task
pub static TELEMETRY: Channel<CriticalSectionRawMutex, Message, 8> = Channel::new();

/// Install the controller before any task is spawned
pub fn init_navigator(controller: NavigationController) {
    NAVIGATOR.lock(|cell| *cell.borrow_mut() = Some(controller));
}

/// Run one state transition, `None` before [`init_navigator`]
pub fn with_navigator<R>(f: impl FnOnce(&mut NavigationController) -> R) -> Option<R> {
    NAVIGATOR.lock(|cell| cell.borrow_mut().as_mut().map(f))
}

pub fn set_gas_alert(level: AlertLevel) {
    GAS_ALERT.lock(|cell| cell.set(Some(level)));
}

pub fn gas_alert() -> Option<AlertLevel> {
    GAS_ALERT.lock(|cell| cell.get())
}

pub fn set_link_up(up: bool) {
    LINK_UP.store(up, Ordering::Relaxed);
}

pub fn link_up() -> bool {
    LINK_UP.load(Ordering::Relaxed)
}

/// Queue a telemetry message if the link is up, dropping it when the queue is full
pub fn publish<T: Serialize>(topic: &'static str, body: &T) {
    if !link_up() {
        return;
    }
    if let Some(message) = Message::new(topic, body) {
        if TELEMETRY.try_send(message).is_err() {
            defmt::debug!("Telemetry queue full, dropped {}", topic);
        }
    }
}

/// The safety rules, shared by the watchdog and the sensor tasks
pub fn watchdog() -> SafetyWatchdog {
    SafetyWatchdog::new(CONFIG.safety)
}

/// Milliseconds since boot
pub fn now_ms() -> u64 {
    Instant::now().as_millis()
}

/// [`Clock`] backed by the embassy time driver
#[derive(Clone, Copy)]
pub struct EmbassyClock;

impl Clock for EmbassyClock {
    fn now_us(&self) -> u64 {
        Instant::now().as_micros()
    }
}
