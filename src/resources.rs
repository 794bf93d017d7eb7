//! Hardware Resource Management
//!
//! Allocates the RP2350 pins and peripherals to the tasks that own them.
//!
//! # Resource Groups
//! - Bus: I2C0 shared by all six devices
//! - Motors: four PWM outputs, one per wheel, on two PWM slices
//! - Link: UART0 to the broker bridge
//!
//! # Shared Resources
//! The I2C bus is shared between tasks behind an async mutex. Each driver gets its
//! own `I2cDevice` handle; the mutex is held for one transaction at a time, never
//! across a yield inside a driver.

use assign_resources::assign_resources;
use embassy_embedded_hal::shared_bus::asynch::i2c::I2cDevice;
use embassy_rp::bind_interrupts;
use embassy_rp::i2c::{self, Async as I2cAsync, I2c, InterruptHandler as I2cInterruptHandler};
use embassy_rp::peripherals::{self, I2C0, UART0};
use embassy_rp::uart::BufferedInterruptHandler;
use embassy_rp::Peri;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::mutex::Mutex;
use static_cell::StaticCell;

use hermes_robot::config::Config;

/// The I2C bus shared by every driver
pub type I2cBusShared = Mutex<CriticalSectionRawMutex, I2c<'static, I2C0, I2cAsync>>;

/// One driver's handle onto the shared bus
pub type SharedI2c = I2cDevice<'static, CriticalSectionRawMutex, I2c<'static, I2C0, I2cAsync>>;

static I2C_BUS: StaticCell<I2cBusShared> = StaticCell::new();

/// Initializes the I2C peripheral.
///
/// This should only be called once during system initialization in main.rs,
/// before any tasks are spawned.
pub fn init_i2c(r: BusResources, config: &Config) -> &'static I2cBusShared {
    let mut i2c_config = i2c::Config::default();
    i2c_config.frequency = config.bus.frequency;
    let i2c = I2c::new_async(r.i2c, r.scl, r.sda, Irqs, i2c_config);
    I2C_BUS.init(Mutex::new(i2c))
}

/// Handle for one driver on the bus
pub fn device(bus: &'static I2cBusShared) -> SharedI2c {
    I2cDevice::new(bus)
}

assign_resources! {
    /// Shared I2C bus (expanders, ADS1115, SCD30, MPU6050)
    bus: BusResources {
        i2c: I2C0,
        sda: PIN_20,
        scl: PIN_21,
    },
    /// Motor speed PWM; direction goes through the expanders
    motors: MotorResources {
        // M1 (A) and M2 (B), left side
        left_slice: PWM_SLICE0,
        m1_pin: PIN_16,
        m2_pin: PIN_17,
        // M3 (A) and M4 (B), right side
        right_slice: PWM_SLICE1,
        m3_pin: PIN_18,
        m4_pin: PIN_19,
    },
    /// Serial link to the broker bridge
    link: LinkResources {
        uart: UART0,
        tx_pin: PIN_0,
        rx_pin: PIN_1,
    },
}

bind_interrupts!(pub struct Irqs {
    I2C0_IRQ => I2cInterruptHandler<I2C0>;
    UART0_IRQ => BufferedInterruptHandler<UART0>;
});
