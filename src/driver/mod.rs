//! Device drivers
//!
//! Every driver owns a handle onto the shared I2C bus (an `I2cDevice` on the
//! firmware) and talks to exactly one kind of chip. None of them hold the bus
//! across a yield: each register access is one complete transaction.

pub mod ads1115;
pub mod bus;
pub mod gas;
pub mod motor;
pub mod mpu6050;
pub mod pcf8574;
pub mod scd30;
pub mod ultrasonic;
