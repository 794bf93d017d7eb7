//! Hermes robot control core
//!
//! Hardware-independent part of the firmware: device drivers written against the
//! `embedded-hal` 1.0 traits, heading estimation and PID steering, the navigation
//! state machine with its command router, the safety watchdog and telemetry
//! encoding. The firmware binary (`src/main.rs`) wires all of it to the RP2350
//! through embassy tasks.
//!
//! # Layout
//! - [`driver`]: I2C devices (direction/ranging expanders, ADS1115 + MQ-2, SCD30, MPU6050) and PWM motors
//! - [`control`]: orientation, PID, navigation state machine, safety watchdog
//! - [`system`]: shared state types, command decoding and telemetry payloads
//! - [`config`]: the immutable configuration supplied at startup

#![cfg_attr(not(test), no_std)]
#![allow(async_fn_in_trait)]

#[macro_use]
pub mod logging;

pub mod config;
pub mod control;
pub mod driver;
pub mod system;
