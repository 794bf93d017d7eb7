//! Heading estimation, steering and the navigation state machine
pub mod navigation;
pub mod orientation;
pub mod pid;
pub mod watchdog;
