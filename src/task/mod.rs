pub mod link;
pub mod navigate;
pub mod sensors_fast;
pub mod sensors_slow;
pub mod watchdog;
