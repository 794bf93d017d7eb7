//! Shared state types, command decoding, link framing and telemetry payloads
pub mod command;
pub mod link;
pub mod state;
pub mod telemetry;
