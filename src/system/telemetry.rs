//! Outbound telemetry payloads
//!
//! The dashboard expects JSON objects in fixed shapes. Each shape is a plain
//! `Serialize` struct; [`encode`] renders one into a bounded string with
//! `serde-json-core`, so publishing never allocates.

use heapless::String;
use serde::Serialize;

use crate::driver::gas::GasReading;
use crate::driver::mpu6050::ImuReading;

/// Largest payload the link will carry
pub const PAYLOAD_CAPACITY: usize = 256;

/// Number of beams in the radar message
pub const RADAR_SLOTS: usize = 18;

pub type Payload = String<PAYLOAD_CAPACITY>;

/// One message for the transport
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub topic: &'static str,
    pub payload: Payload,
}

impl Message {
    /// Encode `body` for `topic`, `None` if it does not fit
    pub fn new<T: Serialize>(topic: &'static str, body: &T) -> Option<Self> {
        encode(body).map(|payload| Self { topic, payload })
    }
}

/// Render `body` as JSON, `None` if it exceeds [`PAYLOAD_CAPACITY`]
pub fn encode<T: Serialize>(body: &T) -> Option<Payload> {
    match serde_json_core::to_string::<_, PAYLOAD_CAPACITY>(body) {
        Ok(payload) => Some(payload),
        Err(_) => {
            log_warn!("Telemetry payload exceeds {} bytes", PAYLOAD_CAPACITY);
            None
        }
    }
}

/// `{"sensor_data": {...}}` on the gas topic
#[derive(Debug, Serialize)]
pub struct GasTelemetry {
    pub sensor_data: GasReading,
}

#[derive(Debug, Serialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

#[derive(Debug, Serialize)]
pub struct Orientation {
    pub roll: f32,
    pub pitch: f32,
    pub yaw: f32,
}

/// Accelerometer and attitude on the IMU topic
#[derive(Debug, Serialize)]
pub struct ImuTelemetry {
    pub accelerometer: Vector3,
    pub orientation: Orientation,
}

impl ImuTelemetry {
    /// Combine a raw sample with the integrated yaw
    pub fn new(reading: &ImuReading, yaw: f32) -> Self {
        let [x, y, z] = reading.accel;
        let (roll, pitch) = reading.tilt();
        Self {
            accelerometer: Vector3 { x, y, z },
            orientation: Orientation { roll, pitch, yaw },
        }
    }
}

/// Radar-style distance array
///
/// There is a single fixed sensor, so every beam carries the same distance.
#[derive(Debug, Serialize)]
pub struct RadarTelemetry {
    pub distance_cm: f32,
    pub distances: [f32; RADAR_SLOTS],
}

impl RadarTelemetry {
    pub fn new(distance_cm: f32) -> Self {
        Self {
            distance_cm,
            distances: [distance_cm; RADAR_SLOTS],
        }
    }
}

/// Free-text alert on the gas-alert topic
#[derive(Debug, Serialize)]
pub struct AlertTelemetry<'a> {
    pub msg: &'a str,
}

/// Link status on the status topic
#[derive(Debug, Serialize)]
pub struct StatusTelemetry<'a> {
    pub status: &'a str,
    pub msg: &'a str,
}

impl StatusTelemetry<'static> {
    pub const ONLINE: StatusTelemetry<'static> = StatusTelemetry {
        status: "online",
        msg: "Reconnected",
    };
}

/// Text of the emergency-stop alert
pub const GAS_EMERGENCY_ALERT: &str = "EMERGENCY STOP - GAS DETECTED";

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::gas::AlertLevel;
    use crate::driver::scd30::EnvReading;

    #[test]
    fn gas_shape() {
        let body = GasTelemetry {
            sensor_data: GasReading {
                adc_value: 8000,
                voltage: 1.0,
                ppm: 250.5,
                alert_status: AlertLevel::Normal,
            },
        };
        assert_eq!(
            encode(&body).as_deref(),
            Some(r#"{"sensor_data":{"adc_value":8000,"voltage":1.0,"ppm":250.5,"alert_status":"normal"}}"#)
        );
    }

    #[test]
    fn environment_shape() {
        let body = EnvReading {
            co2: 612.5,
            temperature: 23.25,
            humidity: 41.0,
        };
        assert_eq!(
            encode(&body).as_deref(),
            Some(r#"{"co2":612.5,"temperature":23.25,"humidity":41.0}"#)
        );
    }

    #[test]
    fn status_and_alert_shapes() {
        assert_eq!(
            encode(&StatusTelemetry::ONLINE).as_deref(),
            Some(r#"{"status":"online","msg":"Reconnected"}"#)
        );
        let alert = Message::new("iot/sensor/mq2/alert", &AlertTelemetry { msg: GAS_EMERGENCY_ALERT });
        assert_eq!(
            alert.map(|m| m.payload).as_deref(),
            Some(r#"{"msg":"EMERGENCY STOP - GAS DETECTED"}"#)
        );
    }

    #[test]
    fn radar_fills_every_slot() {
        let radar = RadarTelemetry::new(42.0);
        assert!(radar.distances.iter().all(|d| *d == 42.0));
        let payload = encode(&radar).unwrap_or_default();
        assert!(payload.starts_with(r#"{"distance_cm":42.0,"distances":[42.0,42.0,"#));
        assert!(payload.len() < PAYLOAD_CAPACITY);
    }

    #[test]
    fn imu_shape_keys() {
        let reading = ImuReading {
            accel: [0.0, 0.0, 1.0],
            gyro_z: 0.0,
        };
        let payload = encode(&ImuTelemetry::new(&reading, 12.5)).unwrap_or_default();
        assert!(payload.starts_with(r#"{"accelerometer":{"x":0.0,"y":0.0,"z":1.0},"orientation":{"roll":"#));
        assert!(payload.ends_with(r#""yaw":12.5}}"#));
    }
}
