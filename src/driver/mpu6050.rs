//! MPU6050 accelerometer + gyroscope
//!
//! Runs at the power-on ranges (±2 g, ±250 °/s) with the 44 Hz low-pass filter,
//! which keeps motor vibration out of the heading integration. The navigation loop
//! only needs the Z rate, so [`Mpu6050::read_gyro_z`] reads two bytes instead of
//! the full fourteen-byte burst.

use embedded_hal_async::i2c::I2c;

use super::bus::BusError;

const REG_CONFIG: u8 = 0x1A;
const REG_GYRO_CONFIG: u8 = 0x1B;
const REG_ACCEL_CONFIG: u8 = 0x1C;
const REG_ACCEL_XOUT_H: u8 = 0x3B;
const REG_GYRO_ZOUT_H: u8 = 0x47;
const REG_PWR_MGMT_1: u8 = 0x6B;
const REG_WHO_AM_I: u8 = 0x75;

const WHO_AM_I_VALUE: u8 = 0x68;
/// DLPF_CFG = 3: 44 Hz accel, 42 Hz gyro
const DLPF_44HZ: u8 = 0x03;

/// LSB per g at ±2 g
const ACCEL_LSB_PER_G: f32 = 16384.0;
/// LSB per °/s at ±250 °/s
const GYRO_LSB_PER_DPS: f32 = 131.0;

/// One IMU sample
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "embedded", derive(defmt::Format))]
pub struct ImuReading {
    /// Acceleration along X, Y, Z (g)
    pub accel: [f32; 3],
    /// Rotation rate about the vertical axis (°/s, counter-clockwise positive)
    pub gyro_z: f32,
}

impl ImuReading {
    /// Roll and pitch from the gravity vector (degrees)
    pub fn tilt(&self) -> (f32, f32) {
        let [x, y, z] = self.accel;
        let roll = libm::atan2f(y, z);
        let pitch = libm::atan2f(-x, libm::sqrtf(y * y + z * z));
        (roll.to_degrees(), pitch.to_degrees())
    }
}

/// MPU6050 on the shared bus
pub struct Mpu6050<I> {
    i2c: I,
    address: u8,
}

impl<I: I2c> Mpu6050<I> {
    pub fn new(i2c: I, address: u8) -> Self {
        Self { i2c, address }
    }

    /// Check identity, wake the chip and set ranges and filter
    pub async fn init(&mut self) -> Result<(), BusError> {
        let who = self.read_register(REG_WHO_AM_I).await?;
        if who != WHO_AM_I_VALUE {
            log_warn!("MPU6050 WHO_AM_I is {}, expected {}", who, WHO_AM_I_VALUE);
        }
        self.write_register(REG_PWR_MGMT_1, 0x00).await?;
        self.write_register(REG_CONFIG, DLPF_44HZ).await?;
        self.write_register(REG_GYRO_CONFIG, 0x00).await?;
        self.write_register(REG_ACCEL_CONFIG, 0x00).await?;
        log_info!("MPU6050 initialized");
        Ok(())
    }

    /// Rotation rate about Z (°/s), uncorrected for bias
    pub async fn read_gyro_z(&mut self) -> Result<f32, BusError> {
        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[REG_GYRO_ZOUT_H], &mut buf)
            .await
            .map_err(BusError::at(self.address))?;
        Ok(f32::from(i16::from_be_bytes(buf)) / GYRO_LSB_PER_DPS)
    }

    /// Accelerometer plus gyro Z in one burst
    pub async fn read(&mut self) -> Result<ImuReading, BusError> {
        let mut buf = [0u8; 14];
        self.i2c
            .write_read(self.address, &[REG_ACCEL_XOUT_H], &mut buf)
            .await
            .map_err(BusError::at(self.address))?;
        Ok(decode_burst(&buf))
    }

    async fn write_register(&mut self, register: u8, value: u8) -> Result<(), BusError> {
        self.i2c
            .write(self.address, &[register, value])
            .await
            .map_err(BusError::at(self.address))
    }

    async fn read_register(&mut self, register: u8) -> Result<u8, BusError> {
        let mut buf = [0u8; 1];
        self.i2c
            .write_read(self.address, &[register], &mut buf)
            .await
            .map_err(BusError::at(self.address))?;
        Ok(buf[0])
    }
}

/// Decode ACCEL_XOUT_H..GYRO_ZOUT_L (temperature and gyro X/Y are skipped)
pub fn decode_burst(buf: &[u8; 14]) -> ImuReading {
    let word = |i: usize| f32::from(i16::from_be_bytes([buf[i], buf[i + 1]]));
    ImuReading {
        accel: [
            word(0) / ACCEL_LSB_PER_G,
            word(2) / ACCEL_LSB_PER_G,
            word(4) / ACCEL_LSB_PER_G,
        ],
        gyro_z: word(12) / GYRO_LSB_PER_DPS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn burst_decodes_scaled_values() {
        let mut buf = [0u8; 14];
        // ax = +0.5 g, az = +1 g, gz = -1 °/s
        buf[0..2].copy_from_slice(&8192i16.to_be_bytes());
        buf[4..6].copy_from_slice(&16384i16.to_be_bytes());
        buf[12..14].copy_from_slice(&(-131i16).to_be_bytes());

        let r = decode_burst(&buf);
        assert_eq!(r.accel, [0.5, 0.0, 1.0]);
        assert_eq!(r.gyro_z, -1.0);
    }

    #[test]
    fn level_board_has_no_tilt() {
        let r = ImuReading {
            accel: [0.0, 0.0, 1.0],
            gyro_z: 0.0,
        };
        let (roll, pitch) = r.tilt();
        assert!(roll.abs() < 1e-4);
        assert!(pitch.abs() < 1e-4);
    }

    #[test]
    fn nose_down_is_positive_pitch() {
        let r = ImuReading {
            accel: [-0.5, 0.0, 0.866],
            gyro_z: 0.0,
        };
        let (_, pitch) = r.tilt();
        assert!((pitch - 30.0).abs() < 0.1);
    }
}
