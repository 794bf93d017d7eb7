//! ADS1115 16-bit ADC
//!
//! Only what the gas sensor needs: a single-shot, single-ended conversion at
//! ±4.096 V full scale and 128 SPS. The conversion takes about 8 ms; the driver
//! waits 10 ms through `DelayNs`, which is a yield point on the firmware.

use embedded_hal_async::delay::DelayNs;
use embedded_hal_async::i2c::I2c;

use super::bus::BusError;

const REG_CONVERSION: u8 = 0x00;
const REG_CONFIG: u8 = 0x01;

/// Start a single conversion
const OS_SINGLE: u16 = 0x8000;
/// AIN0 vs GND; channels 1-3 follow in steps of 0x1000
const MUX_SINGLE_AIN0: u16 = 0x4000;
/// PGA ±4.096 V
const PGA_4_096V: u16 = 0x0200;
/// Power-down single-shot mode
const MODE_SINGLE_SHOT: u16 = 0x0100;
/// 128 samples per second
const DR_128SPS: u16 = 0x0080;
/// Comparator disabled
const COMP_QUEUE_DISABLE: u16 = 0x0003;

/// Wait between starting a conversion and reading it back (ms)
const CONVERSION_WAIT_MS: u32 = 10;

/// Config register word starting a conversion on `channel` (0..=3)
pub const fn config_word(channel: u8) -> u16 {
    OS_SINGLE
        | (MUX_SINGLE_AIN0 + (channel as u16) * 0x1000)
        | PGA_4_096V
        | MODE_SINGLE_SHOT
        | DR_128SPS
        | COMP_QUEUE_DISABLE
}

/// ADS1115 on the shared bus
pub struct Ads1115<I, D> {
    i2c: I,
    delay: D,
    address: u8,
}

impl<I: I2c, D: DelayNs> Ads1115<I, D> {
    pub fn new(i2c: I, delay: D, address: u8) -> Self {
        Self { i2c, delay, address }
    }

    /// The delay used for conversions, shared with callers that pace their sampling
    pub fn delay(&mut self) -> &mut D {
        &mut self.delay
    }

    /// Convert `channel` and return the signed raw code
    pub async fn read_raw(&mut self, channel: u8) -> Result<i16, BusError> {
        let config = config_word(channel).to_be_bytes();
        self.i2c
            .write(self.address, &[REG_CONFIG, config[0], config[1]])
            .await
            .map_err(BusError::at(self.address))?;

        self.delay.delay_ms(CONVERSION_WAIT_MS).await;

        let mut buf = [0u8; 2];
        self.i2c
            .write_read(self.address, &[REG_CONVERSION], &mut buf)
            .await
            .map_err(BusError::at(self.address))?;
        Ok(i16::from_be_bytes(buf))
    }

    /// Convert `channel`, reporting 0 for invalid channels and bus failures
    pub async fn read_channel(&mut self, channel: u8) -> i16 {
        if channel > 3 {
            return 0;
        }
        match self.read_raw(channel).await {
            Ok(raw) => raw,
            Err(e) => {
                log_warn!("ADC {} read failed: {:?}", e.address, e.kind);
                0
            }
        }
    }
}
