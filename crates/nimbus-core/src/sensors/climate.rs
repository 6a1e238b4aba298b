//! Identification of the Bosch climate sensor on bus #1.
//!
//! The BME280 and the BMP280 share address, registers and driver, but only
//! the BME280 has a humidity sensor. The BMP280 leaves the humidity
//! registers unimplemented and any value read from them is meaningless, so
//! the chip is told apart by its ID register before the driver takes over.

use crate::snapshot::{Channel, ChannelSet};

/// Register holding the chip ID on both parts.
pub const CHIP_ID_REGISTER: u8 = 0xD0;

pub const BME280_CHIP_ID: u8 = 0x60;
/// Production BMP280 ID; 0x56 and 0x57 are engineering samples.
pub const BMP280_CHIP_IDS: [u8; 3] = [0x56, 0x57, 0x58];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClimateChip {
    Bme280,
    Bmp280,
}

impl ClimateChip {
    pub const fn from_chip_id(id: u8) -> Option<Self> {
        match id {
            BME280_CHIP_ID => Some(ClimateChip::Bme280),
            0x56..=0x58 => Some(ClimateChip::Bmp280),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ClimateChip::Bme280 => "BME280",
            ClimateChip::Bmp280 => "BMP280",
        }
    }

    pub const fn channels(self) -> ChannelSet {
        match self {
            ClimateChip::Bme280 => ChannelSet::CLIMATE,
            ClimateChip::Bmp280 => ChannelSet::CLIMATE.without(Channel::Humidity),
        }
    }

    /// Humidity as reported by this chip: the raw driver value on a BME280,
    /// NaN on a BMP280.
    pub fn humidity(self, raw: f32) -> f32 {
        if self.channels().contains(Channel::Humidity) {
            raw
        } else {
            f32::NAN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifies_both_parts() {
        assert_eq!(ClimateChip::from_chip_id(0x60), Some(ClimateChip::Bme280));
        for id in BMP280_CHIP_IDS {
            assert_eq!(ClimateChip::from_chip_id(id), Some(ClimateChip::Bmp280));
        }
        assert_eq!(ClimateChip::from_chip_id(0x00), None);
        assert_eq!(ClimateChip::from_chip_id(0xFF), None);
        assert_eq!(ClimateChip::from_chip_id(0x61), None);
    }

    #[test]
    fn bmp280_never_reports_humidity() {
        let chip = ClimateChip::Bmp280;
        assert!(!chip.channels().contains(Channel::Humidity));
        assert!(chip.channels().contains(Channel::Temperature));
        assert!(chip.channels().contains(Channel::Pressure));
        assert!(chip.humidity(0.0).is_nan());
        assert!(chip.humidity(100.0).is_nan());
    }

    #[test]
    fn bme280_keeps_humidity() {
        let chip = ClimateChip::Bme280;
        assert_eq!(chip.channels(), ChannelSet::CLIMATE);
        assert_eq!(chip.humidity(55.12), 55.12);
    }
}
