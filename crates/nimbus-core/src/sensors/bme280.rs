use crate::config::BME280_ADDRESS_SECONDARY;
use crate::sensors::SensorError;
use crate::sensors::climate::{CHIP_ID_REGISTER, ClimateChip};
use crate::snapshot::{Channel, ChannelSet};

use super::SensorGroup;
use bme280::i2c::AsyncBME280;
use embedded_hal_async::{delay::DelayNs, i2c::I2c};
use log::{error, info};

/// Cached values from the last forced measurement.
#[derive(Clone, Copy)]
struct ClimateReadings {
    temperature_celsius: f32,
    humidity_percent: f32,
    pressure_pascal: f32,
}

impl ClimateReadings {
    const UNAVAILABLE: Self = Self {
        temperature_celsius: f32::NAN,
        humidity_percent: f32::NAN,
        pressure_pascal: f32::NAN,
    };
}

/// BME280 (or humidity-less BMP280) climate sensor, alone on bus #1.
///
/// The bus is held until [`SensorGroup::initialize`] has read the chip ID;
/// only then is it handed to the driver.
pub struct BME280Group<I, D> {
    bus: Option<I>,
    sensor: Option<AsyncBME280<I>>,
    address: u8,
    chip: Option<ClimateChip>,
    delay: D,
    readings: ClimateReadings,
}

impl<I: I2c, D: DelayNs> BME280Group<I, D> {
    pub fn new(i2c: I, delay: D, address: u8) -> Self {
        Self {
            bus: Some(i2c),
            sensor: None,
            address,
            chip: None,
            delay,
            readings: ClimateReadings::UNAVAILABLE,
        }
    }

    /// The detected part, once initialization got that far.
    pub fn chip(&self) -> Option<ClimateChip> {
        self.chip
    }

    async fn identify(&mut self, mut i2c: I) -> Result<ClimateChip, SensorError> {
        let mut id = [0u8; 1];
        let id_read = i2c
            .write_read(self.address, &[CHIP_ID_REGISTER], &mut id)
            .await;

        self.sensor = Some(if self.address == BME280_ADDRESS_SECONDARY {
            AsyncBME280::new_secondary(i2c)
        } else {
            AsyncBME280::new_primary(i2c)
        });

        id_read.map_err(|e| {
            error!("BME280 chip ID read failed: {:?}", e);
            SensorError::InitializationFailed {
                sensor: "BME280",
                details: "No answer at the configured address on bus #1",
            }
        })?;

        ClimateChip::from_chip_id(id[0]).ok_or_else(|| {
            error!("Unsupported climate chip ID {:#04x}", id[0]);
            SensorError::InitializationFailed {
                sensor: "BME280",
                details: "Unsupported chip ID on bus #1",
            }
        })
    }
}

impl<I: I2c, D: DelayNs> SensorGroup for BME280Group<I, D> {
    fn name(&self) -> &'static str {
        self.chip.map_or("BME280", ClimateChip::name)
    }

    fn channels(&self) -> ChannelSet {
        self.chip.map_or(ChannelSet::CLIMATE, ClimateChip::channels)
    }

    async fn initialize(&mut self) -> Result<(), SensorError> {
        if let Some(i2c) = self.bus.take() {
            let chip = self.identify(i2c).await?;
            info!("{} detected", chip.name());
            self.chip = Some(chip);
        }

        let (Some(sensor), Some(chip)) = (self.sensor.as_mut(), self.chip) else {
            return Err(SensorError::InitializationFailed {
                sensor: "BME280",
                details: "Chip was not identified on bus #1",
            });
        };

        sensor.init(&mut self.delay).await.map_err(|e| {
            error!("{} init failed: {:?}", chip.name(), e);
            SensorError::InitializationFailed {
                sensor: chip.name(),
                details: "Calibration read failed on bus #1",
            }
        })?;

        info!("{} ready", chip.name());
        Ok(())
    }

    /// The driver puts the chip in forced mode for every `measure`, so the
    /// sensor sleeps between polls.
    async fn trigger_measurement(&mut self) -> Result<(), SensorError> {
        self.readings = ClimateReadings::UNAVAILABLE;

        let (Some(sensor), Some(chip)) = (self.sensor.as_mut(), self.chip) else {
            return Err(SensorError::NotReady { sensor: "BME280" });
        };

        let measurement = sensor.measure(&mut self.delay).await.map_err(|e| {
            error!("BME280 forced measurement failed: {:?}", e);
            SensorError::ReadFailed {
                sensor: "BME280",
                operation: "forced measurement",
                details: "I2C communication error or sensor not responding",
            }
        })?;

        self.readings = ClimateReadings {
            temperature_celsius: measurement.temperature,
            humidity_percent: chip.humidity(measurement.humidity),
            pressure_pascal: measurement.pressure,
        };

        Ok(())
    }

    fn read_channel(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Temperature => self.readings.temperature_celsius,
            Channel::Humidity => self.readings.humidity_percent,
            Channel::Pressure => self.readings.pressure_pascal,
            Channel::Light => f32::NAN,
        }
    }
}
