use crate::config::BH1750_ADDRESS_HIGH;
use crate::sensors::SensorError;
use crate::snapshot::{Channel, ChannelSet};

use super::SensorGroup;
use bh1750_embedded::{Address, Resolution, r#async::Bh1750Async};
use embedded_hal_async::{delay::DelayNs, i2c::I2c};
use log::{error, info};

/// BH1750 ambient light sensor, alone on bus #2.
pub struct BH1750Group<I, D> {
    sensor: Bh1750Async<I, D>,
    lux: f32,
}

impl<I: I2c, D: DelayNs> BH1750Group<I, D> {
    pub fn new(i2c: I, delay: D, address: u8) -> Self {
        let address = if address == BH1750_ADDRESS_HIGH {
            Address::High
        } else {
            Address::Low
        };

        Self {
            sensor: Bh1750Async::<I, D>::new(i2c, delay, address),
            lux: f32::NAN,
        }
    }

    async fn measure_once(&mut self) -> Result<f32, SensorError> {
        self.sensor
            .one_time_measurement(Resolution::High)
            .await
            .map_err(|e| {
                error!("BH1750 one_time_measurement failed: {:?}", e);
                SensorError::ReadFailed {
                    sensor: "BH1750",
                    operation: "one_time_measurement",
                    details: "Failed to read lux value during a single one-time measurement",
                }
            })
    }
}

impl<I: I2c, D: DelayNs> SensorGroup for BH1750Group<I, D> {
    fn name(&self) -> &'static str {
        "BH1750"
    }

    fn channels(&self) -> ChannelSet {
        ChannelSet::LIGHT
    }

    async fn initialize(&mut self) -> Result<(), SensorError> {
        // The BH1750 has no ID register; a one-time measurement checks that it answers.
        let lux = self.measure_once().await.map_err(|_| SensorError::InitializationFailed {
            sensor: "BH1750",
            details: "No response to a one-time measurement on bus #2",
        })?;

        info!("BH1750 ready ({} lx)", lux);
        Ok(())
    }

    async fn trigger_measurement(&mut self) -> Result<(), SensorError> {
        self.lux = f32::NAN;
        self.lux = self.measure_once().await?;
        Ok(())
    }

    fn read_channel(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Light => self.lux,
            _ => f32::NAN,
        }
    }
}
