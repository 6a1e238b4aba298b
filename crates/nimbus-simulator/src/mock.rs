//! Synthetic hardware for the simulator.

use std::convert::Infallible;
use std::time::Instant;

use embedded_hal::digital::{ErrorType, OutputPin};
use log::trace;

use nimbus_core::sensors::{SensorError, SensorGroup};
use nimbus_core::snapshot::{Channel, ChannelSet};

/// Readings that drift slowly over time, like a room over a day.
fn synthetic_value(channel: Channel, t: f64) -> f32 {
    let value = match channel {
        // 20–26 °C with slow drift
        Channel::Temperature => 23.0 + 3.0 * (t / 120.0).sin() + 0.5 * (t / 37.0).cos(),
        // 40–60 %RH on a different period
        Channel::Humidity => 50.0 + 10.0 * (t / 180.0).sin() + 2.0 * (t / 23.0).cos(),
        // Weather front passing through, in Pa
        Channel::Pressure => 101_325.0 + 800.0 * (t / 600.0).sin() + 20.0 * (t / 17.0).cos(),
        // Clouds over a window
        Channel::Light => 400.0 + 350.0 * (t / 90.0).sin() + 30.0 * (t / 7.0).cos(),
    };
    value as f32
}

/// A sensor group producing sinusoidal readings for a fixed channel set.
///
/// An absent group fails its initialization, just like a device that does
/// not acknowledge its address.
pub struct MockSensorGroup {
    name: &'static str,
    channels: ChannelSet,
    present: bool,
    started: Instant,
    latched: [f32; 4],
}

impl MockSensorGroup {
    pub fn new(name: &'static str, channels: ChannelSet, present: bool) -> Self {
        Self {
            name,
            channels,
            present,
            started: Instant::now(),
            latched: [f32::NAN; 4],
        }
    }
}

impl SensorGroup for MockSensorGroup {
    fn name(&self) -> &'static str {
        self.name
    }

    fn channels(&self) -> ChannelSet {
        self.channels
    }

    async fn initialize(&mut self) -> Result<(), SensorError> {
        if self.present {
            Ok(())
        } else {
            Err(SensorError::InitializationFailed {
                sensor: self.name,
                details: "no acknowledge",
            })
        }
    }

    async fn trigger_measurement(&mut self) -> Result<(), SensorError> {
        if !self.present {
            return Err(SensorError::NotReady { sensor: self.name });
        }

        let t = self.started.elapsed().as_secs_f64();
        for channel in self.channels.iter() {
            self.latched[channel as usize] = synthetic_value(channel, t);
        }
        Ok(())
    }

    fn read_channel(&self, channel: Channel) -> f32 {
        if self.channels.contains(channel) {
            self.latched[channel as usize]
        } else {
            f32::NAN
        }
    }
}

/// Status LED that only logs its level changes.
#[derive(Default)]
pub struct LoggingLed {
    lit: bool,
}

impl LoggingLed {
    fn set(&mut self, lit: bool) {
        if lit != self.lit {
            trace!("LED {}", if lit { "on" } else { "off" });
        }
        self.lit = lit;
    }
}

impl ErrorType for LoggingLed {
    type Error = Infallible;
}

impl OutputPin for LoggingLed {
    fn set_low(&mut self) -> Result<(), Infallible> {
        self.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.set(true);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embassy_futures::block_on;

    #[test]
    fn synthetic_values_stay_in_operating_range() {
        for step in 0..2_000 {
            let t = f64::from(step) * 3.7;
            for channel in Channel::ALL {
                let (lo, hi) = channel.operating_range();
                let v = synthetic_value(channel, t);
                assert!(v >= lo as f32 && v <= hi as f32, "{:?} = {}", channel, v);
            }
        }
    }

    #[test]
    fn present_group_produces_its_channels_only() {
        let mut group = MockSensorGroup::new("BME280", ChannelSet::CLIMATE, true);
        block_on(group.initialize()).unwrap();
        block_on(group.trigger_measurement()).unwrap();

        assert!(group.read_channel(Channel::Temperature).is_finite());
        assert!(group.read_channel(Channel::Pressure).is_finite());
        assert!(group.read_channel(Channel::Light).is_nan());
    }

    #[test]
    fn absent_group_fails_like_missing_hardware() {
        let mut group = MockSensorGroup::new("BH1750", ChannelSet::LIGHT, false);
        assert!(block_on(group.initialize()).is_err());
        assert!(block_on(group.trigger_measurement()).is_err());
        assert!(group.read_channel(Channel::Light).is_nan());
    }
}
