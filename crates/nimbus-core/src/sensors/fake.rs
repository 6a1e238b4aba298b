//! Deterministic [`SensorGroup`] for host tests.

use crate::sensors::{SensorError, SensorGroup};
use crate::snapshot::{Channel, ChannelSet};

/// A scripted sensor group.
///
/// Holds one programmed value per channel and can be told to fail its
/// initialization or its measurements. It counts how often it was touched
/// so tests can assert on bus traffic.
#[derive(Debug, Clone)]
pub struct FakeSensorGroup {
    name: &'static str,
    channels: ChannelSet,
    programmed: [f32; 4],
    latched: [f32; 4],
    fail_init: bool,
    fail_measurement: bool,
    pub init_calls: u32,
    pub trigger_calls: u32,
}

impl FakeSensorGroup {
    pub fn new(name: &'static str, channels: ChannelSet) -> Self {
        Self {
            name,
            channels,
            programmed: [f32::NAN; 4],
            latched: [f32::NAN; 4],
            fail_init: false,
            fail_measurement: false,
            init_calls: 0,
            trigger_calls: 0,
        }
    }

    /// Value returned for `channel` by the next successful measurement.
    pub fn with_value(mut self, channel: Channel, value: f32) -> Self {
        self.set_value(channel, value);
        self
    }

    pub fn failing_init(mut self) -> Self {
        self.fail_init = true;
        self
    }

    pub fn set_value(&mut self, channel: Channel, value: f32) {
        self.programmed[channel as usize] = value;
    }

    pub fn set_measurement_failure(&mut self, fail: bool) {
        self.fail_measurement = fail;
    }
}

impl SensorGroup for FakeSensorGroup {
    fn name(&self) -> &'static str {
        self.name
    }

    fn channels(&self) -> ChannelSet {
        self.channels
    }

    async fn initialize(&mut self) -> Result<(), SensorError> {
        self.init_calls += 1;
        if self.fail_init {
            return Err(SensorError::InitializationFailed {
                sensor: self.name,
                details: "scripted failure",
            });
        }
        Ok(())
    }

    async fn trigger_measurement(&mut self) -> Result<(), SensorError> {
        self.trigger_calls += 1;
        self.latched = [f32::NAN; 4];
        if self.fail_measurement {
            return Err(SensorError::ReadFailed {
                sensor: self.name,
                operation: "trigger_measurement",
                details: "scripted failure",
            });
        }
        self.latched = self.programmed;
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
