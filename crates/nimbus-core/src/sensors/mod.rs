#[cfg(feature = "sensor-bh1750")]
mod bh1750;
#[cfg(feature = "sensor-bme280")]
mod bme280;
pub mod climate;
pub mod fake;

#[cfg(feature = "sensor-bh1750")]
pub use bh1750::BH1750Group;
#[cfg(feature = "sensor-bme280")]
pub use bme280::BME280Group;
pub use climate::ClimateChip;
pub use fake::FakeSensorGroup;

use thiserror_no_std::Error;

use crate::snapshot::{Channel, ChannelSet};

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    #[error("{sensor} initialization failed: {details}")]
    InitializationFailed {
        sensor: &'static str,
        details: &'static str,
    },
    #[error("{sensor} read failed during {operation}: {details}")]
    ReadFailed {
        sensor: &'static str,
        operation: &'static str,
        details: &'static str,
    },
    #[error("{sensor} used before a successful initialization")]
    NotReady { sensor: &'static str },
}

/// Capability interface for one sensor group living on its own bus.
///
/// Acquisition, validation and serialization only ever talk to hardware
/// through this trait. Real implementations wrap a driver crate; tests and
/// the simulator use deterministic fakes.
///
/// A measurement is always one-shot: [`SensorGroup::trigger_measurement`]
/// wakes the device, samples once and caches the result, and
/// [`SensorGroup::read_channel`] then hands out the cached values.
pub trait SensorGroup {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// Channels this group can produce.
    fn channels(&self) -> ChannelSet;

    /// Probe and configure the device.
    fn initialize(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    /// Run a single forced measurement and cache its values.
    fn trigger_measurement(&mut self) -> impl Future<Output = Result<(), SensorError>>;

    /// Value of `channel` from the last successful measurement, or NaN when
    /// the channel is not provided or no fresh value exists.
    fn read_channel(&self, channel: Channel) -> f32;
}
