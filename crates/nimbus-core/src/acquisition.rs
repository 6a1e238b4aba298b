//! Acquisition and validation of sensor readings.
//!
//! [`SensorManager`] owns the two sensor groups, one per I2C bus, and the
//! single [`SensorSnapshot`] of the node. Each bus is brought up and read
//! independently: a dead device on bus #1 never stops bus #2, it only turns
//! its own channels into NaN.

use log::{debug, error, info, warn};

use crate::sensors::SensorGroup;
use crate::snapshot::{Channel, ChannelSet, SensorSnapshot};

/// How many enabled sensor groups answer: at bring-up until the first
/// acquisition cycle, then in the latest cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AcquisitionHealth {
    enabled_groups: u8,
    responding_groups: u8,
}

impl AcquisitionHealth {
    pub const fn new(enabled_groups: u8, responding_groups: u8) -> Self {
        Self {
            enabled_groups,
            responding_groups,
        }
    }

    pub const fn enabled_groups(&self) -> u8 {
        self.enabled_groups
    }

    pub const fn responding_groups(&self) -> u8 {
        self.responding_groups
    }

    pub const fn all_responding(&self) -> bool {
        self.responding_groups >= self.enabled_groups
    }

    /// True when at least one group is enabled and none of them answers.
    pub const fn none_responding(&self) -> bool {
        self.enabled_groups > 0 && self.responding_groups == 0
    }
}

/// One sensor group plus its bring-up and freshness state.
struct BusSlot<G> {
    group: G,
    bus: &'static str,
    enabled: bool,
    ready: bool,
    fresh: bool,
}

impl<G: SensorGroup> BusSlot<G> {
    fn new(group: G, bus: &'static str, enabled_channels: ChannelSet) -> Self {
        let enabled = group.channels().intersects(enabled_channels);
        Self {
            group,
            bus,
            enabled,
            ready: false,
            fresh: false,
        }
    }

    /// Bring the group up. Disabled groups count as success because nothing
    /// is expected from them.
    async fn initialize(&mut self) -> bool {
        if !self.enabled {
            info!("[I2C] {} on bus {} disabled", self.group.name(), self.bus);
            return true;
        }

        match self.group.initialize().await {
            Ok(()) => {
                info!("[I2C] {} on bus {} ready", self.group.name(), self.bus);
                self.ready = true;
            }
            Err(e) => {
                error!("[I2C] bus {}: {}", self.bus, e);
                self.ready = false;
            }
        }

        self.ready
    }

    async fn measure(&mut self) {
        self.fresh = false;
        if !(self.enabled && self.ready) {
            return;
        }

        match self.group.trigger_measurement().await {
            Ok(()) => self.fresh = true,
            Err(e) => error!("[I2C] bus {}: {}", self.bus, e),
        }
    }

    /// Before any cycle ran only bring-up counts; afterwards the group must
    /// also have delivered in the latest cycle.
    fn responding(&self, measured: bool) -> bool {
        self.enabled && self.ready && (!measured || self.fresh)
    }

    fn provides(&self, channel: Channel) -> bool {
        self.group.channels().contains(channel)
    }

    fn value(&self, channel: Channel) -> f32 {
        if self.fresh {
            self.group.read_channel(channel)
        } else {
            f32::NAN
        }
    }
}

/// Owner of both buses' sensor groups and the node's only snapshot.
pub struct SensorManager<P, S> {
    primary: BusSlot<P>,
    secondary: BusSlot<S>,
    enabled: ChannelSet,
    snapshot: SensorSnapshot,
    measured: bool,
}

impl<P: SensorGroup, S: SensorGroup> SensorManager<P, S> {
    /// `primary` lives on bus #1 and `secondary` on bus #2. Channels outside
    /// `enabled` always read NaN and never make a snapshot invalid.
    pub fn new(primary: P, secondary: S, enabled: ChannelSet) -> Self {
        Self {
            primary: BusSlot::new(primary, "#1", enabled),
            secondary: BusSlot::new(secondary, "#2", enabled),
            enabled,
            snapshot: SensorSnapshot::default(),
            measured: false,
        }
    }

    /// Initialize every enabled sensor group.
    ///
    /// Both buses are always attempted. Returns true only when every enabled
    /// group responded; on false the manager stays usable and the failed
    /// groups report NaN from then on.
    pub async fn initialize(&mut self) -> bool {
        let primary_ok = self.primary.initialize().await;
        let secondary_ok = self.secondary.initialize().await;
        primary_ok && secondary_ok
    }

    /// Take one forced measurement per enabled group and replace the snapshot.
    ///
    /// The new snapshot is assembled completely before it is stored, so a
    /// reader never sees values from two different cycles. Bus errors show
    /// up as NaN on the affected channels.
    pub async fn read_sensors(&mut self) -> &SensorSnapshot {
        self.primary.measure().await;
        self.secondary.measure().await;
        self.measured = true;

        let snapshot = SensorSnapshot::validated(
            self.channel_value(Channel::Temperature),
            self.channel_value(Channel::Humidity),
            self.channel_value(Channel::Pressure),
            self.channel_value(Channel::Light),
            self.enabled,
        );
        self.snapshot = snapshot;

        if self.snapshot.is_valid {
            debug!(
                "Snapshot: {} C, {} %RH, {} Pa, {} lx",
                self.snapshot.temperature,
                self.snapshot.humidity,
                self.snapshot.pressure,
                self.snapshot.light_level
            );
        } else {
            warn!("Invalid sensor data");
        }

        &self.snapshot
    }

    /// Latest snapshot; the boot default until the first `read_sensors`.
    pub fn snapshot(&self) -> &SensorSnapshot {
        &self.snapshot
    }

    pub fn enabled_channels(&self) -> ChannelSet {
        self.enabled
    }

    /// Group health of the latest acquisition cycle, or of bring-up before
    /// the first cycle. A group that initialized but stopped answering
    /// counts as not responding.
    pub fn health(&self) -> AcquisitionHealth {
        let slots = [
            (self.primary.enabled, self.primary.responding(self.measured)),
            (self.secondary.enabled, self.secondary.responding(self.measured)),
        ];
        let enabled = slots.iter().filter(|(enabled, _)| *enabled).count() as u8;
        let responding = slots.iter().filter(|(_, responding)| *responding).count() as u8;
        AcquisitionHealth::new(enabled, responding)
    }

    /// Borrow the groups, mainly for tests and diagnostics.
    pub fn groups(&self) -> (&P, &S) {
        (&self.primary.group, &self.secondary.group)
    }

    pub fn groups_mut(&mut self) -> (&mut P, &mut S) {
        (&mut self.primary.group, &mut self.secondary.group)
    }

    fn channel_value(&self, channel: Channel) -> f32 {
        if !self.enabled.contains(channel) {
            f32::NAN
        } else if self.primary.provides(channel) {
            self.primary.value(channel)
        } else if self.secondary.provides(channel) {
            self.secondary.value(channel)
        } else {
            f32::NAN
        }
    }
}
