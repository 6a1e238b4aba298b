//! The shared reading type produced once per acquisition cycle.
//!
//! A [`SensorSnapshot`] holds every channel value from one cycle plus the
//! validity verdict. Values are `f32`; `f32::NAN` is the sentinel for
//! "channel disabled or unavailable".

use serde::{Deserialize, Serialize};

/// A single measurement channel on the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Channel {
    /// Degrees Celsius (bus #1 climate sensor)
    Temperature = 0,
    /// Relative humidity in percent (bus #1, absent on BMP280 variants)
    Humidity = 1,
    /// Barometric pressure in pascals (bus #1)
    Pressure = 2,
    /// Ambient light in lux (bus #2)
    Light = 3,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Temperature,
        Channel::Humidity,
        Channel::Pressure,
        Channel::Light,
    ];

    const fn bit(self) -> u8 {
        1 << (self as u8)
    }

    /// Inclusive operating range of the channel, in its native unit.
    ///
    /// These bounds come from the sensor datasheets (BME280: -40..85 °C,
    /// 0..100 %RH, 300..1100 hPa; BH1750: 0..65535 lx).
    pub const fn operating_range(self) -> (i32, i32) {
        match self {
            Channel::Temperature => (-40, 85),
            Channel::Humidity => (0, 100),
            Channel::Pressure => (30_000, 110_000),
            Channel::Light => (0, 65_535),
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            Channel::Temperature => "temperature",
            Channel::Humidity => "humidity",
            Channel::Pressure => "pressure",
            Channel::Light => "light",
        }
    }
}

/// Runtime capability set: a bitmask of enabled [`Channel`]s.
///
/// Resolved once at startup from configuration; acquisition and validation
/// branch on this set instead of compile-time flags.
///
/// Serialized as its raw bits; deserialization drops bits that name no
/// channel, like [`ChannelSet::from_bits`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "u8", into = "u8")]
pub struct ChannelSet(u8);

impl ChannelSet {
    pub const EMPTY: Self = Self(0);
    pub const ALL: Self = Self(0b1111);
    /// Channels served by the BME280/BMP280 on bus #1.
    pub const CLIMATE: Self = Self(
        Channel::Temperature.bit() | Channel::Humidity.bit() | Channel::Pressure.bit(),
    );
    /// Channels served by the BH1750 on bus #2.
    pub const LIGHT: Self = Self(Channel::Light.bit());
    /// Channels whose finiteness decides snapshot validity. Humidity is
    /// deliberately absent.
    pub const VALIDITY: Self = Self(
        Channel::Temperature.bit() | Channel::Pressure.bit() | Channel::Light.bit(),
    );

    pub const fn from_bits(bits: u8) -> Self {
        Self(bits & Self::ALL.0)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn contains(self, channel: Channel) -> bool {
        self.0 & channel.bit() != 0
    }

    pub const fn with(self, channel: Channel) -> Self {
        Self(self.0 | channel.bit())
    }

    pub const fn without(self, channel: Channel) -> Self {
        Self(self.0 & !channel.bit())
    }

    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    pub const fn intersection(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Iterate the contained channels in declaration order.
    pub fn iter(self) -> impl Iterator<Item = Channel> {
        Channel::ALL.into_iter().filter(move |c| self.contains(*c))
    }
}

impl From<u8> for ChannelSet {
    fn from(bits: u8) -> Self {
        Self::from_bits(bits)
    }
}

impl From<ChannelSet> for u8 {
    fn from(set: ChannelSet) -> Self {
        set.bits()
    }
}

impl FromIterator<Channel> for ChannelSet {
    fn from_iter<T: IntoIterator<Item = Channel>>(iter: T) -> Self {
        iter.into_iter().fold(Self::EMPTY, Self::with)
    }
}

/// Complete set of values captured during one acquisition cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorSnapshot {
    pub temperature: f32,
    pub humidity: f32,
    pub pressure: f32,
    pub light_level: f32,
    pub is_valid: bool,
}

impl Default for SensorSnapshot {
    /// Boot-time snapshot: all zero and not valid until the first cycle.
    fn default() -> Self {
        Self {
            temperature: 0.0,
            humidity: 0.0,
            pressure: 0.0,
            light_level: 0.0,
            is_valid: false,
        }
    }
}

impl SensorSnapshot {
    /// Build a snapshot from raw channel values and run validation against
    /// the enabled channel set.
    pub fn validated(
        temperature: f32,
        humidity: f32,
        pressure: f32,
        light_level: f32,
        enabled: ChannelSet,
    ) -> Self {
        let mut snapshot = Self {
            temperature,
            humidity,
            pressure,
            light_level,
            is_valid: false,
        };
        snapshot.is_valid = validate_readings(&snapshot, enabled);
        snapshot
    }

    /// Snapshot with every channel unavailable.
    pub fn unavailable(enabled: ChannelSet) -> Self {
        Self::validated(f32::NAN, f32::NAN, f32::NAN, f32::NAN, enabled)
    }

    pub const fn value(&self, channel: Channel) -> f32 {
        match channel {
            Channel::Temperature => self.temperature,
            Channel::Humidity => self.humidity,
            Channel::Pressure => self.pressure,
            Channel::Light => self.light_level,
        }
    }
}

/// The asymmetric validity rule.
///
/// A snapshot is valid iff every required channel is finite, where the
/// required set is `{temperature, pressure, light}` restricted to the
/// enabled channels. Humidity is never required: BMP280 builds have no
/// humidity channel and report NaN forever.
pub fn validate_readings(snapshot: &SensorSnapshot, enabled: ChannelSet) -> bool {
    ChannelSet::VALIDITY
        .intersection(enabled)
        .iter()
        .all(|channel| snapshot.value(channel).is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::de::IntoDeserializer;
    use serde::de::value::{Error as ValueError, U8Deserializer};

    fn deserialize_bits(bits: u8) -> ChannelSet {
        let de: U8Deserializer<ValueError> = bits.into_deserializer();
        ChannelSet::deserialize(de).unwrap()
    }

    #[test]
    fn deserialized_set_drops_unknown_bits() {
        assert_eq!(deserialize_bits(0xFF), ChannelSet::ALL);
        assert_eq!(deserialize_bits(0xF0), ChannelSet::EMPTY);
        assert_eq!(deserialize_bits(0b1_0100), ChannelSet::EMPTY.with(Channel::Pressure));
        assert_eq!(deserialize_bits(0xFF).iter().count(), 4);
    }

    #[test]
    fn bits_convert_both_ways() {
        assert_eq!(ChannelSet::from(0xFFu8), ChannelSet::ALL);
        assert_eq!(u8::from(ChannelSet::LIGHT), 0b1000);
    }

    #[test]
    fn default_snapshot_is_zeroed_and_invalid() {
        let snapshot = SensorSnapshot::default();
        assert_eq!(snapshot.temperature, 0.0);
        assert_eq!(snapshot.light_level, 0.0);
        assert!(!snapshot.is_valid);
    }

    #[test]
    fn missing_humidity_stays_valid() {
        let snapshot = SensorSnapshot::validated(21.5, f32::NAN, 1013.2, 300.0, ChannelSet::ALL);
        assert!(snapshot.is_valid);
    }

    #[test]
    fn each_required_channel_invalidates() {
        let cases = [
            (f32::NAN, 50.0, 101_300.0, 300.0),
            (21.0, 50.0, f32::INFINITY, 300.0),
            (21.0, 50.0, 101_300.0, f32::NAN),
        ];
        for (t, h, p, l) in cases {
            assert!(!SensorSnapshot::validated(t, h, p, l, ChannelSet::ALL).is_valid);
        }
    }

    #[test]
    fn disabled_light_channel_is_not_required() {
        let enabled = ChannelSet::CLIMATE;
        let snapshot = SensorSnapshot::validated(21.0, 40.0, 101_300.0, f32::NAN, enabled);
        assert!(snapshot.is_valid);
    }

    #[test]
    fn nothing_enabled_is_trivially_valid() {
        assert!(SensorSnapshot::unavailable(ChannelSet::EMPTY).is_valid);
        assert!(!SensorSnapshot::unavailable(ChannelSet::ALL).is_valid);
    }

    #[test]
    fn channel_set_operations() {
        let set = ChannelSet::EMPTY
            .with(Channel::Temperature)
            .with(Channel::Light);
        assert!(set.contains(Channel::Temperature));
        assert!(!set.contains(Channel::Humidity));
        assert_eq!(set.without(Channel::Light), ChannelSet::EMPTY.with(Channel::Temperature));
        assert_eq!(ChannelSet::CLIMATE.union(ChannelSet::LIGHT), ChannelSet::ALL);
        assert!(ChannelSet::CLIMATE.intersects(ChannelSet::VALIDITY));
        assert!(!ChannelSet::LIGHT.intersects(ChannelSet::CLIMATE));
        assert_eq!(ChannelSet::from_bits(0xFF), ChannelSet::ALL);
    }

    #[test]
    fn channel_set_iterates_in_order() {
        let collected: ChannelSet = ChannelSet::VALIDITY.iter().collect();
        assert_eq!(collected, ChannelSet::VALIDITY);

        let mut iter = ChannelSet::VALIDITY.iter();
        assert_eq!(iter.next(), Some(Channel::Temperature));
        assert_eq!(iter.next(), Some(Channel::Pressure));
        assert_eq!(iter.next(), Some(Channel::Light));
        assert_eq!(iter.next(), None);
    }
}
