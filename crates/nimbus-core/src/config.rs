use serde::{Deserialize, Serialize};
use thiserror_no_std::Error;

use crate::fault::BlinkPatterns;
use crate::snapshot::ChannelSet;

/// Address of the BME280/BMP280 with SDO tied low.
pub const BME280_ADDRESS_PRIMARY: u8 = 0x76;
/// Address of the BME280/BMP280 with SDO tied high.
pub const BME280_ADDRESS_SECONDARY: u8 = 0x77;
/// Address of the BH1750 with ADDR tied low.
pub const BH1750_ADDRESS_LOW: u8 = 0x23;
/// Address of the BH1750 with ADDR tied high.
pub const BH1750_ADDRESS_HIGH: u8 = 0x5C;

/// Wiring of one I2C bus and the single sensor group it hosts.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    pub sda_pin: u8,
    pub scl_pin: u8,
    pub address: u8,
}

impl BusConfig {
    /// Confirm that the GPIOs actually routed to the controller are the
    /// configured ones.
    pub fn check_pins(&self, sda: u8, scl: u8) -> Result<(), ConfigError> {
        expect_pin("SDA", self.sda_pin, sda)?;
        expect_pin("SCL", self.scl_pin, scl)
    }
}

/// Fail unless the `wired` GPIO number matches the `configured` one.
pub fn expect_pin(role: &'static str, configured: u8, wired: u8) -> Result<(), ConfigError> {
    if configured == wired {
        Ok(())
    } else {
        Err(ConfigError::PinMismatch {
            role,
            configured,
            wired,
        })
    }
}

/// Node-wide configuration, resolved once at startup.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeConfig {
    /// Bus #1: BME280/BMP280 (temperature, humidity, pressure)
    pub primary_bus: BusConfig,
    /// Bus #2: BH1750 (ambient light)
    pub secondary_bus: BusConfig,
    /// Clock rate applied to both buses. 100 kHz standard mode saves power.
    pub bus_clock_hz: u32,
    /// Runtime capability set; channels outside it always read NaN.
    pub enabled_channels: ChannelSet,
    /// Time between acquisition cycles.
    pub poll_interval_ms: u32,
    /// Cadence of the coordinator loop; must stay well below the shortest
    /// blink phase.
    pub tick_interval_ms: u32,
    pub http_port: u16,
    pub led_pin: u8,
    pub blink: BlinkPatterns,
}

impl NodeConfig {
    pub const DEFAULT: Self = Self {
        primary_bus: BusConfig {
            sda_pin: 19,
            scl_pin: 21,
            address: BME280_ADDRESS_PRIMARY,
        },
        secondary_bus: BusConfig {
            sda_pin: 27,
            scl_pin: 26,
            address: BH1750_ADDRESS_LOW,
        },
        bus_clock_hz: 100_000,
        enabled_channels: ChannelSet::ALL,
        poll_interval_ms: 5_000,
        tick_interval_ms: 10,
        http_port: 80,
        led_pin: 2,
        blink: BlinkPatterns::DEFAULT,
    };

    /// Check the invariants the coordinator relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "poll_interval_ms",
            });
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "tick_interval_ms",
            });
        }
        if !(1..=1_000_000).contains(&self.bus_clock_hz) {
            return Err(ConfigError::BusClockOutOfRange {
                hz: self.bus_clock_hz,
            });
        }

        let pins = [
            self.primary_bus.sda_pin,
            self.primary_bus.scl_pin,
            self.secondary_bus.sda_pin,
            self.secondary_bus.scl_pin,
            self.led_pin,
        ];
        for (i, pin) in pins.iter().enumerate() {
            if pins[i + 1..].contains(pin) {
                return Err(ConfigError::PinConflict { pin: *pin });
            }
        }

        let shortest = self.blink.shortest_phase_ms();
        if shortest == 0 {
            return Err(ConfigError::ZeroBlinkDuration);
        }
        if self.tick_interval_ms >= u32::from(shortest) {
            return Err(ConfigError::TickTooSlow {
                tick_ms: self.tick_interval_ms,
                shortest_blink_ms: shortest,
            });
        }

        Ok(())
    }
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Wi-Fi station credentials, injected at build time.
#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy)]
pub struct WifiConfig<'a> {
    pub ssid: &'a str,
    pub password: &'a str,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{field} must be greater than zero")]
    ZeroInterval { field: &'static str },
    #[error("I2C bus clock of {hz} Hz is outside 1 Hz..=1 MHz")]
    BusClockOutOfRange { hz: u32 },
    #[error("blink durations must be greater than zero")]
    ZeroBlinkDuration,
    #[error("tick interval {tick_ms} ms is not shorter than the shortest blink phase ({shortest_blink_ms} ms)")]
    TickTooSlow { tick_ms: u32, shortest_blink_ms: u16 },
    #[error("GPIO{pin} is assigned twice")]
    PinConflict { pin: u8 },
    #[error("{role} is configured on GPIO{configured} but wired to GPIO{wired}")]
    PinMismatch {
        role: &'static str,
        configured: u8,
        wired: u8,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::BlinkPattern;

    #[test]
    fn default_config_is_valid() {
        assert_eq!(NodeConfig::default().validate(), Ok(()));
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let config = NodeConfig {
            poll_interval_ms: 0,
            ..NodeConfig::DEFAULT
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::ZeroInterval {
                field: "poll_interval_ms"
            })
        );
    }

    #[test]
    fn rejects_tick_slower_than_blink() {
        let mut config = NodeConfig::DEFAULT;
        config.blink.critical = BlinkPattern::new(20, 20);
        config.tick_interval_ms = 20;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::TickTooSlow {
                shortest_blink_ms: 20,
                ..
            })
        ));
    }

    #[test]
    fn rejects_shared_pins() {
        let mut config = NodeConfig::DEFAULT;
        config.secondary_bus.scl_pin = config.primary_bus.sda_pin;
        assert_eq!(config.validate(), Err(ConfigError::PinConflict { pin: 19 }));

        let config = NodeConfig {
            led_pin: 26,
            ..NodeConfig::DEFAULT
        };
        assert_eq!(config.validate(), Err(ConfigError::PinConflict { pin: 26 }));
    }

    #[test]
    fn wired_pins_must_match_bus_config() {
        let bus = NodeConfig::DEFAULT.primary_bus;
        assert_eq!(bus.check_pins(19, 21), Ok(()));
        assert_eq!(
            bus.check_pins(21, 19),
            Err(ConfigError::PinMismatch {
                role: "SDA",
                configured: 19,
                wired: 21
            })
        );

        let moved = BusConfig {
            scl_pin: 22,
            ..bus
        };
        assert_eq!(
            moved.check_pins(19, 21),
            Err(ConfigError::PinMismatch {
                role: "SCL",
                configured: 22,
                wired: 21
            })
        );
        assert_eq!(expect_pin("LED", 2, 2), Ok(()));
    }

    #[test]
    fn rejects_zero_blink_and_bad_clock() {
        let mut config = NodeConfig::DEFAULT;
        config.blink.link = BlinkPattern::new(0, 100);
        assert_eq!(config.validate(), Err(ConfigError::ZeroBlinkDuration));

        let config = NodeConfig {
            bus_clock_hz: 2_000_000,
            ..NodeConfig::DEFAULT
        };
        assert_eq!(
            config.validate(),
            Err(ConfigError::BusClockOutOfRange { hz: 2_000_000 })
        );
    }
}
