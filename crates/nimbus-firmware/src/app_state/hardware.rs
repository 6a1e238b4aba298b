//! Hardware initialization for the two sensor buses
//!
//! Each sensor group gets its own I2C controller so that a wedged device on
//! one bus can never hold up the other.

use embassy_time::Delay;
use esp_hal::gpio::Pin;
use esp_hal::gpio::interconnect::PeripheralOutput;
use esp_hal::i2c::master::{Config as I2cConfig, I2c, Instance};
use esp_hal::time::Rate;
use log::info;
use nimbus_core::config::{BusConfig, NodeConfig, expect_pin};
use nimbus_core::sensors::{BH1750Group, BME280Group};

use super::{AppError, error_message};

pub type AsyncI2c = I2c<'static, esp_hal::Async>;

/// Bus #1: BME280/BMP280.
pub type PrimaryGroup = BME280Group<AsyncI2c, Delay>;
/// Bus #2: BH1750.
pub type SecondaryGroup = BH1750Group<AsyncI2c, Delay>;

/// Create one async I2C master at `clock_hz`.
///
/// The pins are typed peripherals picked by the caller; they are refused
/// unless their GPIO numbers match `bus`.
pub fn create_i2c_bus(
    i2c: impl Instance + 'static,
    sda: impl PeripheralOutput<'static> + Pin,
    scl: impl PeripheralOutput<'static> + Pin,
    bus: &BusConfig,
    clock_hz: u32,
) -> Result<AsyncI2c, AppError> {
    bus.check_pins(sda.number(), scl.number())?;

    info!(
        "[I2C] SDA GPIO{} / SCL GPIO{} at {} Hz, device 0x{:02X}",
        bus.sda_pin, bus.scl_pin, clock_hz, bus.address
    );

    let bus = I2c::new(i2c, I2cConfig::default().with_frequency(Rate::from_hz(clock_hz)))
        .map_err(|e| {
            log::error!("[I2C] configuration rejected: {:?}", e);
            AppError::Sensor(error_message("I2C bus configuration rejected"))
        })?
        .with_sda(sda)
        .with_scl(scl)
        .into_async();

    Ok(bus)
}

/// Wrap the two buses in their sensor groups.
pub fn sensor_groups(
    bus1: AsyncI2c,
    bus2: AsyncI2c,
    config: &NodeConfig,
) -> (PrimaryGroup, SecondaryGroup) {
    (
        BME280Group::new(bus1, Delay, config.primary_bus.address),
        BH1750Group::new(bus2, Delay, config.secondary_bus.address),
    )
}

/// Refuse a status LED on any GPIO other than the configured one.
pub fn check_led_pin(led: &impl Pin, config: &NodeConfig) -> Result<(), AppError> {
    expect_pin("LED", config.led_pin, led.number())?;
    Ok(())
}
