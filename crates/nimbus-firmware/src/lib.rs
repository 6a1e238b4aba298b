//! ESP32 firmware-specific modules for the nimbus node
//!
//! This crate contains hardware-specific code that cannot compile on desktop
//! targets: ESP32 peripheral initialization, the Wi-Fi station and network
//! stack, and the concrete sensor groups on the two I2C buses.

#![no_std]

extern crate alloc;

pub mod app_state;
