//! Hardware-independent core library for the nimbus environmental node
//!
//! This crate contains all platform-agnostic logic of the node: the sensor
//! snapshot and its validity rule, dual-bus acquisition behind the
//! [`sensors::SensorGroup`] trait, the status LED fault indicator, the
//! fixed-size JSON/HTTP API, and the [`app_state::NodeContext`] that ties
//! them together for the coordinator loop.
//!
//! It is `#![no_std]` and allocation-free so it compiles on both the ESP32
//! firmware and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

pub mod acquisition;
pub mod api;
pub mod app_state;
pub mod config;
pub mod fault;
pub mod sensors;
pub mod snapshot;
pub mod timing;
