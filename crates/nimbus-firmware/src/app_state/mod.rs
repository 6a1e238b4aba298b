//! Firmware-specific application state extensions
//!
//! Re-exports the hardware-independent app state from `nimbus_core` and
//! adds ESP32 bus bring-up and the Wi-Fi link collaborator.

mod hardware;
mod network;

pub use hardware::*;
pub use network::*;

// Re-export all shared app state types from nimbus-core
pub use nimbus_core::app_state::*;
