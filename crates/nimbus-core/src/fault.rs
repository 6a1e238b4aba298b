//! Status LED fault signalling.
//!
//! [`FaultIndicator`] is a level-triggered, non-blocking blink state machine.
//! The coordinator hands it one [`FaultState`] at a time through
//! [`FaultIndicator::set_error`] and calls [`FaultIndicator::update`] on a
//! cadence much shorter than the shortest blink phase. Reporting is
//! last-write-wins: there is no queue, so a fault overwritten before the next
//! `update` is never shown.

use embedded_hal::digital::OutputPin;
use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::acquisition::AcquisitionHealth;
use crate::snapshot::SensorSnapshot;
use crate::timing::elapsed_ms;

/// The single current fault condition of the node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FaultState {
    /// Normal operation: LED permanently off.
    #[default]
    None,
    /// Network bring-up failed or the link is down.
    LinkFault,
    /// A sensor group failed to initialize or a required channel is not finite.
    SensorFault,
    /// No enabled sensor group responds at all.
    CriticalFault,
}

impl FaultState {
    /// Derive the fault to display from the coordinator's view of the node.
    ///
    /// Exactly one state comes out: total sensor loss first, then any sensor
    /// problem, then the network link.
    pub fn classify(link_up: bool, health: AcquisitionHealth, snapshot: &SensorSnapshot) -> Self {
        Self::derive(link_up, health, snapshot.is_valid)
    }

    /// Same order as [`FaultState::classify`], for the moment right after
    /// bring-up when no snapshot has been taken yet.
    pub fn at_boot(link_up: bool, health: AcquisitionHealth) -> Self {
        Self::derive(link_up, health, true)
    }

    fn derive(link_up: bool, health: AcquisitionHealth, data_valid: bool) -> Self {
        if health.none_responding() {
            FaultState::CriticalFault
        } else if !health.all_responding() || !data_valid {
            FaultState::SensorFault
        } else if !link_up {
            FaultState::LinkFault
        } else {
            FaultState::None
        }
    }

    pub const fn label(self) -> &'static str {
        match self {
            FaultState::None => "none",
            FaultState::LinkFault => "link fault",
            FaultState::SensorFault => "sensor fault",
            FaultState::CriticalFault => "critical fault",
        }
    }
}

/// On/off durations of one blink pattern, in milliseconds.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPattern {
    pub on_ms: u16,
    pub off_ms: u16,
}

impl BlinkPattern {
    pub const fn new(on_ms: u16, off_ms: u16) -> Self {
        Self { on_ms, off_ms }
    }
}

/// Blink pattern per fault; faster as severity rises.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPatterns {
    pub link: BlinkPattern,
    pub sensor: BlinkPattern,
    pub critical: BlinkPattern,
}

impl BlinkPatterns {
    pub const DEFAULT: Self = Self {
        link: BlinkPattern::new(500, 500),
        sensor: BlinkPattern::new(200, 200),
        critical: BlinkPattern::new(50, 50),
    };

    /// Pattern bound to `state`, or `None` for the steady-off state.
    pub const fn pattern_for(&self, state: FaultState) -> Option<BlinkPattern> {
        match state {
            FaultState::None => None,
            FaultState::LinkFault => Some(self.link),
            FaultState::SensorFault => Some(self.sensor),
            FaultState::CriticalFault => Some(self.critical),
        }
    }

    pub fn shortest_phase_ms(&self) -> u16 {
        [self.link, self.sensor, self.critical]
            .iter()
            .flat_map(|p| [p.on_ms, p.off_ms])
            .min()
            .unwrap_or(0)
    }
}

impl Default for BlinkPatterns {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Current LED level and when it last changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlinkPhase {
    pub is_lit: bool,
    pub last_transition_ms: u32,
}

/// Drives the status LED from the current [`FaultState`].
pub struct FaultIndicator<P> {
    led: P,
    patterns: BlinkPatterns,
    state: FaultState,
    phase: BlinkPhase,
}

impl<P: OutputPin> FaultIndicator<P> {
    /// Take ownership of the LED pin and switch it off.
    pub fn new(led: P, patterns: BlinkPatterns) -> Self {
        let mut indicator = Self {
            led,
            patterns,
            state: FaultState::None,
            phase: BlinkPhase::default(),
        };
        indicator.set_led(false);
        indicator
    }

    /// Replace the current fault.
    ///
    /// Setting the state that is already active does nothing, so repeated
    /// reports never restart the blink timing. Any change switches the LED
    /// off and restarts the phase at `now_ms`.
    pub fn set_error(&mut self, state: FaultState, now_ms: u32) {
        if state == self.state {
            return;
        }

        match state {
            FaultState::None => {}
            FaultState::LinkFault => error!("Fault: network link failed"),
            FaultState::SensorFault => error!("Fault: sensor malfunction"),
            FaultState::CriticalFault => error!("Fault: I2C sensor communication lost"),
        }

        self.state = state;
        self.phase.last_transition_ms = now_ms;
        self.set_led(false);
    }

    /// Advance the blink pattern. No-op while no fault is active.
    pub fn update(&mut self, now_ms: u32) {
        let Some(pattern) = self.patterns.pattern_for(self.state) else {
            return;
        };

        let duration = if self.phase.is_lit {
            pattern.on_ms
        } else {
            pattern.off_ms
        };

        if elapsed_ms(now_ms, self.phase.last_transition_ms) >= u32::from(duration) {
            self.phase.last_transition_ms = now_ms;
            self.set_led(!self.phase.is_lit);
        }
    }

    pub fn current_error(&self) -> FaultState {
        self.state
    }

    pub fn phase(&self) -> BlinkPhase {
        self.phase
    }

    pub fn is_lit(&self) -> bool {
        self.phase.is_lit
    }

    /// Give the LED pin back, e.g. for a panic handler.
    pub fn release(self) -> P {
        self.led
    }

    fn set_led(&mut self, lit: bool) {
        let result = if lit {
            self.led.set_high()
        } else {
            self.led.set_low()
        };
        if let Err(e) = result {
            warn!("Status LED write failed: {:?}", e);
        }
        self.phase.is_lit = lit;
    }
}
