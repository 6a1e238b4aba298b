//! Application-wide state and error types for the node.
//!
//! [`NodeContext`] is the one explicit top-level context: it owns exactly one
//! sensor manager, one fault indicator and one API unit, and exposes the
//! cooperative steps the coordinator loop runs in turn. Platform code owns
//! the clock, the network and the socket; it only ever hands the context a
//! `now_ms` reading, the link status and raw request bytes.

use log::info;
use thiserror_no_std::Error;

use crate::acquisition::SensorManager;
use crate::api::{HostTelemetry, Response, SensorApi};
use crate::config::{ConfigError, NodeConfig};
use crate::fault::{FaultIndicator, FaultState};
use crate::sensors::SensorGroup;
use crate::snapshot::SensorSnapshot;
use crate::timing::IntervalTimer;
use embedded_hal::digital::OutputPin;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppRunState {
    Uninitialized,
    SensorsRunning,
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Invalid configuration: {0}")]
    Config(ConfigError),
    #[error("WiFi connection failed: {0}")]
    Wifi(heapless::String<64>),
    #[error("Network error: {0}")]
    Network(heapless::String<64>),
    #[error("Sensor error: {0}")]
    Sensor(heapless::String<64>),
}

impl From<ConfigError> for AppError {
    fn from(e: ConfigError) -> Self {
        AppError::Config(e)
    }
}

/// Copy `message` into a bounded string, cutting it at the last character
/// that fits.
pub fn error_message<const N: usize>(message: &str) -> heapless::String<N> {
    let mut out = heapless::String::new();
    for c in message.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

/// The node: acquisition, fault indicator and API behind one handle.
pub struct NodeContext<P, S, L> {
    config: NodeConfig,
    run_state: AppRunState,
    link_up: bool,
    sensors: SensorManager<P, S>,
    indicator: FaultIndicator<L>,
    api: SensorApi,
    poll_timer: IntervalTimer,
}

impl<P, S, L> NodeContext<P, S, L>
where
    P: SensorGroup,
    S: SensorGroup,
    L: OutputPin,
{
    /// Assemble the context. The LED is switched off right away; nothing
    /// touches the buses until [`NodeContext::start`].
    pub fn new(config: NodeConfig, primary: P, secondary: S, led: L) -> Result<Self, AppError> {
        config.validate()?;

        Ok(Self {
            config,
            run_state: AppRunState::Uninitialized,
            link_up: false,
            sensors: SensorManager::new(primary, secondary, config.enabled_channels),
            indicator: FaultIndicator::new(led, config.blink),
            api: SensorApi::new(),
            poll_timer: IntervalTimer::new(config.poll_interval_ms),
        })
    }

    /// Bring up the sensor groups and raise the boot fault, if any.
    ///
    /// `link_up` is the outcome of the network bring-up that ran before.
    /// Returns the fault that is now being signalled.
    pub async fn start(&mut self, now_ms: u32, link_up: bool) -> FaultState {
        self.link_up = link_up;
        self.sensors.initialize().await;

        let health = self.sensors.health();
        info!(
            "Sensors up: {}/{} groups responding",
            health.responding_groups(),
            health.enabled_groups()
        );

        let fault = FaultState::at_boot(link_up, health);
        self.indicator.set_error(fault, now_ms);
        self.run_state = AppRunState::SensorsRunning;
        fault
    }

    /// Record the current link status; it is folded into the fault state on
    /// the next acquisition cycle.
    pub fn set_link_up(&mut self, link_up: bool) {
        if link_up != self.link_up {
            info!("Network link {}", if link_up { "up" } else { "down" });
        }
        self.link_up = link_up;
    }

    /// Run one acquisition cycle if the polling interval has elapsed.
    ///
    /// Returns true when a new snapshot was taken.
    pub async fn poll(&mut self, now_ms: u32) -> bool {
        if self.run_state != AppRunState::SensorsRunning || !self.poll_timer.is_due(now_ms) {
            return false;
        }

        let snapshot = *self.sensors.read_sensors().await;
        let fault = FaultState::classify(self.link_up, self.sensors.health(), &snapshot);
        self.indicator.set_error(fault, now_ms);
        true
    }

    /// Advance the status LED.
    pub fn tick(&mut self, now_ms: u32) {
        self.indicator.update(now_ms);
    }

    /// Answer one HTTP request from the latest snapshot.
    pub fn handle_request(&mut self, request: &[u8], telemetry: HostTelemetry) -> Response<'_> {
        self.api.handle(request, self.sensors.snapshot(), telemetry)
    }

    pub fn snapshot(&self) -> &SensorSnapshot {
        self.sensors.snapshot()
    }

    pub fn fault(&self) -> FaultState {
        self.indicator.current_error()
    }

    pub fn run_state(&self) -> AppRunState {
        self.run_state
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn sensors(&self) -> &SensorManager<P, S> {
        &self.sensors
    }

    pub fn indicator(&self) -> &FaultIndicator<L> {
        &self.indicator
    }
}
