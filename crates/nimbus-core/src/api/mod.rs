//! Serialization / HTTP API unit.
//!
//! [`SensorApi`] answers one request at a time from the latest snapshot. It
//! owns the only JSON buffer, so serving a request never allocates and never
//! triggers a sensor read: API freshness is bounded by the polling interval.

pub mod http;
pub mod json;

pub use http::{ContentType, Response, Route, StatusCode};
pub use json::{JSON_BUFFER_SIZE, JsonBuffer, MAX_DOCUMENT_LEN, render_sensor_json};

use log::error;
use thiserror_no_std::Error;

use crate::snapshot::SensorSnapshot;

/// Dashboard page served at `/`; it polls the JSON endpoint from the browser.
pub const DASHBOARD_HTML: &str = include_str!("dashboard.html");

/// Link-quality value reported while no network link exists.
pub const RSSI_NO_LINK: i8 = -100;

/// Host telemetry supplied by the network/clock collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostTelemetry {
    /// Whole seconds since boot
    pub uptime_secs: u32,
    /// Wi-Fi signal strength in dBm, [`RSSI_NO_LINK`] without a link
    pub rssi: i8,
}

impl HostTelemetry {
    /// Build telemetry from the monotonic uptime in milliseconds and the
    /// current link RSSI, if any.
    pub fn new(uptime_ms: u64, rssi: Option<i8>) -> Self {
        Self {
            uptime_secs: u32::try_from(uptime_ms / 1000).unwrap_or(u32::MAX),
            rssi: rssi.unwrap_or(RSSI_NO_LINK),
        }
    }
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    #[error("rendered document exceeds the {capacity} byte buffer")]
    BufferOverflow { capacity: usize },
}

/// The HTTP-facing unit of the node.
#[derive(Default)]
pub struct SensorApi {
    json: JsonBuffer,
}

impl SensorApi {
    pub const fn new() -> Self {
        Self {
            json: JsonBuffer::new(),
        }
    }

    /// Route `request` and build the response.
    pub fn handle(
        &mut self,
        request: &[u8],
        snapshot: &SensorSnapshot,
        telemetry: HostTelemetry,
    ) -> Response<'_> {
        match Route::resolve(request) {
            Route::Dashboard => Response::html(DASHBOARD_HTML),
            Route::Sensors => match render_sensor_json(&mut self.json, snapshot, telemetry) {
                Ok(()) => Response::json(self.json.as_str()),
                Err(e) => {
                    error!("Sensor API: {}", e);
                    Response::server_error()
                }
            },
            Route::NotFound => Response::not_found(),
        }
    }
}
