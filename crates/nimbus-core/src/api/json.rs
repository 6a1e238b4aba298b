//! Allocation-free rendering of the `/api/v1/sensors` document.
//!
//! The document is written with `core::fmt` into a fixed-capacity
//! [`heapless::String`]. Every finite number is sent as read, with two
//! decimals, so the widest field is the widest finite `f32`. The longest
//! possible output is therefore known at compile time; [`MAX_DOCUMENT_LEN`]
//! computes it and a `const` assertion keeps it strictly below
//! [`JSON_BUFFER_SIZE`].

use core::fmt::Write;

use crate::api::{ApiError, HostTelemetry};
use crate::snapshot::{Channel, SensorSnapshot};

/// Capacity of the response buffer in bytes.
pub const JSON_BUFFER_SIZE: usize = 288;

pub type JsonBuffer = heapless::String<JSON_BUFFER_SIZE>;

const KEY_TEMPERATURE: &str = "{\"temperature\":";
const KEY_HUMIDITY: &str = ",\"humidity\":";
const KEY_PRESSURE: &str = ",\"pressure\":";
const KEY_LIGHT: &str = ",\"light\":";
const KEY_UPTIME: &str = ",\"uptime\":";
const KEY_RSSI: &str = ",\"rssi\":";
const KEY_VALID: &str = ",\"valid\":";
const CLOSE: &str = "}";

const NULL: &str = "null";

/// Number of decimal digits of `v`.
const fn digits(mut v: u128) -> usize {
    let mut width = 0;
    loop {
        width += 1;
        v /= 10;
        if v == 0 {
            return width;
        }
    }
}

/// Number of characters of the integer `v` in decimal, sign included.
const fn int_width(v: i64) -> usize {
    let sign = if v < 0 { 1 } else { 0 };
    sign + digits(v.unsigned_abs() as u128)
}

const fn max(a: usize, b: usize) -> usize {
    if a > b { a } else { b }
}

/// Widest `{:.2}` rendering of any finite `f32` (sign, integer part, point
/// and two decimals), or `null`, whichever is longer.
const FIELD_WIDTH: usize = max(1 + digits(f32::MAX as u128) + 3, NULL.len());

/// Upper bound on the rendered document length.
pub const MAX_DOCUMENT_LEN: usize = KEY_TEMPERATURE.len()
    + FIELD_WIDTH
    + KEY_HUMIDITY.len()
    + FIELD_WIDTH
    + KEY_PRESSURE.len()
    + FIELD_WIDTH
    + KEY_LIGHT.len()
    + FIELD_WIDTH
    + KEY_UPTIME.len()
    + int_width(u32::MAX as i64)
    + KEY_RSSI.len()
    + int_width(i8::MIN as i64)
    + KEY_VALID.len()
    + "false".len()
    + CLOSE.len();

const _: () = assert!(MAX_DOCUMENT_LEN < JSON_BUFFER_SIZE);

/// A channel value as it goes on the wire: `null` when not finite,
/// otherwise the reading itself with two decimals.
struct WireValue(f32);

impl core::fmt::Display for WireValue {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        if self.0.is_finite() {
            write!(f, "{:.2}", self.0)
        } else {
            f.write_str(NULL)
        }
    }
}

fn wire(snapshot: &SensorSnapshot, channel: Channel) -> WireValue {
    WireValue(snapshot.value(channel))
}

/// Render the sensor document into `out`, replacing its previous content.
///
/// ```text
/// {"temperature":22.34,"humidity":55.12,"pressure":101523.00,"light":812.50,"uptime":125,"rssi":-62,"valid":true}
/// ```
pub fn render_sensor_json(
    out: &mut JsonBuffer,
    snapshot: &SensorSnapshot,
    telemetry: HostTelemetry,
) -> Result<(), ApiError> {
    out.clear();
    write!(
        out,
        "{}{}{}{}{}{}{}{}{}{}{}{}{}{}{}",
        KEY_TEMPERATURE,
        wire(snapshot, Channel::Temperature),
        KEY_HUMIDITY,
        wire(snapshot, Channel::Humidity),
        KEY_PRESSURE,
        wire(snapshot, Channel::Pressure),
        KEY_LIGHT,
        wire(snapshot, Channel::Light),
        KEY_UPTIME,
        telemetry.uptime_secs,
        KEY_RSSI,
        telemetry.rssi,
        KEY_VALID,
        snapshot.is_valid,
        CLOSE,
    )
    .map_err(|_| ApiError::BufferOverflow {
        capacity: JSON_BUFFER_SIZE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::ChannelSet;

    fn render(snapshot: &SensorSnapshot, telemetry: HostTelemetry) -> JsonBuffer {
        let mut out = JsonBuffer::new();
        render_sensor_json(&mut out, snapshot, telemetry).unwrap();
        out
    }

    #[test]
    fn renders_reference_document() {
        let snapshot = SensorSnapshot {
            temperature: 22.34,
            humidity: 55.12,
            pressure: 101_523.0,
            light_level: 812.5,
            is_valid: true,
        };
        let telemetry = HostTelemetry {
            uptime_secs: 125,
            rssi: -62,
        };

        assert_eq!(
            render(&snapshot, telemetry).as_str(),
            "{\"temperature\":22.34,\"humidity\":55.12,\"pressure\":101523.00,\"light\":812.50,\"uptime\":125,\"rssi\":-62,\"valid\":true}"
        );
    }

    #[test]
    fn missing_humidity_is_null() {
        let snapshot = SensorSnapshot::validated(21.5, f32::NAN, 101_320.0, 300.0, ChannelSet::ALL);
        let out = render(&snapshot, HostTelemetry::new(3_999, None));

        assert_eq!(
            out.as_str(),
            "{\"temperature\":21.50,\"humidity\":null,\"pressure\":101320.00,\"light\":300.00,\"uptime\":3,\"rssi\":-100,\"valid\":true}"
        );
    }

    #[test]
    fn disabled_light_is_null() {
        let snapshot = SensorSnapshot::validated(
            -5.0,
            80.0,
            99_000.0,
            f32::NAN,
            ChannelSet::CLIMATE,
        );
        let out = render(&snapshot, HostTelemetry::new(0, Some(-70)));
        assert!(out.contains("\"light\":null"));
        assert!(out.contains("\"temperature\":-5.00"));
        assert!(out.ends_with("\"valid\":true}"));
    }

    #[test]
    fn boot_snapshot_renders_zeros_and_invalid() {
        let out = render(&SensorSnapshot::default(), HostTelemetry::new(0, None));
        assert_eq!(
            out.as_str(),
            "{\"temperature\":0.00,\"humidity\":0.00,\"pressure\":0.00,\"light\":0.00,\"uptime\":0,\"rssi\":-100,\"valid\":false}"
        );
    }

    #[test]
    fn widest_document_fits() {
        let snapshot = SensorSnapshot {
            temperature: -f32::MAX,
            humidity: -f32::MAX,
            pressure: -f32::MAX,
            light_level: -f32::MAX,
            is_valid: false,
        };
        let telemetry = HostTelemetry {
            uptime_secs: u32::MAX,
            rssi: i8::MIN,
        };
        let out = render(&snapshot, telemetry);
        assert_eq!(out.len(), MAX_DOCUMENT_LEN);
        assert!(out.len() < JSON_BUFFER_SIZE);
    }

    #[test]
    fn out_of_range_values_are_sent_as_read() {
        let snapshot = SensorSnapshot {
            temperature: 120.0,
            humidity: -3.0,
            pressure: 0.0,
            light_level: 1.0e6,
            is_valid: true,
        };
        let out = render(&snapshot, HostTelemetry::new(0, Some(-40)));
        assert!(out.starts_with(
            "{\"temperature\":120.00,\"humidity\":-3.00,\"pressure\":0.00,\"light\":1000000.00,"
        ));
    }

    #[test]
    fn huge_finite_value_is_not_truncated() {
        let snapshot = SensorSnapshot {
            pressure: f32::MAX,
            ..SensorSnapshot::default()
        };
        let out = render(&snapshot, HostTelemetry::new(0, None));
        let field = out
            .split("\"pressure\":")
            .nth(1)
            .and_then(|rest| rest.split(',').next())
            .unwrap();
        assert_eq!(field.len(), digits(f32::MAX as u128) + 3);
        assert!(field.ends_with(".00"));
    }

    #[test]
    fn non_finite_required_channels_stay_valid_json() {
        let snapshot = SensorSnapshot::unavailable(ChannelSet::ALL);
        let out = render(&snapshot, HostTelemetry::new(0, None));
        assert!(out.starts_with("{\"temperature\":null,\"humidity\":null,\"pressure\":null,\"light\":null"));
        assert!(!out.contains("NaN"));
    }

    #[test]
    fn reuses_the_buffer() {
        let mut out = JsonBuffer::new();
        let snapshot = SensorSnapshot::default();
        render_sensor_json(&mut out, &snapshot, HostTelemetry::new(0, None)).unwrap();
        let first = out.len();
        render_sensor_json(&mut out, &snapshot, HostTelemetry::new(0, None)).unwrap();
        assert_eq!(out.len(), first);
    }
}
