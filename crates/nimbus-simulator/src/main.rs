//! Desktop simulator for the nimbus environmental node.
//!
//! Runs the real `nimbus-core` node context against synthetic sensor groups
//! and serves the dashboard and JSON API over a local TCP socket, so the
//! firmware's behavior can be exercised without hardware.
//!
//! # Usage
//!
//! ```text
//! nimbus-simulator [PORT] [--no-light] [--offline]
//! ```
//!
//! | Flag         | Effect                                              |
//! |--------------|-----------------------------------------------------|
//! | `PORT`       | HTTP port (default 8080)                            |
//! | `--no-light` | BH1750 does not answer: sensor fault, light `null`  |
//! | `--offline`  | Wi-Fi never comes up: link fault, rssi `-100`       |
//!
//! Set `RUST_LOG=trace` to also see the status LED toggling.

mod mock;

use std::io::{self, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;
use std::time::{Duration, Instant};

use embassy_futures::block_on;
use log::{error, info, warn};

use nimbus_core::api::HostTelemetry;
use nimbus_core::app_state::NodeContext;
use nimbus_core::config::NodeConfig;
use nimbus_core::snapshot::ChannelSet;
use nimbus_core::timing::wrap_millis;

use mock::{LoggingLed, MockSensorGroup};

const DEFAULT_PORT: u16 = 8080;
const SIMULATED_RSSI: i8 = -58;
const MAX_REQUEST_SIZE: usize = 1024;
const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

type Node = NodeContext<MockSensorGroup, MockSensorGroup, LoggingLed>;

/// Command-line options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Options {
    port: u16,
    light_present: bool,
    online: bool,
}

impl Options {
    fn parse(args: impl Iterator<Item = String>) -> Result<Self, String> {
        let mut options = Options {
            port: DEFAULT_PORT,
            light_present: true,
            online: true,
        };

        for arg in args {
            match arg.as_str() {
                "--no-light" => options.light_present = false,
                "--offline" => options.online = false,
                other => {
                    options.port = other
                        .parse()
                        .map_err(|_| format!("unrecognized argument: {other}"))?;
                }
            }
        }

        Ok(options)
    }
}

/// Monotonic millisecond clock starting at simulator launch.
struct Clock(Instant);

impl Clock {
    fn uptime_ms(&self) -> u64 {
        u64::try_from(self.0.elapsed().as_millis()).unwrap_or(u64::MAX)
    }

    fn now_ms(&self) -> u32 {
        wrap_millis(self.uptime_ms())
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let options = match Options::parse(std::env::args().skip(1)) {
        Ok(options) => options,
        Err(e) => {
            error!("{e}");
            eprintln!("usage: nimbus-simulator [PORT] [--no-light] [--offline]");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(options) {
        error!("Simulator stopped: {e}");
        std::process::exit(1);
    }
}

fn run(options: Options) -> io::Result<()> {
    info!("Starting nimbus simulator");

    let config = NodeConfig {
        http_port: options.port,
        ..NodeConfig::DEFAULT
    };
    let clock = Clock(Instant::now());

    let climate = MockSensorGroup::new("BME280", ChannelSet::CLIMATE, true);
    let light = MockSensorGroup::new("BH1750", ChannelSet::LIGHT, options.light_present);

    let mut node: Node = NodeContext::new(config, climate, light, LoggingLed::default())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e.to_string()))?;

    let fault = block_on(node.start(clock.now_ms(), options.online));
    info!("Boot complete, fault state: {}", fault.label());

    let listener = TcpListener::bind(("127.0.0.1", config.http_port))?;
    listener.set_nonblocking(true)?;
    info!(
        "Dashboard at http://127.0.0.1:{}/ (API: /api/v1/sensors)",
        config.http_port
    );

    let tick = Duration::from_millis(u64::from(config.tick_interval_ms));

    loop {
        match listener.accept() {
            Ok((stream, peer)) => {
                if let Err(e) = serve(stream, &mut node, &clock, options.online) {
                    warn!("HTTP connection from {peer} failed: {e}");
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                step(&mut node, &clock);
                thread::sleep(tick);
            }
            Err(e) => return Err(e),
        }
    }
}

/// One coordinator step: acquisition if due, then the LED.
fn step(node: &mut Node, clock: &Clock) {
    let now = clock.now_ms();
    block_on(node.poll(now));
    node.tick(now);
}

fn serve(mut stream: TcpStream, node: &mut Node, clock: &Clock, online: bool) -> io::Result<()> {
    stream.set_nonblocking(false)?;
    stream.set_read_timeout(Some(CLIENT_TIMEOUT))?;
    stream.set_write_timeout(Some(CLIENT_TIMEOUT))?;

    let mut request = [0u8; MAX_REQUEST_SIZE];
    let mut total = 0usize;
    loop {
        let n = stream.read(&mut request[total..])?;
        if n == 0 {
            break;
        }
        total += n;
        if total >= MAX_REQUEST_SIZE || request[..total].windows(4).any(|w| w == b"\r\n\r\n") {
            break;
        }
    }

    if total == 0 {
        return Ok(());
    }

    let rssi = online.then_some(SIMULATED_RSSI);
    let telemetry = HostTelemetry::new(clock.uptime_ms(), rssi);
    let response = node.handle_request(&request[..total], telemetry);

    stream.write_all(response.head().as_bytes())?;
    stream.write_all(response.body)?;
    stream.flush()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options, String> {
        Options::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn defaults_without_arguments() {
        assert_eq!(
            parse(&[]),
            Ok(Options {
                port: DEFAULT_PORT,
                light_present: true,
                online: true
            })
        );
    }

    #[test]
    fn parses_port_and_fault_flags() {
        let options = parse(&["9000", "--no-light", "--offline"]).unwrap();
        assert_eq!(options.port, 9000);
        assert!(!options.light_present);
        assert!(!options.online);
    }

    #[test]
    fn rejects_unknown_arguments() {
        assert!(parse(&["--verbose"]).is_err());
        assert!(parse(&["70000"]).is_err());
    }

    #[test]
    fn missing_light_sensor_raises_sensor_fault() {
        let config = NodeConfig::DEFAULT;
        let mut node: Node = NodeContext::new(
            config,
            MockSensorGroup::new("BME280", ChannelSet::CLIMATE, true),
            MockSensorGroup::new("BH1750", ChannelSet::LIGHT, false),
            LoggingLed::default(),
        )
        .unwrap();

        let fault = block_on(node.start(0, true));
        assert_eq!(fault, nimbus_core::fault::FaultState::SensorFault);

        block_on(node.poll(0));
        let response = node.handle_request(
            b"GET /api/v1/sensors HTTP/1.1\r\n\r\n",
            HostTelemetry::new(0, None),
        );
        let body = std::str::from_utf8(response.body).unwrap();
        assert!(body.contains("\"light\":null"));
        assert!(body.ends_with("\"valid\":false}"));
    }
}
