#![no_std]
#![no_main]
#![deny(
    clippy::mem_forget,
    reason = "mem::forget is generally not safe to do with esp_hal types, especially those \
    holding buffers for the duration of a data transfer."
)]
#![deny(clippy::large_stack_frames)]

use core::pin::pin;

use embassy_executor::Spawner;
use embassy_futures::select::{Either, select};
use embassy_net::tcp::{Error as TcpError, TcpSocket};
use embassy_time::{Duration, Instant, Timer, with_timeout};
use esp_hal::clock::CpuClock;
use esp_hal::gpio::{Level, Output, OutputConfig};
use esp_hal::timer::timg::TimerGroup;
use log::{error, info, warn};
use nimbus_core::api::HostTelemetry;
use nimbus_core::config::NodeConfig;
use nimbus_core::timing::wrap_millis;
use nimbus_firmware::app_state::{
    LINK, NodeContext, PrimaryGroup, SecondaryGroup, check_led_pin, create_i2c_bus, sensor_groups,
    start_network,
};

type Node = NodeContext<PrimaryGroup, SecondaryGroup, Output<'static>>;

/// How long boot waits for the first DHCP lease before raising a link fault.
const LINK_WAIT: Duration = Duration::from_secs(15);
const SOCKET_TIMEOUT: Duration = Duration::from_secs(5);
const MAX_REQUEST_SIZE: usize = 1024;

#[panic_handler]
fn panic(info: &core::panic::PanicInfo) -> ! {
    rtt_target::rprintln!("PANIC: {}", info);
    loop {}
}

extern crate alloc;

// This creates a default app-descriptor required by the esp-idf bootloader.
esp_bootloader_esp_idf::esp_app_desc!();

fn now_ms() -> u32 {
    wrap_millis(Instant::now().as_millis())
}

#[allow(
    clippy::large_stack_frames,
    reason = "socket buffers live in main for the lifetime of the program"
)]
#[esp_rtos::main]
async fn main(spawner: Spawner) -> ! {
    rtt_target::rtt_init_log!();

    let config = NodeConfig::DEFAULT;
    let peripherals = esp_hal::init(esp_hal::Config::default().with_cpu_clock(CpuClock::max()));

    esp_alloc::heap_allocator!(#[esp_hal::ram(reclaimed)] size: 73744);

    let timg0 = TimerGroup::new(peripherals.TIMG0);
    esp_rtos::start(timg0.timer0);

    info!("Embassy initialized");

    check_led_pin(&peripherals.GPIO2, &config).expect("status LED pin");
    let led = Output::new(peripherals.GPIO2, Level::Low, OutputConfig::default());

    let bus1 = create_i2c_bus(
        peripherals.I2C0,
        peripherals.GPIO19,
        peripherals.GPIO21,
        &config.primary_bus,
        config.bus_clock_hz,
    )
    .expect("I2C bus #1");
    let bus2 = create_i2c_bus(
        peripherals.I2C1,
        peripherals.GPIO27,
        peripherals.GPIO26,
        &config.secondary_bus,
        config.bus_clock_hz,
    )
    .expect("I2C bus #2");
    let (primary, secondary) = sensor_groups(bus1, bus2, &config);

    let mut node: Node =
        NodeContext::new(config, primary, secondary, led).expect("valid node configuration");

    let stack = match start_network(&spawner, peripherals.WIFI) {
        Ok(stack) => Some(stack),
        Err(e) => {
            error!("{}", e);
            None
        }
    };

    let link_up = match stack {
        Some(stack) => with_timeout(LINK_WAIT, stack.wait_config_up()).await.is_ok(),
        None => false,
    };

    let fault = node.start(now_ms(), link_up).await;
    info!("Boot complete, fault state: {}", fault.label());

    let tick = Duration::from_millis(u64::from(config.tick_interval_ms));

    let Some(stack) = stack else {
        loop {
            step(&mut node).await;
            Timer::after(tick).await;
        }
    };

    let mut rx_buffer = [0u8; 1024];
    let mut tx_buffer = [0u8; 1024];

    info!("HTTP server listening on port {}", config.http_port);

    loop {
        let mut socket = TcpSocket::new(stack, &mut rx_buffer, &mut tx_buffer);
        socket.set_timeout(Some(SOCKET_TIMEOUT));

        // Keep the node running while waiting for a client.
        let accepted = {
            let mut accept = pin!(socket.accept(config.http_port));
            loop {
                match select(&mut accept, Timer::after(tick)).await {
                    Either::First(result) => break result,
                    Either::Second(()) => step(&mut node).await,
                }
            }
        };

        match accepted {
            Ok(()) => {
                if let Err(e) = serve(&mut socket, &mut node).await {
                    warn!("HTTP connection error: {:?}", e);
                }
            }
            Err(e) => {
                warn!("HTTP accept error: {:?}", e);
                Timer::after(tick).await;
            }
        }

        socket.close();
        let _ = socket.flush().await;
        socket.abort();
    }
}

/// One coordinator step: link status, acquisition if due, LED.
async fn step(node: &mut Node) {
    let now = now_ms();
    node.set_link_up(LINK.get().up);
    node.poll(now).await;
    node.tick(now);
}

async fn serve(socket: &mut TcpSocket<'_>, node: &mut Node) -> Result<(), TcpError> {
    let mut request = [0u8; MAX_REQUEST_SIZE];
    let mut total = 0usize;

    loop {
        let n = socket.read(&mut request[total..]).await?;
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

    let link = LINK.get();
    let telemetry = HostTelemetry::new(
        Instant::now().as_millis(),
        if link.up { link.rssi } else { None },
    );
    let response = node.handle_request(&request[..total], telemetry);

    write_all(socket, response.head().as_bytes()).await?;
    write_all(socket, response.body).await?;
    socket.flush().await
}

async fn write_all(socket: &mut TcpSocket<'_>, mut bytes: &[u8]) -> Result<(), TcpError> {
    while !bytes.is_empty() {
        let n = socket.write(bytes).await?;
        bytes = &bytes[n..];
    }
    Ok(())
}
