//! Wi-Fi station bring-up and the shared link status
//!
//! The radio, the embassy-net runner and the reconnect loop run as their own
//! executor tasks. They share exactly one thing with the coordinator: the
//! [`LINK`] cell, read once per coordinator step.

use alloc::string::String;
use core::cell::Cell;

use embassy_executor::Spawner;
use embassy_futures::select::{Either, select};
use embassy_net::{Config as NetConfig, Runner, Stack, StackResources};
use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_time::{Duration, Timer, with_timeout};
use esp_hal::peripherals::WIFI;
use esp_hal::rng::Rng;
use esp_radio::wifi::{self, ClientConfig, ModeConfig, WifiController, WifiDevice, WifiEvent};
use log::{info, warn};
use nimbus_core::config::WifiConfig;
use static_cell::StaticCell;

use super::{AppError, error_message};

/// Station credentials injected by `build.rs`.
pub const WIFI_CREDENTIALS: WifiConfig<'static> = WifiConfig {
    ssid: env!("WIFI_SSID"),
    password: env!("WIFI_PASSWORD"),
};

const DHCP_TIMEOUT: Duration = Duration::from_secs(15);
const RETRY_DELAY: Duration = Duration::from_secs(5);
const RSSI_REFRESH: Duration = Duration::from_secs(10);

/// Link state as seen by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LinkStatus {
    pub up: bool,
    /// Last sampled signal strength in dBm
    pub rssi: Option<i8>,
}

/// Critical-section protected [`LinkStatus`].
pub struct LinkCell(Mutex<CriticalSectionRawMutex, Cell<LinkStatus>>);

impl LinkCell {
    const fn new() -> Self {
        Self(Mutex::new(Cell::new(LinkStatus {
            up: false,
            rssi: None,
        })))
    }

    pub fn get(&self) -> LinkStatus {
        self.0.lock(|status| status.get())
    }

    fn set(&self, value: LinkStatus) {
        self.0.lock(|status| status.set(value));
    }
}

pub static LINK: LinkCell = LinkCell::new();

static RADIO: StaticCell<esp_radio::Controller<'static>> = StaticCell::new();
static NET_RESOURCES: StaticCell<StackResources<3>> = StaticCell::new();

/// Bring up the radio and the DHCP network stack and spawn the tasks that
/// keep them running.
pub fn start_network(spawner: &Spawner, wifi_peripheral: WIFI<'static>) -> Result<Stack<'static>, AppError> {
    let radio = esp_radio::init().map_err(|e| {
        warn!("Wi-Fi radio init failed: {:?}", e);
        AppError::Wifi(error_message("radio init failed"))
    })?;
    let radio = RADIO.init(radio);

    let (controller, interfaces) =
        wifi::new(radio, wifi_peripheral, Default::default()).map_err(|e| {
            warn!("Wi-Fi driver init failed: {:?}", e);
            AppError::Wifi(error_message("driver init failed"))
        })?;

    let rng = Rng::new();
    let seed = (u64::from(rng.random()) << 32) | u64::from(rng.random());

    let resources = NET_RESOURCES.init(StackResources::new());
    let (stack, runner) = embassy_net::new(
        interfaces.sta,
        NetConfig::dhcpv4(Default::default()),
        resources,
        seed,
    );

    spawner
        .spawn(connection_task(controller, stack))
        .map_err(|_| AppError::Network(error_message("cannot spawn connection task")))?;
    spawner
        .spawn(net_task(runner))
        .map_err(|_| AppError::Network(error_message("cannot spawn network runner")))?;

    Ok(stack)
}

#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await;
}

#[embassy_executor::task]
async fn connection_task(mut controller: WifiController<'static>, stack: Stack<'static>) {
    info!("Wi-Fi task starting (ssid=\"{}\")", WIFI_CREDENTIALS.ssid);

    loop {
        if !matches!(controller.is_started(), Ok(true)) {
            let client_config = ModeConfig::Client(
                ClientConfig::default()
                    .with_ssid(String::from(WIFI_CREDENTIALS.ssid))
                    .with_password(String::from(WIFI_CREDENTIALS.password)),
            );
            if let Err(e) = controller.set_config(&client_config) {
                warn!("Wi-Fi set_config error: {:?}", e);
                Timer::after(RETRY_DELAY).await;
                continue;
            }
            if let Err(e) = controller.start_async().await {
                warn!("Wi-Fi start error: {:?}", e);
                Timer::after(RETRY_DELAY).await;
                continue;
            }
        }

        if let Err(e) = controller.connect_async().await {
            warn!("Wi-Fi connect error: {:?}", e);
            Timer::after(RETRY_DELAY).await;
            continue;
        }

        if with_timeout(DHCP_TIMEOUT, stack.wait_config_up()).await.is_err() {
            warn!("Wi-Fi associated but no IPv4 configuration");
            let _ = controller.disconnect_async().await;
            Timer::after(RETRY_DELAY).await;
            continue;
        }

        if let Some(config) = stack.config_v4() {
            info!("Wi-Fi link up: ip={}", config.address.address());
        }
        LINK.set(LinkStatus {
            up: true,
            rssi: sample_rssi(&controller),
        });

        loop {
            match select(
                controller.wait_for_event(WifiEvent::StaDisconnected),
                Timer::after(RSSI_REFRESH),
            )
            .await
            {
                Either::First(_) => break,
                Either::Second(()) => LINK.set(LinkStatus {
                    up: true,
                    rssi: sample_rssi(&controller),
                }),
            }
        }

        warn!("Wi-Fi disconnected; retrying");
        LINK.set(LinkStatus::default());
        Timer::after(RETRY_DELAY).await;
    }
}

fn sample_rssi(controller: &WifiController<'static>) -> Option<i8> {
    controller
        .rssi()
        .ok()
        .map(|rssi| rssi.clamp(i32::from(i8::MIN), 0) as i8)
}
