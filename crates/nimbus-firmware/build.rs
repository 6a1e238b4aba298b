//! Injects Wi-Fi credentials from `.env` (or the environment) and adds the
//! esp-hal linker script.

const CREDENTIALS: [&str; 2] = ["WIFI_SSID", "WIFI_PASSWORD"];

fn main() {
    // A missing .env is fine as long as the variables come from the shell.
    let _ = dotenvy::dotenv();

    for key in CREDENTIALS {
        println!("cargo:rerun-if-env-changed={key}");
        let value = match std::env::var(key) {
            Ok(value) => value,
            Err(_) => {
                println!("cargo:warning={key} is not set; the node will boot with a link fault");
                String::new()
            }
        };
        println!("cargo:rustc-env={key}={value}");
    }
    println!("cargo:rerun-if-changed=.env");

    println!("cargo:rustc-link-arg=-Tlinkall.x");
}
