//! Install a .pbw and stream its logs

use std::time::Duration;

use anyhow::Context;
use pebrust::{BridgeConfig, Emulator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    pebrust::logging::init(2)?;

    let port: u16 = std::env::var("QEMU_PORT")
        .unwrap_or_else(|_| "12344".to_string())
        .parse()
        .context("QEMU_PORT is not a port number")?;
    let pbw = std::env::args().nth(1).context("usage: install <app.pbw> [platform]")?;
    let platform = std::env::args().nth(2).unwrap_or_else(|| "basalt".to_string());

    let emulator = Emulator::connect_with("127.0.0.1", port, BridgeConfig::default()).await?;

    if let Some(firmware) = emulator.negotiate().await? {
        println!("Connected to {}", firmware);
    }

    let app = emulator
        .install(&pbw, &platform)
        .await
        .with_context(|| format!("installing {}", pbw))?;
    println!("Installed {} (app id {:?})", app.metadata, app.app_id);

    // Watch the app for a while
    emulator.stream_logs(Some(Duration::from_secs(30))).await?;

    emulator.disconnect().await?;
    Ok(())
}
