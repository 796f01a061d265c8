//! Ping example

use std::time::Duration;
use tokio::time::sleep;
use pebrust::Emulator;

#[tokio::main]
async fn main() -> pebrust::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let port = std::env::var("QEMU_PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(12344);

    let emulator = Emulator::connect(port).await?;
    emulator.negotiate().await?;

    for _ in 0..3 {
        let rtt = emulator.ping().await?;
        println!("Pong in {:?}", rtt);
        sleep(Duration::from_secs(1)).await;
    }

    emulator.disconnect().await?;
    Ok(())
}
