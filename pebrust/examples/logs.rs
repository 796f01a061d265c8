//! Print app logs until the emulator goes away

use pebrust::Emulator;

#[tokio::main]
async fn main() -> pebrust::Result<()> {
    pebrust::logging::init(1)?;

    let port = std::env::var("QEMU_PORT")
        .ok()
        .and_then(|port| port.parse().ok())
        .unwrap_or(12344);

    let emulator = Emulator::connect(port).await?;
    emulator.negotiate().await?;

    println!("Streaming logs, Ctrl-C to stop");
    emulator.stream_logs(None).await?;

    Ok(())
}
