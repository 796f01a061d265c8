//! Screenshot example

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

    let shot = emulator.screenshot().await?;
    println!("Captured {}x{} ({} bpp)", shot.width, shot.height, shot.bits_per_pixel());

    pebrust::save_png(&shot, "screenshot.png")?;
    println!("Saved screenshot.png");

    emulator.disconnect().await?;
    Ok(())
}
