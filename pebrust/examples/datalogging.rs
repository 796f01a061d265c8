//! Data logging example

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

    let sessions = emulator.list_sessions().await?;
    if sessions.is_empty() {
        println!("No open sessions");
    }
    for session in &sessions {
        println!("{}", session);
    }

    match emulator.get_send_enabled().await? {
        Some(true) => println!("Sending is enabled"),
        Some(false) => {
            println!("Sending is disabled, enabling...");
            emulator.set_send_enabled(true).await?;
        }
        None => println!("Watch did not report the send state"),
    }

    emulator.disconnect().await?;
    Ok(())
}
