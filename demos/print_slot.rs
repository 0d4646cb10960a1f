//! Print Slot - log one watched address for every frame.
//!
//! This example demonstrates:
//! - Starting a coordinator from environment configuration
//! - Registering a plain async closure as the frame handler
//! - Reading a single address out of each frame
//!
//! # Running
//!
//! ```bash
//! RAMWIRE_SOCKET_PORT=8765 cargo run --example print_slot
//! # in another terminal
//! cargo run --example send_frames
//! ```

use ramwire::{Coordinator, CoordinatorConfig, HandlerResult, ListenerConfig, RamFrame};
use tracing_subscriber::EnvFilter;

/// First party slot in the emulated game's RAM.
const PARTY_SLOT_1: u64 = 0xD164;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = CoordinatorConfig::default().listener(ListenerConfig::from_env()?);

    let coordinator = Coordinator::start(config, |frame: RamFrame| async move {
        match frame.value_at(PARTY_SLOT_1) {
            Some(value) => println!("Frame {} | Slot 1: {}", frame.frame, value),
            None => println!("Frame {} | Slot 1: <absent>", frame.frame),
        }
        HandlerResult::Ok(())
    })
    .await?;

    tracing::info!(addr = %coordinator.local_addr(), "Press Ctrl-C to stop");
    coordinator
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
