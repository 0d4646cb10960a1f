//! Watch Changes - print change batches for a set of addresses.
//!
//! This example demonstrates:
//! - Building a `ChangeMonitor` over a fixed subscription
//! - Plugging the monitor into a coordinator as its frame handler
//! - Emitting each change batch as a JSON line on stdout
//!
//! Addresses are taken from the command line (hex with `0x` or decimal);
//! without arguments the six party slots `0xD164..=0xD169` are watched.
//!
//! # Running
//!
//! ```bash
//! cargo run --example watch_changes -- 0xD164 0xD165
//! ```

use std::sync::Arc;

use ramwire::{
    ChangeMonitor, Coordinator, CoordinatorConfig, HandlerResult, ListenerConfig, RamChangeInfo,
};
use tracing_subscriber::EnvFilter;

fn parse_address(arg: &str) -> Result<u64, std::num::ParseIntError> {
    match arg.strip_prefix("0x").or_else(|| arg.strip_prefix("0X")) {
        Some(hex) => u64::from_str_radix(hex, 16),
        None => arg.parse(),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut addresses = std::env::args()
        .skip(1)
        .map(|arg| parse_address(&arg))
        .collect::<Result<Vec<_>, _>>()?;
    if addresses.is_empty() {
        addresses = (0xD164..=0xD169).collect();
    }

    let monitor = Arc::new(ChangeMonitor::new(addresses, |info: RamChangeInfo| async move {
        let line = serde_json::to_string(&info)?;
        println!("{}", line);
        HandlerResult::Ok(())
    }));

    let coordinator = Coordinator::builder()
        .config(CoordinatorConfig::default().listener(ListenerConfig::from_env()?))
        .on_frame_shared(monitor.clone())
        .start()
        .await?;

    tracing::info!(
        addr = %coordinator.local_addr(),
        watched = monitor.subscription().len(),
        "Watching for RAM changes"
    );

    coordinator
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    tracing::info!(latest = ?monitor.latest_frame_number(), "Stopped");
    Ok(())
}
