//! Send Frames - emulator-side client streaming synthetic frames.
//!
//! This example demonstrates:
//! - Building wire messages with `encode_message`
//! - Streaming them over one TCP connection at a fixed rate
//!
//! Every frame carries the six party slots `0xD164..=0xD169`; one slot
//! changes every few frames so a `watch_changes` run has something to show.
//!
//! # Running
//!
//! ```bash
//! cargo run --example send_frames -- 600
//! ```

use std::time::Duration;

use ramwire::protocol::encode_message;
use ramwire::{ListenerConfig, RamFrame};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

/// Roughly the emulator's frame rate.
const FRAME_PERIOD: Duration = Duration::from_millis(16);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let count: u64 = match std::env::args().nth(1) {
        Some(arg) => arg.parse()?,
        None => 300,
    };
    let config = ListenerConfig::from_env()?;

    let mut stream = TcpStream::connect(config.bind_addr).await?;
    stream.set_nodelay(true)?;

    let mut ticker = tokio::time::interval(FRAME_PERIOD);
    for n in 1..=count {
        ticker.tick().await;

        let changing_slot = (n / 30) % 6;
        let frame = RamFrame::from_pairs(
            n,
            (0..6u64).map(|slot| {
                let value = if slot == changing_slot { (n / 30) % 256 } else { slot };
                (0xD164 + slot, value)
            }),
        );
        let message = encode_message(&frame, config.payload_format)?;
        stream.write_all(&message).await?;
    }

    stream.shutdown().await?;
    println!("Sent {} frames to {}", count, config.bind_addr);
    Ok(())
}
