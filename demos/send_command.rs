//! Example: Send a keypad command (e.g. disarm code) to the panel.
//!
//! Usage: send_command <host> <port> <command>

use std::time::Duration;

use ad2_bridge::{AdBridge, BridgeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "192.168.1.10".to_string());
    let port: u16 = args.next().as_deref().unwrap_or("10000").parse()?;
    let command = args
        .next()
        .ok_or_else(|| anyhow::anyhow!("usage: send_command <host> <port> <command>"))?;

    let config = BridgeConfig::builder()
        .tcp(host, port)
        .send_commands(true)
        .build();

    let bridge = AdBridge::new(config);
    bridge.connect().await?;

    bridge.send_keypad_command(&command).await?;
    println!("Command sent.");

    // Give the panel a moment to react before tearing down.
    tokio::time::sleep(Duration::from_secs(2)).await;
    bridge.disconnect().await;

    Ok(())
}
