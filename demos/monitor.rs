//! Example: Connect to an AlarmDecoder and print everything it says.

use ad2_bridge::{AdBridge, AdEvent, AdMessage, BridgeConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let config = BridgeConfig::builder()
        .tcp("192.168.1.10", 10000)
        .build();

    let bridge = AdBridge::new(config);
    let mut events = bridge.subscribe();

    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                AdEvent::Message(AdMessage::Keypad(kpm)) => {
                    println!(
                        "keypad: \"{}\" ready={} armed={} beeps={}",
                        kpm.display,
                        kpm.is_ready(),
                        kpm.is_armed_away() || kpm.is_armed_home(),
                        kpm.beeps,
                    );
                }
                AdEvent::Message(msg) => println!("{:?}: {}", msg.kind(), msg.raw()),
                AdEvent::ConnectionStatus(state) => println!("connection: {state:?}"),
                AdEvent::PanelReady => println!("panel ready"),
            }
        }
    });

    println!("Connecting...");
    bridge.connect().await?;

    println!("Press Ctrl+C to disconnect...");
    tokio::signal::ctrl_c().await?;
    bridge.disconnect().await;
    println!("Disconnected.");

    Ok(())
}
