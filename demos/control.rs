//! Example: interactive receiver control
//!
//! Connects to `RECEIVER_HOST` if set, otherwise to the first receiver
//! discovered, then reads textual commands such as `zone2.volume=40`.

use onkyo_eiscp::{ReceiverConfig, StateChange, quick_connect};
use tokio::io::{self, AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let mut config = ReceiverConfig::default();
    config.host = std::env::var("RECEIVER_HOST").ok();

    println!("Connecting...");
    let client = quick_connect(config).await?;
    println!("Connected to: {}", client.endpoint().display_name());

    let mut changes = client.subscribe();
    tokio::spawn(async move {
        while let Ok(change) = changes.recv().await {
            match change {
                StateChange::ZoneDiscovered { zone } => println!("< {zone} discovered"),
                StateChange::Updated { zone, status } => println!("< {zone}: {status:?}"),
                StateChange::Cleared { zone, property } => println!("< {zone}: {property} cleared"),
            }
        }
    });

    println!("\nCommands:");
    println!("  <zone>.<property>=<value>  - e.g. main.power=on, zone2.volume=40");
    println!("  state                      - Print tracked state");
    println!("  quit                       - Exit");

    let mut lines = BufReader::new(io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "" => {}
            "quit" => break,
            "state" => {
                for (zone, state) in client.state().zones() {
                    println!("{zone}: {state:?}");
                }
            }
            command => {
                if let Err(e) = client.execute(command).await {
                    println!("Error: {e}");
                }
            }
        }
    }

    client.shutdown().await;
    Ok(())
}
