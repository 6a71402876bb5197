//! Receiver discovery example

use onkyo_eiscp::scan;
use std::time::Duration;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("Discovering receivers...");

    let receivers = scan(Duration::from_secs(5)).await?;

    if receivers.is_empty() {
        println!("No receivers found.");
    } else {
        println!("Found {} receivers:", receivers.len());
        for info in receivers {
            println!(
                "  - {} [{}] at {}:{} (area {})",
                info.model, info.identifier, info.host, info.port, info.area
            );
        }
    }
    Ok(())
}
