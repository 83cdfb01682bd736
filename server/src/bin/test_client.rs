//! Scripted protocol peer for smoke testing a running server.
//!
//! Connects, prints the welcome line, streams parsed snapshots and
//! sends a canned sequence of direction tokens. Run two of these
//! against a server to watch a full match play out.

use shared::StateSnapshot;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::sleep;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:12343".to_string());

    let stream = TcpStream::connect(&addr).await?;
    println!("Connected to {}", addr);

    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    match lines.next_line().await? {
        Some(welcome) => println!("{}", welcome),
        None => {
            println!("Server closed the connection before the welcome line");
            return Ok(());
        }
    }

    // Print snapshots as they arrive.
    tokio::spawn(async move {
        while let Ok(Some(line)) = lines.next_line().await {
            match serde_json::from_str::<StateSnapshot>(&line) {
                Ok(snapshot) => {
                    for (id, player) in &snapshot.players {
                        println!(
                            "  {}: {} cells, head {:?}, alive={}",
                            id,
                            player.body.len(),
                            player.body.last(),
                            player.alive
                        );
                    }
                    println!(
                        "  food=({}, {}), winner={:?}",
                        snapshot.food.x, snapshot.food.y, snapshot.winner
                    );
                }
                Err(e) => println!("  unparsed line ({}): {}", e, line),
            }
        }
        println!("Snapshot stream ended");
    });

    // Steer a small loop, then ask for a restart.
    for token in ["up", "right", "down", "right", "up", "restart"] {
        println!("Sending {}", token);
        writer.write_all(format!("{}\n", token).as_bytes()).await?;
        sleep(Duration::from_millis(600)).await;
    }

    println!("Test client finished");
    Ok(())
}
