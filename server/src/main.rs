use clap::Parser;
use log::info;
use shared::{DEFAULT_PORT, DEFAULT_TICK_MS};
use std::time::Duration;
use tokio::net::TcpListener;

/// Authoritative server for the two-player grid snake game.
#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Address to bind the listener to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Port to listen on
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Simulation and broadcast period in milliseconds
    #[clap(short, long, default_value_t = DEFAULT_TICK_MS)]
    tick_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    // Bind failure is fatal; anything after this point keeps the
    // server alive for the remaining peer instead.
    let address = format!("{}:{}", args.host, args.port);
    let listener = TcpListener::bind(&address).await?;
    info!("Server listening on {}", address);

    let tick_interval = Duration::from_millis(args.tick_ms);

    tokio::select! {
        result = server::network::run(listener, tick_interval) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
