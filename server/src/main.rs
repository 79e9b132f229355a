use clap::Parser;
use log::{error, info};
use server::config::ServerConfig;
use server::error::BoxError;
use server::network::{Server, ServerMessage};
use shared::{MAX_CLIENTS, MAX_COLLECTIBLES};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server IP address to bind to
    #[arg(short = 'H', long, default_value = "127.0.0.1")]
    host: String,

    /// Server port to listen on
    #[arg(short, long, default_value = "8080")]
    port: u16,

    /// Maximum number of concurrent players
    #[arg(
        short,
        long,
        default_value = "32",
        value_parser = clap::value_parser!(u16).range(1..=MAX_CLIENTS as i64)
    )]
    max_clients: u16,

    /// Collectibles placed when the server starts
    #[arg(
        short,
        long,
        default_value = "10",
        value_parser = clap::value_parser!(u16).range(0..=MAX_COLLECTIBLES as i64)
    )]
    collectibles: u16,

    /// Seed for collectible placement
    #[arg(long)]
    seed: Option<u64>,

    /// Seconds of silence before a client is dropped
    #[arg(long, default_value = "10")]
    client_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        max_clients: args.max_clients.into(),
        collectibles: args.collectibles.into(),
        seed: args.seed,
        client_timeout: Duration::from_secs(args.client_timeout),
    };

    info!("Starting server...");
    info!("Max clients: {}", config.max_clients);

    let mut server = Server::new(config).await?;
    let shutdown = server.shutdown_handle();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Received Ctrl+C, shutting down gracefully...");
            if let Err(e) = shutdown.send(ServerMessage::Shutdown) {
                error!("Failed to signal shutdown: {}", e);
            }
        }
    });

    server.run().await?;

    Ok(())
}
