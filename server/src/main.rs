use clap::Parser;
use env_logger::Env;
use log::{error, info};
use server::config::ServerConfig;
use server::network::{Server, ServerMessage};
use shared::DEFAULT_PORT;
use std::time::Duration;

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server IP address to bind to
    #[clap(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// Server port to listen on
    #[clap(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// Server loop tick rate (ticks per second)
    #[clap(short, long, default_value = "60")]
    tick_rate: u32,
    /// Connections allowed to wait for their login at once
    #[clap(long, default_value = "32")]
    max_pending_logins: usize,
    /// Seconds a connection gets to send its login
    #[clap(long, default_value = "10")]
    login_timeout_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.host, args.port),
        tick_duration: Duration::from_secs_f64(1.0 / f64::from(args.tick_rate.max(1))),
        max_pending_logins: args.max_pending_logins,
        login_timeout: Duration::from_secs(args.login_timeout_secs),
        ..ServerConfig::default()
    };

    info!("Starting server on {}", config.bind_addr);
    info!("Tick rate: {} Hz", args.tick_rate);

    let mut server = Server::new(config).await?;

    let shutdown = server.shutdown_handle();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C, shutting down gracefully...");
                let _ = shutdown.send(ServerMessage::Shutdown);
            }
            Err(e) => error!("Failed to listen for Ctrl+C: {}", e),
        }
    });

    server.run().await
}
