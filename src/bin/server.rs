use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;
use wire_relay::config::ServerConfig;
use wire_relay::server::Server;

#[tokio::main]
async fn main() {
    // Load configuration
    let config = match ServerConfig::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let server = Server::new(config);
    if let Err(e) = server.run().await {
        error!(error = %e, "server terminated");
        process::exit(1);
    }
}
