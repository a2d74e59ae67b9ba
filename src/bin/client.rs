use clap::Parser;
use std::process;
use tracing::error;
use tracing_subscriber::EnvFilter;
use wire_relay::client;
use wire_relay::config::ClientArgs;

#[tokio::main]
async fn main() {
    // A missing or malformed address dies here, before any socket work.
    let args = ClientArgs::parse();

    // Initialize logging. Stdout carries relayed bytes, so logs go to
    // stderr.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = client::run(&args).await {
        error!(error = %e, "client terminated");
        process::exit(1);
    }
}
