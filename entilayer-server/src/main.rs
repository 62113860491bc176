use anyhow::{Context, Result};
use clap::Parser;

use entilayer_server::{config::ServerArgs, run_server, tracing_setup::init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    let args = ServerArgs::parse();
    init_tracing(args.debug)?;

    tracing::info!(store = ?args.store, addr = %args.bind_addr(), "Starting entilayer");

    run_server(args).await.context("Server error")
}
