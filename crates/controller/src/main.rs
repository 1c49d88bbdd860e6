// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! syd: the switchyard controller daemon.
//!
//! Accepts runner connections on TCP and serves dispatches. Trigger matchers
//! are wired in by the embedding deployment once a trigger source and worker
//! pool are configured; the bare daemon is useful for protocol testing.

use std::sync::Arc;

use clap::Parser;
use sy_controller::{env, Registry, RegistryConfig};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "syd", about = "Switchyard controller daemon")]
struct Args {
    /// Port to listen on for runner connections (default from SY_PORT)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let port = args.port.unwrap_or_else(env::listen_port);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!(port, "controller listening for runners");

    let registry = Arc::new(Registry::new(RegistryConfig::default()));
    registry.start(listener).await?;

    tokio::signal::ctrl_c().await?;
    info!("shutting down");
    registry.stop().await?;
    Ok(())
}
