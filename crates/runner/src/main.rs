// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Standalone runner binary with an echo handler, for local runs and
//! protocol smoke tests. Production runners embed [`sy_runner::Runner`]
//! with their own handler.

use async_trait::async_trait;
use clap::Parser;
use serde_json::Value;
use sy_core::RunnerId;
use sy_runner::{Handler, Runner};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sy-runner", about = "Switchyard runner process")]
struct Args {
    /// Pre-registered runner id to claim with the init message
    id: String,
    /// Controller host
    host: String,
    /// Controller port
    port: u16,
}

struct Echo;

#[async_trait]
impl Handler for Echo {
    async fn handle(&self, payload: Value) -> Value {
        payload
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let runner = Runner::new(RunnerId::from_string(args.id), Echo);
    runner.run_tcp(&args.host, args.port).await?;
    Ok(())
}
