// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the controller crate.

use std::time::Duration;

fn duration_ms(var: &str, default: Duration) -> Duration {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(default)
}

/// Per-dispatch deadline (default 30s, `SY_DISPATCH_TIMEOUT_MS`).
pub fn dispatch_timeout() -> Duration {
    duration_ms("SY_DISPATCH_TIMEOUT_MS", Duration::from_secs(30))
}

/// Backoff while waiting for a registered runner to connect
/// (default 100ms, `SY_CONNECT_POLL_MS`).
pub fn connect_poll_interval() -> Duration {
    duration_ms("SY_CONNECT_POLL_MS", Duration::from_millis(100))
}

/// How many connect polls before a dispatch to a never-connecting runner
/// fails (default 50, `SY_CONNECT_MAX_POLLS`).
pub fn connect_max_polls() -> u32 {
    std::env::var("SY_CONNECT_MAX_POLLS")
        .ok()
        .and_then(|s| s.parse::<u32>().ok())
        .unwrap_or(50)
}

/// Sleep between reconciliation iterations (default 1s,
/// `SY_RECONCILE_INTERVAL_MS`).
pub fn reconcile_interval() -> Duration {
    duration_ms("SY_RECONCILE_INTERVAL_MS", Duration::from_secs(1))
}

/// TCP port the controller listens on for runner connections
/// (default 7077, `SY_PORT`).
pub fn listen_port() -> u16 {
    std::env::var("SY_PORT").ok().and_then(|s| s.parse::<u16>().ok()).unwrap_or(7077)
}
