// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use std::time::Duration;

/// Status poll interval override (`SW_POLL_INTERVAL_MS`)
pub fn poll_interval() -> Option<Duration> {
    std::env::var("SW_POLL_INTERVAL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Whether to keep polling once a job is terminal (`SW_POLL_AFTER_TERMINAL`).
/// Accepts `1/0/true/false`.
pub fn poll_after_terminal() -> Option<bool> {
    std::env::var("SW_POLL_AFTER_TERMINAL").ok().and_then(|s| match s.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    })
}

/// Bound on lines kept per session (`SW_LOG_BUFFER_CAPACITY`); unset means unbounded
pub fn log_buffer_capacity() -> Option<usize> {
    std::env::var("SW_LOG_BUFFER_CAPACITY").ok().and_then(|s| s.parse::<usize>().ok())
}
