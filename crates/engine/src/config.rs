// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator configuration.

use crate::env;
use std::time::Duration;

/// Default status poll interval
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Time between status polls; the first poll is immediate.
    pub poll_interval: Duration,
    /// Keep polling after a terminal snapshot was delivered (catches late
    /// output updates). When false the poller stops after the first terminal
    /// snapshot.
    pub poll_after_terminal: bool,
    /// Maximum lines kept per session; `None` is unbounded.
    pub buffer_capacity: Option<usize>,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self { poll_interval: DEFAULT_POLL_INTERVAL, poll_after_terminal: true, buffer_capacity: None }
    }
}

impl CoordinatorConfig {
    /// Defaults overridden by `SW_*` environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            poll_interval: env::poll_interval().unwrap_or(defaults.poll_interval),
            poll_after_terminal: env::poll_after_terminal().unwrap_or(defaults.poll_after_terminal),
            buffer_capacity: env::log_buffer_capacity().or(defaults.buffer_capacity),
        }
    }

    sw_core::setters! {
        set {
            poll_interval: Duration,
            poll_after_terminal: bool,
        }
        option {
            buffer_capacity: usize,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
