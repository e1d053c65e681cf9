// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sw-engine: Job-log streaming coordinator
//!
//! For a long-running remote job this crate polls status, opens at most one
//! log subscription at a time, and buffers the lines for a display layer.
//!
//! ```text
//! StatusPoller ──snapshots──▶ StreamCoordinator ──spawns──▶ StreamSession ──appends──▶ LogBuffer
//!        ▲                           ▲                              │
//!        └──── CoordinatorRuntime ───┴────────── reports ───────────┘
//! ```

pub mod config;
pub mod coordinator;
pub mod env;
pub mod error;
pub mod event;
pub mod poller;
pub mod runtime;
pub mod session;
pub mod view;

pub use config::CoordinatorConfig;
pub use coordinator::{CoordinatorPhase, Decision, IgnoreReason, StreamCoordinator};
pub use error::CoordinatorError;
pub use event::CoordinatorEvent;
pub use poller::{PollUpdate, StatusPoller};
pub use runtime::{CoordinatorHandle, CoordinatorRuntime};
pub use session::{PhaseCell, SessionOutcome, SessionPhase, SessionReport, StreamSession};
pub use view::{CoordinatorView, LogAvailability, SessionView};

#[cfg(test)]
pub(crate) mod test_helpers;
