// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors returned to the display layer by a [`crate::CoordinatorHandle`].
///
/// Fetch and stream failures never show up here: fetch failures are skipped
/// by the poller and stream failures end the session and are reported as a
/// [`crate::CoordinatorEvent`].
#[derive(Debug, Error)]
pub enum CoordinatorError {
    #[error("coordinator has shut down")]
    Closed,
    #[error("coordinator task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
