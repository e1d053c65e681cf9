// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Lifecycle notifications emitted by the coordinator.

use crate::session::SessionOutcome;
use sw_core::{JobId, SessionId};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorEvent {
    /// The bound job changed; `None` means unbound.
    JobBound { job_id: Option<JobId> },
    SessionStarted { job_id: JobId, session: SessionId, backfill: bool },
    /// Emitted exactly once per started session.
    SessionEnded { job_id: JobId, session: SessionId, outcome: SessionOutcome },
}

impl CoordinatorEvent {
    pub fn name(&self) -> &'static str {
        match self {
            CoordinatorEvent::JobBound { .. } => "job:bound",
            CoordinatorEvent::SessionStarted { .. } => "session:started",
            CoordinatorEvent::SessionEnded { .. } => "session:ended",
        }
    }
}

/// Optional event sink. Events are best-effort: a full or closed channel
/// drops the event rather than stalling the coordinator.
#[derive(Debug, Clone, Default)]
pub(crate) struct EventSink(Option<mpsc::Sender<CoordinatorEvent>>);

impl EventSink {
    pub(crate) fn new(tx: mpsc::Sender<CoordinatorEvent>) -> Self {
        Self(Some(tx))
    }

    pub(crate) fn emit(&self, event: CoordinatorEvent) {
        let Some(tx) = &self.0 else {
            return;
        };
        let name = event.name();
        if let Err(e) = tx.try_send(event) {
            tracing::debug!(event = name, error = %e, "coordinator event dropped");
        }
    }
}
