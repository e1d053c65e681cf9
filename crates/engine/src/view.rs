// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Read-only coordinator state for the display layer.

use crate::session::{PhaseCell, SessionPhase};
use sw_core::{JobId, JobSnapshot, LogBuffer, LogLine, SessionId};

/// What the display layer should show in place of log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogAvailability {
    /// No lines yet, but some may still arrive.
    Waiting,
    /// The buffer holds at least one line.
    Available,
    /// The first status fetch or the stream attempt failed with nothing shown.
    Unavailable,
    /// The session ended without producing any line.
    Empty,
}

sw_core::simple_display! {
    LogAvailability {
        Waiting => "waiting",
        Available => "available",
        Unavailable => "unavailable",
        Empty => "empty",
    }
}

/// The session behind the current buffer, active or ended.
#[derive(Debug, Clone)]
pub struct SessionView {
    pub id: SessionId,
    pub backfill: bool,
    /// Shared with the running task, so it is live.
    pub phase: PhaseCell,
}

impl SessionView {
    pub fn is_active(&self) -> bool {
        self.phase.get() != SessionPhase::Terminated
    }
}

#[derive(Debug, Clone, Default)]
pub struct CoordinatorView {
    pub job_id: Option<JobId>,
    pub snapshot: Option<JobSnapshot>,
    pub session: Option<SessionView>,
    /// Shares storage with the session's buffer; reads see new appends.
    pub buffer: Option<LogBuffer>,
    pub loaded_historical: bool,
    pub unavailable: bool,
}

impl CoordinatorView {
    pub fn is_streaming(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.phase.get() == SessionPhase::Streaming)
    }

    /// Copy of the buffered lines; empty when there is no session.
    pub fn lines(&self) -> Vec<LogLine> {
        self.buffer.as_ref().map(LogBuffer::snapshot).unwrap_or_default()
    }

    /// Evaluated against the live buffer and phase, not a stored copy.
    pub fn availability(&self) -> LogAvailability {
        if self.buffer.as_ref().is_some_and(|b| !b.is_empty()) {
            return LogAvailability::Available;
        }
        if self.unavailable {
            return LogAvailability::Unavailable;
        }
        match &self.session {
            Some(session) if !session.is_active() => LogAvailability::Empty,
            _ => LogAvailability::Waiting,
        }
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
