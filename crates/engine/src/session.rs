// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! A single log subscription for one job.
//!
//! A session consumes the job's log stream into its own [`LogBuffer`] until
//! one of:
//! - the stream reports `completed` or `cancelled`
//! - the stream closes or fails
//! - its cancellation token fires
//!
//! Cancellation is checked before every frame and raced against the wait for
//! the next one, so a silent stream is released as soon as the token fires.

use futures_util::StreamExt;
use parking_lot::Mutex;
use std::sync::Arc;
use sw_adapters::{FrameStatus, LogStreamAdapter, StreamError, StreamFrame, StreamRequest};
use sw_core::{Append, Clock, JobId, LogBuffer, LogLine, SessionId, StreamType};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionPhase {
    #[default]
    Idle,
    Streaming,
    Terminated,
}

sw_core::simple_display! {
    SessionPhase {
        Idle => "idle",
        Streaming => "streaming",
        Terminated => "terminated",
    }
}

/// Phase shared between a running session and its coordinator.
///
/// `Terminated` is absorbing: once either side terminates the session, a
/// late `Streaming` from the task is ignored.
#[derive(Debug, Clone, Default)]
pub struct PhaseCell(Arc<Mutex<SessionPhase>>);

impl PhaseCell {
    pub fn get(&self) -> SessionPhase {
        *self.0.lock()
    }

    /// Returns false if the phase was already terminated.
    pub fn set(&self, phase: SessionPhase) -> bool {
        let mut current = self.0.lock();
        if *current == SessionPhase::Terminated {
            return phase == SessionPhase::Terminated;
        }
        *current = phase;
        true
    }
}

/// How a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionOutcome {
    /// Stream reported `completed`.
    Completed,
    /// Stream reported `cancelled` (the server gave up, not us).
    RemoteCancelled,
    /// Our cancellation token fired.
    Cancelled,
    /// Stream closed without a terminal status.
    Exhausted,
    /// Transport or decode failure.
    Failed(StreamError),
}

impl SessionOutcome {
    /// Whether the stream delivered everything it had; marks the job's
    /// history as loaded.
    pub fn ran_to_completion(&self) -> bool {
        matches!(self, SessionOutcome::Completed | SessionOutcome::RemoteCancelled)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, SessionOutcome::Failed(_))
    }
}

sw_core::simple_display! {
    SessionOutcome {
        Completed => "completed",
        RemoteCancelled => "remote_cancelled",
        Cancelled => "cancelled",
        Exhausted => "exhausted",
        Failed(..) => "failed",
    }
}

/// Sent by a finished session task back to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionReport {
    pub session: SessionId,
    pub job_id: JobId,
    pub outcome: SessionOutcome,
}

pub struct StreamSession<S, C> {
    id: SessionId,
    job_id: JobId,
    adapter: S,
    clock: C,
    buffer: LogBuffer,
    cancel: CancellationToken,
    phase: PhaseCell,
}

impl<S, C> StreamSession<S, C>
where
    S: LogStreamAdapter,
    C: Clock,
{
    pub fn new(
        id: SessionId,
        job_id: JobId,
        adapter: S,
        clock: C,
        buffer: LogBuffer,
        cancel: CancellationToken,
    ) -> Self {
        Self { id, job_id, adapter, clock, buffer, cancel, phase: PhaseCell::default() }
    }

    pub fn phase(&self) -> PhaseCell {
        self.phase.clone()
    }

    /// Consume the stream until it ends; the phase is `Terminated` on return
    /// and the subscription has been dropped.
    pub async fn run(self) -> SessionOutcome {
        let outcome = self.consume().await;
        self.phase.set(SessionPhase::Terminated);
        match &outcome {
            SessionOutcome::Failed(e) => {
                tracing::warn!(job_id = %self.job_id, session = %self.id, error = %e, "log stream failed");
            }
            _ => {
                tracing::debug!(job_id = %self.job_id, session = %self.id, %outcome, lines = self.buffer.len(), "log stream ended");
            }
        }
        outcome
    }

    async fn consume(&self) -> SessionOutcome {
        if self.cancel.is_cancelled() {
            return SessionOutcome::Cancelled;
        }
        self.phase.set(SessionPhase::Streaming);

        let request = StreamRequest { job_id: self.job_id.clone(), cancel: self.cancel.clone() };
        let opened = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return SessionOutcome::Cancelled,
            opened = self.adapter.stream_logs(request) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(e) => return self.classify_error(e),
        };
        tracing::debug!(job_id = %self.job_id, session = %self.id, "log stream opened");

        loop {
            let item = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return SessionOutcome::Cancelled,
                item = stream.next() => item,
            };
            let frame = match item {
                None => return SessionOutcome::Exhausted,
                Some(Err(e)) => return self.classify_error(e),
                Some(Ok(frame)) => frame,
            };
            if self.cancel.is_cancelled() {
                return SessionOutcome::Cancelled;
            }

            let status = frame.frame_status();
            self.append(frame);
            match status {
                FrameStatus::Completed => return SessionOutcome::Completed,
                FrameStatus::Cancelled => return SessionOutcome::RemoteCancelled,
                FrameStatus::Streaming => {}
            }
        }
    }

    /// An error raised after our token fired is the teardown we asked for.
    fn classify_error(&self, e: StreamError) -> SessionOutcome {
        if e.is_cancellation() || self.cancel.is_cancelled() {
            SessionOutcome::Cancelled
        } else {
            SessionOutcome::Failed(e)
        }
    }

    fn append(&self, frame: StreamFrame) {
        let line = LogLine {
            sequence_num: frame.sequence_num,
            stream_type: StreamType::from_wire(&frame.stream_type),
            timestamp_ms: frame.timestamp_ms.unwrap_or_else(|| self.clock.epoch_ms()),
            content: frame.content,
        };
        match self.buffer.append(line) {
            Append::Appended | Append::Evicted => {}
            Append::Regressed { last } => {
                tracing::debug!(
                    job_id = %self.job_id,
                    session = %self.id,
                    seq = frame.sequence_num,
                    last,
                    "dropping out-of-order log line"
                );
            }
            Append::Sealed => {
                tracing::debug!(job_id = %self.job_id, session = %self.id, "buffer sealed, dropping line");
            }
        }
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
