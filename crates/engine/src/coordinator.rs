// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Stream coordinator state machine.
//!
//! Decides, from status snapshots, when a log session starts for the bound
//! job, and owns the lifecycle of that session. At most one session is active
//! at a time; a superseded session is cancelled and its buffer sealed before
//! anything else happens for the new binding.
//!
//! The coordinator itself is synchronous. Sessions run as spawned tasks and
//! report back through the `SessionReport` channel given at construction;
//! the caller routes those reports to [`StreamCoordinator::on_session_report`].

use crate::event::{CoordinatorEvent, EventSink};
use crate::session::{PhaseCell, SessionOutcome, SessionPhase, SessionReport, StreamSession};
use crate::view::{CoordinatorView, SessionView};
use sw_adapters::LogStreamAdapter;
use sw_core::{Clock, JobId, JobSnapshot, JobStatus, LogBuffer, SessionId};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Coarse coordinator state, for logging and assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinatorPhase {
    NoJob,
    /// Bound, no session started yet.
    Idle,
    SessionActive,
    SessionTerminated,
}

sw_core::simple_display! {
    CoordinatorPhase {
        NoJob => "no_job",
        Idle => "idle",
        SessionActive => "session_active",
        SessionTerminated => "session_terminated",
    }
}

/// Why a snapshot did not start a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    NoJob,
    /// Snapshot for a job other than the bound one.
    OtherJob,
    SessionActive,
    /// Same status as the previous snapshot for this binding.
    StatusUnchanged,
    /// Job is still pending.
    NotStarted,
    /// Terminal job whose backfill was already attempted.
    HistoryLoaded,
}

sw_core::simple_display! {
    IgnoreReason {
        NoJob => "no job bound",
        OtherJob => "snapshot for another job",
        SessionActive => "session already active",
        StatusUnchanged => "status unchanged",
        NotStarted => "job not started",
        HistoryLoaded => "history already loaded",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Started { session: SessionId, backfill: bool },
    Ignored(IgnoreReason),
}

impl Decision {
    pub fn started(&self) -> bool {
        matches!(self, Decision::Started { .. })
    }
}

struct ActiveSession {
    id: SessionId,
    backfill: bool,
    cancel: CancellationToken,
    phase: PhaseCell,
    buffer: LogBuffer,
    handle: JoinHandle<()>,
}

struct EndedSession {
    id: SessionId,
    backfill: bool,
    phase: PhaseCell,
    buffer: LogBuffer,
    outcome: SessionOutcome,
}

enum SessionSlot {
    Idle,
    Active(ActiveSession),
    Terminated(EndedSession),
}

impl SessionSlot {
    fn take_active(&mut self) -> Option<ActiveSession> {
        match std::mem::replace(self, SessionSlot::Idle) {
            SessionSlot::Active(active) => Some(active),
            other => {
                *self = other;
                None
            }
        }
    }

    fn active_id(&self) -> Option<SessionId> {
        match self {
            SessionSlot::Active(active) => Some(active.id),
            _ => None,
        }
    }

    fn view(&self) -> (Option<SessionView>, Option<LogBuffer>) {
        match self {
            SessionSlot::Idle => (None, None),
            SessionSlot::Active(s) => (
                Some(SessionView { id: s.id, backfill: s.backfill, phase: s.phase.clone() }),
                Some(s.buffer.clone()),
            ),
            SessionSlot::Terminated(s) => (
                Some(SessionView { id: s.id, backfill: s.backfill, phase: s.phase.clone() }),
                Some(s.buffer.clone()),
            ),
        }
    }
}

struct BoundJob {
    job_id: JobId,
    last_snapshot: Option<JobSnapshot>,
    /// Set at most once per binding; a terminal job gets one backfill.
    loaded_historical: bool,
    slot: SessionSlot,
    /// First status fetch failed and no snapshot has arrived since.
    status_unavailable: bool,
    /// Last session failed before producing a line.
    stream_failed: bool,
    /// Status changed while a session was active.
    deferred_change: bool,
}

impl BoundJob {
    fn new(job_id: JobId) -> Self {
        Self {
            job_id,
            last_snapshot: None,
            loaded_historical: false,
            slot: SessionSlot::Idle,
            status_unavailable: false,
            stream_failed: false,
            deferred_change: false,
        }
    }
}

enum CoordinatorState {
    NoJob,
    Bound(BoundJob),
}

struct SessionLauncher<S, C> {
    adapter: S,
    clock: C,
    buffer_capacity: Option<usize>,
    reports: mpsc::UnboundedSender<SessionReport>,
    last_id: SessionId,
}

impl<S: LogStreamAdapter, C: Clock> SessionLauncher<S, C> {
    fn launch(&mut self, job_id: &JobId, backfill: bool) -> ActiveSession {
        self.last_id = self.last_id.next();
        let id = self.last_id;
        let buffer = match self.buffer_capacity {
            Some(cap) => LogBuffer::with_capacity(cap),
            None => LogBuffer::new(),
        };
        let cancel = CancellationToken::new();
        let session = StreamSession::new(
            id,
            job_id.clone(),
            self.adapter.clone(),
            self.clock.clone(),
            buffer.clone(),
            cancel.clone(),
        );
        let phase = session.phase();
        let reports = self.reports.clone();
        let job_id = job_id.clone();
        let handle = tokio::spawn(async move {
            let outcome = session.run().await;
            // Receiver gone means the coordinator is gone; nobody to tell.
            let _ = reports.send(SessionReport { session: id, job_id, outcome });
        });
        ActiveSession { id, backfill, cancel, phase, buffer, handle }
    }
}

pub struct StreamCoordinator<S, C> {
    launcher: SessionLauncher<S, C>,
    state: CoordinatorState,
    events: EventSink,
    /// Tasks of sessions that were cancelled or reported, still winding down.
    retired: Vec<JoinHandle<()>>,
}

impl<S, C> StreamCoordinator<S, C>
where
    S: LogStreamAdapter,
    C: Clock,
{
    pub fn new(adapter: S, clock: C, reports: mpsc::UnboundedSender<SessionReport>) -> Self {
        Self {
            launcher: SessionLauncher {
                adapter,
                clock,
                buffer_capacity: None,
                reports,
                last_id: SessionId(0),
            },
            state: CoordinatorState::NoJob,
            events: EventSink::default(),
            retired: Vec::new(),
        }
    }

    /// Bound each session's buffer to `capacity` lines.
    pub fn with_buffer_capacity(mut self, capacity: Option<usize>) -> Self {
        self.launcher.buffer_capacity = capacity;
        self
    }

    pub fn with_events(mut self, tx: mpsc::Sender<CoordinatorEvent>) -> Self {
        self.events = EventSink::new(tx);
        self
    }

    pub fn job_id(&self) -> Option<&JobId> {
        match &self.state {
            CoordinatorState::NoJob => None,
            CoordinatorState::Bound(bound) => Some(&bound.job_id),
        }
    }

    pub fn last_snapshot(&self) -> Option<&JobSnapshot> {
        match &self.state {
            CoordinatorState::NoJob => None,
            CoordinatorState::Bound(bound) => bound.last_snapshot.as_ref(),
        }
    }

    pub fn loaded_historical(&self) -> bool {
        matches!(&self.state, CoordinatorState::Bound(bound) if bound.loaded_historical)
    }

    pub fn active_session(&self) -> Option<SessionId> {
        match &self.state {
            CoordinatorState::NoJob => None,
            CoordinatorState::Bound(bound) => bound.slot.active_id(),
        }
    }

    /// How the most recent session ended, unless one is active or none ran.
    pub fn last_outcome(&self) -> Option<&SessionOutcome> {
        match &self.state {
            CoordinatorState::Bound(BoundJob { slot: SessionSlot::Terminated(ended), .. }) => {
                Some(&ended.outcome)
            }
            _ => None,
        }
    }

    /// Buffer of the current (active or last ended) session.
    pub fn buffer(&self) -> Option<LogBuffer> {
        match &self.state {
            CoordinatorState::NoJob => None,
            CoordinatorState::Bound(bound) => bound.slot.view().1,
        }
    }

    pub fn phase(&self) -> CoordinatorPhase {
        match &self.state {
            CoordinatorState::NoJob => CoordinatorPhase::NoJob,
            CoordinatorState::Bound(bound) => match bound.slot {
                SessionSlot::Idle => CoordinatorPhase::Idle,
                SessionSlot::Active(_) => CoordinatorPhase::SessionActive,
                SessionSlot::Terminated(_) => CoordinatorPhase::SessionTerminated,
            },
        }
    }

    /// Bind to `job_id` (or unbind with `None`).
    ///
    /// Any active session for the previous job is cancelled and its buffer
    /// sealed before this returns. Rebinding the same id is a no-op and
    /// returns false.
    pub fn bind(&mut self, job_id: Option<JobId>) -> bool {
        if self.job_id() == job_id.as_ref() {
            return false;
        }
        if let CoordinatorState::Bound(bound) = &mut self.state {
            if let Some(active) = bound.slot.take_active() {
                let previous = bound.job_id.clone();
                self.cancel_session(&previous, active, "job changed");
            }
        }

        match &job_id {
            Some(id) => tracing::info!(job_id = %id, "bound job"),
            None => tracing::info!("unbound job"),
        }
        self.state = match job_id.clone() {
            Some(id) => CoordinatorState::Bound(BoundJob::new(id)),
            None => CoordinatorState::NoJob,
        };
        self.events.emit(CoordinatorEvent::JobBound { job_id });
        true
    }

    /// Apply a status snapshot and start a session if the policy says so.
    pub fn on_snapshot(&mut self, snapshot: JobSnapshot) -> Decision {
        let CoordinatorState::Bound(bound) = &mut self.state else {
            tracing::debug!(job_id = %snapshot.job_id, "snapshot with no job bound");
            return Decision::Ignored(IgnoreReason::NoJob);
        };
        if bound.job_id != snapshot.job_id {
            tracing::debug!(job_id = %snapshot.job_id, bound = %bound.job_id, "stale snapshot for another job");
            return Decision::Ignored(IgnoreReason::OtherJob);
        }

        let status_changed = bound
            .last_snapshot
            .as_ref()
            .is_none_or(|prev| prev.status != snapshot.status);
        bound.last_snapshot = Some(snapshot);
        bound.status_unavailable = false;
        self.apply_policy(status_changed)
    }

    /// Start a session for the bound job's last known status if the policy
    /// allows it.
    fn apply_policy(&mut self, status_changed: bool) -> Decision {
        let CoordinatorState::Bound(bound) = &mut self.state else {
            return Decision::Ignored(IgnoreReason::NoJob);
        };
        let Some(status) = bound.last_snapshot.as_ref().map(|s| s.status) else {
            return Decision::Ignored(IgnoreReason::NotStarted);
        };

        let reason = if bound.slot.active_id().is_some() {
            if status_changed {
                bound.deferred_change = true;
            }
            Some(IgnoreReason::SessionActive)
        } else if !status_changed {
            Some(IgnoreReason::StatusUnchanged)
        } else {
            match status {
                JobStatus::Pending => Some(IgnoreReason::NotStarted),
                JobStatus::InProgress => None,
                JobStatus::Success | JobStatus::Failed if bound.loaded_historical => {
                    Some(IgnoreReason::HistoryLoaded)
                }
                JobStatus::Success | JobStatus::Failed => None,
            }
        };
        if let Some(reason) = reason {
            tracing::debug!(job_id = %bound.job_id, %status, %reason, "snapshot ignored");
            return Decision::Ignored(reason);
        }

        let backfill = status.is_terminal();
        if backfill {
            bound.loaded_historical = true;
        }
        bound.stream_failed = false;
        bound.deferred_change = false;
        let active = self.launcher.launch(&bound.job_id, backfill);
        let session = active.id;
        tracing::info!(job_id = %bound.job_id, %session, %status, backfill, "log session started");
        bound.slot = SessionSlot::Active(active);
        self.events.emit(CoordinatorEvent::SessionStarted {
            job_id: bound.job_id.clone(),
            session,
            backfill,
        });
        Decision::Started { session, backfill }
    }

    /// Record how a session ended. Returns false for a stale report from a
    /// superseded or cancelled session.
    pub fn on_session_report(&mut self, report: SessionReport) -> bool {
        let CoordinatorState::Bound(bound) = &mut self.state else {
            tracing::debug!(session = %report.session, "stale session report, no job bound");
            return false;
        };
        if bound.job_id != report.job_id || bound.slot.active_id() != Some(report.session) {
            tracing::debug!(job_id = %report.job_id, session = %report.session, "stale session report");
            return false;
        }
        let Some(active) = bound.slot.take_active() else {
            return false;
        };

        active.phase.set(SessionPhase::Terminated);
        let outcome = report.outcome;
        if outcome.ran_to_completion() {
            bound.loaded_historical = true;
        }
        if outcome.is_failure() && active.buffer.is_empty() {
            bound.stream_failed = true;
        }
        match &outcome {
            SessionOutcome::Failed(e) => {
                tracing::warn!(job_id = %bound.job_id, session = %active.id, error = %e, "log session failed");
            }
            _ => {
                tracing::info!(job_id = %bound.job_id, session = %active.id, %outcome, lines = active.buffer.len(), "log session ended");
            }
        }

        self.retired.retain(|h| !h.is_finished());
        self.retired.push(active.handle);
        let revisit = bound.deferred_change && matches!(outcome, SessionOutcome::Exhausted | SessionOutcome::Failed(_));
        bound.slot = SessionSlot::Terminated(EndedSession {
            id: active.id,
            backfill: active.backfill,
            phase: active.phase,
            buffer: active.buffer,
            outcome: outcome.clone(),
        });
        self.events.emit(CoordinatorEvent::SessionEnded {
            job_id: bound.job_id.clone(),
            session: report.session,
            outcome,
        });
        // A status change seen while the session ran was never acted on.
        if revisit {
            self.apply_policy(true);
        }
        true
    }

    /// Cancel the active session but stay bound. Returns false if nothing
    /// was active.
    pub fn stop_stream(&mut self) -> bool {
        let CoordinatorState::Bound(bound) = &mut self.state else {
            return false;
        };
        let Some(active) = bound.slot.take_active() else {
            return false;
        };
        let job_id = bound.job_id.clone();
        let ended = self.cancel_session(&job_id, active, "stopped");
        if let CoordinatorState::Bound(bound) = &mut self.state {
            bound.slot = SessionSlot::Terminated(ended);
        }
        true
    }

    /// The first status fetch for `job_id` failed. Ignored once a snapshot
    /// is known or if another job is bound.
    pub fn mark_status_unavailable(&mut self, job_id: &JobId) -> bool {
        match &mut self.state {
            CoordinatorState::Bound(bound) if bound.job_id == *job_id && bound.last_snapshot.is_none() => {
                tracing::debug!(%job_id, "job status unavailable");
                bound.status_unavailable = true;
                true
            }
            _ => false,
        }
    }

    /// Cancel any active session unconditionally and hand back every
    /// session task that may still be winding down.
    pub fn shutdown(&mut self) -> Vec<JoinHandle<()>> {
        self.stop_stream();
        std::mem::take(&mut self.retired)
    }

    pub fn view(&self) -> CoordinatorView {
        match &self.state {
            CoordinatorState::NoJob => CoordinatorView::default(),
            CoordinatorState::Bound(bound) => {
                let (session, buffer) = bound.slot.view();
                CoordinatorView {
                    job_id: Some(bound.job_id.clone()),
                    snapshot: bound.last_snapshot.clone(),
                    session,
                    buffer,
                    loaded_historical: bound.loaded_historical,
                    unavailable: bound.status_unavailable || bound.stream_failed,
                }
            }
        }
    }

    /// Cancel token, seal buffer, then mark terminated; in that order, so no
    /// line lands after this returns.
    fn cancel_session(&mut self, job_id: &JobId, active: ActiveSession, reason: &str) -> EndedSession {
        active.cancel.cancel();
        active.buffer.seal();
        active.phase.set(SessionPhase::Terminated);
        tracing::info!(%job_id, session = %active.id, reason, "log session cancelled");

        self.retired.retain(|h| !h.is_finished());
        self.retired.push(active.handle);
        self.events.emit(CoordinatorEvent::SessionEnded {
            job_id: job_id.clone(),
            session: active.id,
            outcome: SessionOutcome::Cancelled,
        });
        EndedSession {
            id: active.id,
            backfill: active.backfill,
            phase: active.phase,
            buffer: active.buffer,
            outcome: SessionOutcome::Cancelled,
        }
    }
}

#[cfg(test)]
#[path = "coordinator_tests.rs"]
mod tests;
