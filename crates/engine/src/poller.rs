// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic job status polling.
//!
//! The poller fetches the job on a fixed interval and forwards a snapshot
//! only when `status` or `output` changed since the last one it forwarded.
//! Fetch failures are logged and skipped; they never end the loop.

use std::time::Duration;
use sw_adapters::{JobQueryAdapter, QueryError};
use sw_core::{JobId, JobSnapshot};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// What a poll tick forwards to the coordinator.
#[derive(Debug, Clone, PartialEq)]
pub enum PollUpdate {
    /// Job state changed (or this is the first successful fetch).
    Snapshot(JobSnapshot),
    /// The very first fetch failed; nothing is known about the job yet.
    Unavailable(JobId),
}

pub struct StatusPoller<Q> {
    job_id: JobId,
    query: Q,
    interval: Duration,
    stop_after_terminal: bool,
    last: Option<JobSnapshot>,
    attempts: u64,
}

impl<Q: JobQueryAdapter> StatusPoller<Q> {
    pub fn new(job_id: JobId, query: Q, interval: Duration) -> Self {
        Self {
            job_id,
            query,
            // tokio intervals panic on a zero period
            interval: interval.max(Duration::from_millis(1)),
            stop_after_terminal: false,
            last: None,
            attempts: 0,
        }
    }

    /// Stop the loop once a terminal snapshot has been delivered.
    pub fn stop_after_terminal(mut self, stop: bool) -> Self {
        self.stop_after_terminal = stop;
        self
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Fetch the job once.
    pub async fn poll(&self) -> Result<JobSnapshot, QueryError> {
        let record = self.query.get_job(&self.job_id).await?;
        Ok(record.into_snapshot(self.job_id.clone()))
    }

    /// One poll tick: fetch, then forward only what changed.
    pub async fn tick(&mut self) -> Option<PollUpdate> {
        self.attempts += 1;
        match self.poll().await {
            Ok(snapshot) => {
                if self.last.as_ref().is_some_and(|last| last.same_state(&snapshot)) {
                    tracing::trace!(job_id = %self.job_id, "status unchanged");
                    return None;
                }
                tracing::debug!(job_id = %self.job_id, status = %snapshot.status, "job status changed");
                self.last = Some(snapshot.clone());
                Some(PollUpdate::Snapshot(snapshot))
            }
            Err(e) => {
                tracing::warn!(job_id = %self.job_id, error = %e, "status fetch failed, skipping tick");
                if self.attempts == 1 && self.last.is_none() {
                    Some(PollUpdate::Unavailable(self.job_id.clone()))
                } else {
                    None
                }
            }
        }
    }

    /// Poll until cancelled, until the receiver is gone, or (if configured)
    /// until a terminal snapshot has been delivered. The first tick is
    /// immediate.
    pub async fn run(mut self, tx: mpsc::Sender<PollUpdate>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = interval.tick() => {}
            }
            let update = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                update = self.tick() => update,
            };
            let Some(update) = update else {
                continue;
            };

            let terminal = matches!(&update, PollUpdate::Snapshot(s) if s.status.is_terminal());
            if tx.send(update).await.is_err() {
                tracing::debug!(job_id = %self.job_id, "poll receiver dropped");
                break;
            }
            if terminal && self.stop_after_terminal {
                tracing::info!(job_id = %self.job_id, "job terminal, status polling stopped");
                break;
            }
        }
    }
}

#[cfg(test)]
#[path = "poller_tests.rs"]
mod tests;
