// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job status and the point-in-time snapshots the status poller emits.

use crate::id::JobId;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

/// Lifecycle status of a remote job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    InProgress,
    Success,
    Failed,
}

impl JobStatus {
    /// Success and failure are terminal; the job will produce no further logs.
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Success | JobStatus::Failed)
    }
}

crate::simple_display! {
    JobStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Success => "success",
        Failed => "failed",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown job status: {0:?}")]
pub struct ParseStatusError(pub String);

impl FromStr for JobStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "in_progress" => Ok(JobStatus::InProgress),
            "success" => Ok(JobStatus::Success),
            "failed" => Ok(JobStatus::Failed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Immutable view of a job as returned by one status poll.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: JobId,
    pub status: JobStatus,
    /// Final output of the job; opaque to the coordinator.
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at_ms: Option<u64>,
}

impl JobSnapshot {
    pub fn new(job_id: impl Into<JobId>, status: JobStatus) -> Self {
        Self { job_id: job_id.into(), status, output: serde_json::Value::Null, updated_at_ms: None }
    }

    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = output;
        self
    }

    pub fn with_updated_at_ms(mut self, ms: u64) -> Self {
        self.updated_at_ms = Some(ms);
        self
    }

    /// Whether two snapshots describe the same job state.
    ///
    /// Only `status` and `output` count; `updated_at_ms` alone changing is
    /// not a change.
    pub fn same_state(&self, other: &JobSnapshot) -> bool {
        self.status == other.status && self.output == other.output
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
