// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job query adapter: fetch the current status and output of a job.

use async_trait::async_trait;
use serde::Deserialize;
use sw_core::{JobId, JobSnapshot, JobStatus, ParseStatusError};
use thiserror::Error;

/// Errors from job query operations.
///
/// All of these are transient from the poller's point of view: the tick is
/// skipped and polling continues.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("job not found: {0}")]
    NotFound(JobId),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<ParseStatusError> for QueryError {
    fn from(e: ParseStatusError) -> Self {
        QueryError::Decode(e.to_string())
    }
}

/// Job metadata as returned by the query service.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRecord {
    pub status: JobStatus,
    #[serde(default)]
    pub output: serde_json::Value,
    #[serde(default)]
    pub updated_at_ms: Option<u64>,
}

impl JobRecord {
    pub fn new(status: JobStatus) -> Self {
        Self { status, output: serde_json::Value::Null, updated_at_ms: None }
    }

    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = output;
        self
    }

    /// Decode a JSON job record (`{"status": "in_progress", "output": ...}`).
    pub fn from_json(text: &str) -> Result<Self, QueryError> {
        serde_json::from_str(text).map_err(|e| QueryError::Decode(e.to_string()))
    }

    pub fn into_snapshot(self, job_id: JobId) -> JobSnapshot {
        JobSnapshot {
            job_id,
            status: self.status,
            output: self.output,
            updated_at_ms: self.updated_at_ms,
        }
    }
}

/// Adapter for the job query service
#[async_trait]
pub trait JobQueryAdapter: Clone + Send + Sync + 'static {
    /// Fetch the current state of a job
    async fn get_job(&self, job_id: &JobId) -> Result<JobRecord, QueryError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{JobQueryAdapter, JobRecord, QueryError};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use sw_core::JobId;

    /// Recorded query call
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct QueryCall {
        pub job_id: JobId,
    }

    #[derive(Default)]
    struct JobScript {
        queued: VecDeque<Result<JobRecord, QueryError>>,
        current: Option<JobRecord>,
    }

    #[derive(Default)]
    struct FakeQueryState {
        jobs: HashMap<JobId, JobScript>,
        calls: Vec<QueryCall>,
    }

    /// Fake job query service.
    ///
    /// Queued results are returned first, in order. Once the queue is empty
    /// the last successful record keeps being returned, which is what a poll
    /// loop against an idle job sees.
    #[derive(Clone, Default)]
    pub struct FakeJobQuery {
        inner: Arc<Mutex<FakeQueryState>>,
    }

    impl FakeJobQuery {
        pub fn new() -> Self {
            Self::default()
        }

        /// Replace the job's current record and clear anything queued.
        pub fn set(&self, job_id: impl Into<JobId>, record: JobRecord) {
            let mut inner = self.inner.lock();
            let script = inner.jobs.entry(job_id.into()).or_default();
            script.queued.clear();
            script.current = Some(record);
        }

        /// Queue one result to be returned by the next fetch.
        pub fn push(&self, job_id: impl Into<JobId>, result: Result<JobRecord, QueryError>) {
            self.inner.lock().jobs.entry(job_id.into()).or_default().queued.push_back(result);
        }

        pub fn calls(&self) -> Vec<QueryCall> {
            self.inner.lock().calls.clone()
        }

        pub fn call_count(&self, job_id: &str) -> usize {
            self.inner.lock().calls.iter().filter(|c| c.job_id == job_id).count()
        }
    }

    #[async_trait]
    impl JobQueryAdapter for FakeJobQuery {
        async fn get_job(&self, job_id: &JobId) -> Result<JobRecord, QueryError> {
            let mut inner = self.inner.lock();
            inner.calls.push(QueryCall { job_id: job_id.clone() });
            let Some(script) = inner.jobs.get_mut(job_id) else {
                return Err(QueryError::NotFound(job_id.clone()));
            };
            match script.queued.pop_front() {
                Some(Ok(record)) => {
                    script.current = Some(record.clone());
                    Ok(record)
                }
                Some(Err(e)) => Err(e),
                None => script.current.clone().ok_or_else(|| QueryError::NotFound(job_id.clone())),
            }
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeJobQuery, QueryCall};

#[cfg(test)]
#[path = "query_tests.rs"]
mod tests;
