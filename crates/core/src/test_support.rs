// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{JobSnapshot, JobStatus, LogLine, StreamType};

// ── Proptest strategies ─────────────────────────────────────────────────

/// Proptest strategies for core value types.
pub mod strategies {
    use crate::{JobStatus, LogLine, StreamType};
    use proptest::prelude::*;

    pub fn arb_job_status() -> impl Strategy<Value = JobStatus> {
        prop_oneof![
            Just(JobStatus::Pending),
            Just(JobStatus::InProgress),
            Just(JobStatus::Success),
            Just(JobStatus::Failed),
        ]
    }

    pub fn arb_stream_type() -> impl Strategy<Value = StreamType> {
        prop_oneof![Just(StreamType::Stdout), Just(StreamType::Stderr)]
    }

    /// Lines with arbitrary (possibly regressing or repeating) sequence numbers.
    pub fn arb_log_lines(max: usize) -> impl Strategy<Value = Vec<LogLine>> {
        prop::collection::vec(
            (0u64..32, "[a-z ]{0,12}", arb_stream_type()).prop_map(|(seq, content, stream)| {
                LogLine { sequence_num: seq, content, stream_type: stream, timestamp_ms: 0 }
            }),
            0..max,
        )
    }
}

// ── Factory functions ───────────────────────────────────────────────────

pub fn snapshot(job_id: &str, status: JobStatus) -> JobSnapshot {
    JobSnapshot::new(job_id, status)
}

pub fn stdout_line(seq: u64, content: &str) -> LogLine {
    LogLine::builder().sequence_num(seq).content(content).build()
}

pub fn stderr_line(seq: u64, content: &str) -> LogLine {
    LogLine::builder().sequence_num(seq).content(content).stream_type(StreamType::Stderr).build()
}
