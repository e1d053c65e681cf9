// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Append-only log buffer for a single stream session.
//!
//! One session writes, any number of readers (the display layer) read.
//! Clones share the same storage, so handing a clone to a renderer gives it
//! a live view of appends.
//!
//! The buffer never reorders: `sequence_num` ordering is a property of the
//! producer. It does, however, refuse lines that would break the
//! non-decreasing order, and it refuses all lines once sealed.

use crate::log::LogLine;
use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;

/// Result of [`LogBuffer::append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Append {
    /// The line was stored.
    Appended,
    /// The line was stored and the oldest line was evicted to stay in bounds.
    Evicted,
    /// The line's sequence number is below the last stored one; dropped.
    Regressed { last: u64 },
    /// The buffer was sealed when its session was superseded; dropped.
    Sealed,
}

impl Append {
    pub fn is_stored(self) -> bool {
        matches!(self, Append::Appended | Append::Evicted)
    }
}

#[derive(Debug, Default)]
struct Inner {
    lines: VecDeque<LogLine>,
    last_seq: Option<u64>,
    evicted: u64,
    sealed: bool,
}

#[derive(Debug, Clone, Default)]
pub struct LogBuffer {
    inner: Arc<RwLock<Inner>>,
    capacity: Option<usize>,
}

impl LogBuffer {
    /// Unbounded buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer holding at most `capacity` lines; the oldest are evicted first.
    /// A capacity of zero is treated as one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self { inner: Arc::default(), capacity: Some(capacity.max(1)) }
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn append(&self, line: LogLine) -> Append {
        let mut inner = self.inner.write();
        if inner.sealed {
            return Append::Sealed;
        }
        if let Some(last) = inner.last_seq {
            if line.sequence_num < last {
                return Append::Regressed { last };
            }
        }
        inner.last_seq = Some(line.sequence_num);
        inner.lines.push_back(line);

        match self.capacity {
            Some(cap) if inner.lines.len() > cap => {
                inner.lines.pop_front();
                inner.evicted += 1;
                Append::Evicted
            }
            _ => Append::Appended,
        }
    }

    /// Copy of all retained lines in append order, which is non-decreasing
    /// in `sequence_num`.
    pub fn snapshot(&self) -> Vec<LogLine> {
        self.inner.read().lines.iter().cloned().collect()
    }

    /// Retained lines with `sequence_num` strictly greater than `seq`.
    ///
    /// Lets a renderer pull only what it has not drawn yet.
    pub fn lines_after(&self, seq: u64) -> Vec<LogLine> {
        let inner = self.inner.read();
        let start = inner.lines.partition_point(|l| l.sequence_num <= seq);
        inner.lines.range(start..).cloned().collect()
    }

    /// Inclusive ranges of sequence numbers missing between retained lines.
    ///
    /// Gaps are data loss to report, not a reason to discard the buffer.
    pub fn gaps(&self) -> Vec<(u64, u64)> {
        let inner = self.inner.read();
        let mut gaps = Vec::new();
        let mut prev: Option<u64> = None;
        for line in &inner.lines {
            if let Some(p) = prev {
                // Retained lines are non-decreasing, so this cannot underflow.
                if line.sequence_num - p > 1 {
                    gaps.push((p + 1, line.sequence_num - 1));
                }
            }
            prev = Some(line.sequence_num);
        }
        gaps
    }

    pub fn len(&self) -> usize {
        self.inner.read().lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().lines.is_empty()
    }

    pub fn last_sequence_num(&self) -> Option<u64> {
        self.inner.read().last_seq
    }

    /// Number of lines dropped to honor the capacity bound.
    pub fn evicted(&self) -> u64 {
        self.inner.read().evicted
    }

    /// Refuse all further appends. Idempotent.
    pub fn seal(&self) {
        self.inner.write().sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.inner.read().sealed
    }

    /// Whether two handles share the same storage.
    pub fn same_buffer(&self, other: &LogBuffer) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

#[cfg(test)]
#[path = "log_buffer_tests.rs"]
mod tests;
