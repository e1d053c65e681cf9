// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Log lines produced by a stream session.

use serde::{Deserialize, Serialize};

/// Which output stream of the job a line came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamType {
    #[default]
    Stdout,
    Stderr,
}

impl StreamType {
    /// Normalize a wire marker. Only `"stderr"` is stderr; anything else,
    /// including unknown or empty markers, is stdout.
    pub fn from_wire(marker: &str) -> Self {
        if marker == "stderr" {
            StreamType::Stderr
        } else {
            StreamType::Stdout
        }
    }
}

crate::simple_display! {
    StreamType {
        Stdout => "stdout",
        Stderr => "stderr",
    }
}

/// One line of job output.
///
/// Ordered by `sequence_num`, which reflects server emission order; arrival
/// order is not meaningful.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub sequence_num: u64,
    pub content: String,
    pub stream_type: StreamType,
    pub timestamp_ms: u64,
}

crate::builder! {
    pub struct LogLineBuilder => LogLine {
        into {
            content: String = "line",
        }
        set {
            sequence_num: u64 = 0,
            stream_type: StreamType = StreamType::Stdout,
            timestamp_ms: u64 = 1_000_000,
        }
    }
}

#[cfg(test)]
#[path = "log_tests.rs"]
mod tests;
