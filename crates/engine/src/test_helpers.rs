// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for engine unit tests.

use std::time::Duration;
use sw_adapters::StreamFrame;

/// Install a test subscriber once; honors `RUST_LOG`.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Yield to the scheduler until `cond` holds; panics after a generous bound.
pub(crate) async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..1000 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    panic!("condition not reached");
}

pub(crate) fn out(seq: u64, content: &str) -> StreamFrame {
    StreamFrame::output(seq, content)
}

pub(crate) fn completed(seq: u64) -> StreamFrame {
    StreamFrame::output(seq, "Stream completed").with_status("completed")
}
