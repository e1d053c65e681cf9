// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sw-adapters: Collaborator interfaces for the job-log coordinator
//!
//! The coordinator talks to two remote services:
//! - a job query service (`JobQueryAdapter`, unary request/response)
//! - a job log stream service (`LogStreamAdapter`, server-streaming)
//!
//! Any pair of implementations can drive the same coordinator, so each job
//! kind only has to supply its adapters.

pub mod query;
pub mod stream;

pub use query::{JobQueryAdapter, JobRecord, QueryError};
#[cfg(any(test, feature = "test-support"))]
pub use query::{FakeJobQuery, QueryCall};
#[cfg(any(test, feature = "test-support"))]
pub use stream::{FakeLogStream, LiveFeed};
pub use stream::{
    text_frames, FrameStatus, LogStream, LogStreamAdapter, StreamError, StreamFrame, StreamRequest,
};
