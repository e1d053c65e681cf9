// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! sw-core: Core types for the stackwatch job-log streaming coordinator

pub mod macros;

pub mod clock;
pub mod id;
pub mod job;
pub mod log;
pub mod log_buffer;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{Clock, FakeClock, SystemClock};
pub use id::{JobId, SessionId};
pub use job::{JobSnapshot, JobStatus, ParseStatusError};
#[cfg(any(test, feature = "test-support"))]
pub use log::LogLineBuilder;
pub use log::{LogLine, StreamType};
pub use log_buffer::{Append, LogBuffer};
