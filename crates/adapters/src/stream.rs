// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job log stream adapter: subscribe to a job's server-streamed output.

use async_trait::async_trait;
use futures_util::future;
use futures_util::stream::{BoxStream, Stream, StreamExt};
use serde::{Deserialize, Serialize};
use sw_core::JobId;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Errors from log stream operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StreamError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("decode error: {0}")]
    Decode(String),
    /// The subscription was aborted through its cancellation token.
    #[error("stream cancelled")]
    Cancelled,
}

impl StreamError {
    /// Cancellation is the expected result of aborting a subscription, not a fault.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, StreamError::Cancelled)
    }
}

/// Status carried on each stream frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameStatus {
    Streaming,
    Completed,
    Cancelled,
}

impl FrameStatus {
    /// Only `completed` and `cancelled` end a stream; every other value,
    /// known or not, means more frames may follow.
    pub fn from_wire(status: &str) -> Self {
        match status {
            "completed" => FrameStatus::Completed,
            "cancelled" => FrameStatus::Cancelled,
            _ => FrameStatus::Streaming,
        }
    }

    pub fn is_terminal(self) -> bool {
        !matches!(self, FrameStatus::Streaming)
    }
}

sw_core::simple_display! {
    FrameStatus {
        Streaming => "streaming",
        Completed => "completed",
        Cancelled => "cancelled",
    }
}

/// One server-streamed response for a job's output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamFrame {
    pub sequence_num: u64,
    #[serde(default)]
    pub content: String,
    /// Raw stream marker; normalized with [`sw_core::StreamType::from_wire`].
    #[serde(default)]
    pub stream_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp_ms: Option<u64>,
    #[serde(default)]
    pub status: String,
}

impl StreamFrame {
    /// A `streaming` stdout frame without a timestamp.
    pub fn output(sequence_num: u64, content: impl Into<String>) -> Self {
        Self {
            sequence_num,
            content: content.into(),
            stream_type: "stdout".to_string(),
            timestamp_ms: None,
            status: "streaming".to_string(),
        }
    }

    pub fn with_stream_type(mut self, stream_type: impl Into<String>) -> Self {
        self.stream_type = stream_type.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }

    pub fn with_timestamp_ms(mut self, ms: u64) -> Self {
        self.timestamp_ms = Some(ms);
        self
    }

    pub fn frame_status(&self) -> FrameStatus {
        FrameStatus::from_wire(&self.status)
    }

    pub fn from_json(text: &str) -> Result<Self, StreamError> {
        serde_json::from_str(text).map_err(|e| StreamError::Decode(e.to_string()))
    }
}

/// Decode a transport's raw text messages into a [`LogStream`].
///
/// Blank messages are keepalives and are skipped. A message that does not
/// parse becomes [`StreamError::Decode`], which ends the consuming session.
pub fn text_frames<M>(messages: M) -> LogStream
where
    M: Stream<Item = Result<String, StreamError>> + Send + 'static,
{
    messages
        .filter_map(|message| {
            future::ready(match message {
                Ok(text) if text.trim().is_empty() => {
                    tracing::trace!("skipping keepalive message");
                    None
                }
                Ok(text) => Some(StreamFrame::from_json(&text).inspect_err(|e| {
                    tracing::warn!(error = %e, len = text.len(), "undecodable log frame");
                })),
                Err(e) => Some(Err(e)),
            })
        })
        .boxed()
}

/// Subscription request for one job's logs.
#[derive(Debug, Clone)]
pub struct StreamRequest {
    pub job_id: JobId,
    /// Aborting this token should tear down the underlying connection.
    pub cancel: CancellationToken,
}

/// Server-streamed frames; dropping the stream releases the connection.
pub type LogStream = BoxStream<'static, Result<StreamFrame, StreamError>>;

/// Adapter for the job log stream service
#[async_trait]
pub trait LogStreamAdapter: Clone + Send + Sync + 'static {
    /// Open a log subscription for a job
    async fn stream_logs(&self, request: StreamRequest) -> Result<LogStream, StreamError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{LogStream, LogStreamAdapter, StreamError, StreamFrame, StreamRequest};
    use async_trait::async_trait;
    use futures_util::stream::{self, StreamExt};
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;
    use sw_core::JobId;
    use tokio::sync::mpsc;

    type Item = Result<StreamFrame, StreamError>;

    /// Sender side of a live fake subscription.
    #[derive(Clone)]
    pub struct LiveFeed {
        tx: mpsc::UnboundedSender<Item>,
    }

    impl LiveFeed {
        /// Push a frame; returns false once the subscription has been dropped.
        pub fn send(&self, frame: StreamFrame) -> bool {
            self.tx.send(Ok(frame)).is_ok()
        }

        pub fn fail(&self, error: StreamError) -> bool {
            self.tx.send(Err(error)).is_ok()
        }

        /// Whether the subscriber has dropped its stream.
        pub fn is_closed(&self) -> bool {
            self.tx.is_closed()
        }
    }

    enum Tail {
        /// Stream ends after the scripted frames.
        End,
        /// Stream stays open, yielding nothing, until dropped.
        Hold,
        /// Stream yields whatever is pushed through the paired `LiveFeed`.
        Live(mpsc::UnboundedReceiver<Item>),
    }

    struct Script {
        open_error: Option<StreamError>,
        frames: Vec<Item>,
        tail: Tail,
    }

    #[derive(Default)]
    struct FakeStreamState {
        scripts: HashMap<JobId, VecDeque<Script>>,
        requests: Vec<StreamRequest>,
        open: usize,
        max_open: usize,
    }

    /// Decrements the open-connection count when the stream is dropped.
    struct OpenGuard(Arc<Mutex<FakeStreamState>>);

    impl Drop for OpenGuard {
        fn drop(&mut self) {
            let mut inner = self.0.lock();
            inner.open = inner.open.saturating_sub(1);
        }
    }

    /// Fake log stream service.
    ///
    /// Each `stream_logs` call for a job consumes the next script queued for
    /// it. Unscripted subscriptions stay open and silent until dropped, like
    /// a live job that has not printed anything yet.
    #[derive(Clone, Default)]
    pub struct FakeLogStream {
        inner: Arc<Mutex<FakeStreamState>>,
    }

    impl FakeLogStream {
        pub fn new() -> Self {
            Self::default()
        }

        fn queue(&self, job_id: JobId, script: Script) {
            self.inner.lock().scripts.entry(job_id).or_default().push_back(script);
        }

        /// Next subscription yields `frames`, then ends.
        pub fn script(&self, job_id: impl Into<JobId>, frames: Vec<Item>) {
            self.queue(job_id.into(), Script { open_error: None, frames, tail: Tail::End });
        }

        /// Next subscription yields `frames`, then stays open until dropped.
        pub fn script_held(&self, job_id: impl Into<JobId>, frames: Vec<Item>) {
            self.queue(job_id.into(), Script { open_error: None, frames, tail: Tail::Hold });
        }

        /// Next subscription is fed by the returned `LiveFeed`.
        pub fn live(&self, job_id: impl Into<JobId>) -> LiveFeed {
            let (tx, rx) = mpsc::unbounded_channel();
            self.queue(
                job_id.into(),
                Script { open_error: None, frames: Vec::new(), tail: Tail::Live(rx) },
            );
            LiveFeed { tx }
        }

        /// Next subscription fails to open.
        pub fn fail_open(&self, job_id: impl Into<JobId>, error: StreamError) {
            self.queue(
                job_id.into(),
                Script { open_error: Some(error), frames: Vec::new(), tail: Tail::End },
            );
        }

        pub fn requests(&self) -> Vec<StreamRequest> {
            self.inner.lock().requests.clone()
        }

        pub fn request_count(&self, job_id: &str) -> usize {
            self.inner.lock().requests.iter().filter(|r| r.job_id == job_id).count()
        }

        /// Subscriptions currently open (stream not yet dropped).
        pub fn open_streams(&self) -> usize {
            self.inner.lock().open
        }

        /// Highest number of simultaneously open subscriptions seen.
        pub fn max_open_streams(&self) -> usize {
            self.inner.lock().max_open
        }
    }

    #[async_trait]
    impl LogStreamAdapter for FakeLogStream {
        async fn stream_logs(&self, request: StreamRequest) -> Result<LogStream, StreamError> {
            let script = {
                let mut inner = self.inner.lock();
                inner.requests.push(request.clone());
                inner.scripts.get_mut(&request.job_id).and_then(|q| q.pop_front())
            };
            let script = script.unwrap_or(Script {
                open_error: None,
                frames: Vec::new(),
                tail: Tail::Hold,
            });
            if let Some(error) = script.open_error {
                return Err(error);
            }

            {
                let mut inner = self.inner.lock();
                inner.open += 1;
                inner.max_open = inner.max_open.max(inner.open);
            }
            let guard = OpenGuard(Arc::clone(&self.inner));

            let head = stream::iter(script.frames);
            let tail: LogStream = match script.tail {
                Tail::End => stream::empty().boxed(),
                Tail::Hold => stream::pending().boxed(),
                Tail::Live(rx) => stream::unfold(rx, |mut rx| async move {
                    rx.recv().await.map(|item| (item, rx))
                })
                .boxed(),
            };
            Ok(head
                .chain(tail)
                .map(move |item| {
                    let _held = &guard;
                    item
                })
                .boxed())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeLogStream, LiveFeed};

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
