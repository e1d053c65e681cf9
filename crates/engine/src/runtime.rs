// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Async driver for a [`StreamCoordinator`].
//!
//! One task owns the coordinator. It runs the status poller for the bound
//! job, routes poll updates and session reports into the coordinator, and
//! publishes a [`CoordinatorView`] after every change. The display layer
//! talks to it only through [`CoordinatorHandle`].
//!
//! Each binding gets its own poller and poll channel. The previous receiver
//! is dropped on rebind, so an update still in flight for the old job never
//! reaches the coordinator.

use crate::config::CoordinatorConfig;
use crate::coordinator::StreamCoordinator;
use crate::error::CoordinatorError;
use crate::event::CoordinatorEvent;
use crate::poller::{PollUpdate, StatusPoller};
use crate::session::SessionReport;
use crate::view::CoordinatorView;
use sw_adapters::{JobQueryAdapter, LogStreamAdapter};
use sw_core::{Clock, JobId};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Buffered poll updates per binding
const POLL_CHANNEL_CAPACITY: usize = 16;

#[derive(Debug)]
enum Command {
    Bind(Option<JobId>),
    StopStream,
    Shutdown,
}

/// Builder for the coordinator task.
pub struct CoordinatorRuntime<Q, S, C> {
    config: CoordinatorConfig,
    query: Q,
    stream: S,
    clock: C,
    events: Option<mpsc::Sender<CoordinatorEvent>>,
}

impl<Q, S, C> CoordinatorRuntime<Q, S, C>
where
    Q: JobQueryAdapter,
    S: LogStreamAdapter,
    C: Clock,
{
    pub fn new(config: CoordinatorConfig, query: Q, stream: S, clock: C) -> Self {
        Self { config, query, stream, clock, events: None }
    }

    /// Deliver lifecycle events to `tx` (best-effort).
    pub fn with_events(mut self, tx: mpsc::Sender<CoordinatorEvent>) -> Self {
        self.events = Some(tx);
        self
    }

    /// Start the coordinator task. Must be called within a tokio runtime.
    pub fn spawn(self) -> CoordinatorHandle {
        let (report_tx, reports) = mpsc::unbounded_channel();
        let mut coord = StreamCoordinator::new(self.stream, self.clock, report_tx)
            .with_buffer_capacity(self.config.buffer_capacity);
        if let Some(tx) = self.events {
            coord = coord.with_events(tx);
        }

        let (commands, command_rx) = mpsc::unbounded_channel();
        let (view_tx, view) = watch::channel(CoordinatorView::default());
        let driver = Driver {
            coord,
            query: self.query,
            config: self.config,
            poller: None,
            stopped_pollers: Vec::new(),
            view_tx,
        };
        let task = tokio::spawn(driver.run(command_rx, reports));
        CoordinatorHandle { commands, view, task }
    }
}

/// Entry point for the display layer.
///
/// Dropping the handle without calling [`CoordinatorHandle::shutdown`]
/// still stops the task, but nothing waits for it.
pub struct CoordinatorHandle {
    commands: mpsc::UnboundedSender<Command>,
    view: watch::Receiver<CoordinatorView>,
    task: JoinHandle<()>,
}

impl CoordinatorHandle {
    /// Bind to a job. Any session for the previously bound job is cancelled
    /// before the new job is polled.
    pub fn bind(&self, job_id: impl Into<JobId>) -> Result<(), CoordinatorError> {
        self.send(Command::Bind(Some(job_id.into())))
    }

    pub fn unbind(&self) -> Result<(), CoordinatorError> {
        self.send(Command::Bind(None))
    }

    /// Cancel the active log session, if any, without unbinding.
    pub fn stop_stream(&self) -> Result<(), CoordinatorError> {
        self.send(Command::StopStream)
    }

    /// Latest published view.
    pub fn view(&self) -> CoordinatorView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<CoordinatorView> {
        self.view.clone()
    }

    /// Cancel everything and wait for the poller and session tasks to exit.
    pub async fn shutdown(self) -> Result<(), CoordinatorError> {
        // Already gone is fine; the join below reports how it ended.
        let _ = self.commands.send(Command::Shutdown);
        self.task.await?;
        Ok(())
    }

    fn send(&self, command: Command) -> Result<(), CoordinatorError> {
        self.commands.send(command).map_err(|_| CoordinatorError::Closed)
    }
}

struct PollerTask {
    job_id: JobId,
    /// `None` once the poller has exited on its own.
    rx: Option<mpsc::Receiver<PollUpdate>>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Driver<Q, S, C> {
    coord: StreamCoordinator<S, C>,
    query: Q,
    config: CoordinatorConfig,
    poller: Option<PollerTask>,
    stopped_pollers: Vec<JoinHandle<()>>,
    view_tx: watch::Sender<CoordinatorView>,
}

impl<Q, S, C> Driver<Q, S, C>
where
    Q: JobQueryAdapter,
    S: LogStreamAdapter,
    C: Clock,
{
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut reports: mpsc::UnboundedReceiver<SessionReport>,
    ) {
        tracing::debug!("coordinator runtime started");
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Bind(job_id)) => self.bind(job_id),
                    Some(Command::StopStream) => {
                        self.coord.stop_stream();
                    }
                    Some(Command::Shutdown) | None => break,
                },
                update = next_update(&mut self.poller) => match update {
                    Some(update) => self.on_poll(update),
                    None => self.poller_exited(),
                },
                Some(report) = reports.recv() => {
                    self.coord.on_session_report(report);
                }
            }
            self.publish();
        }
        self.shutdown().await;
    }

    fn bind(&mut self, job_id: Option<JobId>) {
        // The coordinator cancels the old session before anything else runs.
        if !self.coord.bind(job_id.clone()) {
            return;
        }
        self.stop_poller();
        if let Some(job_id) = job_id {
            self.start_poller(job_id);
        }
    }

    fn start_poller(&mut self, job_id: JobId) {
        let (tx, rx) = mpsc::channel(POLL_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let poller = StatusPoller::new(job_id.clone(), self.query.clone(), self.config.poll_interval)
            .stop_after_terminal(!self.config.poll_after_terminal);
        let handle = tokio::spawn(poller.run(tx, cancel.clone()));
        tracing::debug!(%job_id, interval_ms = self.config.poll_interval.as_millis() as u64, "status poller started");
        self.poller = Some(PollerTask { job_id, rx: Some(rx), cancel, handle });
    }

    fn stop_poller(&mut self) {
        if let Some(poller) = self.poller.take() {
            poller.cancel.cancel();
            tracing::debug!(job_id = %poller.job_id, "status poller stopped");
            self.stopped_pollers.retain(|h| !h.is_finished());
            self.stopped_pollers.push(poller.handle);
        }
    }

    fn poller_exited(&mut self) {
        if let Some(poller) = &mut self.poller {
            tracing::debug!(job_id = %poller.job_id, "status poller exited");
            poller.rx = None;
        }
    }

    fn on_poll(&mut self, update: PollUpdate) {
        match update {
            PollUpdate::Snapshot(snapshot) => {
                self.coord.on_snapshot(snapshot);
            }
            PollUpdate::Unavailable(job_id) => {
                self.coord.mark_status_unavailable(&job_id);
            }
        }
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.coord.view());
    }

    async fn shutdown(mut self) {
        let mut handles = self.coord.shutdown();
        self.stop_poller();
        handles.append(&mut self.stopped_pollers);
        self.publish();

        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "task failed during coordinator shutdown");
            }
        }
        tracing::info!("coordinator stopped");
    }
}

/// Next update from the current poller; pending while there is none.
async fn next_update(poller: &mut Option<PollerTask>) -> Option<PollUpdate> {
    match poller.as_mut().and_then(|p| p.rx.as_mut()) {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "runtime_tests.rs"]
mod tests;
