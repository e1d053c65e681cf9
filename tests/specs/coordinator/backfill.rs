// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Jobs that are already terminal when first seen get their history once.

use crate::prelude::*;
use crate::prelude::assert_eq;

#[tokio::test(start_paused = true)]
async fn terminal_job_is_backfilled_exactly_once() {
    let query = FakeJobQuery::new();
    query.set("job-1", JobRecord::new(JobStatus::Success));
    let stream = FakeLogStream::new();
    stream.script(
        "job-1",
        vec![Ok(out(0, "Updating (prod)")), Ok(out(1, "Resources: 12 unchanged")), Ok(completed(1))],
    );
    let handle = spawn(query.clone(), stream.clone());

    handle.bind("job-1").unwrap();
    let mut view = handle.subscribe();
    view.wait_for(|v| v.session.as_ref().is_some_and(|s| s.backfill && !s.is_active())).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(query.call_count("job-1") >= 10);
    assert_eq!(stream.request_count("job-1"), 1);
    let view = handle.view();
    assert!(view.loaded_historical);
    assert_eq!(view.availability(), LogAvailability::Available);
    assert_eq!(contents(&view.lines()), vec!["Updating (prod)", "Resources: 12 unchanged", "Stream completed"]);
    handle.shutdown().await.unwrap();
}

#[tokio::test]
async fn backfill_is_attempted_once_even_when_it_fails() {
    let stream = FakeLogStream::new();
    stream.fail_open("job-1", StreamError::Transport("503".into()));
    let (reports_tx, mut reports) = tokio::sync::mpsc::unbounded_channel();
    let mut coord = StreamCoordinator::new(stream.clone(), FakeClock::new(), reports_tx);
    coord.bind(Some(JobId::new("job-1")));

    let snapshot = |status| sw_core::JobSnapshot::new("job-1", status);
    assert_eq!(coord.on_snapshot(snapshot(JobStatus::Failed)), Decision::Started { session: SessionId(1), backfill: true });
    let report = reports.recv().await.unwrap();
    assert!(report.outcome.is_failure());
    assert!(coord.on_session_report(report));

    for status in [JobStatus::Failed, JobStatus::Success, JobStatus::Failed] {
        assert!(!coord.on_snapshot(snapshot(status)).started());
    }
    assert_eq!(stream.request_count("job-1"), 1);
    assert_eq!(coord.view().availability(), LogAvailability::Unavailable);
}

#[tokio::test]
async fn blank_terminal_frame_counts_as_a_line() {
    let stream = FakeLogStream::new();
    stream.script("job-1", vec![Ok(StreamFrame::output(0, "").with_status("completed"))]);
    let (reports_tx, mut reports) = tokio::sync::mpsc::unbounded_channel();
    let mut coord = StreamCoordinator::new(stream, FakeClock::new(), reports_tx);
    coord.bind(Some(JobId::new("job-1")));

    coord.on_snapshot(sw_core::JobSnapshot::new("job-1", JobStatus::Success));
    let report = reports.recv().await.unwrap();
    assert_eq!(report.outcome, SessionOutcome::Completed);
    coord.on_session_report(report);

    // The terminal frame itself is a line, even when blank.
    assert_eq!(coord.view().lines().len(), 1);
    assert_eq!(coord.view().availability(), LogAvailability::Available);
}

#[tokio::test]
async fn stream_that_closes_silently_is_empty() {
    let stream = FakeLogStream::new();
    stream.script("job-1", vec![]);
    let (reports_tx, mut reports) = tokio::sync::mpsc::unbounded_channel();
    let mut coord = StreamCoordinator::new(stream, FakeClock::new(), reports_tx);
    coord.bind(Some(JobId::new("job-1")));

    coord.on_snapshot(sw_core::JobSnapshot::new("job-1", JobStatus::Success));
    let report = reports.recv().await.unwrap();
    assert_eq!(report.outcome, SessionOutcome::Exhausted);
    coord.on_session_report(report);

    assert_eq!(coord.view().availability(), LogAvailability::Empty);
    assert!(coord.loaded_historical(), "backfill attempt is still spent");
}
