// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Properties that must hold for any interleaving of binds, snapshots,
//! stop requests and session reports.

use crate::prelude::*;
use proptest::prelude::*;
use proptest::test_runner::TestCaseError;
use sw_core::test_support::strategies::arb_job_status;
use sw_core::JobSnapshot;
use tokio::sync::mpsc;

const JOBS: u8 = 3;

#[derive(Debug, Clone)]
enum Op {
    Bind(u8),
    Unbind,
    Snapshot(u8, JobStatus),
    StopStream,
    /// Let sessions run, then apply whatever reports are ready.
    Settle,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0..JOBS).prop_map(Op::Bind),
        1 => Just(Op::Unbind),
        6 => (0..JOBS, arb_job_status()).prop_map(|(job, status)| Op::Snapshot(job, status)),
        1 => Just(Op::StopStream),
        3 => Just(Op::Settle),
    ]
}

fn job(n: u8) -> JobId {
    JobId::new(format!("job-{n}"))
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap()
}

/// Every subscription replays two lines tagged with its job, then stays open.
fn probe() -> OverlapProbe {
    let inner = FakeLogStream::new();
    for n in 0..JOBS {
        let tag = job(n).to_string();
        for _ in 0..64 {
            inner.script_held(job(n), vec![Ok(out(0, &tag)), Ok(out(1, &tag))]);
        }
    }
    OverlapProbe::new(inner)
}

async fn let_sessions_run() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

async fn check_interleaving(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let probe = probe();
    let (reports_tx, mut reports) = mpsc::unbounded_channel();
    let mut coord = StreamCoordinator::new(probe.clone(), FakeClock::new(), reports_tx);

    for op in ops {
        match op {
            Op::Bind(n) => {
                coord.bind(Some(job(n)));
            }
            Op::Unbind => {
                coord.bind(None);
            }
            Op::Snapshot(n, status) => {
                coord.on_snapshot(JobSnapshot::new(job(n), status));
            }
            Op::StopStream => {
                coord.stop_stream();
            }
            Op::Settle => {
                let_sessions_run().await;
                while let Ok(report) = reports.try_recv() {
                    coord.on_session_report(report);
                }
            }
        }
        let_sessions_run().await;

        prop_assert!(probe.overlaps().is_empty(), "overlapping subscriptions: {:?}", probe.overlaps());
        let view = coord.view();
        if let (Some(job_id), Some(buffer)) = (&view.job_id, &view.buffer) {
            let lines = buffer.snapshot();
            prop_assert!(lines.iter().all(|l| l.content == job_id.as_str()), "foreign lines in {job_id}: {lines:?}");
            prop_assert!(lines.windows(2).all(|w| w[0].sequence_num <= w[1].sequence_num));
        }
        let active = view.session.as_ref().is_some_and(|s| s.is_active());
        prop_assert_eq!(coord.active_session().is_some(), active);
    }

    for handle in coord.shutdown() {
        handle.await.unwrap();
    }
    prop_assert_eq!(probe.inner.open_streams(), 0);
    Ok(())
}

async fn check_backfill_once(statuses: Vec<(JobStatus, bool)>) -> Result<(), TestCaseError> {
    let stream = FakeLogStream::new();
    for _ in 0..statuses.len() {
        stream.script("job-1", vec![Ok(out(0, "history")), Ok(completed(0))]);
    }
    let (reports_tx, mut reports) = mpsc::unbounded_channel();
    let mut coord = StreamCoordinator::new(stream, FakeClock::new(), reports_tx);
    coord.bind(Some(JobId::new("job-1")));

    let mut backfills = 0;
    for (status, settle) in statuses {
        if let Decision::Started { backfill: true, .. } = coord.on_snapshot(JobSnapshot::new("job-1", status)) {
            backfills += 1;
        }
        if settle {
            let_sessions_run().await;
            while let Ok(report) = reports.try_recv() {
                coord.on_session_report(report);
            }
        }
    }
    prop_assert!(backfills <= 1, "{backfills} backfills for one binding");
    for handle in coord.shutdown() {
        handle.await.unwrap();
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn single_flight_and_no_cross_job_leakage(ops in prop::collection::vec(arb_op(), 1..40)) {
        runtime().block_on(check_interleaving(ops))?;
    }

    #[test]
    fn terminal_history_is_backfilled_at_most_once(
        statuses in prop::collection::vec((arb_job_status(), any::<bool>()), 1..30),
    ) {
        runtime().block_on(check_backfill_once(statuses))?;
    }
}
