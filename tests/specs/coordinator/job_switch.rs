// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Switching the bound job mid-stream.

use crate::prelude::*;
use crate::prelude::assert_eq;

#[tokio::test(start_paused = true)]
async fn switch_cancels_old_session_before_new_lines() {
    let query = FakeJobQuery::new();
    query.set("job-1", JobRecord::new(JobStatus::InProgress));
    query.set("job-2", JobRecord::new(JobStatus::InProgress));
    let probe = OverlapProbe::new(FakeLogStream::new());
    let feed_1 = probe.inner.live("job-1");
    let feed_2 = probe.inner.live("job-2");
    let handle = spawn(query, probe.clone());

    handle.bind("job-1").unwrap();
    eventually(|| probe.inner.open_streams() == 1).await;
    feed_1.send(out(0, "job-1: Updating"));
    eventually(|| handle.view().lines().len() == 1).await;
    let job_1_buffer = handle.view().buffer.unwrap();

    handle.bind("job-2").unwrap();
    eventually(|| probe.inner.request_count("job-2") == 1).await;
    assert_eq!(probe.tokens(), vec![(JobId::new("job-1"), true), (JobId::new("job-2"), false)]);
    assert!(probe.overlaps().is_empty());

    // job-1's server keeps talking; none of it may land anywhere.
    feed_1.send(out(1, "job-1: late"));
    feed_2.send(out(0, "job-2: Previewing"));
    eventually(|| {
        let view = handle.view();
        view.job_id == Some(JobId::new("job-2")) && view.lines().len() == 1
    })
    .await;

    assert_eq!(contents(&handle.view().lines()), vec!["job-2: Previewing"]);
    assert_eq!(contents(&job_1_buffer.snapshot()), vec!["job-1: Updating"]);
    assert!(job_1_buffer.is_sealed());
    eventually(|| feed_1.is_closed()).await;
    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn rapid_switching_keeps_a_single_live_subscription() {
    let query = FakeJobQuery::new();
    for n in 0..5 {
        query.set(format!("job-{n}"), JobRecord::new(JobStatus::InProgress));
    }
    let probe = OverlapProbe::new(FakeLogStream::new());
    let handle = spawn(query, probe.clone());

    for round in 0..3 {
        for n in 0..5 {
            let job = format!("job-{n}");
            let before = probe.inner.request_count(&job);
            handle.bind(job.as_str()).unwrap();
            if (n + round) % 2 == 0 {
                eventually(|| probe.inner.request_count(&job) > before).await;
            }
        }
    }
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert!(probe.overlaps().is_empty(), "overlapping subscriptions: {:?}", probe.overlaps());
    let live: Vec<_> = probe.tokens().into_iter().filter(|(_, cancelled)| !cancelled).collect();
    assert_eq!(live, vec![(JobId::new("job-4"), false)]);
    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn returning_to_a_job_starts_a_fresh_buffer() {
    let query = FakeJobQuery::new();
    query.set("job-1", JobRecord::new(JobStatus::InProgress));
    query.set("job-2", JobRecord::new(JobStatus::Pending));
    let stream = FakeLogStream::new();
    stream.script_held("job-1", vec![Ok(out(0, "first visit"))]);
    stream.script_held("job-1", vec![Ok(out(0, "second visit"))]);
    let handle = spawn(query, stream.clone());

    handle.bind("job-1").unwrap();
    eventually(|| handle.view().lines().len() == 1).await;
    let first = handle.view().buffer.unwrap();

    handle.bind("job-2").unwrap();
    handle.bind("job-1").unwrap();
    eventually(|| stream.request_count("job-1") == 2 && handle.view().lines().len() == 1).await;

    assert!(!handle.view().buffer.unwrap().same_buffer(&first));
    assert_eq!(contents(&handle.view().lines()), vec!["second visit"]);
    handle.shutdown().await.unwrap();
}
