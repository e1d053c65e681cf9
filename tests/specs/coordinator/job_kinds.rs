// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The same coordinator drives any job kind that supplies its two adapters.
//!
//! Stack jobs use the fakes; deployment jobs below speak raw JSON text, the
//! way a websocket or server-sent-events transport would hand it over.

use crate::prelude::*;
use crate::prelude::assert_eq;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Default)]
struct DeploymentState {
    records: HashMap<JobId, String>,
    messages: HashMap<JobId, Vec<String>>,
}

/// Deployment job service: one client serving both status and logs.
#[derive(Clone, Default)]
struct DeploymentService(Arc<Mutex<DeploymentState>>);

impl DeploymentService {
    fn set_record(&self, job_id: &str, json: &str) {
        self.0.lock().records.insert(JobId::new(job_id), json.to_string());
    }

    fn set_messages(&self, job_id: &str, messages: &[&str]) {
        self.0.lock().messages.insert(JobId::new(job_id), messages.iter().map(|m| m.to_string()).collect());
    }
}

#[async_trait]
impl JobQueryAdapter for DeploymentService {
    async fn get_job(&self, job_id: &JobId) -> Result<JobRecord, QueryError> {
        let text = self.0.lock().records.get(job_id).cloned();
        match text {
            Some(text) => JobRecord::from_json(&text),
            None => Err(QueryError::NotFound(job_id.clone())),
        }
    }
}

#[async_trait]
impl LogStreamAdapter for DeploymentService {
    async fn stream_logs(&self, request: StreamRequest) -> Result<LogStream, StreamError> {
        let messages = self.0.lock().messages.get(&request.job_id).cloned().unwrap_or_default();
        Ok(sw_adapters::text_frames(futures_util::stream::iter(messages.into_iter().map(Ok))))
    }
}

#[tokio::test(start_paused = true)]
async fn deployment_jobs_stream_through_json_adapters() {
    let service = DeploymentService::default();
    service.set_record("deploy-7", r#"{"status":"in_progress","output":null}"#);
    service.set_messages(
        "deploy-7",
        &[
            r#"{"sequenceNum":0,"content":"pulling image","streamType":"stdout","status":"streaming"}"#,
            "",
            r#"{"sequenceNum":1,"content":"healthcheck failed, retrying","streamType":"stderr","status":"streaming"}"#,
            r#"{"sequenceNum":2,"content":"Stream completed","status":"completed"}"#,
        ],
    );
    let handle = spawn(service.clone(), service.clone());

    handle.bind("deploy-7").unwrap();
    let mut view = handle.subscribe();
    view.wait_for(|v| v.loaded_historical).await.unwrap();

    let lines = handle.view().lines();
    assert_eq!(contents(&lines), vec!["pulling image", "healthcheck failed, retrying", "Stream completed"]);
    assert_eq!(lines[1].stream_type, sw_core::StreamType::Stderr);
    assert_eq!(lines[2].stream_type, sw_core::StreamType::Stdout);
    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn undecodable_frame_ends_the_session_as_failed() {
    let service = DeploymentService::default();
    service.set_record("deploy-8", r#"{"status":"in_progress"}"#);
    service.set_messages(
        "deploy-8",
        &[r#"{"sequenceNum":0,"content":"pulling image","status":"streaming"}"#, "<html>502</html>"],
    );
    let (events_tx, mut events) = tokio::sync::mpsc::channel(16);
    let handle = CoordinatorRuntime::new(config(), service.clone(), service, FakeClock::new())
        .with_events(events_tx)
        .spawn();

    handle.bind("deploy-8").unwrap();
    let outcome = loop {
        if let CoordinatorEvent::SessionEnded { outcome, .. } = events.recv().await.unwrap() {
            break outcome;
        }
    };
    assert!(matches!(outcome, SessionOutcome::Failed(StreamError::Decode(_))));
    assert!(!handle.view().loaded_historical);
    assert_eq!(contents(&handle.view().lines()), vec!["pulling image"]);
    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn unknown_status_is_a_skipped_fetch() {
    let service = DeploymentService::default();
    service.set_record("deploy-9", r#"{"status":"queued"}"#);
    let handle = spawn(service.clone(), service.clone());

    handle.bind("deploy-9").unwrap();
    let mut view = handle.subscribe();
    view.wait_for(|v| v.unavailable).await.unwrap();

    service.set_record("deploy-9", r#"{"status":"pending"}"#);
    view.wait_for(|v| v.snapshot.is_some()).await.unwrap();
    assert_eq!(handle.view().availability(), LogAvailability::Waiting);
    handle.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn stack_and_deployment_coordinators_run_side_by_side() {
    let query = FakeJobQuery::new();
    query.set("stack-1", JobRecord::new(JobStatus::Success));
    let stream = FakeLogStream::new();
    stream.script("stack-1", vec![Ok(out(0, "stack history")), Ok(completed(0))]);
    let stacks = spawn(query, stream);

    let service = DeploymentService::default();
    service.set_record("deploy-1", r#"{"status":"failed"}"#);
    service.set_messages("deploy-1", &[r#"{"sequenceNum":0,"content":"deploy history","status":"completed"}"#]);
    let deployments = spawn(service.clone(), service);

    stacks.bind("stack-1").unwrap();
    deployments.bind("deploy-1").unwrap();
    let (mut a, mut b) = (stacks.subscribe(), deployments.subscribe());
    a.wait_for(|v| v.loaded_historical && !v.lines().is_empty()).await.unwrap();
    b.wait_for(|v| v.loaded_historical && !v.lines().is_empty()).await.unwrap();

    assert_eq!(contents(&stacks.view().lines())[0], "stack history");
    assert_eq!(contents(&deployments.view().lines()), vec!["deploy history"]);
    stacks.shutdown().await.unwrap();
    deployments.shutdown().await.unwrap();
}
