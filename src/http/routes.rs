//! The axum route table: `<task_name>`, `jobs/submit|status|result|cancel`,
//! `status`, `metrics`.
//!
//! Grounded on `router_handle_request` in the original `router.c` for the
//! route set and status codes, and on the teacher's preference for a thin
//! routing layer that defers everything domain-specific to `core`.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use tokio::sync::oneshot;
use tracing::instrument;

use crate::builders::JobServer;
use crate::core::{DispatchError, JobStatus, ReplySink};
use crate::http::models::{
    JobCancelResponse, JobIdQuery, JobResultResponse, JobStatusResponse, JobSubmitQuery,
    JobSubmitResponse, StatusResponse, TaskParams,
};
use crate::util::RequestId;

enum ReplyMessage {
    Success(String),
    Error(u16, String),
}

struct OneshotReplySink(oneshot::Sender<ReplyMessage>);

impl ReplySink for OneshotReplySink {
    fn success(self: Box<Self>, body: String) {
        let _ = self.0.send(ReplyMessage::Success(body));
    }

    fn error(self: Box<Self>, status: u16, message: String) {
        let _ = self.0.send(ReplyMessage::Error(status, message));
    }
}

/// Build the application router over a shared [`JobServer`].
pub fn build_router(server: Arc<JobServer>) -> Router {
    Router::new()
        .route("/status", get(status_handler))
        .route("/metrics", get(metrics_handler))
        .route("/jobs/submit", get(jobs_submit))
        .route("/jobs/status", get(jobs_status))
        .route("/jobs/result", get(jobs_result))
        .route("/jobs/cancel", get(jobs_cancel))
        .route("/:task_name", get(run_task))
        .with_state(server)
}

// `dispatch_sync`/`submit_job` can block the calling thread, either on the
// work queue's wait budget or (for an inline handler) for the full handler
// duration. Both are run via `spawn_blocking` so a slow task never stalls
// the tokio runtime's async worker threads, matching the teacher's
// `spawn_blocking`-around-`Condvar::wait` isolation in `worker_pool/native.rs`.

#[instrument(skip(server, params))]
async fn run_task(
    State(server): State<Arc<JobServer>>,
    Path(task_name): Path<String>,
    Query(params): Query<TaskParams>,
) -> Response {
    let (tx, rx) = oneshot::channel();
    let sink: Box<dyn ReplySink> = Box::new(OneshotReplySink(tx));

    let dispatch_result = tokio::task::spawn_blocking(move || {
        server
            .dispatcher
            .dispatch_sync(RequestId::new(), &task_name, params, sink)
    })
    .await;

    match dispatch_result {
        Ok(Ok(())) => {}
        Ok(Err(err)) => return err.into_response(),
        Err(_) => {
            return DispatchError::HandlerFailure("dispatch task panicked".to_string())
                .into_response()
        }
    }

    match rx.await {
        Ok(ReplyMessage::Success(body)) => (axum::http::StatusCode::OK, body).into_response(),
        Ok(ReplyMessage::Error(status, message)) => {
            let status = axum::http::StatusCode::from_u16(status)
                .unwrap_or(axum::http::StatusCode::INTERNAL_SERVER_ERROR);
            (status, message).into_response()
        }
        Err(_) => DispatchError::HandlerFailure("worker dropped reply channel".to_string())
            .into_response(),
    }
}

async fn jobs_submit(
    State(server): State<Arc<JobServer>>,
    Query(query): Query<JobSubmitQuery>,
    Query(mut params): Query<HashMap<String, String>>,
) -> Response {
    params.remove("task");
    let task_name = query.task;
    let submit_result = tokio::task::spawn_blocking(move || {
        server
            .dispatcher
            .submit_job(RequestId::new(), &task_name, params)
    })
    .await;

    match submit_result {
        Ok(Ok(job_id)) => Json(JobSubmitResponse::new(job_id)).into_response(),
        Ok(Err(err)) => err.into_response(),
        Err(_) => {
            DispatchError::HandlerFailure("submit task panicked".to_string()).into_response()
        }
    }
}

async fn jobs_status(
    State(server): State<Arc<JobServer>>,
    Query(query): Query<JobIdQuery>,
) -> Response {
    match server.dispatcher.job_status(query.id) {
        Ok(record) => {
            let recent_avg_exec_us = server.metrics.recent_avg_exec_us(&record.task_name);
            Json(JobStatusResponse::new(record, recent_avg_exec_us)).into_response()
        }
        Err(err) => err.into_response(),
    }
}

async fn jobs_result(
    State(server): State<Arc<JobServer>>,
    Query(query): Query<JobIdQuery>,
) -> Response {
    match server.dispatcher.job_result(query.id) {
        Ok(record) => match record.status {
            JobStatus::Done => {
                (axum::http::StatusCode::OK, record.result.unwrap_or_default()).into_response()
            }
            JobStatus::Error => {
                Json(JobResultResponse { error: record.error.unwrap_or_default() }).into_response()
            }
            JobStatus::Queued | JobStatus::Running | JobStatus::Canceled => {
                DispatchError::NotFound.into_response()
            }
        },
        Err(err) => err.into_response(),
    }
}

async fn jobs_cancel(
    State(server): State<Arc<JobServer>>,
    Query(query): Query<JobIdQuery>,
) -> Response {
    match server.dispatcher.cancel_job(query.id) {
        Ok(true) => Json(JobCancelResponse { status: "canceled" }).into_response(),
        Ok(false) => Json(JobCancelResponse { status: "not_cancelable" }).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn status_handler(State(server): State<Arc<JobServer>>) -> Response {
    let snapshot = server.metrics_snapshot();
    Json(StatusResponse {
        status: "running",
        pid: std::process::id(),
        uptime_seconds: snapshot.uptime_seconds,
        connections_served: snapshot.total_requests,
        requests_ok: snapshot.total_requests.saturating_sub(snapshot.total_errors),
        requests_error: snapshot.total_errors,
    })
    .into_response()
}

async fn metrics_handler(State(server): State<Arc<JobServer>>) -> Response {
    Json(server.metrics_snapshot()).into_response()
}
