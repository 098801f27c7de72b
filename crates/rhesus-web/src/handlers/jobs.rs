//! EBI job proxies.
//!
//! Each endpoint works in two modes:
//!   - body with input (`sequence` / `sequences`) -> submit, `202 {"jobId"}`
//!   - body with `jobId`                          -> one status check

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use rhesus_bioapi::{JobInput, JobKind, JobOutput, JobPoll};
use serde_json::{json, Value};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::state::SharedState;

pub async fn blastp(State(state): State<SharedState>, Json(body): Json<Value>) -> ApiResult<Response> {
    job_endpoint(&state, JobKind::Blast, &body).await
}

pub async fn msa(State(state): State<SharedState>, Json(body): Json<Value>) -> ApiResult<Response> {
    job_endpoint(&state, JobKind::Msa, &body).await
}

pub async fn phylo(State(state): State<SharedState>, Json(body): Json<Value>) -> ApiResult<Response> {
    job_endpoint(&state, JobKind::PhyloTree, &body).await
}

async fn job_endpoint(state: &SharedState, kind: JobKind, body: &Value) -> ApiResult<Response> {
    if let Some(job_id) = body["jobId"].as_str().filter(|id| !id.trim().is_empty()) {
        let poll = state.jobs.check(kind, job_id.trim()).await?;
        return Ok(Json(poll_body(poll)).into_response());
    }

    let field = match kind {
        JobKind::Blast => "sequence",
        JobKind::Msa | JobKind::PhyloTree => "sequences",
    };
    if body[field].is_null() {
        return Err(ApiError::bad_request(match kind {
            JobKind::Blast => "Request must include either a sequence or a jobId.",
            _ => "Request must include either sequences or a jobId.",
        }));
    }

    let input = JobInput::from_tool_data(kind, body)?;
    let job_id = state.jobs.submit(kind, &input).await?;
    info!(%kind, job_id = %job_id, "Job submitted via API");
    Ok((StatusCode::ACCEPTED, Json(json!({ "jobId": job_id }))).into_response())
}

fn poll_body(poll: JobPoll) -> Value {
    match poll {
        JobPoll::Running => json!({ "status": "RUNNING" }),
        JobPoll::Failed(message) => json!({ "status": "FAILURE", "message": message }),
        JobPoll::Finished(JobOutput::BlastHits(hits)) => json!({ "status": "FINISHED", "results": hits }),
        JobPoll::Finished(JobOutput::Alignment(text) | JobOutput::Tree(text)) => {
            json!({ "status": "FINISHED", "result": text })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_bodies() {
        assert_eq!(poll_body(JobPoll::Running), json!({ "status": "RUNNING" }));
        assert_eq!(
            poll_body(JobPoll::Finished(JobOutput::Tree("(A,B);".into()))),
            json!({ "status": "FINISHED", "result": "(A,B);" })
        );
        assert_eq!(
            poll_body(JobPoll::Finished(JobOutput::BlastHits(vec![]))),
            json!({ "status": "FINISHED", "results": [] })
        );
        assert_eq!(
            poll_body(JobPoll::Failed("Job failed with status: ERROR".into())),
            json!({ "status": "FAILURE", "message": "Job failed with status: ERROR" })
        );
    }
}
