//! In-process application with scripted upstream services.
#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use rhesus_bioapi::{JobInput, JobKind, JobOutput, JobPoll, JobService, SequenceLookup, StructureFetcher};
use rhesus_chat::{ChatConfig, ChatService};
use rhesus_common::{BlastHit, Result, RhesusError, UniProtEntry};
use rhesus_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};
use rhesus_store::Store;
use rhesus_web::router::build_router;
use rhesus_web::state::AppState;
use serde_json::Value;
use tower::ServiceExt;

/// Always answers with the same prose.
pub struct EchoLlm;

#[async_trait]
impl LlmBackend for EchoLlm {
    async fn complete(&self, req: LlmRequest) -> std::result::Result<LlmResponse, LlmError> {
        let prompt = req.messages.last().map(|m| m.content.clone()).unwrap_or_default();
        let content = serde_json::json!({ "prose": format!("You said: {}", prompt) }).to_string();
        Ok(LlmResponse { content, model: "echo".into(), prompt_tokens: 0, completion_tokens: 0 })
    }

    fn model_id(&self) -> &str {
        "echo"
    }

    fn is_local(&self) -> bool {
        true
    }

    fn max_output_tokens(&self) -> usize {
        1024
    }
}

/// Job ids encode the outcome: `done-*` finished, `fail-*` failed, anything else running.
pub struct FakeEbi;

#[async_trait]
impl JobService for FakeEbi {
    async fn submit(&self, kind: JobKind, _input: &JobInput) -> Result<String> {
        Ok(format!("{}-R1", kind.message_prefix()))
    }

    async fn check(&self, kind: JobKind, job_id: &str) -> Result<JobPoll> {
        if job_id.starts_with("boom") {
            return Err(RhesusError::upstream("EBI", "Failed to get job status. EBI API responded with status 500"));
        }
        if job_id.starts_with("fail") {
            return Ok(JobPoll::Failed("Job failed with status: ERROR".into()));
        }
        if !job_id.starts_with("done") {
            return Ok(JobPoll::Running);
        }
        Ok(JobPoll::Finished(match kind {
            JobKind::Blast => JobOutput::BlastHits(vec![BlastHit {
                accession: "P01308".into(),
                description: "Insulin".into(),
                score: 226.5,
                e_value: "2e-130".into(),
                identity: 1.0,
            }]),
            JobKind::Msa => JobOutput::Alignment("CLUSTAL".into()),
            JobKind::PhyloTree => JobOutput::Tree("(seq1,seq2);".into()),
        }))
    }
}

pub struct FakeUniProt;

#[async_trait]
impl SequenceLookup for FakeUniProt {
    async fn fetch_sequence(&self, protein_name: &str) -> Result<UniProtEntry> {
        match protein_name.trim() {
            "" => Err(RhesusError::InvalidInput("A valid protein name is required.".into())),
            "insulin" => Ok(UniProtEntry {
                accession: "P01308".into(),
                protein_name: "Insulin".into(),
                organism_name: "Homo sapiens".into(),
                sequence: "MALWMRLLPL".into(),
            }),
            other => Err(RhesusError::NotFound(format!("No reviewed UniProt entry found for \"{}\".", other))),
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Store,
}

/// The structure cache in `cache_dir` is never refreshed from the network by these tests.
pub fn test_app(cache_dir: &Path) -> TestApp {
    let store = Store::in_memory();
    let jobs: Arc<dyn JobService> = Arc::new(FakeEbi);
    let lookup: Arc<dyn SequenceLookup> = Arc::new(FakeUniProt);
    let chat = ChatService::new(ChatConfig::default(), Arc::new(EchoLlm), jobs.clone(), lookup.clone(), store.clone());
    let structures = Arc::new(StructureFetcher::new(cache_dir).unwrap());
    let state = AppState::new(chat, jobs, lookup, structures, store.clone());
    TestApp { router: build_router(state), store }
}

impl TestApp {
    pub async fn request(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = self.raw(method, uri, body).await;
        let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).unwrap() };
        (status, json)
    }

    pub async fn raw(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(json) => builder
                .header("content-type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    pub async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.request(Method::GET, uri, None).await
    }

    pub async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.request(Method::POST, uri, Some(body)).await
    }
}
