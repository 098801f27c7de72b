//! Scripted collaborators for driving `ChatService` without the network.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rhesus_bioapi::{JobInput, JobKind, JobOutput, JobPoll, JobService, PollConfig, SequenceLookup};
use rhesus_chat::{ChatConfig, ChatService, HistoryKey};
use rhesus_common::{BlastHit, ChatMessage, Result, RhesusError, UniProtEntry};
use rhesus_llm::{LlmBackend, LlmError, LlmRequest, LlmResponse};
use rhesus_store::Store;
use tokio::sync::{Notify, Semaphore};

pub const DEFAULT_REPLY: &str = r#"{"prose":"Done."}"#;

/// Answers from a queue, then with `DEFAULT_REPLY`.
#[derive(Default)]
pub struct ScriptedLlm {
    replies: Mutex<VecDeque<std::result::Result<String, LlmError>>>,
    requests: Mutex<Vec<LlmRequest>>,
    web_search: bool,
}

impl ScriptedLlm {
    pub fn new(replies: Vec<std::result::Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies.into()), ..Default::default() })
    }

    pub fn with_web_search(replies: Vec<std::result::Result<String, LlmError>>) -> Arc<Self> {
        Arc::new(Self { replies: Mutex::new(replies.into()), web_search: true, ..Default::default() })
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Text of the last user message of every request, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.requests()
            .iter()
            .filter_map(|r| r.messages.last().map(|m| m.content.clone()))
            .collect()
    }
}

#[async_trait]
impl LlmBackend for ScriptedLlm {
    async fn complete(&self, req: LlmRequest) -> std::result::Result<LlmResponse, LlmError> {
        self.requests.lock().unwrap().push(req);
        let reply = self.replies.lock().unwrap().pop_front().unwrap_or_else(|| Ok(DEFAULT_REPLY.to_string()))?;
        Ok(LlmResponse { content: reply, model: "scripted".into(), prompt_tokens: 0, completion_tokens: 0 })
    }

    fn model_id(&self) -> &str {
        "scripted"
    }

    fn is_local(&self) -> bool {
        true
    }

    fn max_output_tokens(&self) -> usize {
        1024
    }

    fn supports_web_search(&self) -> bool {
        self.web_search
    }
}

/// Holds every request until `release` is called, then answers with `DEFAULT_REPLY`.
pub struct GatedLlm {
    entered: Notify,
    gate: Semaphore,
}

impl GatedLlm {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { entered: Notify::new(), gate: Semaphore::new(0) })
    }

    /// Resolves once a request is waiting at the gate.
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }
}

#[async_trait]
impl LlmBackend for GatedLlm {
    async fn complete(&self, _req: LlmRequest) -> std::result::Result<LlmResponse, LlmError> {
        self.entered.notify_one();
        let _permit = self.gate.acquire().await.map_err(|e| LlmError::Unavailable(e.to_string()))?;
        Ok(LlmResponse { content: DEFAULT_REPLY.to_string(), model: "gated".into(), prompt_tokens: 0, completion_tokens: 0 })
    }

    fn model_id(&self) -> &str {
        "gated"
    }

    fn is_local(&self) -> bool {
        true
    }

    fn max_output_tokens(&self) -> usize {
        1024
    }
}

/// Reports `Running` for `running_for` checks, then a canned result for the kind.
pub struct ScriptedJobs {
    running_for: usize,
    pub submits: AtomicUsize,
    pub checks: AtomicUsize,
}

impl ScriptedJobs {
    pub fn finishing_after(running_for: usize) -> Arc<Self> {
        Arc::new(Self { running_for, submits: AtomicUsize::new(0), checks: AtomicUsize::new(0) })
    }

    pub fn never_finishing() -> Arc<Self> {
        Self::finishing_after(usize::MAX)
    }
}

pub fn insulin_hit() -> BlastHit {
    BlastHit {
        accession: "P01308".into(),
        description: "Insulin OS=Homo sapiens".into(),
        score: 226.5,
        e_value: "2e-130".into(),
        identity: 1.0,
    }
}

#[async_trait]
impl JobService for ScriptedJobs {
    async fn submit(&self, _kind: JobKind, _input: &JobInput) -> Result<String> {
        let n = self.submits.fetch_add(1, Ordering::SeqCst);
        Ok(format!("job-{}", n + 1))
    }

    async fn check(&self, kind: JobKind, _job_id: &str) -> Result<JobPoll> {
        if self.checks.fetch_add(1, Ordering::SeqCst) < self.running_for {
            return Ok(JobPoll::Running);
        }
        Ok(JobPoll::Finished(match kind {
            JobKind::Blast => JobOutput::BlastHits(vec![insulin_hit()]),
            JobKind::Msa => JobOutput::Alignment("CLUSTAL O(1.2.4) multiple sequence alignment".into()),
            JobKind::PhyloTree => JobOutput::Tree("(seq1:0.1,seq2:0.2);".into()),
        }))
    }
}

/// Knows human insulin and nothing else.
pub struct InsulinLookup;

pub fn insulin_entry() -> UniProtEntry {
    UniProtEntry {
        accession: "P01308".into(),
        protein_name: "Insulin".into(),
        organism_name: "Homo sapiens".into(),
        sequence: "MALWMRLLPLLALLALWGPDPAAA".into(),
    }
}

#[async_trait]
impl SequenceLookup for InsulinLookup {
    async fn fetch_sequence(&self, protein_name: &str) -> Result<UniProtEntry> {
        if protein_name.eq_ignore_ascii_case("insulin") {
            Ok(insulin_entry())
        } else {
            Err(RhesusError::NotFound(format!("No reviewed UniProt entry found for \"{}\".", protein_name)))
        }
    }
}

pub fn fast_config() -> ChatConfig {
    ChatConfig {
        poll: PollConfig { interval: Duration::from_millis(10), timeout: Duration::from_secs(5) },
        ..ChatConfig::default()
    }
}

pub fn chat_service(llm: Arc<ScriptedLlm>, jobs: Arc<ScriptedJobs>, store: Store) -> ChatService {
    ChatService::new(fast_config(), llm, jobs, Arc::new(InsulinLookup), store)
}

/// Poll the conversation until `done` holds.
pub async fn wait_for<F>(chat: &ChatService, key: &HistoryKey, done: F) -> Vec<ChatMessage>
where
    F: Fn(&[ChatMessage]) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let messages = chat.messages(key).await.unwrap();
            if done(&messages) {
                return messages;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("conversation never reached the expected state")
}
