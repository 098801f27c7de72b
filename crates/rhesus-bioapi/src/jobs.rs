//! Long-running EBI job model.
//!
//! A job moves through
//!
//!   Submitting ─► Polling(job_id) ─► Finished(output)
//!                                └─► Failed(reason)
//!
//! and ends as `Interrupted` when polling is abandoned (shutdown, new chat,
//! or a history reloaded while a job was still in flight).
//!
//! The state is stored inside chat messages as a progress tool call, so it
//! must survive a round-trip through JSON.

use async_trait::async_trait;
use rhesus_common::{AiResponse, BlastHit, ContentType, Result, RhesusError, ToolCall};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    Blast,
    Msa,
    PhyloTree,
}

impl JobKind {
    pub const ALL: [JobKind; 3] = [JobKind::Blast, JobKind::Msa, JobKind::PhyloTree];

    pub fn label(self) -> &'static str {
        match self {
            Self::Blast => "BLAST",
            Self::Msa => "MSA",
            Self::PhyloTree => "phylogenetic tree",
        }
    }

    /// Tool call type the model uses to request this job.
    pub fn request_type(self) -> ContentType {
        match self {
            Self::Blast => ContentType::RunBlastp,
            Self::Msa => ContentType::RunMsa,
            Self::PhyloTree => ContentType::RunPhylogeneticTree,
        }
    }

    pub fn progress_type(self) -> ContentType {
        match self {
            Self::Blast => ContentType::BlastProgress,
            Self::Msa => ContentType::MsaProgress,
            Self::PhyloTree => ContentType::PhyloTreeProgress,
        }
    }

    pub fn result_type(self) -> ContentType {
        match self {
            Self::Blast => ContentType::BlastResult,
            Self::Msa => ContentType::MsaResult,
            Self::PhyloTree => ContentType::PhyloTreeResult,
        }
    }

    pub fn from_request_type(t: &ContentType) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.request_type() == *t)
    }

    pub fn from_progress_type(t: &ContentType) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.progress_type() == *t)
    }

    /// Message id prefix for progress messages of this kind.
    pub fn message_prefix(self) -> &'static str {
        match self {
            Self::Blast => "blast",
            Self::Msa => "msa",
            Self::PhyloTree => "phylo",
        }
    }

    pub fn completion_prose(self) -> &'static str {
        match self {
            Self::Blast => "The real-time BLASTp search is complete. Here are the top results.",
            Self::Msa => "The real-time Multiple Sequence Alignment is complete.",
            Self::PhyloTree => "The phylogenetic tree has been generated.",
        }
    }

    pub fn interrupted_message(self) -> &'static str {
        match self {
            Self::Blast => "Search was interrupted. Please try again.",
            Self::Msa => "Alignment was interrupted. Please try again.",
            Self::PhyloTree => "Tree generation was interrupted. Please try again.",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Input ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobInput {
    /// A single protein sequence (BLAST).
    Sequence(String),
    /// Two or more sequences (alignment, tree).
    Sequences(Vec<String>),
}

impl JobInput {
    pub fn sequence(seq: &str) -> Result<Self> {
        let seq = seq.trim();
        if seq.is_empty() {
            return Err(RhesusError::InvalidInput("A valid protein sequence is required.".to_string()));
        }
        Ok(Self::Sequence(seq.to_string()))
    }

    pub fn sequences<S: AsRef<str>>(seqs: &[S]) -> Result<Self> {
        let seqs: Vec<String> = seqs
            .iter()
            .map(|s| s.as_ref().trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if seqs.len() < 2 {
            return Err(RhesusError::InvalidInput(
                "At least two sequences are required for MSA.".to_string(),
            ));
        }
        Ok(Self::Sequences(seqs))
    }

    /// Build the input for `kind` from the `data` of a model tool call.
    pub fn from_tool_data(kind: JobKind, data: &Value) -> Result<Self> {
        match kind {
            JobKind::Blast => Self::sequence(data["sequence"].as_str().unwrap_or_default()),
            JobKind::Msa | JobKind::PhyloTree => {
                let seqs: Vec<&str> = data["sequences"]
                    .as_array()
                    .map(|a| a.iter().filter_map(Value::as_str).collect())
                    .unwrap_or_default();
                Self::sequences(seqs.as_slice())
            }
        }
    }

    /// Render as the `sequence` form field EBI expects.
    /// Multiple sequences become FASTA records `>seq1`, `>seq2`, … unless
    /// they already carry a header.
    pub fn to_fasta(&self) -> String {
        match self {
            Self::Sequence(s) => s.clone(),
            Self::Sequences(seqs) => seqs
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    if s.starts_with('>') {
                        s.clone()
                    } else {
                        format!(">seq{}\n{}", i + 1, s)
                    }
                })
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

// ── Output & polling outcome ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum JobOutput {
    BlastHits(Vec<BlastHit>),
    Alignment(String),
    Tree(String),
}

impl JobOutput {
    pub fn to_tool_call(&self) -> ToolCall {
        match self {
            Self::BlastHits(hits) => ToolCall::new(
                ContentType::BlastResult,
                serde_json::to_value(hits).unwrap_or_else(|_| json!([])),
            ),
            Self::Alignment(text) => ToolCall::new(ContentType::MsaResult, json!({ "result": text })),
            Self::Tree(text) => ToolCall::new(ContentType::PhyloTreeResult, json!({ "result": text })),
        }
    }
}

/// What a single status check reported.
#[derive(Debug, Clone, PartialEq)]
pub enum JobPoll {
    Running,
    Finished(JobOutput),
    Failed(String),
}

/// A remote service that runs jobs asynchronously.
#[async_trait]
pub trait JobService: Send + Sync {
    /// Submit a job and return the server-issued job id.
    async fn submit(&self, kind: JobKind, input: &JobInput) -> Result<String>;

    /// Check a job once; fetches the result when it has finished.
    async fn check(&self, kind: JobKind, job_id: &str) -> Result<JobPoll>;
}

// ── State ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobState {
    Submitting,
    Polling { job_id: String },
    Finished { job_id: String, output: JobOutput },
    Failed { job_id: Option<String>, reason: String },
    Interrupted { job_id: Option<String>, reason: String },
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished { .. } | Self::Failed { .. } | Self::Interrupted { .. })
    }

    pub fn job_id(&self) -> Option<&str> {
        match self {
            Self::Submitting => None,
            Self::Polling { job_id } | Self::Finished { job_id, .. } => Some(job_id),
            Self::Failed { job_id, .. } | Self::Interrupted { job_id, .. } => job_id.as_deref(),
        }
    }

    /// Render as the structured content of the job's chat message.
    pub fn to_response(&self, kind: JobKind) -> AiResponse {
        let progress = |status: &str, job_id: Option<&str>, error: Option<&str>| {
            let mut data = json!({ "status": status });
            if let Some(id) = job_id {
                data["jobId"] = json!(id);
            }
            if let Some(msg) = error {
                data["errorMessage"] = json!(msg);
            }
            AiResponse::default().with_tool_call(ToolCall::new(kind.progress_type(), data))
        };

        match self {
            Self::Submitting => progress("submitting", None, None),
            Self::Polling { job_id } => progress("polling", Some(job_id), None),
            Self::Failed { job_id, reason } => progress("error", job_id.as_deref(), Some(reason.as_str())),
            Self::Interrupted { job_id, reason } => progress("interrupted", job_id.as_deref(), Some(reason.as_str())),
            Self::Finished { output, .. } => {
                AiResponse::prose(kind.completion_prose()).with_tool_call(output.to_tool_call())
            }
        }
    }

    /// Recover a state from the `data` of a progress tool call.
    pub fn from_progress(data: &Value) -> Option<Self> {
        let job_id = data["jobId"].as_str().map(String::from);
        let reason = data["errorMessage"].as_str().unwrap_or_default().to_string();
        match data["status"].as_str()? {
            "submitting" => Some(Self::Submitting),
            "polling" => job_id.map(|job_id| Self::Polling { job_id }),
            "error" => Some(Self::Failed { job_id, reason }),
            "interrupted" => Some(Self::Interrupted { job_id, reason }),
            _ => None,
        }
    }

    /// The interrupted counterpart of a non-terminal state.
    pub fn interrupt(&self, kind: JobKind) -> Self {
        if self.is_terminal() {
            return self.clone();
        }
        Self::Interrupted {
            job_id: self.job_id().map(String::from),
            reason: kind.interrupted_message().to_string(),
        }
    }
}
