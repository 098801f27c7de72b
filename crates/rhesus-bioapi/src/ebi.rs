//! EMBL-EBI Job Dispatcher REST client.
//!
//! Endpoints used (per tool):
//!   run:    POST {base}/{tool}/run
//!   status: GET  {base}/{tool}/status/{jobId}
//!   result: GET  {base}/{tool}/result/{jobId}/{resultType}

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::StatusCode;
use rhesus_common::sandbox::SandboxClient;
use rhesus_common::{Result, RhesusError};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::blast::{parse_blast_hits, DEFAULT_TOP_HITS};
use crate::jobs::{JobInput, JobKind, JobOutput, JobPoll, JobService};

pub const EBI_BASE_URL: &str = "https://www.ebi.ac.uk/Tools/services/rest";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EbiConfig {
    pub base_url: String,
    /// EBI rejects submissions without a contact address.
    pub email: String,
    pub blast_program: String,
    pub blast_database: String,
    pub top_hits: usize,
}

impl Default for EbiConfig {
    fn default() -> Self {
        Self {
            base_url: EBI_BASE_URL.to_string(),
            email: "rhesus@example.com".to_string(),
            blast_program: "blastp".to_string(),
            blast_database: "uniprotkb".to_string(),
            top_hits: DEFAULT_TOP_HITS,
        }
    }
}

/// Status text reported by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteStatus {
    Finished,
    Running,
    Failed(String),
}

impl RemoteStatus {
    pub fn parse(text: &str) -> Self {
        match text.trim() {
            "FINISHED" => Self::Finished,
            "RUNNING" | "PENDING" | "QUEUED" => Self::Running,
            other => Self::Failed(other.to_string()),
        }
    }
}

fn tool(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Blast => "ncbiblast",
        JobKind::Msa | JobKind::PhyloTree => "clustalo",
    }
}

fn result_type(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Blast => "json",
        JobKind::Msa => "aln-clustal_num",
        JobKind::PhyloTree => "phylotree",
    }
}

pub struct EbiClient {
    client: SandboxClient,
    config: EbiConfig,
}

impl EbiClient {
    pub fn new(config: EbiConfig) -> Result<Self> {
        Self::with_client(SandboxClient::new()?, config)
    }

    pub fn with_client(mut client: SandboxClient, config: EbiConfig) -> Result<Self> {
        client.allow_url(&config.base_url)?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &EbiConfig {
        &self.config
    }

    fn url(&self, kind: JobKind, tail: &str) -> String {
        format!("{}/{}/{}", self.config.base_url.trim_end_matches('/'), tool(kind), tail)
    }

    fn form(&self, kind: JobKind, input: &JobInput) -> Result<Vec<(&'static str, String)>> {
        let mut params = vec![("email", self.config.email.clone())];
        match kind {
            JobKind::Blast => {
                let JobInput::Sequence(seq) = input else {
                    return Err(RhesusError::InvalidInput("A valid protein sequence is required.".to_string()));
                };
                params.push(("program", self.config.blast_program.clone()));
                params.push(("database", self.config.blast_database.clone()));
                params.push(("stype", "protein".to_string()));
                params.push(("sequence", seq.clone()));
            }
            JobKind::Msa | JobKind::PhyloTree => {
                if !matches!(input, JobInput::Sequences(seqs) if seqs.len() >= 2) {
                    return Err(RhesusError::InvalidInput(
                        "At least two sequences are required for MSA.".to_string(),
                    ));
                }
                params.push(("stype", "protein".to_string()));
                params.push(("sequence", input.to_fasta()));
            }
        }
        Ok(params)
    }

    /// Submit a job and return its id.
    #[instrument(skip(self, input))]
    pub async fn submit_job(&self, kind: JobKind, input: &JobInput) -> Result<String> {
        let params = self.form(kind, input)?;
        let resp = self
            .client
            .post(&self.url(kind, "run"))?
            .header("Accept", "text/plain")
            .form(&params)
            .send()
            .await?;

        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            let detail = parse_ebi_error(&body).unwrap_or(body);
            warn!(%kind, status = status.as_u16(), detail = %detail, "EBI job submission rejected");
            return Err(RhesusError::upstream("EBI", format!("job submission failed: {}", detail.trim())));
        }

        let job_id = body.trim().to_string();
        if job_id.is_empty() {
            return Err(RhesusError::upstream("EBI", "job submission returned no job id"));
        }
        info!(%kind, job_id = %job_id, "EBI job submitted");
        Ok(job_id)
    }

    /// A 404 means the job is not visible yet and counts as running.
    #[instrument(skip(self))]
    pub async fn status(&self, kind: JobKind, job_id: &str) -> Result<RemoteStatus> {
        let resp = self
            .client
            .get(&self.url(kind, &format!("status/{}", job_id)))?
            .header("Accept", "text/plain")
            .send()
            .await?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            debug!(%kind, job_id, "Job not visible yet");
            return Ok(RemoteStatus::Running);
        }
        if !status.is_success() {
            return Err(RhesusError::upstream(
                "EBI",
                format!("Failed to get job status. EBI API responded with status {}", status.as_u16()),
            ));
        }
        Ok(RemoteStatus::parse(&resp.text().await?))
    }

    #[instrument(skip(self))]
    pub async fn result(&self, kind: JobKind, job_id: &str) -> Result<JobOutput> {
        let resp = self
            .client
            .get(&self.url(kind, &format!("result/{}/{}", job_id, result_type(kind))))?
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail = parse_ebi_error(&body).unwrap_or(body);
            return Err(RhesusError::upstream("EBI", format!("Failed to fetch results: {}", detail.trim())));
        }

        match kind {
            JobKind::Blast => {
                let json: serde_json::Value = resp.json().await?;
                let hits = parse_blast_hits(&json, self.config.top_hits);
                debug!(job_id, hits = hits.len(), "BLAST results parsed");
                Ok(JobOutput::BlastHits(hits))
            }
            JobKind::Msa => Ok(JobOutput::Alignment(resp.text().await?)),
            JobKind::PhyloTree => Ok(JobOutput::Tree(resp.text().await?)),
        }
    }
}

#[async_trait]
impl JobService for EbiClient {
    async fn submit(&self, kind: JobKind, input: &JobInput) -> Result<String> {
        self.submit_job(kind, input).await
    }

    async fn check(&self, kind: JobKind, job_id: &str) -> Result<JobPoll> {
        match self.status(kind, job_id).await? {
            RemoteStatus::Running => Ok(JobPoll::Running),
            RemoteStatus::Finished => Ok(JobPoll::Finished(self.result(kind, job_id).await?)),
            RemoteStatus::Failed(s) => Ok(JobPoll::Failed(format!("Job failed with status: {}", s))),
        }
    }
}

/// Extract `<error><description>…</description></error>` from a dispatcher error body.
pub fn parse_ebi_error(body: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut in_description = false;
    let mut description = String::new();
    let mut buf = Vec::new();
    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) if e.name().as_ref() == b"description" => in_description = true,
            Ok(Event::End(ref e)) if e.name().as_ref() == b"description" => in_description = false,
            Ok(Event::Text(ref e)) if in_description => {
                if !description.is_empty() {
                    description.push(' ');
                }
                description.push_str(&e.unescape().unwrap_or_default());
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    (!description.is_empty()).then_some(description)
}
