//! Core domain types shared by the chat, storage, and web layers.
//! Field names follow the JSON documents the browser client persists,
//! so stored histories and projects stay interchangeable.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Generate a prefixed identifier such as `cb-3f2a…`.
pub fn new_id(prefix: &str) -> String {
    format!("{}-{}", prefix, Uuid::new_v4().simple())
}

// ---------------------------------------------------------------------------
// Content blocks & tool calls
// ---------------------------------------------------------------------------

/// Kind of a content block or model tool call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ContentType {
    Text,
    PdbViewer,
    BlastResult,
    PubmedSummary,
    Summary,
    ChatSession,
    RunBlastp,
    BlastProgress,
    SequenceViewer,
    FetchUniprotSequence,
    RunMsa,
    MsaProgress,
    MsaResult,
    RunPhylogeneticTree,
    PhyloTreeProgress,
    PhyloTreeResult,
    AlphaFoldViewer,
    /// A type this build does not know about; kept verbatim.
    Other(String),
}

impl ContentType {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Text => "text",
            Self::PdbViewer => "pdb_viewer",
            Self::BlastResult => "blast_result",
            Self::PubmedSummary => "pubmed_summary",
            Self::Summary => "summary",
            Self::ChatSession => "chat_session",
            Self::RunBlastp => "run_blastp",
            Self::BlastProgress => "blast_progress",
            Self::SequenceViewer => "sequence_viewer",
            Self::FetchUniprotSequence => "fetch_uniprot_sequence",
            Self::RunMsa => "run_msa",
            Self::MsaProgress => "msa_progress",
            Self::MsaResult => "msa_result",
            Self::RunPhylogeneticTree => "run_phylogenetic_tree",
            Self::PhyloTreeProgress => "phylo_tree_progress",
            Self::PhyloTreeResult => "phylo_tree_result",
            Self::AlphaFoldViewer => "alpha_fold_viewer",
            Self::Other(s) => s.as_str(),
        }
    }

    /// Progress blocks track a running EBI job and are never pinned or shared.
    pub fn is_progress(&self) -> bool {
        matches!(self, Self::BlastProgress | Self::MsaProgress | Self::PhyloTreeProgress)
    }

    /// Tool calls that trigger work on the server instead of being displayed.
    pub fn is_executable(&self) -> bool {
        matches!(
            self,
            Self::RunBlastp | Self::FetchUniprotSequence | Self::RunMsa | Self::RunPhylogeneticTree
        )
    }
}

impl From<String> for ContentType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "text" => Self::Text,
            "pdb_viewer" => Self::PdbViewer,
            "blast_result" => Self::BlastResult,
            "pubmed_summary" => Self::PubmedSummary,
            "summary" => Self::Summary,
            "chat_session" => Self::ChatSession,
            "run_blastp" => Self::RunBlastp,
            "blast_progress" => Self::BlastProgress,
            "sequence_viewer" => Self::SequenceViewer,
            "fetch_uniprot_sequence" => Self::FetchUniprotSequence,
            "run_msa" => Self::RunMsa,
            "msa_progress" => Self::MsaProgress,
            "msa_result" => Self::MsaResult,
            "run_phylogenetic_tree" => Self::RunPhylogeneticTree,
            "phylo_tree_progress" => Self::PhyloTreeProgress,
            "phylo_tree_result" => Self::PhyloTreeResult,
            "alpha_fold_viewer" => Self::AlphaFoldViewer,
            _ => Self::Other(s),
        }
    }
}

impl From<ContentType> for String {
    fn from(t: ContentType) -> Self {
        match t {
            ContentType::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for ContentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub id: String,
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ContentBlock {
    pub fn new(content_type: ContentType, data: serde_json::Value) -> Self {
        Self { id: new_id("cb"), content_type, data }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(rename = "type")]
    pub content_type: ContentType,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl ToolCall {
    pub fn new(content_type: ContentType, data: serde_json::Value) -> Self {
        Self { content_type, data }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub label: String,
    pub prompt: String,
}

/// Models sometimes emit `null` for optional arrays; treat it as absent.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The JSON object the assistant is instructed to answer with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AiResponse {
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "String::is_empty")]
    pub prose: String,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, deserialize_with = "null_as_default", skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

impl AiResponse {
    pub fn prose(text: impl Into<String>) -> Self {
        Self { prose: text.into(), ..Default::default() }
    }

    pub fn with_tool_call(mut self, call: ToolCall) -> Self {
        self.tool_calls.push(call);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.prose.is_empty() && self.tool_calls.is_empty()
    }

    /// Serialise into the raw content string stored on a message.
    pub fn to_raw(&self) -> String {
        // A struct of strings and JSON values cannot fail to serialise.
        serde_json::to_string(self).unwrap_or_default()
    }
}

// ---------------------------------------------------------------------------
// Chat messages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageAuthor {
    User,
    Rhesus,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyTo {
    pub id: String,
    pub author: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub author: MessageAuthor,
    #[serde(default)]
    pub raw_content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyTo>,
}

impl ChatMessage {
    pub fn new(id: impl Into<String>, author: MessageAuthor, raw_content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            author,
            raw_content: raw_content.into(),
            actions: Vec::new(),
            reply_to: None,
        }
    }

    pub fn user(raw_content: impl Into<String>) -> Self {
        Self::new(new_id("user"), MessageAuthor::User, raw_content)
    }

    pub fn system(raw_content: impl Into<String>) -> Self {
        Self::new(new_id("sys"), MessageAuthor::System, raw_content)
    }

    pub fn rhesus(prefix: &str, raw_content: impl Into<String>) -> Self {
        Self::new(new_id(prefix), MessageAuthor::Rhesus, raw_content)
    }

    /// Parse the raw content as a structured response, if it is one.
    pub fn structured(&self) -> Option<AiResponse> {
        serde_json::from_str(&self.raw_content).ok()
    }

    /// Quote for a reply: users are "you", everyone else is the assistant.
    pub fn as_reply_target(&self) -> ReplyTo {
        let author = match self.author {
            MessageAuthor::User => "you",
            _ => "Dr. Rhesus",
        };
        ReplyTo { id: self.id.clone(), author: author.to_string(), content: self.raw_content.clone() }
    }
}

// ---------------------------------------------------------------------------
// Bioinformatics results
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlastHit {
    #[serde(default)]
    pub accession: String,
    pub description: String,
    pub score: f64,
    pub e_value: String,
    /// Fraction of identical residues, 0..=1.
    pub identity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UniProtEntry {
    pub accession: String,
    pub protein_name: String,
    pub organism_name: String,
    pub sequence: String,
}

// ---------------------------------------------------------------------------
// Projects, pipelines, snapshots
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub last_modified: DateTime<Utc>,
    #[serde(default)]
    pub content_blocks: Vec<ContentBlock>,
}

impl Project {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: new_id("proj"),
            title: title.into(),
            description: description.into(),
            last_modified: Utc::now(),
            content_blocks: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStep {
    pub id: String,
    pub prompt: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub steps: Vec<PipelineStep>,
}

impl Pipeline {
    /// Placeholder substituted with the run target in every step prompt.
    pub const TARGET_PLACEHOLDER: &'static str = "{protein_name}";

    pub fn new(name: impl Into<String>, description: impl Into<String>, prompts: &[&str]) -> Self {
        Self {
            id: new_id("pipe"),
            name: name.into(),
            description: description.into(),
            steps: prompts
                .iter()
                .map(|p| PipelineStep { id: new_id("step"), prompt: p.to_string() })
                .collect(),
        }
    }

    /// Step prompts with the target substituted, in run order.
    pub fn render_prompts(&self, target: &str) -> Vec<String> {
        self.steps
            .iter()
            .map(|s| s.prompt.replace(Self::TARGET_PLACEHOLDER, target))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub content_block: ContentBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecentChatKind {
    General,
    Project,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentChat {
    /// `general` or a project id.
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub kind: RecentChatKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiStatus {
    #[default]
    Idle,
    Healthy,
    Error,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_content_type_wire_names() {
        let call: ToolCall = serde_json::from_value(json!({
            "type": "run_blastp",
            "data": { "sequence": "MTEYKLVVVG" }
        }))
        .unwrap();
        assert_eq!(call.content_type, ContentType::RunBlastp);
        assert!(call.content_type.is_executable());

        let out = serde_json::to_value(&call).unwrap();
        assert_eq!(out["type"], "run_blastp");
    }

    #[test]
    fn test_unknown_content_type_is_preserved() {
        let call: ToolCall = serde_json::from_value(json!({ "type": "heatmap", "data": {} })).unwrap();
        assert_eq!(call.content_type, ContentType::Other("heatmap".to_string()));
        assert_eq!(serde_json::to_value(&call).unwrap()["type"], "heatmap");
    }

    #[test]
    fn test_ai_response_omits_empty_fields() {
        let raw = AiResponse::default()
            .with_tool_call(ToolCall::new(ContentType::BlastProgress, json!({ "status": "submitting" })))
            .to_raw();
        assert_eq!(raw, r#"{"tool_calls":[{"type":"blast_progress","data":{"status":"submitting"}}]}"#);
    }

    #[test]
    fn test_ai_response_accepts_null_arrays() {
        let r: AiResponse =
            serde_json::from_str(r#"{"prose":"Hi","tool_calls":null,"actions":null}"#).unwrap();
        assert_eq!(r.prose, "Hi");
        assert!(r.tool_calls.is_empty());
    }

    #[test]
    fn test_chat_message_uses_camel_case() {
        let msg = ChatMessage::new("1", MessageAuthor::User, "hello");
        let v = serde_json::to_value(&msg).unwrap();
        assert_eq!(v["rawContent"], "hello");
        assert_eq!(v["author"], "user");
        assert!(v.get("replyTo").is_none());
    }

    #[test]
    fn test_reply_target_author_label() {
        let user = ChatMessage::new("1", MessageAuthor::User, "q");
        let bot = ChatMessage::new("2", MessageAuthor::Rhesus, "a");
        assert_eq!(user.as_reply_target().author, "you");
        assert_eq!(bot.as_reply_target().author, "Dr. Rhesus");
    }

    #[test]
    fn test_pipeline_substitutes_every_placeholder() {
        let p = Pipeline::new(
            "Structure then BLAST",
            "",
            &["Find the best structure for {protein_name}", "Compare {protein_name} with {protein_name} homologs"],
        );
        let prompts = p.render_prompts("human insulin");
        assert_eq!(prompts[0], "Find the best structure for human insulin");
        assert_eq!(prompts[1], "Compare human insulin with human insulin homologs");
    }

    #[test]
    fn test_new_id_prefix() {
        let id = new_id("snap");
        assert!(id.starts_with("snap-"));
        assert_ne!(id, new_id("snap"));
    }
}
