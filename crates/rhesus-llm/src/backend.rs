//! LLM backend trait and concrete implementations.
//!
//! Backends:
//!   GeminiBackend             Google Gemini API (gemini-2.5-flash, …), supports
//!                             JSON response mode and Google Search grounding
//!   OpenAiCompatibleBackend   any OpenAI-compatible endpoint (OpenAI, LMStudio,
//!                             TogetherAI, Groq, OpenRouter, vLLM, …)
//!   OllamaBackend             local Ollama through its OpenAI-compatible API

use std::time::Duration;

use async_trait::async_trait;
use rhesus_common::sandbox::SandboxClient;
use rhesus_common::RhesusError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-2.5-flash";

/// Grounded generations routinely take longer than the bioinformatics calls.
const LLM_TIMEOUT: Duration = Duration::from_secs(120);

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Backend unavailable: {0}")]
    Unavailable(String),
    #[error("API error [{status}]: {message}")]
    ApiError { status: u16, message: String },
    #[error("Empty response from model")]
    EmptyResponse,
    #[error("Request blocked: {0}")]
    Blocked(#[from] RhesusError),
}

impl LlmError {
    /// Errors worth retrying on a different backend.
    pub fn is_transport(&self) -> bool {
        match self {
            Self::Http(_) | Self::Unavailable(_) => true,
            Self::ApiError { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

// ── Request / Response ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,   // "system" | "user" | "assistant"
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: "system".to_string(), content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: "assistant".to_string(), content: content.into() }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LlmRequest {
    pub messages: Vec<Message>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    /// Ask the model for a bare JSON object.
    #[serde(default)]
    pub json_mode: bool,
    /// Ground the answer with a web search tool.
    #[serde(default)]
    pub web_search: bool,
}

impl LlmRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages, ..Default::default() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub content: String,
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

// ── Trait ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait LlmBackend: Send + Sync {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError>;
    fn model_id(&self) -> &str;
    fn is_local(&self) -> bool;
    fn max_output_tokens(&self) -> usize;
    fn supports_web_search(&self) -> bool { false }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn parse_openai_response(json: &serde_json::Value, fallback_model: &str) -> LlmResponse {
    LlmResponse {
        content: json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or("")
            .to_string(),
        model: json["model"]
            .as_str()
            .unwrap_or(fallback_model)
            .to_string(),
        prompt_tokens:     json["usage"]["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        completion_tokens: json["usage"]["completion_tokens"].as_u64().unwrap_or(0) as u32,
    }
}

async fn check_response_status(resp: reqwest::Response) -> Result<serde_json::Value, LlmError> {
    let status = resp.status().as_u16();
    let text = resp.text().await?;
    let body: serde_json::Value = match serde_json::from_str(&text) {
        Ok(v) => v,
        Err(e) if status < 400 => return Err(e.into()),
        Err(_) => serde_json::Value::Null,
    };
    if status >= 400 {
        let msg = body["error"]["message"]
            .as_str()
            .or_else(|| body["message"].as_str())
            .map(String::from)
            .unwrap_or_else(|| if text.is_empty() { "unknown API error".to_string() } else { text });
        return Err(LlmError::ApiError { status, message: msg });
    }
    Ok(body)
}

/// A sandboxed client that also admits the host of `base_url`.
fn sandbox_for(base_url: &str) -> Result<SandboxClient, LlmError> {
    let mut client = SandboxClient::with_timeout(LLM_TIMEOUT)?;
    client.allow_url(base_url)?;
    Ok(client)
}

fn openai_body(req: &LlmRequest, default_model: &str, default_max: usize) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model":       req.model.as_deref().unwrap_or(default_model),
        "messages":    req.messages,
        "max_tokens":  req.max_tokens.unwrap_or(default_max as u32),
        "temperature": req.temperature.unwrap_or(0.2),
    });
    if req.json_mode {
        body["response_format"] = serde_json::json!({ "type": "json_object" });
    }
    body
}

// ── 1. Google Gemini ──────────────────────────────────────────────────────────

pub struct GeminiBackend {
    pub model: String,
    pub base_url: String,
    api_key: String,
    client: SandboxClient,
}

impl GeminiBackend {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        Ok(Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: GEMINI_BASE_URL.to_string(),
            client: sandbox_for(GEMINI_BASE_URL)?,
        })
    }

    /// Point at a proxy or mirror; its host joins the allowlist.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Result<Self, LlmError> {
        self.base_url = base_url.into();
        self.client.allow_url(&self.base_url)?;
        Ok(self)
    }

    fn build_body(&self, req: &LlmRequest) -> serde_json::Value {
        // System message → systemInstruction; assistant → "model" role
        let system_text = req.messages.iter()
            .filter(|m| m.role == "system")
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n\n");

        let contents: Vec<serde_json::Value> = req.messages.iter()
            .filter(|m| m.role != "system")
            .map(|m| {
                let role = if m.role == "assistant" { "model" } else { "user" };
                serde_json::json!({
                    "role": role,
                    "parts": [{ "text": m.content }]
                })
            })
            .collect();

        let mut generation_config = serde_json::json!({
            "maxOutputTokens": req.max_tokens.unwrap_or(self.max_output_tokens() as u32),
            "temperature":     req.temperature.unwrap_or(0.2),
        });
        // Gemini rejects a JSON mime type together with tools
        if req.json_mode && !req.web_search {
            generation_config["responseMimeType"] = serde_json::json!("application/json");
        }

        let mut body = serde_json::json!({
            "contents": contents,
            "generationConfig": generation_config,
        });
        if !system_text.is_empty() {
            body["systemInstruction"] = serde_json::json!({
                "parts": [{ "text": system_text }]
            });
        }
        if req.web_search {
            body["tools"] = serde_json::json!([{ "google_search": {} }]);
        }
        body
    }
}

#[async_trait]
impl LlmBackend for GeminiBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let model = req.model.clone().unwrap_or_else(|| self.model.clone());
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            model
        );
        let body = self.build_body(&req);

        let resp = self.client
            .post(&url)?
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;
        let json = check_response_status(resp).await?;

        // Grounded answers may be split over several parts
        let content = json["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| {
                parts.iter()
                    .filter_map(|p| p["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if content.is_empty() {
            return Err(LlmError::EmptyResponse);
        }

        Ok(LlmResponse {
            content,
            model,
            prompt_tokens: json["usageMetadata"]["promptTokenCount"].as_u64().unwrap_or(0) as u32,
            completion_tokens: json["usageMetadata"]["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
        })
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
    fn max_output_tokens(&self) -> usize { 8_192 }
    fn supports_web_search(&self) -> bool { true }
}

// ── 2. OpenAI-Compatible (OpenAI, LMStudio, TogetherAI, Groq, OpenRouter, vLLM, …) ──

pub struct OpenAiCompatibleBackend {
    pub base_url: String,
    pub model: String,
    api_key: Option<String>,
    client: SandboxClient,
}

impl OpenAiCompatibleBackend {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, LlmError> {
        let base_url = base_url.into();
        Ok(Self {
            client: sandbox_for(&base_url)?,
            base_url,
            model: model.into(),
            api_key,
        })
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_key {
            Some(k) => req.bearer_auth(k),
            None    => req,
        }
    }
}

#[async_trait]
impl LlmBackend for OpenAiCompatibleBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        if req.web_search {
            return Err(LlmError::Unavailable(format!(
                "{} does not support web search grounding", self.model
            )));
        }
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = openai_body(&req, &self.model, self.max_output_tokens());
        let resp = self.auth(self.client.post(&url)?).json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { false }
    fn max_output_tokens(&self) -> usize { 8_192 }
}

// ── 3. Ollama (local) ─────────────────────────────────────────────────────────

pub struct OllamaBackend {
    pub base_url: String,
    pub model: String,
    client: SandboxClient,
}

impl OllamaBackend {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Result<Self, LlmError> {
        let base_url = base_url.into();
        Ok(Self { client: sandbox_for(&base_url)?, base_url, model: model.into() })
    }
}

#[async_trait]
impl LlmBackend for OllamaBackend {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        if req.web_search {
            return Err(LlmError::Unavailable("Ollama does not support web search grounding".to_string()));
        }
        let url = format!("{}/v1/chat/completions", self.base_url.trim_end_matches('/'));
        let body = openai_body(&req, &self.model, self.max_output_tokens());
        let resp = self.client.post(&url)?.json(&body).send().await?;
        let json = check_response_status(resp).await?;
        Ok(parse_openai_response(&json, &self.model))
    }

    fn model_id(&self) -> &str { &self.model }
    fn is_local(&self) -> bool { true }
    fn max_output_tokens(&self) -> usize { 4_096 }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
