//! Stateful chat session: system instruction plus running history.

use std::sync::Arc;
use crate::backend::{LlmBackend, LlmError, LlmRequest, Message};
use crate::prompts::DR_RHESUS_SYSTEM_INSTRUCTION;

/// Upper bound on remembered turns (user + assistant messages).
const DEFAULT_MAX_HISTORY: usize = 40;

pub struct ChatSession {
    backend: Arc<dyn LlmBackend>,
    system_instruction: String,
    history: Vec<Message>,
    max_history: usize,
    json_mode: bool,
}

impl ChatSession {
    /// A Dr. Rhesus session answering in JSON mode.
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self {
            backend,
            system_instruction: DR_RHESUS_SYSTEM_INSTRUCTION.to_string(),
            history: Vec::new(),
            max_history: DEFAULT_MAX_HISTORY,
            json_mode: true,
        }
    }

    pub fn with_system_instruction(mut self, instruction: impl Into<String>) -> Self {
        self.system_instruction = instruction.into();
        self
    }

    pub fn with_max_history(mut self, max_history: usize) -> Self {
        self.max_history = max_history.max(2);
        self
    }

    pub fn history(&self) -> &[Message] {
        &self.history
    }

    pub fn reset(&mut self) {
        self.history.clear();
    }

    /// Send a user message and return the raw model text.
    /// History only grows when the exchange succeeds.
    pub async fn send_message(&mut self, text: &str) -> Result<String, LlmError> {
        let mut messages = Vec::with_capacity(self.history.len() + 2);
        messages.push(Message::system(self.system_instruction.clone()));
        messages.extend(self.history.iter().cloned());
        messages.push(Message::user(text));

        let mut req = LlmRequest::new(messages);
        req.json_mode = self.json_mode;

        let resp = self.backend.complete(req).await.map_err(|e| {
            tracing::error!(error = %e, "Error sending message to LLM");
            e
        })?;
        tracing::debug!(
            model = %resp.model,
            prompt_tokens = resp.prompt_tokens,
            completion_tokens = resp.completion_tokens,
            "LLM reply received"
        );

        self.history.push(Message::user(text));
        self.history.push(Message::assistant(resp.content.clone()));
        if self.history.len() > self.max_history {
            let excess = self.history.len() - self.max_history;
            self.history.drain(..excess);
        }
        Ok(resp.content)
    }

    /// One-shot grounded request; does not touch the session history.
    pub async fn send_message_with_search(&self, text: &str) -> Result<String, LlmError> {
        if !self.backend.supports_web_search() {
            return Err(LlmError::Unavailable(format!(
                "{} does not support web search", self.backend.model_id()
            )));
        }
        let mut req = LlmRequest::new(vec![
            Message::system(self.system_instruction.clone()),
            Message::user(text),
        ]);
        req.web_search = true;
        let resp = self.backend.complete(req).await.map_err(|e| {
            tracing::error!(error = %e, "Error sending message with search to LLM");
            e
        })?;
        Ok(resp.content)
    }
}

/// The reply shown in place of a model answer when the exchange failed.
/// Keeps the structured-response shape so clients render it like any other answer.
pub fn error_reply(err: &LlmError) -> String {
    serde_json::json!({
        "prose": format!("I'm sorry, I encountered an error: {}", err),
        "tool_calls": [],
        "actions": [],
    })
    .to_string()
}
