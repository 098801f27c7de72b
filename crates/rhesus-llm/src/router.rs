//! LLM router: picks the backend for each request.
//!
//! Requests go to the default backend. When it is missing or fails with a
//! transport-class error, the fallback backend gets one attempt.

use std::collections::HashMap;
use std::sync::Arc;
use async_trait::async_trait;
use crate::backend::{LlmBackend, LlmError, LlmRequest, LlmResponse};

#[derive(Debug, Clone)]
pub struct RoutingPolicy {
    /// Backend name used for every request.
    pub default_backend: String,
    /// Backend name tried when the default one is unavailable.
    pub fallback_backend: Option<String>,
}

impl Default for RoutingPolicy {
    fn default() -> Self {
        Self {
            default_backend: "gemini".to_string(),
            fallback_backend: None,
        }
    }
}

pub struct LlmRouter {
    backends: HashMap<String, Arc<dyn LlmBackend>>,
    policy: RoutingPolicy,
}

impl LlmRouter {
    pub fn new(policy: RoutingPolicy) -> Self {
        Self { backends: HashMap::new(), policy }
    }

    pub fn register_backend(&mut self, name: impl Into<String>, backend: Arc<dyn LlmBackend>) {
        self.backends.insert(name.into(), backend);
    }

    pub fn registered_backends(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.backends.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    pub fn policy(&self) -> &RoutingPolicy {
        &self.policy
    }

    fn default_backend(&self) -> Option<&Arc<dyn LlmBackend>> {
        self.backends.get(&self.policy.default_backend)
    }

    fn fallback_backend(&self) -> Option<&Arc<dyn LlmBackend>> {
        self.policy
            .fallback_backend
            .as_ref()
            .filter(|name| **name != self.policy.default_backend)
            .and_then(|name| self.backends.get(name))
    }

    /// Route a request to the default backend, falling back once on transport errors.
    pub async fn route(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        let primary = match self.default_backend() {
            Some(b) => b,
            None => {
                let fallback = self.fallback_backend().ok_or_else(|| {
                    LlmError::Unavailable(format!(
                        "Backend '{}' is not configured", self.policy.default_backend
                    ))
                })?;
                tracing::warn!(
                    default = %self.policy.default_backend,
                    model = fallback.model_id(),
                    "Default LLM backend missing, using fallback"
                );
                return fallback.complete(req).await;
            }
        };

        if req.web_search && !primary.supports_web_search() {
            if let Some(fb) = self.fallback_backend().filter(|b| b.supports_web_search()) {
                tracing::info!(model = fb.model_id(), "Routing web search request to fallback backend");
                return fb.complete(req).await;
            }
        }

        tracing::info!(
            model = primary.model_id(),
            is_local = primary.is_local(),
            web_search = req.web_search,
            "LLM request routed"
        );

        let retry = self.fallback_backend().map(|fb| (fb, req.clone()));
        match primary.complete(req).await {
            Err(e) if e.is_transport() => match retry {
                Some((fb, req)) => {
                    tracing::warn!(error = %e, model = fb.model_id(), "Default LLM backend failed, retrying on fallback");
                    fb.complete(req).await
                }
                None => Err(e),
            },
            other => other,
        }
    }
}

/// The router is itself a backend, so a chat session can sit on top of it.
#[async_trait]
impl LlmBackend for LlmRouter {
    async fn complete(&self, req: LlmRequest) -> Result<LlmResponse, LlmError> {
        self.route(req).await
    }

    fn model_id(&self) -> &str {
        self.default_backend()
            .or_else(|| self.fallback_backend())
            .map(|b| b.model_id())
            .unwrap_or("unconfigured")
    }

    fn is_local(&self) -> bool {
        self.default_backend().map(|b| b.is_local()).unwrap_or(false)
    }

    fn max_output_tokens(&self) -> usize {
        self.default_backend().map(|b| b.max_output_tokens()).unwrap_or(4_096)
    }

    fn supports_web_search(&self) -> bool {
        self.default_backend().map(|b| b.supports_web_search()).unwrap_or(false)
            || self.fallback_backend().map(|b| b.supports_web_search()).unwrap_or(false)
    }
}
