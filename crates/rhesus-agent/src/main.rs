//! Dr. Rhesus: conversational bioinformatics assistant.
//! Entry point for the server binary.

mod config;

use std::sync::Arc;

use rhesus_bioapi::{EbiClient, JobService, SequenceLookup, StructureFetcher, UniProtClient};
use rhesus_chat::{ChatConfig, ChatService};
use rhesus_llm::backend::{GeminiBackend, OllamaBackend, OpenAiCompatibleBackend};
use rhesus_llm::{LlmBackend, LlmRouter, RoutingPolicy};
use rhesus_store::Store;
use rhesus_web::router::build_router;
use rhesus_web::state::AppState;
use secrecy::{ExposeSecret, SecretString};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Configured key, else the first environment variable that is set.
fn api_key(configured: Option<&SecretString>, env_vars: &[&str]) -> Option<SecretString> {
    configured
        .map(|k| k.expose_secret().trim().to_string())
        .filter(|k| !k.is_empty())
        .or_else(|| {
            env_vars
                .iter()
                .filter_map(|var| std::env::var(var).ok())
                .find(|k| !k.trim().is_empty())
        })
        .map(SecretString::from)
}

fn build_llm_backends(config: &config::Config) -> anyhow::Result<LlmRouter> {
    let policy = RoutingPolicy {
        default_backend:  config.llm.default_backend.clone(),
        fallback_backend: config.llm.fallback_backend.clone(),
    };
    let mut router = LlmRouter::new(policy);

    // Gemini is the default backend, so it is registered from the environment
    // even without an [llm.gemini] section.
    let gemini = config.llm.gemini.as_ref();
    match api_key(gemini.and_then(|g| g.api_key.as_ref()), &["RHESUS_GEMINI_API_KEY", "GEMINI_API_KEY"]) {
        Some(key) => {
            let model = gemini
                .map(|g| g.model.clone())
                .unwrap_or_else(|| rhesus_llm::backend::DEFAULT_GEMINI_MODEL.to_string());
            let mut backend = GeminiBackend::new(key.expose_secret(), model)?;
            if let Some(base_url) = gemini.and_then(|g| g.base_url.clone()) {
                backend = backend.with_base_url(base_url)?;
            }
            router.register_backend("gemini", Arc::new(backend));
        }
        None if config.llm.default_backend == "gemini" || gemini.is_some() => {
            warn!("Gemini API key not found (set llm.gemini.api_key, RHESUS_GEMINI_API_KEY or GEMINI_API_KEY)");
        }
        None => {}
    }

    if let Some(ref compat) = config.llm.openai_compatible {
        let key = api_key(compat.api_key.as_ref(), &["RHESUS_OPENAI_API_KEY"]);
        router.register_backend(
            "openai_compatible",
            Arc::new(OpenAiCompatibleBackend::new(
                compat.base_url.clone(),
                compat.model.clone(),
                key.map(|k| k.expose_secret().to_string()),
            )?),
        );
    }

    if let Some(ref ollama) = config.llm.ollama {
        router.register_backend(
            "ollama",
            Arc::new(OllamaBackend::new(ollama.base_url.clone(), ollama.model.clone())?),
        );
    }

    if router.registered_backends().is_empty() {
        warn!("No LLM backends configured! Chat replies will report the assistant as unavailable.");
    }
    Ok(router)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Could not listen for Ctrl+C: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::DEFAULT_LOG_FILTER)),
        )
        .init();

    info!("Dr. Rhesus starting up...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = config::Config::load()?;

    let llm = build_llm_backends(&config)?;
    info!(backends = ?llm.registered_backends(), default = %config.llm.default_backend, "LLM router ready");
    let llm: Arc<dyn LlmBackend> = Arc::new(llm);

    let jobs: Arc<dyn JobService> = Arc::new(EbiClient::new(config.ebi.clone())?);
    let lookup: Arc<dyn SequenceLookup> = Arc::new(UniProtClient::new(config.uniprot.base_url.clone())?);
    let structures = Arc::new(StructureFetcher::with_sources(
        &config.structure.cache_dir,
        &config.structure.rcsb_base_url,
        &config.structure.alphafold_base_url,
    )?);

    let store = Store::open(&config.storage.data_dir).await?;
    info!(dir = %config.storage.data_dir.display(), "Store opened");

    let chat = ChatService::new(
        ChatConfig {
            poll: config.polling.to_poll_config(),
            share_base_url: config.server.public_url.clone(),
            ..ChatConfig::default()
        },
        llm,
        jobs.clone(),
        lookup.clone(),
        store.clone(),
    );

    let mut state = AppState::new(chat.clone(), jobs, lookup, structures, store);
    if let Some(ref dir) = config.server.static_dir {
        info!(dir = %dir.display(), "Serving browser client");
        state = state.with_static_dir(dir);
    }
    let router = build_router(state);

    let bind_addr = std::env::var("RHESUS_BIND").unwrap_or_else(|_| config.server.bind.clone());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("Listening on http://{}", bind_addr);
    info!("Dr. Rhesus ready. Press Ctrl+C to stop.");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    chat.stop_all().await;
    info!("Dr. Rhesus stopped");
    Ok(())
}
