//! Axum router: maps all URL paths to handlers.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{
    services::ServeDir,
    cors::CorsLayer,
    trace::TraceLayer,
    compression::CompressionLayer,
};
use std::sync::Arc;
use crate::error::method_not_allowed;
use crate::state::{AppState, SharedState};
use crate::handlers::{chat, jobs, pipelines, projects, snapshots, structures, system, uniprot};
use crate::sse::sse_handler;

/// Build and return the full Axum router.
pub fn build_router(state: AppState) -> Router {
    let static_dir = state.static_dir.clone();
    let shared: SharedState = Arc::new(state);

    let router = Router::new()
        // EBI / UniProt proxies
        .route("/api/blastp",  post(jobs::blastp).fallback(method_not_allowed))
        .route("/api/msa",     post(jobs::msa).fallback(method_not_allowed))
        .route("/api/phylo",   post(jobs::phylo).fallback(method_not_allowed))
        .route("/api/uniprot", post(uniprot::fetch_sequence).fallback(method_not_allowed))

        // Structures
        .route("/api/structures/pdb/{id}",       get(structures::pdb))
        .route("/api/structures/alphafold/{id}", get(structures::alphafold))

        // Chat
        .route("/api/chat/{key}",      get(chat::history).post(chat::send))
        .route("/api/chat/{key}/new",  post(chat::new_chat))
        .route("/api/chat/{key}/save", post(chat::save_to_project))
        .route("/api/chat/{key}/pipelines/{pipeline_id}/run", post(chat::run_pipeline))

        // Projects
        .route("/api/projects",      get(projects::list).post(projects::create))
        .route("/api/projects/{id}", get(projects::get).patch(projects::update).delete(projects::delete))
        .route("/api/projects/{id}/blocks",            post(projects::add_block))
        .route("/api/projects/{id}/blocks/{block_id}", axum::routing::delete(projects::remove_block))

        // Pipelines
        .route("/api/pipelines",      get(pipelines::list).post(pipelines::create))
        .route("/api/pipelines/{id}", get(pipelines::get).put(pipelines::update).delete(pipelines::delete))

        // Snapshots
        .route("/api/snapshots",      post(snapshots::create))
        .route("/api/snapshots/{id}", get(snapshots::get))

        // System
        .route("/api/status",          get(system::status))
        .route("/api/recent-chats",    get(system::recent_chats))
        .route("/api/settings/export", get(system::export_settings))
        .route("/api/settings/import", post(system::import_settings))
        .route("/api/settings/reset",  post(system::reset_settings))

        // SSE streaming
        .route("/api/events", get(sse_handler));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        // Middleware
        .layer(CorsLayer::permissive())
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(shared)
}
