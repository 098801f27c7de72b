//! HTTP handlers for all API routes.

pub mod chat;
pub mod jobs;
pub mod pipelines;
pub mod projects;
pub mod snapshots;
pub mod structures;
pub mod system;
pub mod uniprot;
