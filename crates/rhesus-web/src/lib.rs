//! rhesus-web: HTTP API for Dr. Rhesus.
//! Provides:
//!   - EBI job proxies (BLAST, alignment, phylogenetic tree) and UniProt lookup
//!   - PDB / AlphaFold structure downloads
//!   - Chat, project, pipeline and snapshot endpoints
//!   - Settings export / import / reset
//!   - Server-sent events for live chat updates

pub mod error;
pub mod handlers;
pub mod router;
pub mod sse;
pub mod state;
