//! rhesus-llm: LLM backend abstraction and the Dr. Rhesus chat session.
//!
//! - `backend`:  the `LlmBackend` trait with Gemini, OpenAI-compatible and Ollama implementations
//! - `router`:   default / fallback backend selection
//! - `session`:  a stateful chat carrying the system instruction and history
//! - `response`: lenient parsing of the structured JSON reply
//! - `prompts`:  system instruction and greetings

pub mod backend;
pub mod router;
pub mod session;
pub mod response;
pub mod prompts;

pub use backend::{LlmBackend, LlmError, LlmRequest, LlmResponse, Message};
pub use router::{LlmRouter, RoutingPolicy};
pub use session::{error_reply, ChatSession};
pub use response::parse_ai_response;
