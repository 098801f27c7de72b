//! A single open conversation and the helpers to restore one from storage.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use rhesus_bioapi::{JobKind, JobState};
use rhesus_common::{ChatMessage, MessageAuthor, ToolCall};
use rhesus_llm::prompts::random_greeting;
use rhesus_llm::ChatSession;
use rhesus_store::HistoryKey;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;

/// Id of the welcome message every new conversation starts with.
pub const GREETING_ID: &str = "initial";

pub fn greeting() -> ChatMessage {
    ChatMessage::new(GREETING_ID, MessageAuthor::Rhesus, random_greeting())
}

/// Mark jobs that were still in flight when `messages` were saved as interrupted.
///
/// Nothing polls those jobs anymore, so leaving them as `submitting` or
/// `polling` would show a spinner forever. Finished, failed and already
/// interrupted jobs are left alone. Returns whether anything changed.
pub fn rehydrate(messages: &mut [ChatMessage]) -> bool {
    let mut changed = false;
    for msg in messages.iter_mut() {
        let Some(mut resp) = msg.structured() else { continue };
        let mut touched = false;
        for call in resp.tool_calls.iter_mut() {
            touched |= interrupt_call(call);
        }
        if touched {
            msg.raw_content = resp.to_raw();
            changed = true;
        }
    }
    changed
}

fn interrupt_call(call: &mut ToolCall) -> bool {
    let Some(kind) = JobKind::from_progress_type(&call.content_type) else {
        return false;
    };
    let state = match JobState::from_progress(&call.data) {
        Some(state) if state.is_terminal() => return false,
        Some(state) => state.interrupt(kind),
        None => JobState::Interrupted {
            job_id: call.data["jobId"].as_str().map(String::from),
            reason: kind.interrupted_message().to_string(),
        },
    };
    if let Some(replacement) = state.to_response(kind).tool_calls.pop() {
        *call = replacement;
    }
    true
}

pub(crate) struct ConversationState {
    pub messages: Vec<ChatMessage>,
    /// Nothing is persisted until the first user message of a new chat.
    pub fresh: bool,
    /// Closed conversations (deleted project, reset) never write again.
    pub detached: bool,
}

impl ConversationState {
    pub fn persistent(&self) -> bool {
        !self.fresh && !self.detached
    }
}

pub(crate) struct PollerHandle {
    pub cancel: watch::Sender<bool>,
    pub task: JoinHandle<()>,
}

pub(crate) struct Conversation {
    pub key: HistoryKey,
    pub state: Mutex<ConversationState>,
    pub session: Mutex<ChatSession>,
    /// Keyed by the id of the progress message the job updates.
    pub pollers: Mutex<HashMap<String, PollerHandle>>,
    busy: AtomicBool,
}

impl Conversation {
    pub fn new(key: HistoryKey, messages: Vec<ChatMessage>, fresh: bool, session: ChatSession) -> Self {
        Self {
            key,
            state: Mutex::new(ConversationState { messages, fresh, detached: false }),
            session: Mutex::new(session),
            pollers: Mutex::new(HashMap::new()),
            busy: AtomicBool::new(false),
        }
    }

    /// Claim the conversation for one exchange; `None` while another is running.
    pub fn try_begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard(&self.busy))
    }

    pub async fn messages(&self) -> Vec<ChatMessage> {
        self.state.lock().await.messages.clone()
    }

    pub async fn find(&self, message_id: &str) -> Option<ChatMessage> {
        self.state
            .lock()
            .await
            .messages
            .iter()
            .find(|m| m.id == message_id)
            .cloned()
    }

    /// Signal every poller to stop and hand back their tasks.
    pub async fn cancel_pollers(&self) -> Vec<JoinHandle<()>> {
        let pollers: Vec<PollerHandle> = self.pollers.lock().await.drain().map(|(_, h)| h).collect();
        pollers
            .into_iter()
            .map(|h| {
                let _ = h.cancel.send(true);
                h.task
            })
            .collect()
    }
}

pub(crate) struct BusyGuard<'a>(&'a AtomicBool);

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rhesus_bioapi::JobOutput;
    use rhesus_common::AiResponse;
    use serde_json::json;

    fn progress(kind: JobKind, state: JobState) -> ChatMessage {
        ChatMessage::rhesus(kind.message_prefix(), state.to_response(kind).to_raw())
    }

    #[test]
    fn test_greeting() {
        let msg = greeting();
        assert_eq!(msg.id, GREETING_ID);
        assert_eq!(msg.author, MessageAuthor::Rhesus);
        assert!(!msg.raw_content.is_empty());
    }

    #[test]
    fn test_rehydrate_interrupts_in_flight_jobs() {
        let mut messages = vec![
            ChatMessage::user("run blast"),
            progress(JobKind::Blast, JobState::Polling { job_id: "ncbiblast-1".into() }),
            progress(JobKind::Msa, JobState::Submitting),
        ];
        assert!(rehydrate(&mut messages));

        let blast = messages[1].structured().unwrap();
        assert_eq!(
            blast.tool_calls[0].data,
            json!({
                "status": "interrupted",
                "jobId": "ncbiblast-1",
                "errorMessage": "Search was interrupted. Please try again.",
            })
        );
        let msa = messages[2].structured().unwrap();
        assert_eq!(msa.tool_calls[0].data["status"], "interrupted");
        assert!(msa.tool_calls[0].data.get("jobId").is_none());
        assert_eq!(messages[0].raw_content, "run blast");
    }

    #[test]
    fn test_rehydrate_keeps_terminal_states() {
        let failed = progress(
            JobKind::PhyloTree,
            JobState::Failed { job_id: Some("clustalo-1".into()), reason: "Job failed with status: ERROR".into() },
        );
        let finished = progress(
            JobKind::Msa,
            JobState::Finished { job_id: "clustalo-2".into(), output: JobOutput::Alignment("CLUSTAL".into()) },
        );
        let prose = ChatMessage::rhesus("rhesus", AiResponse::prose("hello").to_raw());
        let mut messages = vec![failed.clone(), finished.clone(), prose.clone()];

        assert!(!rehydrate(&mut messages));
        assert_eq!(messages, vec![failed, finished, prose]);
    }

    #[test]
    fn test_busy_guard_releases_on_drop() {
        let session = ChatSession::new(std::sync::Arc::new(rhesus_llm::backend::OllamaBackend::new(
            "http://localhost:11434",
            "llama3",
        ).unwrap()));
        let conv = Conversation::new(HistoryKey::General, vec![greeting()], true, session);
        let guard = conv.try_begin();
        assert!(guard.is_some());
        assert!(conv.try_begin().is_none());
        drop(guard);
        assert!(conv.try_begin().is_some());
    }
}
