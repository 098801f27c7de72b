//! The chat orchestrator shared by every client connection.

use std::collections::HashMap;
use std::sync::Arc;

use rhesus_bioapi::{JobInput, JobKind, JobPoller, JobService, JobState, PollConfig, SequenceLookup};
use rhesus_common::{
    new_id, AiResponse, ApiStatus, ChatMessage, ContentBlock, ContentType, MessageAuthor, RecentChat,
    RecentChatKind, Result, RhesusError, Snapshot, ToolCall,
};
use rhesus_llm::{error_reply, parse_ai_response, ChatSession, LlmBackend, LlmError};
use rhesus_store::{
    HistoryKey, HistoryRepository, PipelineRepository, ProjectRepository, RecentChatRepository,
    SnapshotRepository, Store,
};
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::commands::{build_prompt, fetch_blast_job_id, recent_title, Attachment, Prompt};
use crate::conversation::{greeting, rehydrate, Conversation, PollerHandle};
use crate::events::ChatEvent;

const EVENT_CAPACITY: usize = 256;
const CHAT_FAILURE_MESSAGE: &str = "Sorry, an error occurred communicating with the AI.";

#[derive(Debug, Clone)]
pub struct ChatConfig {
    pub poll: PollConfig,
    /// Page URL that share links are built on (`<base>#snapshot/<id>`).
    pub share_base_url: String,
    /// Turns of model context kept per conversation.
    pub max_history: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            poll: PollConfig::default(),
            share_base_url: "http://localhost:8080/".to_string(),
            max_history: 40,
        }
    }
}

/// One user turn.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachment: Option<Attachment>,
    /// Id of the message being replied to.
    #[serde(default)]
    pub reply_to: Option<String>,
}

impl SendRequest {
    pub fn text(content: impl Into<String>) -> Self {
        Self { content: content.into(), ..Default::default() }
    }
}

struct Inner {
    config: ChatConfig,
    llm: Arc<dyn LlmBackend>,
    jobs: Arc<dyn JobService>,
    poller: JobPoller,
    lookup: Arc<dyn SequenceLookup>,
    projects: ProjectRepository,
    pipelines: PipelineRepository,
    history: HistoryRepository,
    recent: RecentChatRepository,
    snapshots: SnapshotRepository,
    conversations: Mutex<HashMap<HistoryKey, Arc<Conversation>>>,
    events: broadcast::Sender<ChatEvent>,
    api_status: watch::Sender<ApiStatus>,
}

#[derive(Clone)]
pub struct ChatService {
    inner: Arc<Inner>,
}

impl ChatService {
    pub fn new(
        config: ChatConfig,
        llm: Arc<dyn LlmBackend>,
        jobs: Arc<dyn JobService>,
        lookup: Arc<dyn SequenceLookup>,
        store: Store,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let poller = JobPoller::new(jobs.clone(), config.poll);
        Self {
            inner: Arc::new(Inner {
                config,
                llm,
                jobs,
                poller,
                lookup,
                projects: ProjectRepository::new(store.clone()),
                pipelines: PipelineRepository::new(store.clone()),
                history: HistoryRepository::new(store.clone()),
                recent: RecentChatRepository::new(store.clone()),
                snapshots: SnapshotRepository::new(store),
                conversations: Mutex::new(HashMap::new()),
                events,
                api_status: watch::Sender::new(ApiStatus::Idle),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.inner.events.subscribe()
    }

    pub fn api_status(&self) -> ApiStatus {
        *self.inner.api_status.borrow()
    }

    pub fn config(&self) -> &ChatConfig {
        &self.inner.config
    }

    // ── Conversations ────────────────────────────────────────────────────────

    /// Open a conversation. `fresh` starts over with a greeting without
    /// touching what is stored until the first message is sent.
    pub async fn open(&self, key: &HistoryKey, fresh: bool) -> Result<Vec<ChatMessage>> {
        if fresh {
            return self.reset(key, false).await;
        }
        Ok(self.conversation(key).await?.messages().await)
    }

    pub async fn messages(&self, key: &HistoryKey) -> Result<Vec<ChatMessage>> {
        Ok(self.conversation(key).await?.messages().await)
    }

    /// Discard the conversation and its stored history.
    pub async fn start_new_chat(&self, key: &HistoryKey) -> Result<Vec<ChatMessage>> {
        self.reset(key, true).await
    }

    async fn reset(&self, key: &HistoryKey, clear_stored: bool) -> Result<Vec<ChatMessage>> {
        let conv = self.conversation(key).await?;
        let messages = {
            let mut state = conv.state.lock().await;
            state.messages = vec![greeting()];
            state.fresh = true;
            if clear_stored {
                self.inner.history.clear(key).await?;
            }
            state.messages.clone()
        };
        conv.session.lock().await.reset();
        // Pollers find their message gone and finish without writing.
        conv.cancel_pollers().await;
        info!(conversation = %key, clear_stored, "Conversation reset");
        self.emit(ChatEvent::ConversationReset { conversation: key.id().to_string() });
        Ok(messages)
    }

    /// Drop a conversation from memory; it will never write to storage again.
    pub async fn close(&self, key: &HistoryKey) {
        let conv = self.inner.conversations.lock().await.remove(key);
        if let Some(conv) = conv {
            conv.state.lock().await.detached = true;
            conv.cancel_pollers().await;
            debug!(conversation = %key, "Conversation closed");
        }
    }

    pub async fn close_all(&self) {
        let keys: Vec<HistoryKey> = self.inner.conversations.lock().await.keys().cloned().collect();
        for key in keys {
            self.close(&key).await;
        }
    }

    /// Delete a project together with its conversation.
    pub async fn delete_project(&self, project_id: &str) -> Result<bool> {
        self.close(&HistoryKey::Project(project_id.to_string())).await;
        let deleted = self.inner.projects.delete(project_id).await?;
        if deleted {
            let chats = self.inner.recent.list().await?;
            self.emit(ChatEvent::RecentChatsChanged { chats });
        }
        Ok(deleted)
    }

    /// Cancel every running job and wait until the interrupted states are saved.
    pub async fn stop_all(&self) {
        let convs: Vec<Arc<Conversation>> = self.inner.conversations.lock().await.values().cloned().collect();
        for conv in convs {
            for task in conv.cancel_pollers().await {
                if let Err(e) = task.await {
                    warn!(conversation = %conv.key, error = %e, "Job poller ended abnormally");
                }
            }
        }
        info!("All job pollers stopped");
    }

    async fn conversation(&self, key: &HistoryKey) -> Result<Arc<Conversation>> {
        let mut open = self.inner.conversations.lock().await;
        if let Some(conv) = open.get(key) {
            return Ok(conv.clone());
        }
        if let Some(project_id) = key.project_id() {
            self.inner.projects.require(project_id).await?;
        }

        let session = ChatSession::new(self.inner.llm.clone()).with_max_history(self.inner.config.max_history);
        let conv = match self.inner.history.load(key).await? {
            Some(mut messages) if !messages.is_empty() => {
                if rehydrate(&mut messages) {
                    info!(conversation = %key, "Marked stale jobs as interrupted");
                    self.inner.history.save(key, &messages).await?;
                }
                Conversation::new(key.clone(), messages, false, session)
            }
            _ => Conversation::new(key.clone(), vec![greeting()], true, session),
        };
        let conv = Arc::new(conv);
        open.insert(key.clone(), conv.clone());
        Ok(conv)
    }

    // ── Messages ─────────────────────────────────────────────────────────────

    /// Handle one user turn and return the conversation afterwards.
    #[instrument(skip(self, key, request), fields(conversation = %key))]
    pub async fn send_message(&self, key: &HistoryKey, request: SendRequest) -> Result<Vec<ChatMessage>> {
        let conv = self.conversation(key).await?;
        // Reattaching to a job never talks to the model, so it skips the turn lock.
        if let Some(job_id) = fetch_blast_job_id(&request.content) {
            self.fetch_blast(&conv, &request.content, job_id).await?;
            return Ok(conv.messages().await);
        }

        let _busy = conv.try_begin().ok_or_else(|| {
            RhesusError::InvalidInput("Dr. Rhesus is still answering the previous message.".to_string())
        })?;

        let reply_target = match &request.reply_to {
            Some(id) => {
                let target = conv.find(id).await;
                if target.is_none() {
                    warn!(message_id = %id, "Reply target not found; sending without it");
                }
                target
            }
            None => None,
        };
        let Some(prompt) = build_prompt(&request.content, request.attachment.as_ref(), reply_target.as_ref())
        else {
            return Ok(conv.messages().await);
        };

        let display = match (&request.attachment, request.content.trim().is_empty()) {
            (Some(file), true) => format!("Uploaded {}", file.name),
            _ => request.content.clone(),
        };
        let mut user = ChatMessage::user(display);
        user.reply_to = reply_target.as_ref().map(ChatMessage::as_reply_target);

        self.begin_turn(&conv, &prompt.text).await?;
        self.append(&conv, user).await?;

        if let Err(e) = self.exchange(&conv, &prompt).await {
            error!(error = %e, "Chat turn failed");
            self.set_api_status(ApiStatus::Error);
            let notice = ChatMessage::new(new_id("error"), MessageAuthor::System, CHAT_FAILURE_MESSAGE);
            if let Err(e) = self.append(&conv, notice).await {
                warn!(error = %e, "Could not record chat failure");
            }
            return Err(e);
        }
        Ok(conv.messages().await)
    }

    /// Send each step of a pipeline as its own turn, in order.
    /// A failing step does not stop the run.
    pub async fn run_pipeline(&self, key: &HistoryKey, pipeline_id: &str, target: &str) -> Result<Vec<ChatMessage>> {
        let target = target.trim();
        if target.is_empty() {
            return Err(RhesusError::InvalidInput("A target is required to run a pipeline.".to_string()));
        }
        let pipeline = self.inner.pipelines.require(pipeline_id).await?;
        info!(pipeline = %pipeline.name, target, steps = pipeline.steps.len(), "Running pipeline");

        let conv = self.conversation(key).await?;
        let start = format!("Running pipeline \"{}\" with target \"{}\"...", pipeline.name, target);
        self.append(&conv, ChatMessage::system(start)).await?;
        for (i, prompt) in pipeline.render_prompts(target).into_iter().enumerate() {
            if let Err(e) = self.send_message(key, SendRequest::text(prompt)).await {
                warn!(pipeline = %pipeline.id, step = i + 1, error = %e, "Pipeline step failed");
            }
        }
        let done = format!("Pipeline \"{}\" finished.", pipeline.name);
        self.append(&conv, ChatMessage::system(done)).await?;
        Ok(conv.messages().await)
    }

    /// The first message of a new chat makes it persistent and lists it as recent.
    async fn begin_turn(&self, conv: &Conversation, prompt: &str) -> Result<()> {
        {
            let mut state = conv.state.lock().await;
            if !state.fresh {
                return Ok(());
            }
            state.fresh = false;
            self.persist(conv, &state.messages, state.persistent()).await?;
        }

        let (kind, project_name) = match conv.key.project_id() {
            Some(id) => (RecentChatKind::Project, self.inner.projects.get(id).await?.map(|p| p.title)),
            None => (RecentChatKind::General, None),
        };
        let chat = RecentChat {
            id: conv.key.id().to_string(),
            title: recent_title(prompt),
            kind,
            project_name,
        };
        let chats = self.inner.recent.push(chat).await?;
        self.emit(ChatEvent::RecentChatsChanged { chats });
        Ok(())
    }

    async fn exchange(&self, conv: &Arc<Conversation>, prompt: &Prompt) -> Result<()> {
        let reply = {
            let mut session = conv.session.lock().await;
            if prompt.web_search {
                match session.send_message_with_search(&prompt.text).await {
                    Err(LlmError::Unavailable(reason)) => {
                        debug!(%reason, "Web search unavailable; answering without it");
                        session.send_message(&prompt.text).await
                    }
                    other => other,
                }
            } else {
                session.send_message(&prompt.text).await
            }
        };

        match reply {
            Ok(raw) => {
                self.set_api_status(ApiStatus::Healthy);
                let mut display = parse_ai_response(&raw);
                let (executable, shown): (Vec<ToolCall>, Vec<ToolCall>) = display
                    .tool_calls
                    .drain(..)
                    .partition(|c| c.content_type.is_executable());
                display.tool_calls = shown;
                if !display.is_empty() || !display.actions.is_empty() {
                    self.append(conv, ChatMessage::rhesus("rhesus", display.to_raw())).await?;
                }
                self.run_tool_calls(conv, &executable).await
            }
            Err(e) => {
                warn!(error = %e, "Model request failed");
                self.set_api_status(ApiStatus::Error);
                self.append(conv, ChatMessage::rhesus("rhesus", error_reply(&e))).await
            }
        }
    }

    async fn run_tool_calls(&self, conv: &Arc<Conversation>, calls: &[ToolCall]) -> Result<()> {
        for call in calls {
            if let Some(kind) = JobKind::from_request_type(&call.content_type) {
                self.start_job(conv, kind, &call.data).await?;
            } else if call.content_type == ContentType::FetchUniprotSequence {
                self.fetch_uniprot(conv, &call.data).await?;
            }
        }
        Ok(())
    }

    // ── Tools ────────────────────────────────────────────────────────────────

    async fn start_job(&self, conv: &Arc<Conversation>, kind: JobKind, data: &Value) -> Result<()> {
        let msg = ChatMessage::rhesus(kind.message_prefix(), JobState::Submitting.to_response(kind).to_raw());
        let message_id = msg.id.clone();
        self.append(conv, msg).await?;

        let submitted = match JobInput::from_tool_data(kind, data) {
            Ok(input) => self.inner.jobs.submit(kind, &input).await,
            Err(e) => Err(e),
        };
        let state = match submitted {
            Ok(job_id) => JobState::Polling { job_id },
            Err(e) => {
                warn!(%kind, error = %e, "Job submission failed");
                JobState::Failed { job_id: None, reason: e.to_string() }
            }
        };
        self.set_job_state(conv, &message_id, kind, &state).await?;

        if let JobState::Polling { job_id } = state {
            self.spawn_poller(conv, message_id, kind, job_id).await;
        }
        Ok(())
    }

    async fn fetch_blast(&self, conv: &Arc<Conversation>, content: &str, job_id: &str) -> Result<()> {
        let kind = JobKind::Blast;
        self.begin_turn(conv, content.trim()).await?;
        self.append(conv, ChatMessage::user(content.trim())).await?;
        self.append(conv, ChatMessage::system(format!("Attempting to fetch results for job ID: {}", job_id)))
            .await?;

        let state = JobState::Polling { job_id: job_id.to_string() };
        let msg = ChatMessage::rhesus(kind.message_prefix(), state.to_response(kind).to_raw());
        let message_id = msg.id.clone();
        self.append(conv, msg).await?;
        self.spawn_poller(conv, message_id, kind, job_id.to_string()).await;
        Ok(())
    }

    async fn spawn_poller(&self, conv: &Arc<Conversation>, message_id: String, kind: JobKind, job_id: String) {
        let (cancel, cancelled) = watch::channel(false);
        // Held across the spawn so the task cannot deregister before it is registered.
        let mut pollers = conv.pollers.lock().await;

        let service = self.clone();
        let task_conv = conv.clone();
        let task_message_id = message_id.clone();
        let task = tokio::spawn(async move {
            let state = service.inner.poller.run(kind, job_id, cancelled).await;
            task_conv.pollers.lock().await.remove(&task_message_id);
            if let Err(e) = service.set_job_state(&task_conv, &task_message_id, kind, &state).await {
                error!(%kind, error = %e, "Could not record job result");
            }
        });
        pollers.insert(message_id, PollerHandle { cancel, task });
    }

    async fn fetch_uniprot(&self, conv: &Arc<Conversation>, data: &Value) -> Result<()> {
        let name = data["proteinName"].as_str().unwrap_or_default().trim();
        if name.is_empty() {
            debug!("UniProt lookup requested without a protein name");
            return Ok(());
        }

        let loading = AiResponse::prose(format!("Fetching sequence for \"{}\" from UniProt...", name));
        let msg = ChatMessage::rhesus("uniprot", loading.to_raw());
        let message_id = msg.id.clone();
        self.append(conv, msg).await?;

        let raw = match self.inner.lookup.fetch_sequence(name).await {
            Ok(entry) => AiResponse::default()
                .with_tool_call(ToolCall::new(ContentType::SequenceViewer, serde_json::to_value(&entry)?))
                .to_raw(),
            Err(e) => {
                warn!(protein = name, error = %e, "UniProt lookup failed");
                format!("Error: {}", e)
            }
        };
        self.update_message(conv, &message_id, raw).await
    }

    async fn set_job_state(&self, conv: &Conversation, message_id: &str, kind: JobKind, state: &JobState) -> Result<()> {
        self.update_message(conv, message_id, state.to_response(kind).to_raw()).await
    }

    // ── Projects & sharing ───────────────────────────────────────────────────

    /// Pin a block to a project and note it in the conversation.
    pub async fn save_to_project(&self, key: &HistoryKey, project_id: &str, block: ContentBlock) -> Result<ContentBlock> {
        ensure_pinnable(&block)?;
        let project = self.inner.projects.require(project_id).await?;
        let saved = self.inner.projects.add_block(project_id, &block).await?;

        let conv = self.conversation(key).await?;
        self.append(&conv, ChatMessage::system(format!("Content saved to project: \"{}\"", project.title)))
            .await?;
        Ok(saved)
    }

    /// Store a read-only snapshot of a block and return it with its share link.
    pub async fn share(&self, block: ContentBlock) -> Result<(Snapshot, String)> {
        ensure_pinnable(&block)?;
        let snapshot = self.inner.snapshots.create(&block).await?;
        let link = format!("{}#snapshot/{}", self.inner.config.share_base_url, snapshot.id);
        info!(snapshot = %snapshot.id, "Snapshot shared");
        Ok((snapshot, link))
    }

    // ── Plumbing ─────────────────────────────────────────────────────────────

    async fn append(&self, conv: &Conversation, message: ChatMessage) -> Result<()> {
        let mut state = conv.state.lock().await;
        state.messages.push(message.clone());
        self.persist(conv, &state.messages, state.persistent()).await?;
        self.emit(ChatEvent::MessageAppended { conversation: conv.key.id().to_string(), message });
        Ok(())
    }

    /// Rewrite a message in place. A message that is gone (conversation reset)
    /// is silently skipped.
    async fn update_message(&self, conv: &Conversation, message_id: &str, raw_content: String) -> Result<()> {
        let mut state = conv.state.lock().await;
        let Some(msg) = state.messages.iter_mut().find(|m| m.id == message_id) else {
            debug!(message_id, "Message no longer present; update dropped");
            return Ok(());
        };
        msg.raw_content = raw_content;
        let message = msg.clone();
        self.persist(conv, &state.messages, state.persistent()).await?;
        self.emit(ChatEvent::MessageUpdated { conversation: conv.key.id().to_string(), message });
        Ok(())
    }

    async fn persist(&self, conv: &Conversation, messages: &[ChatMessage], persistent: bool) -> Result<()> {
        if persistent {
            self.inner.history.save(&conv.key, messages).await?;
        }
        Ok(())
    }

    fn set_api_status(&self, status: ApiStatus) {
        let changed = self.inner.api_status.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
        if changed {
            self.emit(ChatEvent::ApiStatusChanged { status });
        }
    }

    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine.
        let _ = self.inner.events.send(event);
    }
}

fn ensure_pinnable(block: &ContentBlock) -> Result<()> {
    if block.content_type.is_progress() {
        return Err(RhesusError::InvalidInput(
            "Job progress cannot be saved or shared; wait for the result.".to_string(),
        ));
    }
    Ok(())
}
