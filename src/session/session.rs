use super::config::LiveSessionConfig;
use super::model::{CanvasBlock, LectureSession, Slide, SlideGroup};
use super::stats::{LiveState, SessionStats, StartMode};
use crate::audio::TurnAudio;
use crate::imaging::{ImageOptimizer, RasterOptimizer};
use crate::live::{
    build_session_setup, FunctionCall, FunctionResponse, LiveTransport, SendOptions, SendOutcome,
    ServerMessage, SetupParams, ToolResponse, TurnBuilder, CANVAS_TOOL_NAME,
};
use crate::notify::Notifier;
use crate::persistence::{migrate_session, SessionSaver, SessionStore};
use crate::schedule::Debouncer;
use crate::transcript::{
    AppendOptions, AppendOutcome, ChatAttachment, Speaker, TranscriptEntry, TranscriptReconciler,
};
use crate::usage::{estimate_cost, TokenUsage, UsageDeltaTracker, UsageReport, DEFAULT_LIVE_TAG};
use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

const COMMAND_BUFFER: usize = 256;

/// Texts that point the model at a slide and ask it to explain it
pub fn explain_slide_texts(slide: &Slide) -> Vec<String> {
    vec![
        format!("ACTIVE SLIDE: {}", slide.page_number),
        format!("Slide {} summary: {}", slide.page_number, slide.summary),
    ]
}

fn resume_texts(slide: &Slide) -> Vec<String> {
    vec![
        format!("ACTIVE SLIDE: {}", slide.page_number),
        format!(
            "We are resuming an earlier lecture on slide {}. Briefly recap where we left off and continue.",
            slide.page_number
        ),
    ]
}

/// Collaborators a live session talks to
#[derive(Clone)]
pub struct LiveServices {
    pub transport: Arc<dyn LiveTransport>,
    pub store: Arc<dyn SessionStore>,
    pub optimizer: Arc<dyn ImageOptimizer>,
    pub notifier: Notifier,
}

impl LiveServices {
    pub fn new(transport: Arc<dyn LiveTransport>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            transport,
            store,
            optimizer: Arc::new(RasterOptimizer),
            notifier: Notifier::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CanvasToolArgs {
    blocks: Vec<CanvasBlock>,
    #[serde(default)]
    slide_number: Option<u32>,
}

enum Command {
    Start {
        mode: StartMode,
        reply: oneshot::Sender<Result<()>>,
    },
    Inbound {
        generation: u64,
        message: Box<ServerMessage>,
    },
    StreamClosed {
        generation: u64,
    },
    SendMessage {
        text: String,
        reply: oneshot::Sender<SendOutcome>,
    },
    AddAttachment(ChatAttachment),
    RemoveAttachment(String),
    ClearAttachments,
    SelectSlide(usize),
    SlideSelectDue(usize),
    NextSlide,
    PreviousSlide,
    Replay,
    SetMuted(bool),
    AutoMuteDue {
        generation: u64,
    },
    AddReport(UsageReport),
    SetSlideGroups(Option<Vec<SlideGroup>>),
    Persist,
    Snapshot(oneshot::Sender<LectureSession>),
    Stats(oneshot::Sender<SessionStats>),
    Attachments(oneshot::Sender<Vec<ChatAttachment>>),
    Flush(oneshot::Sender<bool>),
    End(oneshot::Sender<()>),
}

/// Handle to a running lecture session
///
/// The session itself runs on one task that owns the lecture, transcript,
/// usage accounting and transport. Transport events, user actions and timers
/// are all commands processed strictly in arrival order.
#[derive(Clone)]
pub struct LiveSession {
    session_id: String,
    commands: mpsc::Sender<Command>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl LiveSession {
    /// Spawn the session task. Nothing is connected until [`LiveSession::start`].
    pub fn spawn(session: LectureSession, services: LiveServices, config: LiveSessionConfig) -> Self {
        let session_id = session.id.clone();
        info!("Spawning live session: {}", session_id);

        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        let weak = tx.downgrade();

        let task = tokio::spawn(async move {
            // Legacy PNG slides are converted once up front
            let (session, _) = migrate_session(session).await;
            Engine::new(session, services, config, weak).run(rx).await;
        });

        Self {
            session_id,
            commands: tx,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Connect the transport and send the opening or recap turn
    pub async fn start(&self, mode: StartMode) -> Result<()> {
        self.request(|reply| Command::Start { mode, reply }).await?
    }

    /// Record a typed message (with any pending attachments) and send it
    pub async fn send_message(&self, text: impl Into<String>) -> Result<SendOutcome> {
        let text = text.into();
        self.request(|reply| Command::SendMessage { text, reply }).await
    }

    pub async fn add_attachment(&self, attachment: ChatAttachment) -> Result<()> {
        self.post(Command::AddAttachment(attachment)).await
    }

    pub async fn remove_attachment(&self, id: impl Into<String>) -> Result<()> {
        self.post(Command::RemoveAttachment(id.into())).await
    }

    pub async fn clear_attachments(&self) -> Result<()> {
        self.post(Command::ClearAttachments).await
    }

    pub async fn attachments(&self) -> Result<Vec<ChatAttachment>> {
        self.request(Command::Attachments).await
    }

    /// Jump to a slide (0-based). Rapid calls coalesce into one explanation.
    pub async fn select_slide(&self, index: usize) -> Result<()> {
        self.post(Command::SelectSlide(index)).await
    }

    pub async fn next_slide(&self) -> Result<()> {
        self.post(Command::NextSlide).await
    }

    pub async fn previous_slide(&self) -> Result<()> {
        self.post(Command::PreviousSlide).await
    }

    /// Ask for the current slide to be explained again
    pub async fn replay(&self) -> Result<()> {
        self.post(Command::Replay).await
    }

    /// Unmuting while disconnected reconnects the transport
    pub async fn set_muted(&self, muted: bool) -> Result<()> {
        self.post(Command::SetMuted(muted)).await
    }

    /// Account for a one-shot model call made outside the live stream
    pub async fn add_report(&self, report: UsageReport) -> Result<()> {
        self.post(Command::AddReport(report)).await
    }

    pub async fn set_slide_groups(&self, groups: Option<Vec<SlideGroup>>) -> Result<()> {
        self.post(Command::SetSlideGroups(groups)).await
    }

    pub async fn snapshot(&self) -> Result<LectureSession> {
        self.request(Command::Snapshot).await
    }

    pub async fn get_stats(&self) -> Result<SessionStats> {
        self.request(Command::Stats).await
    }

    pub async fn get_transcript(&self) -> Result<Vec<TranscriptEntry>> {
        Ok(self.snapshot().await?.transcript)
    }

    /// Save immediately, superseding any pending debounced save
    pub async fn flush(&self) -> Result<bool> {
        self.request(Command::Flush).await
    }

    /// Final save, close the transport and stop the session task
    pub async fn end(&self) -> Result<()> {
        info!("Ending live session: {}", self.session_id);

        // Already ended is not an error
        let _ = self.request(Command::End).await;

        if let Some(task) = self.task.lock().await.take() {
            task.await.context("Live session task panicked")?;
        }

        Ok(())
    }

    async fn post(&self, command: Command) -> Result<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| anyhow!("Live session {} has ended", self.session_id))
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (reply, response) = oneshot::channel();
        self.post(make(reply)).await?;
        response
            .await
            .map_err(|_| anyhow!("Live session {} dropped the request", self.session_id))
    }
}

/// State owned by the session task
struct Engine {
    session: LectureSession,
    reconciler: TranscriptReconciler,
    tracker: UsageDeltaTracker,
    turns: TurnBuilder,
    transport: Arc<dyn LiveTransport>,
    saver: SessionSaver,
    notifier: Notifier,
    commands: mpsc::WeakSender<Command>,

    state: LiveState,
    started_at: chrono::DateTime<Utc>,
    muted: bool,
    resumption_handle: Option<String>,
    resumable: bool,

    audio: TurnAudio,
    attachments: Vec<ChatAttachment>,
    /// Streaming user speech merges into the last user entry
    user_turn_open: bool,

    stream_generation: u64,
    forwarder: Option<JoinHandle<()>>,

    slide_select: Debouncer,
    auto_mute: Debouncer,
    auto_mute_generation: u64,
}

impl Engine {
    fn new(
        mut session: LectureSession,
        services: LiveServices,
        config: LiveSessionConfig,
        commands: mpsc::WeakSender<Command>,
    ) -> Self {
        let transcript = std::mem::take(&mut session.transcript);
        let reports = std::mem::take(&mut session.usage_reports);
        let index = session.current_slide_index.min(session.slides.len().saturating_sub(1));
        session.current_slide_index = index;

        Self {
            reconciler: TranscriptReconciler::new(transcript, index),
            tracker: UsageDeltaTracker::new(reports),
            turns: TurnBuilder::from_config(&session.lecture_config, services.optimizer),
            transport: services.transport,
            saver: SessionSaver::new(services.store, config.save_debounce),
            notifier: services.notifier,
            slide_select: Debouncer::new(config.slide_select_debounce),
            auto_mute: Debouncer::new(config.auto_mute_delay),
            commands,
            session,
            state: LiveState::Idle,
            started_at: Utc::now(),
            muted: true,
            resumption_handle: None,
            resumable: false,
            audio: TurnAudio::new(),
            attachments: Vec::new(),
            user_turn_open: false,
            stream_generation: 0,
            forwarder: None,
            auto_mute_generation: 0,
        }
    }

    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        info!("Live session task started: {}", self.session.id);

        while let Some(command) = commands.recv().await {
            if !self.handle(command).await {
                break;
            }
        }

        // Every handle dropped without an explicit end
        if self.state != LiveState::Ended {
            self.shutdown().await;
        }

        info!("Live session task stopped: {}", self.session.id);
    }

    /// Returns false once the session has ended
    async fn handle(&mut self, command: Command) -> bool {
        match command {
            Command::Start { mode, reply } => {
                let result = self.start(mode).await;
                let _ = reply.send(result);
            }
            Command::Inbound {
                generation,
                message,
            } => {
                if generation == self.stream_generation {
                    self.on_server_message(*message).await;
                } else {
                    debug!("Dropping message from stale stream {}", generation);
                }
            }
            Command::StreamClosed { generation } => {
                if generation == self.stream_generation {
                    self.on_stream_closed();
                }
            }
            Command::SendMessage { text, reply } => {
                let outcome = self.send_message(text).await;
                let _ = reply.send(outcome);
            }
            Command::AddAttachment(attachment) => self.attachments.push(attachment),
            Command::RemoveAttachment(id) => self.attachments.retain(|a| a.id != id),
            Command::ClearAttachments => self.attachments.clear(),
            Command::SelectSlide(index) => {
                if index < self.session.slides.len() {
                    let due = self.command_later(Command::SlideSelectDue(index));
                    self.slide_select.schedule(due);
                } else {
                    warn!("Ignoring selection of missing slide index {}", index);
                }
            }
            Command::SlideSelectDue(index) => {
                if index != self.session.current_slide_index {
                    self.go_to_slide(index).await;
                }
            }
            Command::NextSlide => {
                let next = self.session.current_slide_index + 1;
                if next < self.session.slides.len() {
                    self.go_to_slide(next).await;
                }
            }
            Command::PreviousSlide => {
                if let Some(previous) = self.session.current_slide_index.checked_sub(1) {
                    self.go_to_slide(previous).await;
                }
            }
            Command::Replay => self.explain_current_slide().await,
            Command::SetMuted(muted) => self.set_muted(muted).await,
            Command::AutoMuteDue { generation } => {
                let user_speaking = self
                    .reconciler
                    .last_entry()
                    .map(|e| e.speaker == Speaker::User)
                    .unwrap_or(false);
                if generation == self.auto_mute_generation && !user_speaking && !self.muted {
                    debug!("Auto-muting after assistant response");
                    self.muted = true;
                }
            }
            Command::AddReport(report) => {
                self.tracker.add_report(report);
                self.mark_dirty();
            }
            Command::SetSlideGroups(groups) => {
                self.session.slide_groups = groups;
                self.mark_dirty();
            }
            Command::Persist => {
                drop(self.saver.spawn_save(self.snapshot()));
            }
            Command::Snapshot(reply) => {
                let _ = reply.send(self.snapshot());
            }
            Command::Stats(reply) => {
                let _ = reply.send(self.stats());
            }
            Command::Attachments(reply) => {
                let _ = reply.send(self.attachments.clone());
            }
            Command::Flush(reply) => {
                let saved = self.saver.flush(self.snapshot()).await;
                let _ = reply.send(saved);
            }
            Command::End(reply) => {
                self.shutdown().await;
                let _ = reply.send(());
                return false;
            }
        }
        true
    }

    async fn start(&mut self, mode: StartMode) -> Result<()> {
        if self.state == LiveState::Connecting {
            warn!("Live session already connecting");
            return Ok(());
        }

        info!("Starting live session {} ({:?})", self.session.id, mode);
        self.state = LiveState::Connecting;

        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }
        self.stream_generation += 1;

        let handle = match mode {
            StartMode::New => None,
            StartMode::Saved | StartMode::Disconnected => self.resumption_handle.clone(),
        };

        let config = &self.session.lecture_config;
        let setup = build_session_setup(&SetupParams {
            model: &config.model,
            voice: &config.voice,
            language: &config.language,
            general_info: &self.session.general_info,
            custom_prompt: config.custom_prompt(),
            resumption_handle: handle.as_deref(),
        });

        let inbound = match self.transport.connect(&setup).await {
            Ok(inbound) => inbound,
            Err(e) => {
                error!("Failed to connect live session {}: {:#}", self.session.id, e);
                self.state = LiveState::Error;
                self.notifier.error("Could not start the live lecture. Please try again.");
                return Err(e.context("Failed to start live session"));
            }
        };

        // Each connection reports usage cumulatively from its own start
        self.tracker.settle_ongoing();
        self.tracker.reset_baseline();
        self.audio.clear();
        self.reconciler.close_assistant_turn();
        self.user_turn_open = false;

        self.forwarder = Some(self.spawn_forwarder(inbound));
        self.state = LiveState::Ready;
        info!(
            "Live session {} connected via {} (resumed={})",
            self.session.id,
            self.transport.name(),
            setup.is_resuming()
        );

        match (mode, handle.is_some()) {
            (StartMode::New, _) => self.explain_current_slide().await,
            (_, false) => {
                if let Some(slide) = self.session.current_slide() {
                    let options = SendOptions::text(resume_texts(slide)).with_slide(slide);
                    self.turns.send(self.transport.as_ref(), options).await;
                }
            }
            (_, true) => debug!("Resumed with handle; no recap needed"),
        }

        Ok(())
    }

    fn spawn_forwarder(&self, mut inbound: mpsc::Receiver<ServerMessage>) -> JoinHandle<()> {
        let commands = self.commands.clone();
        let generation = self.stream_generation;

        tokio::spawn(async move {
            while let Some(message) = inbound.recv().await {
                let Some(tx) = commands.upgrade() else {
                    return;
                };
                let command = Command::Inbound {
                    generation,
                    message: Box::new(message),
                };
                if tx.send(command).await.is_err() {
                    return;
                }
            }

            if let Some(tx) = commands.upgrade() {
                let _ = tx.send(Command::StreamClosed { generation }).await;
            }
        })
    }

    async fn on_server_message(&mut self, message: ServerMessage) {
        let mut changed = false;

        if message.setup_complete.is_some() {
            debug!("Live setup complete for {}", self.session.id);
        }

        if let Some(content) = &message.server_content {
            if let Some(input) = &content.input_transcription {
                changed |= self.on_user_speech(&input.text);
            }

            if let Some(output) = &content.output_transcription {
                changed |= self.on_assistant_speech(&output.text);
            }

            if let Some(turn) = &content.model_turn {
                for blob in turn.parts.iter().filter_map(|p| p.as_inline()) {
                    if blob.mime_type.starts_with("audio/") {
                        if let Err(e) = self.audio.push_chunk(&blob.mime_type, &blob.data) {
                            warn!("Dropping model audio chunk: {:#}", e);
                        }
                    }
                }
            }
        }

        if let Some(tool_call) = &message.tool_call {
            let mut responses = Vec::with_capacity(tool_call.function_calls.len());
            for call in &tool_call.function_calls {
                responses.push(self.on_function_call(call));
            }
            changed = true;

            if let Err(e) = self
                .transport
                .send_tool_response(ToolResponse {
                    function_responses: responses,
                })
                .await
            {
                warn!("Failed to send tool response: {:#}", e);
            }
        }

        let mut turn_usage = None;
        if let Some(raw) = &message.usage_metadata {
            let tag = format!(
                "{}:{}",
                DEFAULT_LIVE_TAG,
                self.session.current_slide_index + 1
            );
            let is_final = message.ends_turn();
            let usage = self.tracker.record_turn_usage(
                &self.session.lecture_config.model,
                raw,
                is_final,
                Some(&tag),
            );
            if is_final {
                turn_usage = Some(usage);
            }
            changed = true;
        }

        if message.ends_turn() {
            self.finish_assistant_turn(turn_usage);
            changed = true;
        }

        if let Some(update) = &message.session_resumption_update {
            self.resumable = update.resumable;
            if let Some(handle) = update.new_handle.as_ref().filter(|h| !h.is_empty()) {
                if update.resumable {
                    debug!("Stored new resumption handle");
                    self.resumption_handle = Some(handle.clone());
                }
            }
        }

        if let Some(go_away) = &message.go_away {
            info!(
                "Server is closing the stream for {} (time left: {})",
                self.session.id,
                go_away.time_left.as_deref().unwrap_or("unknown")
            );
            self.state = LiveState::Disconnected;
        }

        if changed {
            self.mark_dirty();
        }
    }

    fn on_user_speech(&mut self, text: &str) -> bool {
        let outcome = self.reconciler.append_or_update(
            text,
            Speaker::User,
            AppendOptions {
                update_last_entry: self.user_turn_open,
                ..Default::default()
            },
        );

        match outcome {
            AppendOutcome::Ignored | AppendOutcome::Unchanged => false,
            AppendOutcome::Created | AppendOutcome::Updated => {
                self.user_turn_open = true;
                // The user is talking; keep the microphone open
                if self.auto_mute.cancel() {
                    debug!("Auto-mute canceled by user speech");
                }
                true
            }
        }
    }

    fn on_assistant_speech(&mut self, text: &str) -> bool {
        let outcome = self.reconciler.append_or_update(
            text,
            Speaker::Ai,
            AppendOptions {
                update_last_entry: self.reconciler.is_assistant_turn_open(),
                ..Default::default()
            },
        );

        match outcome {
            AppendOutcome::Ignored | AppendOutcome::Unchanged => false,
            AppendOutcome::Created => {
                self.user_turn_open = false;
                self.state = LiveState::Lecturing;
                self.arm_auto_mute();
                true
            }
            AppendOutcome::Updated => {
                self.state = LiveState::Lecturing;
                true
            }
        }
    }

    fn on_function_call(&mut self, call: &FunctionCall) -> FunctionResponse {
        let response = if call.name == CANVAS_TOOL_NAME {
            match self.render_canvas(call) {
                Ok(page) => json!({ "result": format!("Canvas updated for slide {}", page) }),
                Err(e) => {
                    warn!("Rejected canvas tool call: {:#}", e);
                    json!({ "error": e.to_string() })
                }
            }
        } else {
            warn!("Unknown tool call: {}", call.name);
            json!({ "error": format!("Unknown tool: {}", call.name) })
        };

        FunctionResponse {
            id: call.id.clone(),
            name: call.name.clone(),
            response,
        }
    }

    fn render_canvas(&mut self, call: &FunctionCall) -> Result<u32> {
        let args: CanvasToolArgs =
            serde_json::from_value(call.args.clone()).context("Invalid canvas tool arguments")?;

        let index = match args.slide_number {
            Some(number) => (number as usize)
                .checked_sub(1)
                .ok_or_else(|| anyhow!("Slide numbers start at 1"))?,
            None => self.session.current_slide_index,
        };

        let slide = self
            .session
            .slides
            .get_mut(index)
            .ok_or_else(|| anyhow!("No slide {}", index + 1))?;

        info!(
            "Rendering {} canvas blocks on slide {}",
            args.blocks.len(),
            slide.page_number
        );
        slide.canvas_content = Some(args.blocks);
        Ok(slide.page_number)
    }

    fn finish_assistant_turn(&mut self, turn_usage: Option<TokenUsage>) {
        // Turn ended without a final usage snapshot
        let turn_usage = turn_usage.or_else(|| self.tracker.settle_ongoing());

        if self.reconciler.is_assistant_turn_open() {
            if let Some(usage) = turn_usage {
                let cost = estimate_cost(&self.session.lecture_config.model, &usage);
                self.reconciler.set_last_entry_cost(cost, Speaker::Ai);
            }

            match self.audio.finish() {
                Ok(Some(wav)) => {
                    self.reconciler.set_last_entry_audio(wav, Speaker::Ai);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("Failed to encode turn audio: {:#}", e);
                    self.notifier.error("Could not save the audio for the last answer.");
                }
            }
        } else {
            self.audio.clear();
        }

        self.reconciler.close_assistant_turn();
        if matches!(self.state, LiveState::Lecturing | LiveState::Ready) {
            self.state = LiveState::Listening;
        }
    }

    fn on_stream_closed(&mut self) {
        if matches!(self.state, LiveState::Ended | LiveState::Error) {
            return;
        }

        info!("Live stream closed for {}", self.session.id);
        self.state = LiveState::Disconnected;
        self.forwarder = None;
        if self.tracker.settle_ongoing().is_some() {
            self.mark_dirty();
        }
        self.audio.clear();
        self.reconciler.close_assistant_turn();
    }

    async fn send_message(&mut self, text: String) -> SendOutcome {
        let attachments = std::mem::take(&mut self.attachments);

        let outcome = self.reconciler.push_user_message(&text, attachments.clone());
        if outcome == AppendOutcome::Ignored {
            return SendOutcome::Empty;
        }
        self.user_turn_open = false;
        self.auto_mute.cancel();
        self.mark_dirty();

        let options = SendOptions::text(text).with_attachments(&attachments);
        self.turns.send(self.transport.as_ref(), options).await
    }

    async fn go_to_slide(&mut self, index: usize) {
        info!("Moving to slide {}", index + 1);
        self.session.current_slide_index = index;
        self.reconciler.set_current_slide_index(index);
        self.mark_dirty();
        self.explain_current_slide().await;
    }

    async fn explain_current_slide(&mut self) {
        let Some(slide) = self.session.current_slide() else {
            warn!("Lecture {} has no slides", self.session.id);
            return;
        };

        let options = SendOptions::text(explain_slide_texts(slide)).with_slide(slide);
        let outcome = self.turns.send(self.transport.as_ref(), options).await;
        debug!("Explain slide {}: {:?}", slide.page_number, outcome);
    }

    async fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
        if muted {
            return;
        }

        self.auto_mute.cancel();
        if self.state == LiveState::Disconnected {
            info!("Microphone unmuted while disconnected, reconnecting");
            if let Err(e) = self.start(StartMode::Disconnected).await {
                error!("Reconnect failed: {:#}", e);
            }
        }
    }

    fn arm_auto_mute(&mut self) {
        self.auto_mute_generation += 1;
        let due = self.command_later(Command::AutoMuteDue {
            generation: self.auto_mute_generation,
        });
        self.auto_mute.schedule(due);
    }

    fn mark_dirty(&mut self) {
        let due = self.command_later(Command::Persist);
        self.saver.mark_dirty(due);
    }

    /// Future that posts `command` back to this session's queue
    fn command_later(&self, command: Command) -> impl std::future::Future<Output = ()> + Send + 'static {
        let commands = self.commands.clone();
        async move {
            if let Some(tx) = commands.upgrade() {
                let _ = tx.send(command).await;
            }
        }
    }

    fn snapshot(&self) -> LectureSession {
        let mut snapshot = self.session.clone();
        snapshot.transcript = self.reconciler.entries().to_vec();
        snapshot.usage_reports = self.tracker.reports().to_vec();
        snapshot
    }

    fn stats(&self) -> SessionStats {
        let now = Utc::now();
        SessionStats {
            session_id: self.session.id.clone(),
            state: self.state,
            started_at: self.started_at,
            duration_secs: (now - self.started_at).num_milliseconds() as f64 / 1000.0,
            current_slide: self.session.current_slide_index as u32 + 1,
            total_slides: self.session.slides.len(),
            transcript_entries_count: self.reconciler.len(),
            usage_reports_count: self.tracker.reports().len(),
            estimated_cost: self.tracker.estimated_cost(),
            muted: self.muted,
            resumable: self.resumable,
        }
    }

    async fn shutdown(&mut self) {
        self.state = LiveState::Ended;
        self.slide_select.cancel();
        self.auto_mute.cancel();
        if let Some(forwarder) = self.forwarder.take() {
            forwarder.abort();
        }

        if self.tracker.settle_ongoing().is_some() {
            debug!("Settled ongoing usage report at shutdown");
        }
        self.saver.flush(self.snapshot()).await;

        if let Err(e) = self.transport.close().await {
            warn!("Failed to close transport: {:#}", e);
        }

        info!(
            "Live session {} ended ({} entries, ${:.4} estimated)",
            self.session.id,
            self.reconciler.len(),
            self.tracker.estimated_cost()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ParsedSlide;

    #[test]
    fn test_explain_slide_texts() {
        let mut slide = Slide::from_parsed(ParsedSlide {
            page_number: 4,
            image_data_url: String::new(),
            text_content: String::new(),
            has_images: false,
        });
        slide.summary = "Carnot efficiency bound".to_string();

        assert_eq!(
            explain_slide_texts(&slide),
            vec![
                "ACTIVE SLIDE: 4".to_string(),
                "Slide 4 summary: Carnot efficiency bound".to_string()
            ]
        );
        assert!(resume_texts(&slide)[1].contains("resuming"));
    }
}
