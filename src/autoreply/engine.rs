//! Auto-reply Engine
//!
//! Records every observed chat line, decides which ones get a reply, and runs
//! each admitted reply as its own task: cooldown, context, completion,
//! sanitize, chunk, dispatch.

use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use super::chunking::{self, DEFAULT_CHUNK_SIZE};
use super::config::ReplyConfig;
use super::context;
use super::cooldown::CooldownGate;
use super::history::{ChatHistory, ChatHistoryEntry, HISTORY_CAPACITY};
use super::policy::{should_reply, ChatEvent};
use super::sanitize;
use crate::ai::{CompletionError, Prompt, Providers};
use crate::channels::{emit_event, Dispatcher, EventLog, TracingEventLog};

/// Pause between two chunks of the same reply
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(500);

/// Delivery and retention knobs that are not part of the user settings
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Maximum code points per outbound chunk
    pub chunk_size: usize,
    /// Pause between consecutive chunks
    pub chunk_delay: Duration,
    /// Chat history capacity
    pub history_capacity: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_delay: DEFAULT_CHUNK_DELAY,
            history_capacity: HISTORY_CAPACITY,
        }
    }
}

/// How a reply attempt ended
#[derive(Debug)]
pub enum ReplyOutcome {
    /// All chunks were dispatched
    Sent { chunks: usize },
    /// Another reply went out within the cooldown window
    CooledDown,
    /// The provider call failed
    Failed(CompletionError),
    /// The provider answered with nothing usable
    Empty,
    /// The dispatcher rejected a chunk; remaining chunks were dropped
    DispatchFailed { sent: usize, error: String },
}

/// History and cooldown share one lock so gating decisions see both consistently
#[derive(Debug)]
struct ReplyState {
    history: ChatHistory,
    cooldown: CooldownGate,
}

/// The reply engine
pub struct ReplyEngine {
    state: Mutex<ReplyState>,
    config: RwLock<Arc<ReplyConfig>>,
    enabled: AtomicBool,
    tasks: TaskTracker,
    providers: Providers,
    dispatcher: Arc<dyn Dispatcher>,
    events: Arc<dyn EventLog>,
    options: EngineOptions,
}

impl std::fmt::Debug for ReplyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplyEngine")
            .field("enabled", &self.is_enabled())
            .field("providers", &self.providers)
            .field("options", &self.options)
            .finish()
    }
}

impl ReplyEngine {
    /// Create a disabled engine
    pub fn new(config: ReplyConfig, providers: Providers, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self::with_options(config, providers, dispatcher, EngineOptions::default())
    }

    /// Create a disabled engine with custom delivery options
    pub fn with_options(
        config: ReplyConfig,
        providers: Providers,
        dispatcher: Arc<dyn Dispatcher>,
        options: EngineOptions,
    ) -> Self {
        Self {
            state: Mutex::new(ReplyState {
                history: ChatHistory::with_capacity(options.history_capacity),
                cooldown: CooldownGate::new(),
            }),
            config: RwLock::new(Arc::new(config)),
            enabled: AtomicBool::new(false),
            tasks: TaskTracker::new(),
            providers,
            dispatcher,
            events: Arc::new(TracingEventLog),
            options,
        }
    }

    /// Route notable events to `events` instead of the tracing log
    pub fn with_event_log(mut self, events: Arc<dyn EventLog>) -> Self {
        self.events = events;
        self
    }

    /// Current configuration snapshot
    pub fn config(&self) -> Arc<ReplyConfig> {
        Arc::clone(&self.config.read())
    }

    /// Replace the whole configuration
    pub fn set_config(&self, config: ReplyConfig) {
        if let Err(e) = config.validate() {
            warn!(error = %e, "reply config cannot be used as-is");
        }
        if !config.is_known_model() {
            warn!(
                backend = %config.backend(),
                model = %config.model(),
                "model is not in the known model list"
            );
        }
        *self.config.write() = Arc::new(config);
    }

    /// Whether admitted events get a reply
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Switch auto-reply on or off
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
        info!(enabled, "auto-reply toggled");
    }

    /// Flip the enabled flag, returning the new state
    pub fn toggle(&self) -> bool {
        let enabled = !self.enabled.fetch_xor(true, Ordering::SeqCst);
        info!(enabled, "auto-reply toggled");
        enabled
    }

    /// Copy of the chat history
    pub fn chat_log(&self) -> Vec<ChatHistoryEntry> {
        self.state.lock().history.snapshot()
    }

    /// Append an observed line to the history
    pub fn record(&self, event: &ChatEvent) {
        self.state.lock().history.append_at(
            event.observed_at,
            event.sender_name.as_str(),
            event.text.as_str(),
        );
    }

    /// Whether `event` would be admitted right now
    pub fn admits(&self, event: &ChatEvent) -> bool {
        should_reply(event, &self.config(), self.is_enabled())
    }

    /// Record `event` and, if admitted, spawn a reply task for it.
    ///
    /// Must be called from within a tokio runtime. Returns whether the event
    /// was admitted; the spawned task may still be stopped by the cooldown.
    pub fn observe(self: &Arc<Self>, event: ChatEvent) -> bool {
        self.record(&event);
        if !self.admits(&event) {
            return false;
        }

        let engine = Arc::clone(self);
        self.tasks.spawn(async move {
            let outcome = engine.reply(&event.sender_name, &event.text).await;
            debug!(sender = %event.sender_name, ?outcome, "reply task finished");
        });
        true
    }

    /// Number of spawned reply tasks that have not finished
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait until every spawned reply task has finished, panicked ones included
    pub async fn drain(&self) {
        self.tasks.close();
        self.tasks.wait().await;
    }

    /// Run one reply attempt to completion
    pub async fn reply(&self, sender: &str, message: &str) -> ReplyOutcome {
        let config = self.config();

        let window = {
            let mut state = self.state.lock();
            if !state.cooldown.try_acquire(config.cooldown()) {
                debug!(sender, "reply suppressed by cooldown");
                return ReplyOutcome::CooledDown;
            }
            state.history.window(config.previous_chat_count)
        };

        let context = context::render(&window);
        let prompt = Prompt::build(&context, sender, message, &config.chat_instructions);

        let text = match self.providers.complete(&prompt, &config).await {
            Ok(text) => text,
            Err(CompletionError::EmptyResponse) => {
                emit_event(self.events.as_ref(), "empty response");
                return ReplyOutcome::Empty;
            }
            Err(e) => {
                warn!(backend = %config.backend(), error = %e, "completion failed");
                return ReplyOutcome::Failed(e);
            }
        };

        if text.trim().is_empty() {
            emit_event(self.events.as_ref(), "empty response");
            return ReplyOutcome::Empty;
        }

        let cleaned = sanitize::clean(&text);
        let chunks = chunking::split(&cleaned, self.options.chunk_size);
        if chunks.is_empty() {
            emit_event(self.events.as_ref(), "empty response after sanitizing");
            return ReplyOutcome::Empty;
        }

        self.dispatch(&chunks).await
    }

    async fn dispatch(&self, chunks: &[String]) -> ReplyOutcome {
        for (i, chunk) in chunks.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.options.chunk_delay).await;
            }
            if let Err(e) = self.dispatcher.send(chunk).await {
                warn!(error = %e, sent = i, total = chunks.len(), "failed to dispatch reply chunk");
                return ReplyOutcome::DispatchFailed {
                    sent: i,
                    error: e.to_string(),
                };
            }
        }
        info!(chunks = chunks.len(), "reply dispatched");
        ReplyOutcome::Sent {
            chunks: chunks.len(),
        }
    }

    /// Forget the cooldown so the next admitted event replies immediately
    pub fn clear_cooldown(&self) {
        self.state.lock().cooldown.reset();
    }
}

/// Create a shared reply engine
pub fn create_engine(
    config: ReplyConfig,
    providers: Providers,
    dispatcher: Arc<dyn Dispatcher>,
) -> Arc<ReplyEngine> {
    Arc::new(ReplyEngine::new(config, providers, dispatcher))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::{CompletionClient, Result as AiResult};
    use crate::autoreply::config::Backend;
    use crate::channels::{ChannelError, ChannelResult};
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    /// Replays canned results and records every prompt it sees
    struct ScriptedClient {
        backend: Backend,
        replies: Mutex<VecDeque<AiResult<String>>>,
        prompts: Mutex<Vec<Prompt>>,
    }

    impl ScriptedClient {
        fn new(backend: Backend, replies: Vec<AiResult<String>>) -> Arc<Self> {
            Arc::new(Self {
                backend,
                replies: Mutex::new(replies.into()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> usize {
            self.prompts.lock().len()
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        fn backend(&self) -> Backend {
            self.backend
        }

        async fn complete(&self, prompt: &Prompt, _config: &ReplyConfig) -> AiResult<String> {
            self.prompts.lock().push(prompt.clone());
            self.replies
                .lock()
                .pop_front()
                .unwrap_or(Err(CompletionError::EmptyResponse))
        }
    }

    #[derive(Default)]
    struct RecordingDispatcher {
        sent: Mutex<Vec<String>>,
        fail_after: Option<usize>,
    }

    #[async_trait]
    impl Dispatcher for RecordingDispatcher {
        async fn send(&self, text: &str) -> ChannelResult<()> {
            let mut sent = self.sent.lock();
            if self.fail_after.is_some_and(|n| sent.len() >= n) {
                return Err(ChannelError::NotConnected);
            }
            sent.push(text.to_string());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingLog(Mutex<Vec<String>>);

    impl EventLog for RecordingLog {
        fn log_event(&self, message: &str) {
            self.0.lock().push(message.to_string());
        }
    }

    struct Harness {
        engine: Arc<ReplyEngine>,
        openai: Arc<ScriptedClient>,
        anthropic: Arc<ScriptedClient>,
        dispatcher: Arc<RecordingDispatcher>,
        log: Arc<RecordingLog>,
    }

    fn harness(
        config: ReplyConfig,
        openai: Vec<AiResult<String>>,
        anthropic: Vec<AiResult<String>>,
        dispatcher: RecordingDispatcher,
    ) -> Harness {
        let openai = ScriptedClient::new(Backend::OpenAi, openai);
        let anthropic = ScriptedClient::new(Backend::Anthropic, anthropic);
        let dispatcher = Arc::new(dispatcher);
        let log = Arc::new(RecordingLog::default());
        let options = EngineOptions {
            chunk_delay: Duration::ZERO,
            ..EngineOptions::default()
        };
        let engine = ReplyEngine::with_options(
            config,
            Providers::new(openai.clone(), anthropic.clone()),
            dispatcher.clone(),
            options,
        )
        .with_event_log(log.clone());
        engine.set_enabled(true);
        Harness {
            engine: Arc::new(engine),
            openai,
            anthropic,
            dispatcher,
            log,
        }
    }

    fn ok(text: &str) -> AiResult<String> {
        Ok(text.to_string())
    }

    #[tokio::test]
    async fn test_reply_dispatches_sanitized_chunks() {
        let long = format!("{} 😀 done", "x".repeat(150));
        let h = harness(ReplyConfig::default(), vec![ok(&long)], vec![], Default::default());

        let outcome = h.engine.reply("Bob", "+hi").await;
        assert!(matches!(outcome, ReplyOutcome::Sent { chunks: 2 }));

        let sent = h.dispatcher.sent.lock().clone();
        assert_eq!(sent[0].chars().count(), 95);
        assert_eq!(sent.concat(), format!("{}  done", "x".repeat(150)));
    }

    #[tokio::test]
    async fn test_cooldown_blocks_second_reply() {
        let h = harness(
            ReplyConfig::default(),
            vec![ok("one"), ok("two")],
            vec![],
            Default::default(),
        );

        assert!(matches!(h.engine.reply("Bob", "+a").await, ReplyOutcome::Sent { .. }));
        assert!(matches!(h.engine.reply("Eve", "+b").await, ReplyOutcome::CooledDown));
        assert_eq!(h.openai.calls(), 1);
        assert_eq!(*h.dispatcher.sent.lock(), vec!["one".to_string()]);

        h.engine.clear_cooldown();
        assert!(matches!(h.engine.reply("Eve", "+b").await, ReplyOutcome::Sent { .. }));
    }

    #[tokio::test]
    async fn test_backend_follows_config() {
        let config = ReplyConfig::default().with_backend(Backend::Anthropic);
        let h = harness(config, vec![], vec![ok("from claude")], Default::default());

        h.engine.reply("Bob", "+hi").await;
        assert_eq!(h.openai.calls(), 0);
        assert_eq!(h.anthropic.calls(), 1);
        assert_eq!(*h.dispatcher.sent.lock(), vec!["from claude".to_string()]);
    }

    #[tokio::test]
    async fn test_prompt_carries_context_window() {
        let mut config = ReplyConfig::default();
        config.previous_chat_count = 2;
        let h = harness(config, vec![ok("sure")], vec![], Default::default());

        for (who, msg) in [("A", "one"), ("B", "two"), ("C", "three")] {
            h.engine.record(&ChatEvent::new(0, who, msg));
        }
        h.engine.reply("C", "+three").await;

        let prompt = h.openai.prompts.lock()[0].clone();
        assert!(prompt.user.starts_with("Previous Chatlog:\n"));
        assert!(!prompt.user.contains(":A:one"));
        assert!(prompt.user.contains(":B:two\n"));
        assert!(prompt.user.contains(":C:three\n"));
        assert!(prompt.user.ends_with("The User C asks: +three"));
    }

    #[tokio::test]
    async fn test_blank_reply_logs_empty_response() {
        let h = harness(ReplyConfig::default(), vec![ok("   \n")], vec![], Default::default());

        assert!(matches!(h.engine.reply("Bob", "+hi").await, ReplyOutcome::Empty));
        assert!(h.dispatcher.sent.lock().is_empty());
        assert_eq!(*h.log.0.lock(), vec!["empty response".to_string()]);
    }

    #[tokio::test]
    async fn test_unprintable_reply_sends_nothing() {
        let h = harness(ReplyConfig::default(), vec![ok("😀🎉")], vec![], Default::default());

        assert!(matches!(h.engine.reply("Bob", "+hi").await, ReplyOutcome::Empty));
        assert!(h.dispatcher.sent.lock().is_empty());
    }

    #[tokio::test]
    async fn test_provider_failure_is_silent() {
        let h = harness(
            ReplyConfig::default(),
            vec![Err(CompletionError::Network("connection refused".into()))],
            vec![],
            Default::default(),
        );

        let outcome = h.engine.reply("Bob", "+hi").await;
        assert!(matches!(outcome, ReplyOutcome::Failed(CompletionError::Network(_))));
        assert!(h.dispatcher.sent.lock().is_empty());
        assert!(h.log.0.lock().is_empty());
    }

    #[tokio::test]
    async fn test_dispatch_failure_stops_remaining_chunks() {
        let dispatcher = RecordingDispatcher {
            fail_after: Some(1),
            ..Default::default()
        };
        let h = harness(ReplyConfig::default(), vec![ok(&"y".repeat(300))], vec![], dispatcher);

        let outcome = h.engine.reply("Bob", "+hi").await;
        assert!(matches!(outcome, ReplyOutcome::DispatchFailed { sent: 1, .. }));
        assert_eq!(h.dispatcher.sent.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_observe_records_everything_but_admits_selectively() {
        let h = harness(ReplyConfig::default(), vec![ok("hey")], vec![], Default::default());

        assert!(!h.engine.observe(ChatEvent::new(1, "Bob", "just chatting")));
        assert!(!h.engine.observe(ChatEvent::new(2, "Eve", "[JOIN] Eve")));
        assert!(h.engine.observe(ChatEvent::new(1, "Bob", "+hi")));

        let log: Vec<_> = h.engine.chat_log().into_iter().map(|e| e.message).collect();
        assert_eq!(log, vec!["just chatting", "[JOIN] Eve", "+hi"]);

        tokio::time::timeout(Duration::from_secs(5), h.engine.drain())
            .await
            .unwrap();
        assert_eq!(h.engine.in_flight(), 0);
        assert_eq!(*h.dispatcher.sent.lock(), vec!["hey".to_string()]);
    }

    struct PanickingDispatcher;

    #[async_trait]
    impl Dispatcher for PanickingDispatcher {
        async fn send(&self, _text: &str) -> ChannelResult<()> {
            panic!("dispatcher blew up");
        }
    }

    #[tokio::test]
    async fn test_drain_survives_panicking_reply_task() {
        let providers = Providers::new(
            ScriptedClient::new(Backend::OpenAi, vec![ok("hey")]),
            ScriptedClient::new(Backend::Anthropic, vec![]),
        );
        let engine = Arc::new(ReplyEngine::new(
            ReplyConfig::default(),
            providers,
            Arc::new(PanickingDispatcher),
        ));
        engine.set_enabled(true);

        assert!(engine.observe(ChatEvent::new(1, "Bob", "+hi")));
        tokio::time::timeout(Duration::from_secs(2), engine.drain())
            .await
            .unwrap();
        assert_eq!(engine.in_flight(), 0);

        // Tracking keeps working after a drain
        engine.clear_cooldown();
        assert!(engine.observe(ChatEvent::new(1, "Bob", "+again")));
        tokio::time::timeout(Duration::from_secs(2), engine.drain())
            .await
            .unwrap();
        assert_eq!(engine.in_flight(), 0);
    }

    #[tokio::test]
    async fn test_disabled_engine_records_but_never_replies() {
        let h = harness(ReplyConfig::default(), vec![ok("hey")], vec![], Default::default());
        h.engine.set_enabled(false);

        assert!(!h.engine.observe(ChatEvent::new(1, "Bob", "+hi")));
        assert_eq!(h.engine.chat_log().len(), 1);
        assert_eq!(h.openai.calls(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_replies_single_winner() {
        let replies = (0..8).map(|_| ok("hi")).collect();
        let h = harness(ReplyConfig::default(), replies, vec![], Default::default());

        let sent = Arc::new(AtomicUsize::new(0));
        let tasks: Vec<_> = (0..8)
            .map(|i| {
                let engine = Arc::clone(&h.engine);
                let sent = Arc::clone(&sent);
                tokio::spawn(async move {
                    if let ReplyOutcome::Sent { .. } = engine.reply(&format!("u{i}"), "+x").await {
                        sent.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(sent.load(Ordering::SeqCst), 1);
        assert_eq!(h.openai.calls(), 1);
    }

    #[test]
    fn test_toggle_and_config_swap() {
        let h = harness(ReplyConfig::default(), vec![], vec![], Default::default());
        assert!(h.engine.is_enabled());
        assert!(!h.engine.toggle());
        assert!(h.engine.toggle());

        let before = h.engine.config();
        h.engine.set_config(ReplyConfig::default().with_prefix("!"));
        assert_eq!(before.prefix, "+");
        assert_eq!(h.engine.config().prefix, "!");
    }

    #[test]
    fn test_history_capacity_option() {
        let dispatcher: Arc<dyn Dispatcher> = Arc::new(RecordingDispatcher::default());
        let options = EngineOptions {
            history_capacity: 2,
            ..EngineOptions::default()
        };
        let providers = Providers::new(
            ScriptedClient::new(Backend::OpenAi, vec![]),
            ScriptedClient::new(Backend::Anthropic, vec![]),
        );
        let engine = ReplyEngine::with_options(ReplyConfig::default(), providers, dispatcher, options);

        for msg in ["a", "b", "c"] {
            engine.record(&ChatEvent::new(0, "u", msg));
        }
        let log: Vec<_> = engine.chat_log().into_iter().map(|e| e.message).collect();
        assert_eq!(log, vec!["b", "c"]);
    }
}
