//! End-to-end session tests: fake capture, synthesis and model, real view,
//! driver and SQLite store, on paused tokio time.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use voicio_chat::{
    event_channel, ChatCommand, ChatError, ChatSession, ChatUpdate, EventSender, LanguageModel,
    ProxyMessage, SessionOptions, SessionPorts, APOLOGY,
};
use voicio_core::ports::{ConversationStore, MemoryKeyValueStore, NoClipboard};
use voicio_core::types::{Message, NoticeLevel, Role};
use voicio_session::{
    CaptureBackend, CaptureHandle, ControllerSettings, SessionError, SessionEvent, SessionState,
    SpeechId, SpeechSynthesizer,
};
use voicio_storage::{ConversationRepository, Database};

// ============================================================================
// Fakes
// ============================================================================

struct ScriptedModel {
    replies: Mutex<VecDeque<Result<String, ChatError>>>,
    calls: Mutex<Vec<Vec<ProxyMessage>>>,
    latency: Duration,
}

impl ScriptedModel {
    fn new(replies: Vec<Result<&str, ChatError>>) -> Arc<Self> {
        Self::with_latency(replies, Duration::from_millis(200))
    }

    fn with_latency(replies: Vec<Result<&str, ChatError>>, latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into_iter().map(|r| r.map(str::to_string)).collect()),
            calls: Mutex::new(Vec::new()),
            latency,
        })
    }

    fn calls(&self) -> Vec<Vec<ProxyMessage>> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn generate(&self, messages: &[ProxyMessage]) -> Result<String, ChatError> {
        self.calls.lock().unwrap().push(messages.to_vec());
        tokio::time::sleep(self.latency).await;
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok("ok".to_string()))
    }
}

struct TestCapture {
    opened: Arc<Mutex<Vec<CaptureHandle>>>,
    supported: bool,
}

impl CaptureBackend for TestCapture {
    fn open(&mut self, handle: CaptureHandle) -> Result<(), SessionError> {
        if !self.supported {
            return Err(SessionError::Unsupported("speech recognition".to_string()));
        }
        self.opened.lock().unwrap().push(handle);
        Ok(())
    }

    fn close(&mut self, _handle: CaptureHandle) {}
}

/// Finishes every utterance after a fixed playback time.
struct TestSynth {
    events: EventSender,
    spoken: Arc<Mutex<Vec<String>>>,
}

impl SpeechSynthesizer for TestSynth {
    fn speak(&mut self, id: SpeechId, text: &str) -> Result<(), SessionError> {
        self.spoken.lock().unwrap().push(text.to_string());
        let events = self.events.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            let _ = events.send(SessionEvent::SynthesisEnded(id));
        });
        Ok(())
    }

    fn cancel(&mut self) {}
}

// ============================================================================
// Harness
// ============================================================================

struct Harness {
    commands: mpsc::Sender<ChatCommand>,
    updates: mpsc::UnboundedReceiver<ChatUpdate>,
    events: EventSender,
    model: Arc<ScriptedModel>,
    store: Arc<ConversationRepository>,
    opened: Arc<Mutex<Vec<CaptureHandle>>>,
    spoken: Arc<Mutex<Vec<String>>>,
    seen: Vec<ChatUpdate>,
    task: JoinHandle<()>,
}

impl Harness {
    fn start(model: Arc<ScriptedModel>, auto_start: bool) -> Self {
        Self::build(model, auto_start, true)
    }

    fn build(model: Arc<ScriptedModel>, auto_start: bool, capture_supported: bool) -> Self {
        let (events_tx, events_rx) = event_channel();
        let opened = Arc::new(Mutex::new(Vec::new()));
        let spoken = Arc::new(Mutex::new(Vec::new()));
        let store = Arc::new(ConversationRepository::new(Arc::new(
            Database::in_memory().unwrap(),
        )));

        let ports = SessionPorts {
            capture: Box::new(TestCapture {
                opened: opened.clone(),
                supported: capture_supported,
            }),
            synth: Box::new(TestSynth {
                events: events_tx.clone(),
                spoken: spoken.clone(),
            }),
            model: model.clone(),
            store: store.clone(),
            storage: Arc::new(MemoryKeyValueStore::new()),
            clipboard: Arc::new(NoClipboard),
        };
        let options = SessionOptions {
            controller: ControllerSettings::default(),
            auto_start,
            user_id: "tester".to_string(),
            history_turns: 5,
        };

        let (session, updates) = ChatSession::new(options, ports, (events_tx.clone(), events_rx));
        let (commands, commands_rx) = mpsc::channel(16);
        let task = tokio::spawn(session.run(commands_rx));

        Self {
            commands,
            updates,
            events: events_tx,
            model,
            store,
            opened,
            spoken,
            seen: Vec::new(),
            task,
        }
    }

    fn current_handle(&self) -> CaptureHandle {
        *self.opened.lock().unwrap().last().unwrap()
    }

    fn say(&self, text: &str) {
        self.events
            .send(SessionEvent::CaptureResult {
                handle: self.current_handle(),
                text: text.to_string(),
                is_final: true,
            })
            .unwrap();
    }

    async fn send(&self, command: ChatCommand) {
        self.commands.send(command).await.unwrap();
    }

    async fn next_where(&mut self, mut pred: impl FnMut(&ChatUpdate) -> bool) -> ChatUpdate {
        let deadline = Duration::from_secs(120);
        tokio::time::timeout(deadline, async {
            loop {
                let update = self.updates.recv().await.expect("session ended");
                self.seen.push(update.clone());
                if pred(&update) {
                    return update;
                }
            }
        })
        .await
        .expect("timed out waiting for update")
    }

    async fn next_message(&mut self) -> Message {
        match self.next_where(|u| matches!(u, ChatUpdate::Message(_))).await {
            ChatUpdate::Message(message) => message,
            _ => unreachable!(),
        }
    }

    async fn wait_state(&mut self, state: SessionState) {
        self.next_where(|u| *u == ChatUpdate::State(state)).await;
    }

    async fn shutdown(self) {
        self.commands.send(ChatCommand::Shutdown).await.unwrap();
        self.task.await.unwrap();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test(start_paused = true)]
async fn test_results_within_threshold_send_once() {
    let mut h = Harness::start(ScriptedModel::new(vec![Ok("Sunny and warm.")]), true);
    h.wait_state(SessionState::Listening).await;

    h.say("what's the");
    tokio::time::sleep(Duration::from_millis(600)).await;
    h.say("weather today");

    let user = h.next_message().await;
    assert_eq!(user.role, Role::User);
    assert_eq!(user.content, "what's the weather today");

    let agent = h.next_message().await;
    assert_eq!(agent.role, Role::Agent);
    assert_eq!(agent.content, "Sunny and warm.");

    let calls = h.model.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].len(), 1);
    assert!(calls[0][0].content.ends_with("prompt: what's the weather today"));

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_separate_pauses_send_separately_and_rearm() {
    let mut h = Harness::start(ScriptedModel::new(vec![Ok("first reply"), Ok("second reply")]), true);
    h.wait_state(SessionState::Listening).await;

    h.say("first question");
    assert_eq!(h.next_message().await.content, "first question");
    assert_eq!(h.next_message().await.content, "first reply");

    // Playback ends, settle delay passes, capture reopens on a new handle.
    h.wait_state(SessionState::Speaking).await;
    h.wait_state(SessionState::Listening).await;
    assert_eq!(h.current_handle(), CaptureHandle(2));
    assert_eq!(*h.spoken.lock().unwrap(), vec!["first reply".to_string()]);

    h.say("second question");
    assert_eq!(h.next_message().await.content, "second question");
    assert_eq!(h.next_message().await.content, "second reply");

    // The second payload carries the first exchange as history.
    let calls = h.model.calls();
    assert_eq!(calls.len(), 2);
    let roles: Vec<&str> = calls[1].iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["user", "assistant", "user"]);
    assert_eq!(calls[1][0].content, "first question");

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_proxy_failure_appends_apology_and_resumes() {
    let mut h = Harness::start(
        ScriptedModel::new(vec![Err(ChatError::ProxyStatus {
            status: 500,
            message: "boom".to_string(),
        })]),
        true,
    );
    h.wait_state(SessionState::Listening).await;

    h.say("are you there");
    assert_eq!(h.next_message().await.content, "are you there");
    let apology = h.next_message().await;
    assert_eq!(apology.role, Role::Agent);
    assert_eq!(apology.content, APOLOGY);

    h.wait_state(SessionState::Listening).await;
    let messages = h.seen.iter().filter(|u| matches!(u, ChatUpdate::Message(_))).count();
    assert_eq!(messages, 2);

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_manual_text_without_voice() {
    let mut h = Harness::start(ScriptedModel::new(vec![Ok("It is noon.")]), false);
    h.send(ChatCommand::SendText("what time is it".to_string())).await;

    assert_eq!(h.next_message().await.content, "what time is it");
    assert_eq!(h.next_message().await.content, "It is noon.");
    h.wait_state(SessionState::Idle).await;
    assert!(h.opened.lock().unwrap().is_empty());

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_second_submit_while_in_flight_rejected() {
    let model = ScriptedModel::with_latency(vec![Ok("slow reply")], Duration::from_secs(5));
    let mut h = Harness::start(model, false);

    h.send(ChatCommand::SendText("one".to_string())).await;
    h.wait_state(SessionState::Sending).await;
    h.send(ChatCommand::SendText("two".to_string())).await;

    let notice = h
        .next_where(|u| matches!(u, ChatUpdate::Notice(_)))
        .await;
    match notice {
        ChatUpdate::Notice(n) => assert_eq!(n.level, NoticeLevel::Warning),
        _ => unreachable!(),
    }

    assert_eq!(h.next_message().await.content, "slow reply");
    assert_eq!(h.model.calls().len(), 1);

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_reply_after_stop_is_appended_not_spoken() {
    let model = ScriptedModel::with_latency(vec![Ok("late answer")], Duration::from_secs(3));
    let mut h = Harness::start(model, true);
    h.wait_state(SessionState::Listening).await;

    h.say("quick question");
    h.wait_state(SessionState::Sending).await;
    h.send(ChatCommand::StopListening).await;
    h.wait_state(SessionState::Idle).await;

    // The user turn was already seen while waiting for Idle.
    assert!(h.seen.iter().any(|u| matches!(u, ChatUpdate::Message(m) if m.content == "quick question")));
    assert_eq!(h.next_message().await.content, "late answer");
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(h.spoken.lock().unwrap().is_empty());
    assert!(!h.seen.contains(&ChatUpdate::State(SessionState::Speaking)));

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_submit_after_stop_waits_for_outstanding_reply() {
    let model = ScriptedModel::with_latency(
        vec![Ok("reply to one"), Ok("reply to two")],
        Duration::from_secs(3),
    );
    let mut h = Harness::start(model, false);

    h.send(ChatCommand::SendText("one".to_string())).await;
    h.wait_state(SessionState::Sending).await;
    h.send(ChatCommand::StopListening).await;
    h.wait_state(SessionState::Idle).await;

    h.send(ChatCommand::SendText("two".to_string())).await;
    let notice = h.next_where(|u| matches!(u, ChatUpdate::Notice(_))).await;
    assert!(matches!(notice, ChatUpdate::Notice(n) if n.level == NoticeLevel::Warning));

    assert_eq!(h.next_message().await.content, "reply to one");
    assert_eq!(h.model.calls().len(), 1);

    h.send(ChatCommand::SendText("two".to_string())).await;
    assert_eq!(h.next_message().await.content, "two");
    assert_eq!(h.next_message().await.content, "reply to two");
    h.wait_state(SessionState::Idle).await;

    let contents: Vec<String> = h
        .seen
        .iter()
        .filter_map(|u| match u {
            ChatUpdate::Message(m) => Some(m.content.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(contents, vec!["one", "reply to one", "two", "reply to two"]);
    assert_eq!(h.model.calls().len(), 2);
    assert_eq!(*h.spoken.lock().unwrap(), vec!["reply to two".to_string()]);

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_save_conversation_to_store() {
    let mut h = Harness::start(ScriptedModel::new(vec![Ok("Hello!")]), false);
    h.send(ChatCommand::SendText("hi".to_string())).await;
    h.next_message().await;
    h.next_message().await;

    h.send(ChatCommand::Save).await;
    let id = match h.next_where(|u| matches!(u, ChatUpdate::Saved(_))).await {
        ChatUpdate::Saved(id) => id,
        _ => unreachable!(),
    };
    h.next_where(|u| *u == ChatUpdate::Cleared).await;

    let record = h.store.get(id).await.unwrap().unwrap();
    assert_eq!(record.user_id, "tester");
    let contents: Vec<&str> = record.messages.iter().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["hi", "Hello!"]);
    assert_eq!(h.store.messages(id).await.unwrap().len(), 2);

    h.send(ChatCommand::History).await;
    match h.next_where(|u| matches!(u, ChatUpdate::History(_))).await {
        ChatUpdate::History(records) => {
            assert_eq!(records.len(), 1);
            assert_eq!(records[0].id, id);
        }
        _ => unreachable!(),
    }

    h.send(ChatCommand::Open(id)).await;
    match h.next_where(|u| matches!(u, ChatUpdate::Messages(m) if !m.is_empty())).await {
        ChatUpdate::Messages(messages) => assert_eq!(messages.len(), 2),
        _ => unreachable!(),
    }

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_save_empty_conversation_rejected() {
    let mut h = Harness::start(ScriptedModel::new(vec![]), false);
    h.send(ChatCommand::Save).await;

    let notice = h.next_where(|u| matches!(u, ChatUpdate::Notice(_))).await;
    assert!(matches!(notice, ChatUpdate::Notice(n) if n.text == "Nothing to save yet."));
    assert!(!h.seen.iter().any(|u| matches!(u, ChatUpdate::Saved(_))));
    assert_eq!(h.store.count().unwrap(), 0);

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_unsupported_capture_still_allows_typing() {
    let mut h = Harness::build(ScriptedModel::new(vec![Ok("typed reply")]), true, false);

    let notice = h.next_where(|u| matches!(u, ChatUpdate::Notice(_))).await;
    assert!(matches!(notice, ChatUpdate::Notice(n) if n.level == NoticeLevel::Error));

    h.send(ChatCommand::SendText("typed".to_string())).await;
    assert_eq!(h.next_message().await.content, "typed");
    assert_eq!(h.next_message().await.content, "typed reply");

    h.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_tone_applies_to_next_prompt() {
    let mut h = Harness::start(ScriptedModel::new(vec![Ok("Certainly.")]), false);
    h.send(ChatCommand::SetTone("Formal".to_string())).await;
    h.next_where(|u| *u == ChatUpdate::Tone(voicio_core::types::Tone::Formal)).await;

    h.send(ChatCommand::SendText("summarize".to_string())).await;
    h.next_message().await;
    h.next_message().await;

    let calls = h.model.calls();
    assert!(calls[0][0].content.starts_with("You are a highly knowledgeable"));

    h.shutdown().await;
}
