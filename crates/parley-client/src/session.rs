// ABOUTME: Conversation session state machine owning the transcript
// ABOUTME: Single-flight request lifecycle with optimistic append and rollback

use crate::dispatch::{Dispatcher, Outcome};
use crate::error::ClientError;
use crate::models::{ConversationTurn, RequestState, Role, UsageReport};
use crate::persist::Persistence;
use crate::sse::FrameParser;
use crate::status::StatusQueue;
use crate::transport::{AgentTransport, ByteStream, ChatRequest, HistoryTurn};
use crate::UiSurface;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// How many prior turns ride along with each request. Older turns stay in
/// the local transcript but are not resent.
pub const HISTORY_WINDOW: usize = 10;

/// Character limit for a session title derived from the first message.
pub const TITLE_MAX_CHARS: usize = 50;

/// Placeholder indicator text shown while the request is in flight.
const WORKING_STATUS: &str = "Working on it...";

const DISCONNECTED_STATUS: &str = "Disconnected";

/// How a send ended, for callers that want more than the side effects.
#[derive(Debug, Clone, PartialEq)]
pub enum SendOutcome {
    /// Terminal `done` frame. `response` is None when the agent sent an
    /// empty response (nothing was appended).
    Completed {
        response: Option<String>,
        usage: UsageReport,
    },
    /// The agent reported an error frame; already surfaced to the user.
    AgentError { message: String },
    /// The agent sent a `cancelled` frame.
    CancelledByAgent,
    /// `cancel()` aborted the stream locally.
    Aborted,
}

/// One active conversation with the agent service.
///
/// Owns the transcript exclusively; collaborators only observe it through
/// the UI surface and persistence calls. At most one request may be in
/// flight: the flag is claimed with a compare-and-swap before the first
/// suspension point, so the invariant holds across threads as well as across
/// interleaved tasks.
pub struct ConversationSession {
    transport: Arc<dyn AgentTransport>,
    surface: Arc<dyn UiSurface>,
    persistence: Arc<dyn Persistence>,
    status: StatusQueue,
    session_id: Mutex<Option<String>>,
    transcript: Mutex<Vec<ConversationTurn>>,
    in_flight: AtomicBool,
    history_window: AtomicUsize,
    cancel: Mutex<CancellationToken>,
}

impl ConversationSession {
    pub fn new(
        transport: Arc<dyn AgentTransport>,
        surface: Arc<dyn UiSurface>,
        persistence: Arc<dyn Persistence>,
    ) -> Self {
        Self::with_status_interval(
            transport,
            surface,
            persistence,
            crate::status::DEFAULT_MIN_INTERVAL,
        )
    }

    pub fn with_status_interval(
        transport: Arc<dyn AgentTransport>,
        surface: Arc<dyn UiSurface>,
        persistence: Arc<dyn Persistence>,
        status_interval: Duration,
    ) -> Self {
        let status = StatusQueue::with_interval(surface.clone(), status_interval);
        Self {
            transport,
            surface,
            persistence,
            status,
            session_id: Mutex::new(None),
            transcript: Mutex::new(Vec::new()),
            in_flight: AtomicBool::new(false),
            history_window: AtomicUsize::new(HISTORY_WINDOW),
            cancel: Mutex::new(CancellationToken::new()),
        }
    }

    /// Select the conversation identity this session talks under.
    pub fn set_session(&self, session_id: impl Into<String>) {
        let id = session_id.into();
        tracing::debug!(session_id = %id, "session selected");
        *self.session_id.lock().expect("session id lock poisoned") = Some(id);
    }

    pub fn session_id(&self) -> Option<String> {
        self.session_id
            .lock()
            .expect("session id lock poisoned")
            .clone()
    }

    /// Override how many prior turns ride along with each request.
    pub fn set_history_window(&self, turns: usize) {
        self.history_window.store(turns, Ordering::SeqCst);
    }

    /// Replace the transcript, e.g. with history loaded from the store.
    pub fn load_transcript(&self, turns: Vec<ConversationTurn>) {
        *self.transcript.lock().expect("transcript lock poisoned") = turns;
    }

    pub fn transcript(&self) -> Vec<ConversationTurn> {
        self.transcript
            .lock()
            .expect("transcript lock poisoned")
            .clone()
    }

    pub fn state(&self) -> RequestState {
        if self.in_flight.load(Ordering::SeqCst) {
            RequestState::InFlight
        } else {
            RequestState::Idle
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.state() == RequestState::InFlight
    }

    /// Abort the current stream, if any. The session returns to idle without
    /// touching the transcript; this is not a terminal protocol event.
    pub fn cancel(&self) {
        self.cancel.lock().expect("cancel lock poisoned").cancel();
    }

    /// Send a message and drive its response stream to completion.
    pub async fn send(&self, text: &str) -> Result<SendOutcome, ClientError> {
        let text = text.trim();
        if text.is_empty() {
            tracing::warn!("send rejected: empty message");
            return Err(ClientError::EmptyMessage);
        }

        let session_id = match self.session_id() {
            Some(id) => id,
            None => {
                tracing::warn!("send rejected: no session selected");
                self.surface
                    .show_error(&ClientError::NoSession.user_message());
                return Err(ClientError::NoSession);
            }
        };

        // Claim the single-flight slot before anything awaits.
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::warn!("send rejected: a request is already in flight");
            return Err(ClientError::Busy);
        }

        // The guard releases the slot and re-enables the send affordance on
        // every exit path, including a dropped future.
        let _guard = FlightGuard { session: self };
        self.surface.set_send_enabled(false);

        self.run_request(&session_id, text).await
    }

    async fn run_request(
        &self,
        session_id: &str,
        text: &str,
    ) -> Result<SendOutcome, ClientError> {
        // Optimistic append, plus the sliding window of turns that precede
        // the new message.
        let (is_first_turn, conversation_history) = {
            let mut transcript = self.transcript.lock().expect("transcript lock poisoned");
            let is_first = transcript.is_empty();
            let window = self.history_window.load(Ordering::SeqCst);
            let start = transcript.len().saturating_sub(window);
            let history = transcript[start..].iter().map(HistoryTurn::from).collect();
            transcript.push(ConversationTurn::user(text));
            (is_first, history)
        };
        self.surface.append_transcript_entry(Role::User, text);
        self.spawn_save(session_id, Role::User, text);
        if is_first_turn {
            self.spawn_title_update(session_id, derive_title(text));
        }

        let indicator_id = uuid::Uuid::new_v4().to_string();
        self.surface.create_indicator(&indicator_id, WORKING_STATUS);

        let request = ChatRequest {
            message: text.to_string(),
            conversation_history,
            session_id: session_id.to_string(),
        };

        let cancel = self.fresh_cancel_token();

        let stream = match self.transport.open_stream(request).await {
            Ok(stream) => stream,
            Err(err) => return self.fail(&indicator_id, err),
        };

        self.pump(stream, indicator_id, session_id, cancel).await
    }

    async fn pump(
        &self,
        mut stream: ByteStream,
        indicator_id: String,
        session_id: &str,
        cancel: CancellationToken,
    ) -> Result<SendOutcome, ClientError> {
        let mut parser = FrameParser::new();
        let dispatcher = Dispatcher::new(
            self.surface.clone(),
            self.persistence.clone(),
            self.status.clone(),
            session_id.to_string(),
            indicator_id.clone(),
        );

        loop {
            let next = tokio::select! {
                _ = cancel.cancelled() => {
                    self.surface.remove_indicator(&indicator_id);
                    tracing::info!("stream aborted by user");
                    return Ok(SendOutcome::Aborted);
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(chunk)) => {
                    let frames = parser.push(&chunk);
                    if frames.is_empty() {
                        continue;
                    }
                    let mut transcript =
                        self.transcript.lock().expect("transcript lock poisoned");
                    for frame in frames {
                        match dispatcher.dispatch(frame, &mut transcript) {
                            Outcome::Continue => {}
                            Outcome::Completed { response, usage } => {
                                return Ok(SendOutcome::Completed { response, usage });
                            }
                            Outcome::Errored { message } => {
                                return Ok(SendOutcome::AgentError { message });
                            }
                            Outcome::Cancelled => return Ok(SendOutcome::CancelledByAgent),
                        }
                    }
                }
                Some(Err(err)) => return self.fail(&indicator_id, err),
                None => {
                    if parser.has_partial_input() {
                        tracing::debug!("discarding incomplete trailing block");
                    }
                    return self.fail(
                        &indicator_id,
                        ClientError::Stream("stream ended before a terminal event".to_string()),
                    );
                }
            }
        }
    }

    /// Transport-level failure: clear the indicator, undo the optimistic
    /// append, and surface a categorized message.
    fn fail(&self, indicator_id: &str, err: ClientError) -> Result<SendOutcome, ClientError> {
        self.surface.remove_indicator(indicator_id);
        self.rollback_pending_user_turn();
        self.surface.set_status(DISCONNECTED_STATUS, false);
        self.surface.show_error(&err.user_message());
        tracing::error!(error = %err, "chat request failed");
        Err(err)
    }

    fn rollback_pending_user_turn(&self) {
        let mut transcript = self.transcript.lock().expect("transcript lock poisoned");
        // The assistant turn only lands on a terminal frame, so a trailing
        // user turn here is still the optimistic one.
        if transcript
            .last()
            .map(|turn| turn.role == Role::User)
            .unwrap_or(false)
        {
            transcript.pop();
        }
    }

    /// A cancelled token stays cancelled, so hand each request a fresh one.
    fn fresh_cancel_token(&self) -> CancellationToken {
        let mut cancel = self.cancel.lock().expect("cancel lock poisoned");
        if cancel.is_cancelled() {
            *cancel = CancellationToken::new();
        }
        cancel.clone()
    }

    fn spawn_save(&self, session_id: &str, role: Role, content: &str) {
        let persistence = Arc::clone(&self.persistence);
        let session_id = session_id.to_string();
        let content = content.to_string();
        tokio::spawn(async move {
            if let Err(err) = persistence
                .save_message(&session_id, role, &content, None)
                .await
            {
                tracing::warn!(error = %err, "failed to persist user message");
            }
        });
    }

    fn spawn_title_update(&self, session_id: &str, title: String) {
        let persistence = Arc::clone(&self.persistence);
        let session_id = session_id.to_string();
        tracing::debug!(title = %title, "deriving session title from first message");
        tokio::spawn(async move {
            if let Err(err) = persistence.update_session_title(&session_id, &title).await {
                tracing::warn!(error = %err, "failed to update session title");
            }
        });
    }
}

struct FlightGuard<'a> {
    session: &'a ConversationSession,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.session.in_flight.store(false, Ordering::SeqCst);
        self.session.surface.set_send_enabled(true);
    }
}

/// Session title from the first user message: truncated to the character
/// limit with an ellipsis marker.
pub(crate) fn derive_title(text: &str) -> String {
    let mut chars = text.chars();
    let title: String = chars.by_ref().take(TITLE_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", title)
    } else {
        title
    }
}
