// ABOUTME: Streaming chat client library for the parley agent service
// ABOUTME: Frame decoding, event dispatch, status pacing, and session state

mod dispatch;
pub mod error;
pub mod event;
pub mod models;
pub mod persist;
pub mod session;
pub mod sse;
pub mod status;
pub mod transport;

pub use error::{ClientError, Result};
pub use event::StreamEvent;
pub use models::{ConversationTurn, RequestState, Role, UsageReport};
pub use persist::{HttpPersistence, Persistence};
pub use session::{ConversationSession, SendOutcome, HISTORY_WINDOW, TITLE_MAX_CHARS};
pub use sse::{Frame, FrameParser};
pub use status::{StatusQueue, DEFAULT_MIN_INTERVAL};
pub use transport::{AgentTransport, ByteStream, ChatRequest, HistoryTurn, HttpTransport};

// ============================================================================
// Callback Traits
// ============================================================================

/// UI surface the client drives. The library owns none of the rendering; a
/// front-end implements this against whatever it draws with.
///
/// Status indicators are transient "the agent is working" elements keyed by
/// id: the session creates one per request, the status queue mutates its
/// text (paced), and terminal events remove it. `update_indicator` for an id
/// that is gone must be a no-op.
pub trait UiSurface: Send + Sync {
    /// Ambient status line outside the transcript (e.g. a header badge).
    fn set_status(&self, text: &str, healthy: bool);
    fn show_error(&self, text: &str);
    fn append_transcript_entry(&self, role: Role, text: &str);
    fn set_send_enabled(&self, enabled: bool);
    fn create_indicator(&self, id: &str, text: &str);
    fn update_indicator(&self, id: &str, text: &str);
    fn remove_indicator(&self, id: &str);
}
