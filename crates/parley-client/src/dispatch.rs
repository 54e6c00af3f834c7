// ABOUTME: Per-request event dispatcher applying UI and persistence side effects
// ABOUTME: Maps each decoded frame to status, transcript, and store mutations

use crate::event::StreamEvent;
use crate::models::{ConversationTurn, Role, UsageReport};
use crate::persist::Persistence;
use crate::sse::Frame;
use crate::status::StatusQueue;
use crate::UiSurface;
use std::sync::Arc;

/// Status text shown when the agent acknowledges the connection.
const CONNECTED_STATUS: &str = "Connected to agent";
/// Ambient status once a response has landed, unless the server sent its own.
const READY_STATUS: &str = "Ready";

/// What the session loop should do after a frame was handled.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    Continue,
    Completed {
        response: Option<String>,
        usage: UsageReport,
    },
    Errored {
        message: String,
    },
    Cancelled,
}

/// Routes one request's stream events to the collaborators.
///
/// Dispatch is synchronous: status text goes through the paced queue and
/// persistence runs on spawned tasks, so frames are always handled in
/// arrival order with nothing awaited in between.
pub(crate) struct Dispatcher {
    surface: Arc<dyn UiSurface>,
    persistence: Arc<dyn Persistence>,
    status: StatusQueue,
    session_id: String,
    indicator_id: String,
}

impl Dispatcher {
    pub fn new(
        surface: Arc<dyn UiSurface>,
        persistence: Arc<dyn Persistence>,
        status: StatusQueue,
        session_id: String,
        indicator_id: String,
    ) -> Self {
        Self {
            surface,
            persistence,
            status,
            session_id,
            indicator_id,
        }
    }

    pub fn dispatch(&self, frame: Frame, transcript: &mut Vec<ConversationTurn>) -> Outcome {
        let event = match StreamEvent::from_frame(&frame) {
            Ok(event) => event,
            Err(err) => {
                tracing::warn!(event = %frame.event, error = %err, "dropping malformed frame");
                return Outcome::Continue;
            }
        };

        match event {
            StreamEvent::Connected => {
                self.status.enqueue(&self.indicator_id, CONNECTED_STATUS);
                Outcome::Continue
            }
            StreamEvent::Thinking { status } => {
                self.status.enqueue(&self.indicator_id, &status);
                self.surface.set_status(&status, true);
                Outcome::Continue
            }
            StreamEvent::Tool {
                display_name,
                tool_count,
                max_tools,
            } => {
                let text = format!("{} ({}/{})", display_name, tool_count, max_tools);
                self.status.enqueue(&self.indicator_id, &text);
                self.surface.set_status(&display_name, true);
                Outcome::Continue
            }
            StreamEvent::Done {
                response,
                status,
                usage,
            } => {
                self.surface.remove_indicator(&self.indicator_id);
                let ready = status.unwrap_or_else(|| READY_STATUS.to_string());
                self.surface.set_status(&ready, true);

                if response.is_empty() {
                    tracing::info!("stream completed with empty response");
                    return Outcome::Completed {
                        response: None,
                        usage,
                    };
                }

                transcript.push(ConversationTurn::assistant(response.clone()));
                self.surface
                    .append_transcript_entry(Role::Assistant, &response);
                self.persist_assistant(response.clone(), usage.clone());

                if let Some(summary) = usage.summary() {
                    tracing::info!(usage = %summary, "response usage");
                }
                tracing::info!(response_len = response.len(), "stream completed");
                Outcome::Completed {
                    response: Some(response),
                    usage,
                }
            }
            StreamEvent::Error { message } => {
                self.surface.remove_indicator(&self.indicator_id);
                self.surface.show_error(&message);
                tracing::error!(message = %message, "agent reported an error");
                Outcome::Errored { message }
            }
            StreamEvent::Cancelled => {
                self.surface.remove_indicator(&self.indicator_id);
                tracing::info!("agent cancelled the request");
                Outcome::Cancelled
            }
            StreamEvent::Unknown { event } => {
                tracing::debug!(event = %event, "ignoring unknown event type");
                Outcome::Continue
            }
        }
    }

    fn persist_assistant(&self, content: String, usage: UsageReport) {
        let persistence = Arc::clone(&self.persistence);
        let session_id = self.session_id.clone();
        let usage = if usage.is_empty() { None } else { Some(usage) };
        tokio::spawn(async move {
            if let Err(err) = persistence
                .save_message(&session_id, Role::Assistant, &content, usage)
                .await
            {
                tracing::warn!(error = %err, "failed to persist assistant message");
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClientError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct FakeSurface {
        removed: Mutex<Vec<String>>,
        errors: Mutex<Vec<String>>,
        ambient: Mutex<Vec<(String, bool)>>,
        entries: Mutex<Vec<(Role, String)>>,
    }

    impl UiSurface for FakeSurface {
        fn set_status(&self, text: &str, healthy: bool) {
            self.ambient.lock().unwrap().push((text.to_string(), healthy));
        }
        fn show_error(&self, text: &str) {
            self.errors.lock().unwrap().push(text.to_string());
        }
        fn append_transcript_entry(&self, role: Role, text: &str) {
            self.entries.lock().unwrap().push((role, text.to_string()));
        }
        fn set_send_enabled(&self, _enabled: bool) {}
        fn create_indicator(&self, _id: &str, _text: &str) {}
        fn update_indicator(&self, _id: &str, _text: &str) {}
        fn remove_indicator(&self, id: &str) {
            self.removed.lock().unwrap().push(id.to_string());
        }
    }

    #[derive(Default)]
    struct FakePersistence {
        saved: Mutex<Vec<(String, Role, String)>>,
    }

    #[async_trait]
    impl Persistence for FakePersistence {
        async fn save_message(
            &self,
            session_id: &str,
            role: Role,
            content: &str,
            _usage: Option<UsageReport>,
        ) -> Result<(), ClientError> {
            self.saved
                .lock()
                .unwrap()
                .push((session_id.to_string(), role, content.to_string()));
            Ok(())
        }

        async fn update_session_title(
            &self,
            _session_id: &str,
            _title: &str,
        ) -> Result<(), ClientError> {
            Ok(())
        }
    }

    fn dispatcher(
        surface: &Arc<FakeSurface>,
        persistence: &Arc<FakePersistence>,
    ) -> Dispatcher {
        let surface_dyn: Arc<dyn UiSurface> = surface.clone();
        Dispatcher::new(
            surface_dyn.clone(),
            persistence.clone(),
            StatusQueue::new(surface_dyn),
            "sess-1".to_string(),
            "ind-1".to_string(),
        )
    }

    fn frame(event: &str, data: &str) -> Frame {
        Frame {
            event: event.to_string(),
            data: data.to_string(),
        }
    }

    #[tokio::test]
    async fn test_done_appends_assistant_turn_and_persists() {
        let surface = Arc::new(FakeSurface::default());
        let persistence = Arc::new(FakePersistence::default());
        let dispatcher = dispatcher(&surface, &persistence);
        let mut transcript = vec![ConversationTurn::user("hi")];

        let outcome = dispatcher.dispatch(
            frame("done", "{\"response\":\"hello!\"}"),
            &mut transcript,
        );

        assert!(matches!(
            outcome,
            Outcome::Completed { response: Some(ref r), .. } if r == "hello!"
        ));
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript[1].role, Role::Assistant);
        assert_eq!(transcript[1].content, "hello!");
        assert_eq!(surface.removed.lock().unwrap().as_slice(), ["ind-1"]);

        // The save runs on a spawned task.
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        let saved = persistence.saved.lock().unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].1, Role::Assistant);
        assert_eq!(saved[0].2, "hello!");
    }

    #[tokio::test]
    async fn test_done_empty_response_appends_nothing() {
        let surface = Arc::new(FakeSurface::default());
        let persistence = Arc::new(FakePersistence::default());
        let dispatcher = dispatcher(&surface, &persistence);
        let mut transcript = vec![ConversationTurn::user("hi")];

        let outcome = dispatcher.dispatch(frame("done", "{\"response\":\"\"}"), &mut transcript);

        assert!(matches!(outcome, Outcome::Completed { response: None, .. }));
        assert_eq!(transcript.len(), 1);
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        assert!(persistence.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_done_status_reaches_ambient_surface() {
        let surface = Arc::new(FakeSurface::default());
        let persistence = Arc::new(FakePersistence::default());
        let dispatcher = dispatcher(&surface, &persistence);
        let mut transcript = Vec::new();

        dispatcher.dispatch(
            frame("done", "{\"response\":\"x\",\"status\":\"Done! (used 2 tools)\"}"),
            &mut transcript,
        );

        let ambient = surface.ambient.lock().unwrap();
        assert_eq!(ambient.last().unwrap().0, "Done! (used 2 tools)");
        assert!(ambient.last().unwrap().1);
    }

    #[tokio::test]
    async fn test_error_surfaces_message_without_transcript_change() {
        let surface = Arc::new(FakeSurface::default());
        let persistence = Arc::new(FakePersistence::default());
        let dispatcher = dispatcher(&surface, &persistence);
        let mut transcript = vec![ConversationTurn::user("hi")];

        let outcome =
            dispatcher.dispatch(frame("error", "{\"error\":\"boom\"}"), &mut transcript);

        assert!(matches!(outcome, Outcome::Errored { ref message } if message == "boom"));
        assert_eq!(transcript.len(), 1);
        assert_eq!(surface.errors.lock().unwrap().as_slice(), ["boom"]);
        assert_eq!(surface.removed.lock().unwrap().as_slice(), ["ind-1"]);
    }

    #[tokio::test]
    async fn test_cancelled_removes_indicator_only() {
        let surface = Arc::new(FakeSurface::default());
        let persistence = Arc::new(FakePersistence::default());
        let dispatcher = dispatcher(&surface, &persistence);
        let mut transcript = vec![ConversationTurn::user("hi")];

        let outcome = dispatcher.dispatch(frame("cancelled", "{}"), &mut transcript);

        assert_eq!(outcome, Outcome::Cancelled);
        assert_eq!(transcript.len(), 1);
        assert!(surface.errors.lock().unwrap().is_empty());
        assert_eq!(surface.removed.lock().unwrap().as_slice(), ["ind-1"]);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_dropped() {
        let surface = Arc::new(FakeSurface::default());
        let persistence = Arc::new(FakePersistence::default());
        let dispatcher = dispatcher(&surface, &persistence);
        let mut transcript = Vec::new();

        let outcome = dispatcher.dispatch(frame("thinking", "{garbage"), &mut transcript);

        assert_eq!(outcome, Outcome::Continue);
        assert!(transcript.is_empty());
        assert!(surface.errors.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_event_is_ignored() {
        let surface = Arc::new(FakeSurface::default());
        let persistence = Arc::new(FakePersistence::default());
        let dispatcher = dispatcher(&surface, &persistence);
        let mut transcript = Vec::new();

        let outcome = dispatcher.dispatch(frame("telemetry", "{}"), &mut transcript);

        assert_eq!(outcome, Outcome::Continue);
    }

    #[tokio::test]
    async fn test_thinking_mirrors_to_ambient_surface() {
        let surface = Arc::new(FakeSurface::default());
        let persistence = Arc::new(FakePersistence::default());
        let dispatcher = dispatcher(&surface, &persistence);
        let mut transcript = Vec::new();

        dispatcher.dispatch(frame("thinking", "{\"status\":\"On it\"}"), &mut transcript);

        let ambient = surface.ambient.lock().unwrap();
        assert_eq!(ambient.as_slice(), [("On it".to_string(), true)]);
    }

    #[tokio::test]
    async fn test_tool_mirrors_display_name_only() {
        let surface = Arc::new(FakeSurface::default());
        let persistence = Arc::new(FakePersistence::default());
        let dispatcher = dispatcher(&surface, &persistence);
        let mut transcript = Vec::new();

        dispatcher.dispatch(
            frame(
                "tool",
                "{\"display_name\":\"Searching the web\",\"tool_count\":1,\"max_tools\":5}",
            ),
            &mut transcript,
        );

        let ambient = surface.ambient.lock().unwrap();
        assert_eq!(ambient.last().unwrap().0, "Searching the web");
    }
}
