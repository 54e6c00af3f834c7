// ABOUTME: Transport layer for issuing chat requests and streaming responses
// ABOUTME: AgentTransport trait plus the reqwest HTTP implementation

use crate::error::ClientError;
use crate::models::ConversationTurn;
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;

/// JSON body for the chat endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub message: String,
    /// Sliding window of prior turns, oldest first. Does not include the
    /// message being sent.
    pub conversation_history: Vec<HistoryTurn>,
    pub session_id: String,
}

/// One prior turn in the wire format the agent service expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryTurn {
    pub role: String,
    pub content: String,
}

impl From<&ConversationTurn> for HistoryTurn {
    fn from(turn: &ConversationTurn) -> Self {
        Self {
            role: turn.role.as_str().to_string(),
            content: turn.content.clone(),
        }
    }
}

/// Raw chunks of the response body, in arrival order.
pub type ByteStream = BoxStream<'static, Result<Bytes, ClientError>>;

/// Opens a streaming response for a chat request.
///
/// Abstracted so sessions can be tested against scripted streams.
#[async_trait]
pub trait AgentTransport: Send + Sync {
    async fn open_stream(&self, request: ChatRequest) -> Result<ByteStream, ClientError>;
}

/// HTTP transport talking to the agent service's streaming chat endpoint.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
}

impl HttpTransport {
    /// `base_url` is the service root (e.g. "http://127.0.0.1:8000").
    ///
    /// Only the connect phase is bounded; the response body is a long-lived
    /// stream and must not carry an overall request timeout.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn stream_url(&self) -> String {
        format!("{}/api/chat/stream", self.base_url)
    }
}

#[async_trait]
impl AgentTransport for HttpTransport {
    async fn open_stream(&self, request: ChatRequest) -> Result<ByteStream, ClientError> {
        tracing::debug!(
            session_id = %request.session_id,
            history_len = request.conversation_history.len(),
            "opening chat stream"
        );

        let response = self
            .client
            .post(self.stream_url())
            .json(&request)
            .send()
            .await?
            .error_for_status()?;

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(ClientError::from))
            .boxed())
    }
}
