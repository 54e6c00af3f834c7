// ABOUTME: Typed stream events decoded from raw frames
// ABOUTME: Validates per-event JSON payloads at the dispatch boundary

use crate::error::ClientError;
use crate::models::UsageReport;
use crate::sse::Frame;
use serde::Deserialize;

/// Events received on the response stream, tagged by the frame's event type.
///
/// Unknown tags become `Unknown` so new server-side events degrade to a log
/// line instead of breaking the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Connected,
    Thinking {
        status: String,
    },
    Tool {
        display_name: String,
        tool_count: u32,
        max_tools: u32,
    },
    Done {
        response: String,
        status: Option<String>,
        usage: UsageReport,
    },
    Error {
        message: String,
    },
    Cancelled,
    Unknown {
        event: String,
    },
}

#[derive(Deserialize)]
struct ThinkingPayload {
    status: String,
}

#[derive(Deserialize)]
struct ToolPayload {
    display_name: String,
    tool_count: u32,
    max_tools: u32,
}

#[derive(Deserialize)]
struct DonePayload {
    #[serde(default)]
    response: String,
    status: Option<String>,
    cost_inr: Option<f64>,
    cost_usd: Option<f64>,
    tokens: Option<serde_json::Value>,
}

#[derive(Deserialize)]
struct ErrorPayload {
    error: String,
}

impl StreamEvent {
    /// Decode a frame's payload into a typed event.
    ///
    /// Invalid JSON yields `ClientError::MalformedPayload`; the caller drops
    /// the frame and keeps the stream alive.
    pub fn from_frame(frame: &Frame) -> Result<Self, ClientError> {
        let malformed = |err: serde_json::Error| {
            ClientError::MalformedPayload(format!("{} event: {}", frame.event, err))
        };

        match frame.event.as_str() {
            "connected" => {
                serde_json::from_str::<serde_json::Value>(&frame.data).map_err(malformed)?;
                Ok(StreamEvent::Connected)
            }
            "thinking" => {
                let payload: ThinkingPayload =
                    serde_json::from_str(&frame.data).map_err(malformed)?;
                Ok(StreamEvent::Thinking {
                    status: payload.status,
                })
            }
            "tool" => {
                let payload: ToolPayload = serde_json::from_str(&frame.data).map_err(malformed)?;
                Ok(StreamEvent::Tool {
                    display_name: payload.display_name,
                    tool_count: payload.tool_count,
                    max_tools: payload.max_tools,
                })
            }
            "done" => {
                let payload: DonePayload = serde_json::from_str(&frame.data).map_err(malformed)?;
                Ok(StreamEvent::Done {
                    response: payload.response,
                    status: payload.status,
                    usage: UsageReport {
                        cost_inr: payload.cost_inr,
                        cost_usd: payload.cost_usd,
                        tokens: payload.tokens,
                    },
                })
            }
            "error" => {
                let payload: ErrorPayload = serde_json::from_str(&frame.data).map_err(malformed)?;
                Ok(StreamEvent::Error {
                    message: payload.error,
                })
            }
            "cancelled" => {
                serde_json::from_str::<serde_json::Value>(&frame.data).map_err(malformed)?;
                Ok(StreamEvent::Cancelled)
            }
            other => Ok(StreamEvent::Unknown {
                event: other.to_string(),
            }),
        }
    }
}
