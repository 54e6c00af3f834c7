// ABOUTME: Error types for parley-client
// ABOUTME: Categorizes transport, protocol, and invariant failures

use thiserror::Error;

/// Errors that can occur in parley-client operations
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Malformed event payload: {0}")]
    MalformedPayload(String),

    #[error("A request is already in flight")]
    Busy,

    #[error("Message is empty")]
    EmptyMessage,

    #[error("No active conversation")]
    NoSession,
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ClientError::Timeout(err.to_string())
        } else if err.is_connect() {
            ClientError::Connection(err.to_string())
        } else if err.is_status() {
            ClientError::Api(err.to_string())
        } else {
            ClientError::Stream(err.to_string())
        }
    }
}

impl ClientError {
    /// Message suitable for showing directly in the chat surface.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Timeout(_) => {
                "The agent took too long to respond. Please try again.".to_string()
            }
            ClientError::Connection(_) => {
                "Unable to reach the agent service. Check that the server is running.".to_string()
            }
            ClientError::NoSession => {
                "No active conversation. Start or select a session first.".to_string()
            }
            ClientError::Busy => "A request is already in progress.".to_string(),
            ClientError::EmptyMessage => "Cannot send an empty message.".to_string(),
            ClientError::Api(_) | ClientError::Stream(_) | ClientError::MalformedPayload(_) => {
                format!("Something went wrong: {}", self)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_timeout() {
        let err = ClientError::Timeout("deadline exceeded".to_string());
        let display = format!("{}", err);
        assert!(display.contains("timed out"));
        assert!(display.contains("deadline exceeded"));
    }

    #[test]
    fn test_display_connection() {
        let err = ClientError::Connection("refused".to_string());
        let display = format!("{}", err);
        assert!(display.contains("Connection failed"));
        assert!(display.contains("refused"));
    }

    #[test]
    fn test_display_stream() {
        let err = ClientError::Stream("reset by peer".to_string());
        assert!(format!("{}", err).contains("Stream error"));
    }

    #[test]
    fn test_display_malformed_payload() {
        let err = ClientError::MalformedPayload("expected value at line 1".to_string());
        let display = format!("{}", err);
        assert!(display.contains("Malformed event payload"));
        assert!(display.contains("expected value"));
    }

    #[test]
    fn test_user_message_timeout() {
        let err = ClientError::Timeout("x".to_string());
        assert!(err.user_message().contains("too long"));
    }

    #[test]
    fn test_user_message_connection() {
        let err = ClientError::Connection("x".to_string());
        assert!(err.user_message().contains("Unable to reach"));
    }

    #[test]
    fn test_user_message_no_session() {
        assert!(ClientError::NoSession.user_message().contains("No active conversation"));
    }

    #[test]
    fn test_user_message_other_includes_detail() {
        let err = ClientError::Stream("connection reset".to_string());
        let msg = err.user_message();
        assert!(msg.contains("Something went wrong"));
        assert!(msg.contains("connection reset"));
    }

    #[test]
    fn test_debug_impl() {
        let err = ClientError::Busy;
        assert!(format!("{:?}", err).contains("Busy"));
    }
}
