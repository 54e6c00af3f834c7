// ABOUTME: Data models for parley-client
// ABOUTME: Conversation turns, request state, and usage metadata

use serde::{Deserialize, Serialize};

/// Who authored a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry in the conversation transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    /// Client-side receive/send time, milliseconds since the epoch
    pub timestamp: i64,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }
}

/// Request lifecycle state for a conversation session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Idle,
    InFlight,
}

/// Cost and token metadata attached to a completed response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageReport {
    pub cost_inr: Option<f64>,
    pub cost_usd: Option<f64>,
    /// Free-form token accounting object, passed through untouched
    pub tokens: Option<serde_json::Value>,
}

impl UsageReport {
    pub fn is_empty(&self) -> bool {
        self.cost_inr.is_none() && self.cost_usd.is_none() && self.tokens.is_none()
    }

    /// One-line human summary, or None when no metadata was reported.
    pub fn summary(&self) -> Option<String> {
        if self.is_empty() {
            return None;
        }
        let mut parts = Vec::new();
        if let Some(usd) = self.cost_usd {
            parts.push(format!("${:.6}", usd));
        }
        if let Some(inr) = self.cost_inr {
            parts.push(format!("₹{:.4}", inr));
        }
        if let Some(tokens) = &self.tokens {
            parts.push(format!("tokens: {}", tokens));
        }
        Some(parts.join(" · "))
    }
}
