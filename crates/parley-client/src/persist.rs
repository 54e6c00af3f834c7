// ABOUTME: Persistence collaborator for transcript and session metadata
// ABOUTME: Persistence trait plus the REST-backed HttpPersistence implementation

use crate::error::ClientError;
use crate::models::{Role, UsageReport};
use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

/// Remote store for transcript turns and session metadata.
///
/// All callers treat these as fire-and-forget: failures are logged and never
/// surfaced to the user or allowed to touch the streaming pipeline. A missed
/// save is acceptable degraded behavior.
#[async_trait]
pub trait Persistence: Send + Sync {
    async fn save_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        usage: Option<UsageReport>,
    ) -> Result<(), ClientError>;

    async fn update_session_title(&self, session_id: &str, title: &str)
        -> Result<(), ClientError>;
}

#[derive(Serialize)]
struct MessageBody<'a> {
    session_id: &'a str,
    role: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    usage: Option<UsageReport>,
}

#[derive(Serialize)]
struct TitleBody<'a> {
    title: &'a str,
}

/// Persistence backed by the agent service's REST endpoints.
pub struct HttpPersistence {
    client: reqwest::Client,
    base_url: String,
}

impl HttpPersistence {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(15))
            .build()
            .map_err(|e| ClientError::Connection(e.to_string()))?;

        let base_url: String = base_url.into();
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/api/messages", self.base_url)
    }

    fn session_url(&self, session_id: &str) -> String {
        format!("{}/api/sessions/{}", self.base_url, session_id)
    }
}

#[async_trait]
impl Persistence for HttpPersistence {
    async fn save_message(
        &self,
        session_id: &str,
        role: Role,
        content: &str,
        usage: Option<UsageReport>,
    ) -> Result<(), ClientError> {
        let body = MessageBody {
            session_id,
            role: role.as_str(),
            content,
            usage,
        };

        self.client
            .post(self.messages_url())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(session_id = %session_id, role = %role.as_str(), "message persisted");
        Ok(())
    }

    async fn update_session_title(
        &self,
        session_id: &str,
        title: &str,
    ) -> Result<(), ClientError> {
        self.client
            .put(self.session_url(session_id))
            .json(&TitleBody { title })
            .send()
            .await?
            .error_for_status()?;

        tracing::debug!(session_id = %session_id, title = %title, "session title updated");
        Ok(())
    }
}
