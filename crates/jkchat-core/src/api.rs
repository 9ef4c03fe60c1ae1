use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::state::ChatMessage;

/// Body of a `POST /api/chat` request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub message: String,
    /// Turns before `message`, oldest first
    pub history: Vec<ChatMessage>,
    pub lang: String,
    pub provider: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    reply: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got a response
    #[error("{0}")]
    Network(#[from] reqwest::Error),
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },
    /// The service answered with an `error` field
    #[error("{0}")]
    Service(String),
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// Anything that can turn a chat request into a reply
#[async_trait]
pub trait CompletionService: Send + Sync {
    /// The reply text, empty when the service had nothing to say
    async fn complete(&self, request: &ChatRequest) -> Result<String, ClientError>;
}

/// Talks to the chat server over HTTP
#[derive(Clone)]
pub struct HttpCompletionService {
    client: Client,
    base_url: String,
}

impl HttpCompletionService {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}/api/chat", self.base_url)
    }
}

#[async_trait]
impl CompletionService for HttpCompletionService {
    async fn complete(&self, request: &ChatRequest) -> Result<String, ClientError> {
        let response = self
            .client
            .post(self.endpoint())
            .header("Accept", "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            // The server reports upstream failures as JSON with a 5xx status.
            if let Ok(ChatResponse {
                error: Some(error), ..
            }) = serde_json::from_str::<ChatResponse>(&body)
            {
                return Err(ClientError::Service(error));
            }
            return Err(ClientError::Status {
                status: status.as_u16(),
                reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
            });
        }

        parse_response(&body)
    }
}

fn parse_response(body: &str) -> Result<String, ClientError> {
    let response: ChatResponse =
        serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))?;
    match response.error {
        Some(error) => Err(ClientError::Service(error)),
        None => Ok(response.reply.unwrap_or_default()),
    }
}
