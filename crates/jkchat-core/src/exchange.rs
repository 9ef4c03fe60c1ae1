//! One round trip: record the user's message, ask the service, record the reply.

use anyhow::Result;
use tracing::{info, warn};

use crate::api::{ChatRequest, ClientError, CompletionService};
use crate::provider::Provider;
use crate::session::Session;
use crate::store::KeyValueStore;

pub const EMPTY_REPLY: &str = "I'm sorry, I couldn't generate a response.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The reply, already appended to the history
    Reply(String),
    /// Text to show in place of a reply. Not part of the history.
    Failed(String),
    /// The message was blank; nothing was sent
    Ignored,
}

/// Send `message` in the current chat and record the result.
///
/// Only storage failures are returned as errors. Anything that goes wrong
/// talking to the service comes back as [`Outcome::Failed`].
pub async fn send_message<S, C>(
    session: &mut Session<S>,
    service: &C,
    message: &str,
    lang: &str,
    provider: Provider,
) -> Result<Outcome>
where
    S: KeyValueStore,
    C: CompletionService + ?Sized,
{
    let message = message.trim();
    if message.is_empty() {
        return Ok(Outcome::Ignored);
    }

    session.push_user(message)?;
    let prior = &session.history()[..session.history().len() - 1];
    let request = ChatRequest {
        message: message.to_string(),
        history: prior.to_vec(),
        lang: lang.to_string(),
        provider: provider.as_str().to_string(),
    };

    info!(
        chat = %session.current_id(),
        provider = provider.as_str(),
        turns = request.history.len(),
        "sending message"
    );

    match service.complete(&request).await {
        Ok(reply) => {
            let reply = if reply.is_empty() {
                EMPTY_REPLY.to_string()
            } else {
                reply
            };
            session.push_assistant(&reply)?;
            Ok(Outcome::Reply(reply))
        }
        Err(ClientError::Service(error)) => {
            warn!(%error, "service returned an error");
            Ok(Outcome::Failed(format!("Error: {}", error)))
        }
        Err(e) => {
            warn!(error = %e, "chat request failed");
            Ok(Outcome::Failed(format!(
                "Network error: {}\n\nPlease check your connection and try again.",
                e
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{ChatMessage, ChatRole};
    use crate::store::{ChatStore, MemoryStore};
    use async_trait::async_trait;
    use std::sync::Mutex;

    enum Script {
        Reply(&'static str),
        ServiceError(&'static str),
        Status(u16),
    }

    struct MockService {
        script: Script,
        seen: Mutex<Vec<ChatRequest>>,
    }

    impl MockService {
        fn new(script: Script) -> Self {
            Self {
                script,
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl CompletionService for MockService {
        async fn complete(&self, request: &ChatRequest) -> Result<String, ClientError> {
            self.seen.lock().unwrap().push(request.clone());
            match self.script {
                Script::Reply(text) => Ok(text.to_string()),
                Script::ServiceError(msg) => Err(ClientError::Service(msg.to_string())),
                Script::Status(status) => Err(ClientError::Status {
                    status,
                    reason: "Internal Server Error".to_string(),
                }),
            }
        }
    }

    fn session() -> Session<MemoryStore> {
        Session::load(ChatStore::new(MemoryStore::new())).unwrap()
    }

    #[tokio::test]
    async fn test_reply_is_recorded() {
        let mut session = session();
        let service = MockService::new(Script::Reply("**Answer**: 42"));

        let outcome = send_message(&mut session, &service, "  question  ", "en", Provider::Gemini)
            .await
            .unwrap();

        assert_eq!(outcome, Outcome::Reply("**Answer**: 42".to_string()));
        assert_eq!(
            session.history(),
            &[
                ChatMessage::user("question"),
                ChatMessage::assistant("**Answer**: 42")
            ]
        );
        assert_eq!(session.current().name, "question");
    }

    #[tokio::test]
    async fn test_request_excludes_just_sent_message() {
        let mut session = session();
        session.push_user("earlier").unwrap();
        session.push_assistant("earlier reply").unwrap();
        let service = MockService::new(Script::Reply("ok"));

        send_message(&mut session, &service, "now", "fr", Provider::OpenRouter)
            .await
            .unwrap();

        let seen = service.seen.lock().unwrap();
        let request = &seen[0];
        assert_eq!(request.message, "now");
        assert_eq!(request.lang, "fr");
        assert_eq!(request.provider, "openrouter");
        assert_eq!(request.history.len(), 2);
        assert_eq!(request.history[1].role, ChatRole::Assistant);
    }

    #[tokio::test]
    async fn test_empty_reply_gets_apology() {
        let mut session = session();
        let service = MockService::new(Script::Reply(""));
        let outcome = send_message(&mut session, &service, "hi", "en", Provider::Gemini)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Reply(EMPTY_REPLY.to_string()));
    }

    #[tokio::test]
    async fn test_service_error_is_not_recorded() {
        let mut session = session();
        let service = MockService::new(Script::ServiceError("<b>quota</b> exceeded"));

        let outcome = send_message(&mut session, &service, "hi", "en", Provider::Gemini)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Failed("Error: <b>quota</b> exceeded".to_string())
        );
        assert_eq!(session.history(), &[ChatMessage::user("hi")]);
    }

    #[tokio::test]
    async fn test_transport_failure_message() {
        let mut session = session();
        let service = MockService::new(Script::Status(500));

        let outcome = send_message(&mut session, &service, "hi", "en", Provider::Gemini)
            .await
            .unwrap();

        assert_eq!(
            outcome,
            Outcome::Failed(
                "Network error: HTTP 500: Internal Server Error\n\nPlease check your connection and try again."
                    .to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_blank_message_is_ignored() {
        let mut session = session();
        let service = MockService::new(Script::Reply("unused"));
        let outcome = send_message(&mut session, &service, "   ", "en", Provider::Gemini)
            .await
            .unwrap();
        assert_eq!(outcome, Outcome::Ignored);
        assert!(session.history().is_empty());
        assert!(service.seen.lock().unwrap().is_empty());
    }
}
