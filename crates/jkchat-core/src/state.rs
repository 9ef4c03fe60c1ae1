//! UI-agnostic chat data types
//!
//! These are the records the store persists and the session hands to
//! whatever front end is drawing them. Nothing here knows about HTML or
//! terminals.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name given to a chat before anything has been said in it
pub const DEFAULT_CHAT_NAME: &str = "New Chat";

/// Characters of the first message kept when naming a chat after it
pub const CHAT_NAME_MAX_CHARS: usize = 30;

/// A single turn in a conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            text: text.into(),
        }
    }
}

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChatRole::User => "user",
            ChatRole::Assistant => "assistant",
        }
    }
}

/// A named conversation, persisted as one unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRecord {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub history: Vec<ChatMessage>,
}

impl ChatRecord {
    /// A fresh, empty chat with a new id and the default name
    pub fn new() -> Self {
        Self {
            id: Self::generate_id(),
            name: DEFAULT_CHAT_NAME.to_string(),
            history: Vec::new(),
        }
    }

    /// Opaque chat id: `c` followed by eight lowercase alphanumerics
    pub fn generate_id() -> String {
        let simple = Uuid::new_v4().simple().to_string();
        format!("c{}", &simple[..8])
    }
}

impl Default for ChatRecord {
    fn default() -> Self {
        Self::new()
    }
}

/// Name a chat after its first message, truncated with an ellipsis.
pub fn derive_chat_name(first_message: &str) -> String {
    let mut chars = first_message.chars();
    let name: String = chars.by_ref().take(CHAT_NAME_MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", name)
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","text":"hi"}"#);
    }

    #[test]
    fn test_record_without_history_deserializes() {
        let record: ChatRecord = serde_json::from_str(r#"{"id":"c1","name":"x"}"#).unwrap();
        assert!(record.history.is_empty());
    }

    #[test]
    fn test_generated_ids() {
        let id = ChatRecord::generate_id();
        assert_eq!(id.len(), 9);
        assert!(id.starts_with('c'));
        assert!(id[1..].chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        assert_ne!(id, ChatRecord::generate_id());
    }

    #[test]
    fn test_derive_short_name() {
        assert_eq!(derive_chat_name("How do lifetimes work?"), "How do lifetimes work?");
    }

    #[test]
    fn test_derive_long_name() {
        let name = derive_chat_name("Explain the borrow checker to me like I am five");
        assert_eq!(name, "Explain the borrow checker to ...");
    }

    #[test]
    fn test_derive_name_exactly_thirty_chars() {
        let message = "a".repeat(30);
        assert_eq!(derive_chat_name(&message), message);
    }

    #[test]
    fn test_derive_name_counts_chars_not_bytes() {
        let message = "é".repeat(31);
        assert_eq!(derive_chat_name(&message), format!("{}...", "é".repeat(30)));
    }
}
