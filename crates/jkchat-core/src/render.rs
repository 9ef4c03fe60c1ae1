//! HTML for whole messages and chat transcripts.
//!
//! This is the adapter between the formatter and a page: it only wraps
//! formatter output, it never looks inside message text itself.

use crate::format::{escape_html, format_message};
use crate::state::{ChatMessage, ChatRecord, ChatRole};

const COPY_BUTTON: &str = "<button class=\"copy-btn\">Copy</button>";

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0 auto;max-width:48rem;padding:1rem;background:#fff;color:#222}\
body.dark-theme{background:#1e1f22;color:#ddd}\
.msg{display:flex;gap:.75rem;margin:1rem 0}\
.msg.user .message-content{background:#e8f0fe}\
.dark-theme .msg.user .message-content{background:#2b3445}\
.message-content{padding:.5rem .75rem;border-radius:.5rem;flex:1}\
.avatar{font-weight:bold;min-width:5rem}\
pre{position:relative;background:#f5f5f5;padding:.75rem;overflow-x:auto}\
.dark-theme pre{background:#2a2a2a}\
.copy-btn{position:absolute;top:.25rem;right:.25rem}";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "light" => Some(Theme::Light),
            "dark" => Some(Theme::Dark),
            _ => None,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }
}

/// One conversation turn as a message bubble
pub fn message_html(message: &ChatMessage) -> String {
    let (class, avatar) = match message.role {
        ChatRole::User => ("user", "You"),
        ChatRole::Assistant => ("assistant", "Assistant"),
    };
    let content =
        format_message(&message.text).replace("</pre>", &format!("{}</pre>", COPY_BUTTON));
    format!(
        "<div class=\"msg {}\"><div class=\"avatar\">{}</div><div class=\"message-content\">{}</div></div>",
        class, avatar, content
    )
}

/// A standalone page with every turn of a chat
pub fn transcript_html(chat: &ChatRecord, theme: Theme) -> String {
    let body_class = match theme {
        Theme::Light => "",
        Theme::Dark => " class=\"dark-theme\"",
    };
    let title = escape_html(&chat.name);
    let messages: String = chat.history.iter().map(message_html).collect();

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n<title>{title}</title>\n<style>{STYLE}</style>\n</head>\n<body{body_class}>\n<h1>{title}</h1>\n<div id=\"messages\">{messages}</div>\n</body>\n</html>\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_bubble() {
        let html = message_html(&ChatMessage::user("hi <there>"));
        assert_eq!(
            html,
            "<div class=\"msg user\"><div class=\"avatar\">You</div><div class=\"message-content\"><p>hi &lt;there&gt;</p></div></div>"
        );
    }

    #[test]
    fn test_code_blocks_get_copy_button() {
        let html = message_html(&ChatMessage::assistant("```sh\nls\n```"));
        assert!(html.contains(
            "<pre><code class=\"language-sh\">ls</code><button class=\"copy-btn\">Copy</button></pre>"
        ));
    }

    #[test]
    fn test_message_text_cannot_fake_copy_button() {
        let html = message_html(&ChatMessage::assistant("</pre>"));
        assert!(!html.contains("copy-btn"));
    }

    #[test]
    fn test_transcript_escapes_title_and_applies_theme() {
        let chat = ChatRecord {
            id: "c00000001".to_string(),
            name: "<script>x</script>".to_string(),
            history: vec![ChatMessage::user("q"), ChatMessage::assistant("a")],
        };
        let html = transcript_html(&chat, Theme::Dark);
        assert!(html.contains("<title>&lt;script&gt;x&lt;/script&gt;</title>"));
        assert!(html.contains("<body class=\"dark-theme\">"));
        assert_eq!(html.matches("class=\"msg ").count(), 2);
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_theme_toggle() {
        assert_eq!(Theme::Light.toggled(), Theme::Dark);
        assert_eq!(Theme::from_str("DARK"), Some(Theme::Dark));
        assert_eq!(Theme::from_str("sepia"), None);
    }
}
