pub mod api;
pub mod config;
pub mod exchange;
pub mod format;
pub mod provider;
pub mod render;
pub mod session;
pub mod state;
pub mod store;
pub mod typewriter;

// Re-export main types for convenience
pub use api::{ChatRequest, ClientError, CompletionService, HttpCompletionService};
pub use config::Config;
pub use exchange::{send_message, Outcome};
pub use format::{escape_html, format_message};
pub use provider::Provider;
pub use render::Theme;
pub use session::Session;
pub use state::{ChatMessage, ChatRecord, ChatRole};
pub use store::{ChatStore, KeyValueStore, MemoryStore, SqliteStore};
pub use typewriter::Typewriter;
