//! Chat persistence
//!
//! A flat key-value store holds everything: the whole chat collection lives
//! under one key as JSON and is read and written wholesale. Last write wins.

use anyhow::{anyhow, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::render::Theme;
use crate::state::ChatRecord;

const CHATS_KEY: &str = "jkchat_chats";
const CURRENT_KEY: &str = "jkchat_current";
const THEME_KEY: &str = "jkchat_theme";

/// String key to string value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Key-value store backed by a single SQLite table
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open chat database {:?}", path))?;
        Self::init(conn)
    }

    /// Open the database in the user's data directory
    pub fn open_default() -> Result<Self> {
        Self::open(&Self::default_path()?)
    }

    pub fn in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    pub fn default_path() -> Result<PathBuf> {
        let data_dir =
            dirs::data_dir().ok_or_else(|| anyhow!("Could not determine data directory"))?;
        Ok(data_dir.join("jkchat").join("chats.db"))
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
            [],
        )?;
        Ok(Self { conn })
    }
}

impl KeyValueStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let value = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT INTO kv (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.conn
            .execute("DELETE FROM kv WHERE key = ?1", params![key])?;
        Ok(())
    }
}

/// In-memory store, for tests and throwaway sessions
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Typed access to the chat collection and preferences
pub struct ChatStore<S> {
    kv: S,
}

impl<S: KeyValueStore> ChatStore<S> {
    pub fn new(kv: S) -> Self {
        Self { kv }
    }

    /// Every saved chat, in display order. Empty when nothing was saved yet.
    pub fn load_chats(&self) -> Result<Vec<ChatRecord>> {
        match self.kv.get(CHATS_KEY)? {
            Some(json) => serde_json::from_str(&json).context("Saved chats are not readable"),
            None => Ok(Vec::new()),
        }
    }

    pub fn save_chats(&mut self, chats: &[ChatRecord]) -> Result<()> {
        let json = serde_json::to_string(chats)?;
        self.kv.set(CHATS_KEY, &json)?;
        debug!(count = chats.len(), bytes = json.len(), "saved chats");
        Ok(())
    }

    pub fn current_chat_id(&self) -> Result<Option<String>> {
        self.kv.get(CURRENT_KEY)
    }

    pub fn set_current_chat_id(&mut self, id: &str) -> Result<()> {
        self.kv.set(CURRENT_KEY, id)
    }

    /// Saved theme, light when none was saved or the value is unknown
    pub fn theme(&self) -> Result<Theme> {
        Ok(self
            .kv
            .get(THEME_KEY)?
            .and_then(|value| Theme::from_str(&value))
            .unwrap_or_default())
    }

    pub fn set_theme(&mut self, theme: Theme) -> Result<()> {
        self.kv.set(THEME_KEY, theme.as_str())
    }

    pub fn into_inner(self) -> S {
        self.kv
    }
}
