//! Session state: which chats exist, which one is open, and its working history.
//!
//! The store is the source of truth. `Session` keeps a working copy of the
//! current chat's history, writes it back on every mutation and replaces it on
//! every switch.

use anyhow::{anyhow, Result};
use tracing::{debug, warn};

use crate::state::{derive_chat_name, ChatMessage, ChatRecord};
use crate::store::{ChatStore, KeyValueStore};

pub struct Session<S> {
    store: ChatStore<S>,
    chats: Vec<ChatRecord>,
    current_id: String,
    history: Vec<ChatMessage>,
}

impl<S: KeyValueStore> Session<S> {
    /// Load the saved chats. An empty or unreadable collection starts over
    /// with a single fresh chat.
    pub fn load(store: ChatStore<S>) -> Result<Self> {
        let mut chats = store.load_chats().unwrap_or_else(|e| {
            warn!(error = %e, "could not read saved chats, starting fresh");
            Vec::new()
        });
        let created = chats.is_empty();
        if created {
            chats.push(ChatRecord::new());
        }

        let saved_id = store.current_chat_id().unwrap_or_else(|e| {
            warn!(error = %e, "could not read current chat id");
            None
        });
        let current = saved_id
            .and_then(|id| chats.iter().position(|c| c.id == id))
            .unwrap_or(0);
        let current_id = chats[current].id.clone();
        let history = chats[current].history.clone();

        let mut session = Self {
            store,
            chats,
            current_id,
            history,
        };
        if created {
            session.persist()?;
        }
        Ok(session)
    }

    pub fn chats(&self) -> &[ChatRecord] {
        &self.chats
    }

    pub fn current(&self) -> &ChatRecord {
        &self.chats[self.current_index()]
    }

    pub fn current_id(&self) -> &str {
        &self.current_id
    }

    /// Working copy of the current chat's turns
    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    pub fn store(&self) -> &ChatStore<S> {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ChatStore<S> {
        &mut self.store
    }

    /// Start a new chat at the top of the list and make it current.
    pub fn new_chat(&mut self) -> Result<String> {
        self.sync_history();
        let chat = ChatRecord::new();
        let id = chat.id.clone();
        self.chats.insert(0, chat);
        self.current_id = id.clone();
        self.history.clear();
        debug!(id = %id, "created chat");
        self.persist()?;
        Ok(id)
    }

    pub fn switch_to(&mut self, id: &str) -> Result<()> {
        if id == self.current_id {
            return Ok(());
        }
        let index = self.index_of(id)?;
        self.sync_history();
        self.current_id = id.to_string();
        self.history = self.chats[index].history.clone();
        debug!(id = %id, "switched chat");
        self.persist()
    }

    /// Delete a chat. The collection is never left empty, and deleting the
    /// current chat moves to the first remaining one.
    pub fn delete(&mut self, id: &str) -> Result<()> {
        let index = self.index_of(id)?;
        self.sync_history();
        self.chats.remove(index);
        if self.chats.is_empty() {
            self.chats.push(ChatRecord::new());
        }
        if self.current_id == id {
            self.current_id = self.chats[0].id.clone();
            self.history = self.chats[0].history.clone();
        }
        debug!(id = %id, remaining = self.chats.len(), "deleted chat");
        self.persist()
    }

    /// Rename a chat. Blank or unchanged names are ignored and return false.
    pub fn rename(&mut self, id: &str, name: &str) -> Result<bool> {
        let index = self.index_of(id)?;
        let name = name.trim();
        if name.is_empty() || name == self.chats[index].name {
            return Ok(false);
        }
        self.chats[index].name = name.to_string();
        self.persist()?;
        Ok(true)
    }

    /// Drop every turn of the current chat
    pub fn clear(&mut self) -> Result<()> {
        self.history.clear();
        self.persist()
    }

    /// Append a user turn. The first turn of a chat also names it.
    pub fn push_user(&mut self, text: &str) -> Result<()> {
        self.history.push(ChatMessage::user(text));
        if self.history.len() == 1 {
            let index = self.current_index();
            self.chats[index].name = derive_chat_name(text);
        }
        self.persist()
    }

    pub fn push_assistant(&mut self, text: &str) -> Result<()> {
        self.history.push(ChatMessage::assistant(text));
        self.persist()
    }

    /// Chats whose names contain `query`, ignoring case
    pub fn search(&self, query: &str) -> Vec<&ChatRecord> {
        let query = query.to_lowercase();
        self.chats
            .iter()
            .filter(|chat| chat.name.to_lowercase().contains(&query))
            .collect()
    }

    /// Write the working history and the whole collection back to the store.
    pub fn persist(&mut self) -> Result<()> {
        self.sync_history();
        self.store.save_chats(&self.chats)?;
        self.store.set_current_chat_id(&self.current_id)
    }

    fn sync_history(&mut self) {
        let index = self.current_index();
        self.chats[index].history = self.history.clone();
    }

    // The collection is never empty, so falling back to 0 is always in bounds.
    fn current_index(&self) -> usize {
        self.chats
            .iter()
            .position(|c| c.id == self.current_id)
            .unwrap_or(0)
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        self.chats
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| anyhow!("No chat with id {}", id))
    }
}
