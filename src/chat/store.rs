use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use super::types::{ChatMessage, ChatSession};

pub const CHAT_FILE: &str = "chat-storage.json";

/// Everything the chat view remembers between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatState {
    /// Newest first.
    pub chats: Vec<ChatSession>,
    pub current_chat_id: Option<String>,
    pub selected_niche: Option<String>,
    pub selected_platform: Option<String>,
}

/// Partial update for a chat. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct ChatUpdate {
    pub id: Option<String>,
    pub title: Option<String>,
    pub niche: Option<String>,
    pub platform: Option<String>,
    pub messages: Option<Vec<ChatMessage>>,
}

/// Chat state persisted as JSON in the data directory. Without a path it lives
/// in memory only.
#[derive(Debug, Default)]
pub struct ChatStore {
    path: Option<PathBuf>,
    state: ChatState,
}

impl ChatStore {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn open(data_dir: &Path) -> std::io::Result<Self> {
        let path = data_dir.join(CHAT_FILE);
        let state = if path.exists() {
            let json = fs::read_to_string(&path)?;
            match serde_json::from_str(&json) {
                Ok(state) => state,
                Err(e) => {
                    tracing::warn!("Ignoring unreadable chat storage {}: {}", path.display(), e);
                    ChatState::default()
                }
            }
        } else {
            ChatState::default()
        };
        Ok(Self {
            path: Some(path),
            state,
        })
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn chats(&self) -> &[ChatSession] {
        &self.state.chats
    }

    pub fn get(&self, id: &str) -> Option<&ChatSession> {
        self.state.chats.iter().find(|c| c.id == id)
    }

    pub fn current(&self) -> Option<&ChatSession> {
        self.state
            .current_chat_id
            .as_deref()
            .and_then(|id| self.get(id))
    }

    /// Insert at the front and make it current.
    pub fn add(&mut self, chat: ChatSession) -> std::io::Result<()> {
        self.state.current_chat_id = Some(chat.id.clone());
        self.state.chats.retain(|c| c.id != chat.id);
        self.state.chats.insert(0, chat);
        self.persist()
    }

    /// Returns false when no chat has that id.
    pub fn update(&mut self, id: &str, update: ChatUpdate) -> std::io::Result<bool> {
        let Some(chat) = self.state.chats.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        if let Some(new_id) = update.id {
            if self.state.current_chat_id.as_deref() == Some(id) {
                self.state.current_chat_id = Some(new_id.clone());
            }
            chat.id = new_id;
        }
        if let Some(title) = update.title {
            chat.title = title;
        }
        if let Some(niche) = update.niche {
            chat.niche = Some(niche);
        }
        if let Some(platform) = update.platform {
            chat.platform = Some(platform);
        }
        if let Some(messages) = update.messages {
            chat.messages = messages;
        }
        self.persist()?;
        Ok(true)
    }

    pub fn append_message(&mut self, id: &str, message: ChatMessage) -> std::io::Result<bool> {
        let Some(chat) = self.state.chats.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        chat.messages.push(message);
        self.persist()?;
        Ok(true)
    }

    /// Deleting the current chat clears the current id.
    pub fn delete(&mut self, id: &str) -> std::io::Result<bool> {
        let before = self.state.chats.len();
        self.state.chats.retain(|c| c.id != id);
        if self.state.current_chat_id.as_deref() == Some(id) {
            self.state.current_chat_id = None;
        }
        let removed = self.state.chats.len() != before;
        self.persist()?;
        Ok(removed)
    }

    pub fn set_current(&mut self, id: Option<String>) -> std::io::Result<()> {
        self.state.current_chat_id = id;
        self.persist()
    }

    pub fn set_niche(&mut self, niche: Option<String>) -> std::io::Result<()> {
        self.state.selected_niche = niche;
        self.persist()
    }

    pub fn set_platform(&mut self, platform: Option<String>) -> std::io::Result<()> {
        self.state.selected_platform = platform;
        self.persist()
    }

    /// Deselect the current chat, niche and platform. Saved chats stay.
    pub fn reset(&mut self) -> std::io::Result<()> {
        self.state.current_chat_id = None;
        self.state.selected_niche = None;
        self.state.selected_platform = None;
        self.persist()
    }

    fn persist(&self) -> std::io::Result<()> {
        let Some(ref path) = self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(&self.state).map_err(std::io::Error::other)?;
        fs::write(path, json)
    }
}
