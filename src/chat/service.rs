use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;
use std::path::Path;
use tokio::sync::Mutex;

use super::generator::{self, Topic};
use super::store::{ChatStore, ChatUpdate};
use super::types::{
    normalize_messages, parse_timestamp, ChatMessage, ChatSession, HistoryEntry, Role, WireMessage,
};
use crate::api::{ApiClient, CaptionClient, NewChatSession};
use crate::error::{ApiError, ApiResult};

/// Prefix of chats that only exist locally.
pub const LOCAL_PREFIX: &str = "local-";

pub fn is_local(id: &str) -> bool {
    id.starts_with(LOCAL_PREFIX)
}

fn local_id() -> String {
    format!("{}{}", LOCAL_PREFIX, uuid::Uuid::now_v7())
}

fn id_of(value: &Value) -> Option<String> {
    match value.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Content generator chat. The local store is authoritative; every change is
/// mirrored to the backend when signed in, and a failed mirror is only logged.
pub struct ChatService {
    api: ApiClient,
    captions: CaptionClient,
    store: Mutex<ChatStore>,
}

impl ChatService {
    pub fn new(api: ApiClient, captions: CaptionClient, store: ChatStore) -> Self {
        Self {
            api,
            captions,
            store: Mutex::new(store),
        }
    }

    pub fn store(&self) -> &Mutex<ChatStore> {
        &self.store
    }

    async fn can_sync(&self, chat_id: &str) -> bool {
        !is_local(chat_id) && self.api.session().is_authenticated().await
    }

    /// Start a chat for `topic` and make it current. It is stored under a local
    /// id first and renamed to the backend id once the backend accepts it.
    pub async fn start_session(&self, topic: Topic) -> ApiResult<ChatSession> {
        let system = ChatMessage::system(generator::system_prompt(&topic));
        let mut session = ChatSession {
            id: local_id(),
            title: generator::session_title(&topic),
            niche: topic.niche.clone(),
            platform: topic.platform.clone(),
            messages: vec![system.clone()],
            created_at: Utc::now(),
        };

        {
            let mut store = self.store.lock().await;
            store.set_niche(topic.niche.clone())?;
            store.set_platform(topic.platform.clone())?;
            store.add(session.clone())?;
        }

        if self.api.session().is_authenticated().await {
            let request = NewChatSession {
                title: session.title.clone(),
                niche: topic.niche,
                platform: topic.platform,
                messages: vec![WireMessage::from(&system)],
            };
            match self.api.create_chat_session(&request).await {
                Ok(body) => {
                    if let Some(remote_id) = id_of(&body) {
                        self.store.lock().await.update(
                            &session.id,
                            ChatUpdate {
                                id: Some(remote_id.clone()),
                                ..Default::default()
                            },
                        )?;
                        session.id = remote_id;
                    }
                }
                Err(e) => tracing::warn!("Keeping new chat local: {}", e),
            }
        }

        tracing::info!("Started chat {}", session.id);
        Ok(session)
    }

    /// Current chat, starting one for the selected niche when there is none.
    async fn current_or_new(&self) -> ApiResult<ChatSession> {
        let (current, topic) = {
            let store = self.store.lock().await;
            let state = store.state();
            (
                store.current().cloned(),
                Topic::new(state.selected_niche.clone(), state.selected_platform.clone()),
            )
        };
        match current {
            Some(chat) => Ok(chat),
            None => self.start_session(topic).await,
        }
    }

    async fn append(&self, chat_id: &str, message: ChatMessage) -> ApiResult<()> {
        self.store
            .lock()
            .await
            .append_message(chat_id, message.clone())?;
        self.sync_message(chat_id, &message).await;
        Ok(())
    }

    async fn sync_message(&self, chat_id: &str, message: &ChatMessage) {
        if !self.can_sync(chat_id).await {
            return;
        }
        if let Err(e) = self.api.create_session_message(chat_id, message).await {
            tracing::warn!("Could not sync message to chat {}: {}", chat_id, e);
        }
    }

    /// Append a user message to the current chat and answer it.
    pub async fn send(&self, input: &str) -> ApiResult<ChatMessage> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ApiError::Config("Message is empty".to_string()));
        }

        let chat = self.current_or_new().await?;
        self.append(&chat.id, ChatMessage::user(input)).await?;

        let topic = Topic::new(chat.niche.clone(), chat.platform.clone());
        let reply = ChatMessage::assistant(generator::reply(&self.api, &topic, input).await);
        self.append(&chat.id, reply.clone()).await?;
        Ok(reply)
    }

    /// Caption an image and post the analysis in the current chat.
    pub async fn attach_image(&self, image: &Path) -> ApiResult<ChatMessage> {
        let chat = self.current_or_new().await?;
        let size = tokio::fs::metadata(image).await?.len();
        let name = image
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        self.append(&chat.id, ChatMessage::image(&name, size)).await?;

        let result = self.captions.generate(image).await.map_err(|e| {
            tracing::error!("Image caption generation failed: {}", e);
            e
        })?;

        let reply = ChatMessage::assistant(generator::image_reply(&result));
        self.append(&chat.id, reply.clone()).await?;
        Ok(reply)
    }

    pub async fn list(&self) -> Vec<ChatSession> {
        self.store.lock().await.chats().to_vec()
    }

    /// Load a chat's messages and make it current. Tries the session endpoint, then
    /// the legacy history endpoint, then whatever is stored locally.
    pub async fn open(&self, id: &str) -> ApiResult<ChatSession> {
        let remote = if self.can_sync(id).await {
            self.fetch_messages(id).await
        } else {
            None
        };

        let mut store = self.store.lock().await;
        match (remote, store.get(id).cloned()) {
            (Some(messages), Some(_)) => {
                store.update(
                    id,
                    ChatUpdate {
                        messages: Some(messages),
                        ..Default::default()
                    },
                )?;
            }
            (Some(messages), None) => {
                let title = messages
                    .iter()
                    .find(|m| m.role == Role::User)
                    .map(|m| m.content.clone())
                    .unwrap_or_else(|| format!("Chat {}", id));
                store.add(ChatSession {
                    id: id.to_string(),
                    title,
                    niche: None,
                    platform: None,
                    messages,
                    created_at: Utc::now(),
                })?;
            }
            (None, Some(_)) => {}
            (None, None) => return Err(ApiError::NotFound(format!("chat {}", id))),
        }

        store.set_current(Some(id.to_string()))?;
        let chat = store
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::NotFound(format!("chat {}", id)))?;
        if chat.niche.is_some() {
            store.set_niche(chat.niche.clone())?;
        }
        if chat.platform.is_some() {
            store.set_platform(chat.platform.clone())?;
        }
        Ok(chat)
    }

    async fn fetch_messages(&self, id: &str) -> Option<Vec<ChatMessage>> {
        match self.api.session_messages(id).await {
            Ok(body) => return Some(normalize_messages(&body)),
            Err(e) => tracing::warn!("Failed to load messages for chat {}: {}", id, e),
        }
        match self.api.history(Some(id)).await {
            Ok(body) => Some(normalize_messages(&body)),
            Err(e) => {
                tracing::warn!("Legacy history for chat {} unavailable: {}", id, e);
                None
            }
        }
    }

    /// Remote chat sessions with their messages, newest first. Sessions whose
    /// messages cannot be loaded are left out.
    pub async fn history(&self) -> ApiResult<Vec<HistoryEntry>> {
        let body = self.api.chat_sessions().await?;
        let sessions: Vec<Value> = body
            .get("results")
            .and_then(Value::as_array)
            .or_else(|| body.as_array())
            .cloned()
            .unwrap_or_default();

        let enriched = sessions.iter().filter_map(|s| id_of(s).map(|id| (id, s))).map(
            |(id, session)| async move {
                match self.api.session_messages(&id).await {
                    Ok(body) => Some(history_entry(id, session, normalize_messages(&body))),
                    Err(e) => {
                        tracing::warn!("Failed to fetch messages for session {}: {}", id, e);
                        None
                    }
                }
            },
        );

        let mut entries: Vec<HistoryEntry> =
            join_all(enriched).await.into_iter().flatten().collect();
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(entries)
    }

    /// Delete remotely when possible, always locally.
    pub async fn delete(&self, id: &str) -> ApiResult<bool> {
        if self.can_sync(id).await {
            if let Err(e) = self.api.delete_chat_session(id).await {
                tracing::warn!("Failed to delete chat {} on the backend: {}", id, e);
            }
        }
        Ok(self.store.lock().await.delete(id)?)
    }
}

fn history_entry(id: String, session: &Value, messages: Vec<ChatMessage>) -> HistoryEntry {
    let text = |key: &str| {
        session
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    let title = text("title")
        .or_else(|| {
            messages
                .iter()
                .find(|m| m.role == Role::User && !m.content.is_empty())
                .map(|m| m.content.clone())
        })
        .unwrap_or_else(|| format!("Chat {}", id));
    let preview = messages
        .last()
        .map(|m| m.content.clone())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| "No messages".to_string());
    let created_at = text("created_at")
        .or_else(|| text("createdAt"))
        .and_then(|raw| parse_timestamp(&raw));

    HistoryEntry {
        id,
        title,
        preview,
        niche: text("niche"),
        platform: text("platform"),
        message_count: messages.len(),
        created_at,
    }
}
