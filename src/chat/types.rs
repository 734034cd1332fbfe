use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "user" => Some(Role::User),
            "assistant" | "bot" => Some(Role::Assistant),
            "system" => Some(Role::System),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Image,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            kind: None,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// User message standing in for an uploaded image.
    pub fn image(file_name: &str, size_bytes: u64) -> Self {
        Self {
            role: Role::User,
            content: format!(
                "📷 Uploaded image: {} ({:.2} MB)",
                file_name,
                size_bytes as f64 / 1024.0 / 1024.0
            ),
            kind: Some(MessageKind::Image),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatSession {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub niche: Option<String>,
    #[serde(default)]
    pub platform: Option<String>,
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    pub created_at: DateTime<Utc>,
}

/// Backend message format. User content travels in `query`, everything else in
/// `response`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WireMessage {
    pub query: String,
    pub response: String,
    pub role: Role,
}

impl From<&ChatMessage> for WireMessage {
    fn from(message: &ChatMessage) -> Self {
        let (query, response) = match message.role {
            Role::User => (message.content.clone(), String::new()),
            Role::Assistant | Role::System => (String::new(), message.content.clone()),
        };
        Self {
            query,
            response,
            role: message.role,
        }
    }
}

/// Session summary shown in the history list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub id: String,
    pub title: String,
    pub preview: String,
    pub niche: Option<String>,
    pub platform: Option<String>,
    pub message_count: usize,
    pub created_at: Option<DateTime<Utc>>,
}

fn non_empty_str<'a>(raw: &'a Value, key: &str) -> Option<&'a str> {
    raw.get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

fn message_from_raw(raw: &Value) -> ChatMessage {
    let role = raw
        .get("role")
        .and_then(Value::as_str)
        .and_then(Role::parse)
        .unwrap_or(if non_empty_str(raw, "query").is_some() {
            Role::User
        } else {
            Role::Assistant
        });

    let content = ["content", "query", "response"]
        .iter()
        .find_map(|k| non_empty_str(raw, k))
        .unwrap_or("")
        .to_string();

    let kind = raw
        .get("type")
        .and_then(Value::as_str)
        .filter(|t| *t == "image")
        .map(|_| MessageKind::Image);

    ChatMessage {
        role,
        content,
        kind,
    }
}

/// Accept a bare array, `{results}`, `{messages}` or a single legacy
/// `{query, response}` exchange, which expands into a user and an assistant
/// message.
pub fn normalize_messages(body: &Value) -> Vec<ChatMessage> {
    let list = body
        .as_array()
        .or_else(|| body.get("results").and_then(Value::as_array))
        .or_else(|| body.get("messages").and_then(Value::as_array));

    if let Some(list) = list {
        return list.iter().map(message_from_raw).collect();
    }

    match (non_empty_str(body, "query"), non_empty_str(body, "response")) {
        (Some(query), Some(response)) => vec![
            ChatMessage::user(query),
            ChatMessage::assistant(response),
        ],
        _ => Vec::new(),
    }
}

/// Parse a backend timestamp, tolerating RFC 3339 with or without an offset.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn wire_format_splits_by_role() {
        let user = WireMessage::from(&ChatMessage::user("hi"));
        assert_eq!(user.query, "hi");
        assert!(user.response.is_empty());
        assert_eq!(user.role, Role::User);

        let bot = WireMessage::from(&ChatMessage::assistant("hello"));
        assert!(bot.query.is_empty());
        assert_eq!(bot.response, "hello");

        let body = serde_json::to_value(&bot).unwrap();
        assert_eq!(body, json!({"query": "", "response": "hello", "role": "assistant"}));
    }

    #[test]
    fn normalizes_every_envelope() {
        let list = json!([{"role": "user", "content": "a"}, {"role": "assistant", "content": "b"}]);
        for body in [
            list.clone(),
            json!({ "results": list.clone() }),
            json!({ "messages": list.clone() }),
        ] {
            let messages = normalize_messages(&body);
            assert_eq!(messages, vec![ChatMessage::user("a"), ChatMessage::assistant("b")]);
        }
    }

    #[test]
    fn infers_role_and_content_from_wire_fields() {
        let messages = normalize_messages(&json!([
            {"query": "what's hot?", "response": ""},
            {"response": "cats"},
            {}
        ]));
        assert_eq!(messages[0], ChatMessage::user("what's hot?"));
        assert_eq!(messages[1], ChatMessage::assistant("cats"));
        assert_eq!(messages[2], ChatMessage::assistant(""));
    }

    #[test]
    fn legacy_pair_expands_to_two_messages() {
        let messages = normalize_messages(&json!({"query": "q", "response": "r"}));
        assert_eq!(messages, vec![ChatMessage::user("q"), ChatMessage::assistant("r")]);
        assert!(normalize_messages(&json!({"detail": "nothing"})).is_empty());
        assert!(normalize_messages(&json!({"query": "q"})).is_empty());
        assert!(normalize_messages(&json!({"query": "q", "response": ""})).is_empty());
    }

    #[test]
    fn image_messages_keep_their_kind() {
        let stored = serde_json::to_value(ChatMessage::image("cat.png", 1_048_576)).unwrap();
        assert_eq!(stored["content"], "📷 Uploaded image: cat.png (1.00 MB)");
        assert_eq!(stored["type"], "image");
        let back = normalize_messages(&json!([stored]));
        assert_eq!(back[0].kind, Some(MessageKind::Image));
        assert_eq!(back[0].role, Role::User);
    }

    #[test]
    fn timestamps_with_and_without_offset() {
        assert!(parse_timestamp("2024-05-01T10:00:00Z").is_some());
        assert!(parse_timestamp("2024-05-01T10:00:00.123456").is_some());
        assert!(parse_timestamp("yesterday").is_none());
    }
}
