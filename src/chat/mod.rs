pub mod generator;
pub mod service;
pub mod store;
pub mod types;

pub use generator::{HashtagProvider, Intent, Topic};
pub use service::{is_local, ChatService};
pub use store::{ChatState, ChatStore, ChatUpdate};
pub use types::{
    normalize_messages, ChatMessage, ChatSession, HistoryEntry, MessageKind, Role, WireMessage,
};
