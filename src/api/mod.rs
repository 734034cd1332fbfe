pub mod caption;
pub mod client;
pub mod endpoints;

pub use caption::{CaptionClient, CaptionResult};
pub use client::{ApiClient, ApiRequest};
pub use endpoints::{
    Credentials, HealthStatus, NewChatSession, Registration, TokenPair, UserProfile,
};
