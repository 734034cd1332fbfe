//! Scripted replies for the content generator chat.
//!
//! Replies are picked by keyword, not produced by a model. Only the hashtag
//! reply reaches out to the backend, and it has a canned fallback.

use async_trait::async_trait;

use crate::api::{ApiClient, CaptionResult};
use crate::error::ApiResult;

/// Source of trending hashtags for a niche.
#[async_trait]
pub trait HashtagProvider: Send + Sync {
    async fn hashtags(&self, niche: &str, platform: Option<&str>) -> ApiResult<Vec<String>>;
}

#[async_trait]
impl HashtagProvider for ApiClient {
    async fn hashtags(&self, niche: &str, platform: Option<&str>) -> ApiResult<Vec<String>> {
        ApiClient::hashtags(self, niche, platform).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    Hashtags,
    Captions,
    Help,
}

impl Intent {
    pub fn classify(input: &str) -> Self {
        let input = input.to_lowercase();
        if input.contains("hashtag") {
            Intent::Hashtags
        } else if input.contains("caption") {
            Intent::Captions
        } else {
            Intent::Help
        }
    }
}

/// Niche and platform a chat is generating for.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Topic {
    pub niche: Option<String>,
    pub platform: Option<String>,
}

impl Topic {
    pub fn new(niche: Option<String>, platform: Option<String>) -> Self {
        Self { niche, platform }
    }

    fn niche(&self) -> &str {
        self.niche.as_deref().unwrap_or("")
    }

    /// `" on <platform>"` or nothing.
    fn on_platform(&self) -> String {
        self.platform
            .as_deref()
            .map(|p| format!(" on {}", p))
            .unwrap_or_default()
    }
}

/// Opening system message of a new chat.
pub fn system_prompt(topic: &Topic) -> String {
    let target = match topic.niche.as_deref() {
        Some(niche) => format!("the niche: {}", niche),
        None => "[not selected]".to_string(),
    };
    let platform = topic
        .platform
        .as_deref()
        .map(|p| format!(" on platform: {}", p))
        .unwrap_or_default();
    let hint = match topic.niche.as_deref() {
        Some(niche) => format!(
            "Try: \"Generate hashtags for my {niche} post\", \"Create captions for {niche} content\", or upload an image for caption generation"
        ),
        None => "Please select a niche above to get started.".to_string(),
    };
    format!("You are generating content for {}{}. {}", target, platform, hint)
}

pub fn session_title(topic: &Topic) -> String {
    match (&topic.niche, &topic.platform) {
        (Some(niche), Some(platform)) => format!("{} - {}", niche, platform),
        (Some(niche), None) => niche.clone(),
        (None, _) => "New Chat".to_string(),
    }
}

pub fn fallback_hashtags(topic: &Topic) -> String {
    let mut tags = vec![
        format!("#{}", topic.niche().to_lowercase()),
        "#trending".to_string(),
        "#viral".to_string(),
        "#content".to_string(),
    ];
    if let Some(platform) = topic.platform.as_deref() {
        tags.push(format!("#{}", platform.to_lowercase()));
    }
    tags.extend(
        ["#socialmedia", "#engagement", "#creative", "#inspiration", "#daily"]
            .iter()
            .map(|t| t.to_string()),
    );
    tags.join(" ")
}

pub fn caption_ideas(topic: &Topic) -> String {
    let niche = topic.niche();
    format!(
        "Here are some caption ideas for {niche}{on}:\n\n\
         1. \"{niche} vibes only ✨\"\n\
         2. \"Creating magic in the {niche} space\"\n\
         3. \"Your daily dose of {niche} inspiration\"\n\
         4. \"Bringing you the best {niche} content\"\n\
         5. \"Join the {niche} community!\"",
        on = topic.on_platform(),
    )
}

pub fn help_reply(topic: &Topic) -> String {
    let niche = topic.niche();
    format!(
        "I understand you want to generate content for {niche}{on}. I can help you with:\n\n\
         • **Hashtags**: Ask \"Generate hashtags for my {niche} post\"\n\
         • **Captions**: Ask \"Create captions for {niche} content\"\n\
         • **Image Analysis**: Upload an image for automatic caption generation\n\n\
         What would you like to create?",
        on = topic.on_platform(),
    )
}

pub fn image_reply(result: &CaptionResult) -> String {
    format!(
        "🖼️ **Image Analysis Complete!**\n\n\
         **Description:** {}\n\n\
         **Generated Caption & Hashtags:** {}\n\n\
         You can now ask me to:\n\
         - Refine these hashtags for specific platforms\n\
         - Generate different caption styles\n\
         - Create variations for different audiences",
        result.description, result.caption_hashtags
    )
}

/// Hashtag reply from the backend, or the canned list when the backend fails or
/// has nothing.
pub async fn hashtag_reply(provider: &dyn HashtagProvider, topic: &Topic) -> String {
    match provider.hashtags(topic.niche(), topic.platform.as_deref()).await {
        Ok(tags) if !tags.is_empty() => format!(
            "Here are some trending hashtags for {}{}:\n{}",
            topic.niche(),
            topic.on_platform(),
            tags.join(" ")
        ),
        Ok(_) => {
            tracing::warn!("No hashtags returned for {}", topic.niche());
            suggested_hashtags(topic)
        }
        Err(e) => {
            tracing::warn!("Hashtag lookup failed: {}", e);
            suggested_hashtags(topic)
        }
    }
}

fn suggested_hashtags(topic: &Topic) -> String {
    format!(
        "Here are some suggested hashtags for {}{}:\n{}",
        topic.niche(),
        topic.on_platform(),
        fallback_hashtags(topic)
    )
}

/// Assistant reply for one user message.
pub async fn reply(provider: &dyn HashtagProvider, topic: &Topic, input: &str) -> String {
    match Intent::classify(input) {
        Intent::Hashtags => hashtag_reply(provider, topic).await,
        Intent::Captions => caption_ideas(topic),
        Intent::Help => help_reply(topic),
    }
}
