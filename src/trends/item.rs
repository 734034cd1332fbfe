use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::envelope::extract_items;

pub const DEFAULT_TITLE: &str = "Untitled";
pub const DEFAULT_THUMBNAIL: &str = "https://via.placeholder.com/320x180?text=No+Image";

/// A scraped content source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    YouTube,
    Reddit,
    Pinterest,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::YouTube, Platform::Reddit, Platform::Pinterest];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::YouTube => "YouTube",
            Platform::Reddit => "Reddit",
            Platform::Pinterest => "Pinterest",
        }
    }

    /// Path segment used by the scraper endpoints.
    pub fn slug(&self) -> &'static str {
        match self {
            Platform::YouTube => "youtube",
            Platform::Reddit => "reddit",
            Platform::Pinterest => "pinterest",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "youtube" | "yt" => Ok(Platform::YouTube),
            "reddit" => Ok(Platform::Reddit),
            "pinterest" => Ok(Platform::Pinterest),
            other => Err(format!("Unknown platform: {}", other)),
        }
    }
}

/// Which sources a trends query should hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformFilter {
    All,
    Only(Platform),
}

impl PlatformFilter {
    pub fn includes(&self, platform: Platform) -> bool {
        match self {
            PlatformFilter::All => true,
            PlatformFilter::Only(p) => *p == platform,
        }
    }
}

impl FromStr for PlatformFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("all") {
            Ok(PlatformFilter::All)
        } else {
            s.parse().map(PlatformFilter::Only)
        }
    }
}

/// Canonical trending content record, whatever source it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: String,
    pub title: String,
    pub url: String,
    pub thumbnail: String,
    pub hashtags: Vec<String>,
    pub platform: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub views: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upvotes: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subreddit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

impl ContentItem {
    /// Map one raw upstream record. Non-objects yield `None`.
    ///
    /// `index` only feeds the fallback id when the record has neither an id nor a url.
    pub fn from_raw(raw: &Value, platform: Platform, index: usize) -> Option<Self> {
        let obj = raw.as_object()?;
        let field = |keys: &[&str]| -> Option<String> {
            keys.iter().find_map(|k| match obj.get(*k)? {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        };

        let url = field(&["url", "link", "permalink"]).unwrap_or_default();
        let id = field(&["id", "video_id", "post_id", "pin_id"])
            .or_else(|| (!url.is_empty()).then(|| url.clone()))
            .unwrap_or_else(|| format!("{}-{}", platform.slug(), index));

        Some(Self {
            id,
            title: field(&["title", "name"]).unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            url,
            thumbnail: field(&["thumbnail", "thumbnail_url", "image", "image_url"])
                .unwrap_or_else(|| DEFAULT_THUMBNAIL.to_string()),
            hashtags: obj
                .get("hashtags")
                .or_else(|| obj.get("tags"))
                .map(parse_hashtags)
                .unwrap_or_default(),
            platform: field(&["platform"]).unwrap_or_else(|| platform.as_str().to_string()),
            category: field(&["category"]),
            description: field(&["description"]),
            views: field(&["views", "view_count"]).and_then(|v| parse_count(&v)),
            channel: field(&["channel", "channel_title"]),
            upvotes: field(&["upvotes", "score"]).and_then(|v| v.parse().ok()),
            subreddit: field(&["subreddit"]),
            topic: field(&["topic"]),
        })
    }
}

/// Arrays pass through; a delimited string is split on `,`, `#` and whitespace
/// and every piece is re-prefixed with `#`.
pub fn parse_hashtags(value: &Value) -> Vec<String> {
    match value {
        Value::Array(tags) => tags
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
        Value::String(s) => split_hashtags(s),
        _ => Vec::new(),
    }
}

pub fn split_hashtags(raw: &str) -> Vec<String> {
    raw.split(|c: char| c == ',' || c == '#' || c.is_whitespace())
        .filter(|t| !t.is_empty())
        .map(|t| format!("#{}", t))
        .collect()
}

fn parse_count(raw: &str) -> Option<u64> {
    raw.replace(',', "").parse::<f64>().ok().map(|n| n as u64)
}

/// Extract and map every item from one source response.
pub fn normalize(body: &Value, platform: Platform) -> Vec<ContentItem> {
    extract_items(body)
        .iter()
        .enumerate()
        .filter_map(|(i, raw)| ContentItem::from_raw(raw, platform, i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn platform_parsing_is_case_insensitive() {
        assert_eq!("YouTube".parse::<Platform>().unwrap(), Platform::YouTube);
        assert_eq!("REDDIT".parse::<Platform>().unwrap(), Platform::Reddit);
        assert!("tiktok".parse::<Platform>().is_err());
        assert_eq!("all".parse::<PlatformFilter>().unwrap(), PlatformFilter::All);
        assert_eq!(
            "pinterest".parse::<PlatformFilter>().unwrap(),
            PlatformFilter::Only(Platform::Pinterest)
        );
    }

    #[test]
    fn maps_youtube_record() {
        let raw = json!({
            "video_id": "abc",
            "title": "  Lo-fi beats  ",
            "url": "https://youtu.be/abc",
            "thumbnail": "https://i.ytimg.com/vi/abc/hq.jpg",
            "hashtags": ["#music", "#lofi"],
            "views": "1,204",
            "channel": "Chill"
        });
        let item = ContentItem::from_raw(&raw, Platform::YouTube, 0).unwrap();
        assert_eq!(item.id, "abc");
        assert_eq!(item.title, "Lo-fi beats");
        assert_eq!(item.hashtags, vec!["#music", "#lofi"]);
        assert_eq!(item.platform, "YouTube");
        assert_eq!(item.views, Some(1204));
        assert_eq!(item.channel.as_deref(), Some("Chill"));
    }

    #[test]
    fn maps_reddit_record_with_numeric_id() {
        let raw = json!({
            "id": 42,
            "title": "Daily thread",
            "permalink": "https://reddit.com/r/music/42",
            "subreddit": "music",
            "score": 980
        });
        let item = ContentItem::from_raw(&raw, Platform::Reddit, 3).unwrap();
        assert_eq!(item.id, "42");
        assert_eq!(item.url, "https://reddit.com/r/music/42");
        assert_eq!(item.upvotes, Some(980));
        assert_eq!(item.subreddit.as_deref(), Some("music"));
    }

    #[test]
    fn missing_title_and_thumbnail_are_defaulted() {
        let item = ContentItem::from_raw(&json!({"url": "u"}), Platform::Pinterest, 0).unwrap();
        assert_eq!(item.title, DEFAULT_TITLE);
        assert_eq!(item.thumbnail, DEFAULT_THUMBNAIL);
        assert_eq!(item.id, "u");
    }

    #[test]
    fn id_falls_back_to_platform_and_index() {
        let item = ContentItem::from_raw(&json!({}), Platform::Pinterest, 5).unwrap();
        assert_eq!(item.id, "pinterest-5");
    }

    #[test]
    fn non_objects_are_skipped() {
        assert!(ContentItem::from_raw(&json!("x"), Platform::Reddit, 0).is_none());
        assert!(ContentItem::from_raw(&json!(null), Platform::Reddit, 0).is_none());
    }

    #[test]
    fn delimited_hashtags_are_split_and_prefixed() {
        assert_eq!(
            split_hashtags("music, #lofi chill##beats"),
            vec!["#music", "#lofi", "#chill", "#beats"]
        );
        assert_eq!(parse_hashtags(&json!(42)), Vec::<String>::new());
    }

    #[test]
    fn mapping_is_idempotent() {
        let raw = json!([
            {"title": "A", "url": "a", "hashtags": "x y", "views": 10},
            {"name": "B", "link": "b", "tags": ["#b"], "subreddit": "pics", "score": -2},
            {}
        ]);
        let once = normalize(&raw, Platform::Reddit);
        let again = normalize(&serde_json::to_value(&once).unwrap(), Platform::YouTube);
        assert_eq!(once, again);
    }
}
