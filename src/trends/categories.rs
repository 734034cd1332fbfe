use serde::Serialize;
use std::cmp::Ordering;

use super::aggregator::Aggregator;
use super::item::{ContentItem, Platform, PlatformFilter};

/// Known categories and their icons.
pub const CATEGORY_ICONS: &[(&str, &str)] = &[
    ("Music", "🎵"),
    ("Sports", "⚽"),
    ("Entertainment", "🎬"),
    ("News", "📰"),
    ("Fashion", "👗"),
    ("Food", "🍳"),
    ("Travel", "✈️"),
    ("Fitness", "💪"),
    ("Business", "💼"),
    ("Trending", "🔥"),
    ("Movies", "🎭"),
    ("Beauty", "💄"),
    ("Asian", "🥢"),
    ("Nepal", "🏔️"),
    ("Nepalese", "🇳🇵"),
    ("Songs", "🎤"),
    ("Memes", "😂"),
    ("Blogs", "📝"),
    ("Shorts", "📱"),
    ("Comedy", "🎪"),
    ("Education", "📚"),
    ("Lifestyle", "🌟"),
    ("Art", "🎨"),
    ("Automotive", "🚗"),
    ("Youtube", "📺"),
    ("Reddit", "🤖"),
    ("Pinterest", "📌"),
    ("Health", "🏥"),
    ("Science", "🔬"),
    ("Politics", "🏛️"),
    ("DIY", "🔨"),
    ("Pets", "🐕"),
    ("Parenting", "👶"),
    ("Cooking", "👨‍🍳"),
    ("Photography", "📸"),
    ("Design", "✨"),
];

const DEFAULT_ICON: &str = "📱";

/// Always shown, even with no matching content.
pub const POPULAR: &[&str] = &[
    "Music",
    "Gaming",
    "Entertainment",
    "Sports",
    "Fashion",
    "Tech",
    "Food",
    "Travel",
    "Fitness",
    "Beauty",
    "Education",
    "Comedy",
    "Art",
    "Business",
];

/// Noise labels seen in scraped data.
const UNWANTED: &[&str] = &[
    "cas",
    "cigarettesaftersex",
    "visitmunich",
    "munichhotelsgermany",
    "general",
    "misc",
    "miscellaneous",
    "other",
    "undefined",
    "null",
    "munich",
    "germany",
];

const MAX_CATEGORIES: usize = 20;

/// Seed query per source for discovery.
pub fn discovery_query(platform: Platform) -> &'static str {
    match platform {
        Platform::Reddit => "popular",
        Platform::YouTube | Platform::Pinterest => "trending",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NicheCategory {
    pub icon: String,
    pub title: String,
    pub description: String,
    pub count: usize,
}

impl NicheCategory {
    fn new(icon: &str, title: &str, description: &str, count: usize) -> Self {
        Self {
            icon: icon.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            count,
        }
    }
}

/// Category tallies in first-seen order.
#[derive(Debug, Default)]
struct Tally {
    counts: Vec<(String, usize)>,
}

impl Tally {
    fn with_predefined() -> Self {
        Self {
            counts: CATEGORY_ICONS
                .iter()
                .map(|(name, _)| (name.to_string(), 0))
                .collect(),
        }
    }

    fn bump(&mut self, name: &str) {
        match self.counts.iter_mut().find(|(n, _)| n == name) {
            Some((_, count)) => *count += 1,
            None => self.counts.push((name.to_string(), 1)),
        }
    }

    fn count(&self, name: &str) -> usize {
        self.counts
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, c)| *c)
            .unwrap_or(0)
    }

    /// Record a raw label, dropping noise and folding it onto a predefined
    /// category when one matches.
    fn add(&mut self, raw: &str) {
        let key = raw.trim();
        if key.is_empty() {
            return;
        }
        let lower = key.to_lowercase();

        if UNWANTED
            .iter()
            .any(|u| lower == *u || lower.contains(u) || u.contains(lower.as_str()))
        {
            return;
        }
        let len = key.chars().count();
        if !(3..=15).contains(&len) || key.chars().any(|c| c.is_ascii_digit()) {
            return;
        }

        let predefined = CATEGORY_ICONS.iter().map(|(n, _)| *n).find(|p| {
            let p = p.to_lowercase();
            p == lower || lower.contains(&p) || p.contains(&lower)
        });

        match predefined {
            Some(name) => self.bump(name),
            None if is_clean_label(key) => self.bump(key),
            None => {}
        }
    }
}

fn is_clean_label(key: &str) -> bool {
    let len = key.chars().count();
    (4..=12).contains(&len)
        && key.chars().all(|c| c.is_ascii_alphabetic() || c == ' ')
}

/// Proper-cased single word related to a popular category.
fn is_quality_dynamic(name: &str, count: usize) -> bool {
    let len = name.chars().count();
    let mut chars = name.chars();
    let proper_case = chars.next().is_some_and(|c| c.is_ascii_uppercase())
        && chars.all(|c| c.is_ascii_lowercase());
    let lower = name.to_lowercase();

    count >= 2
        && (4..=12).contains(&len)
        && proper_case
        && POPULAR.iter().any(|p| {
            let p = p.to_lowercase();
            lower.contains(&p) || p.contains(&lower)
        })
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn icon_for(name: &str) -> &'static str {
    CATEGORY_ICONS
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, icon)| *icon)
        .unwrap_or(DEFAULT_ICON)
}

/// Derive niche categories from scraped items. Falls back to the built-in list
/// when nothing qualifies.
pub fn discover_categories(items: &[ContentItem]) -> Vec<NicheCategory> {
    let predefined: Vec<&str> = CATEGORY_ICONS.iter().map(|(n, _)| *n).collect();
    let mut tally = Tally::with_predefined();

    for item in items {
        if let Some(ref category) = item.category {
            tally.add(category);
        }
        if let Some(ref topic) = item.topic {
            tally.add(topic);
        }
        if let Some(ref sub) = item.subreddit {
            tally.add(&capitalize(sub));
        }
        for tag in &item.hashtags {
            for piece in tag.split(|c: char| c == ',' || c == '#' || c.is_whitespace()) {
                tally.add(piece);
            }
        }

        let text = format!(
            "{} {}",
            item.title,
            item.description.as_deref().unwrap_or("")
        )
        .to_lowercase();
        for name in &predefined {
            if text.contains(&name.to_lowercase()) {
                tally.add(name);
            }
        }
    }

    let mut kept: Vec<(String, usize)> = tally
        .counts
        .iter()
        .filter(|(name, count)| {
            POPULAR.contains(&name.as_str()) || is_quality_dynamic(name, *count)
        })
        .cloned()
        .collect();

    kept.sort_by(|(a, a_count), (b, b_count)| {
        let a_pop = POPULAR.contains(&a.as_str());
        let b_pop = POPULAR.contains(&b.as_str());
        match (a_pop, b_pop) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => b_count.cmp(a_count),
        }
    });

    if kept.is_empty() {
        return fallback_categories();
    }

    kept.into_iter()
        .take(MAX_CATEGORIES)
        .map(|(name, _)| {
            let count = tally.count(&name);
            NicheCategory::new(
                icon_for(&name),
                &name,
                &format!("{} content and videos", name),
                count,
            )
        })
        .collect()
}

/// Built-in categories shown when discovery yields nothing.
pub fn fallback_categories() -> Vec<NicheCategory> {
    [
        ("🔥", "Trending", "What's hot right now"),
        ("🎵", "Music", "Songs, Artists, Albums"),
        ("🎮", "Gaming", "Games, Reviews, Gameplay"),
        ("🎬", "Entertainment", "Movies, Shows, Celebrities"),
        ("⚽", "Sports", "Games, Players, Highlights"),
        ("💻", "Tech", "Technology, Gadgets, Reviews"),
        ("👗", "Fashion", "Style, Trends, Outfits"),
        ("🍳", "Food", "Recipes, Cooking, Restaurants"),
        ("✈️", "Travel", "Destinations, Tips, Adventures"),
        ("💪", "Fitness", "Workouts, Health, Wellness"),
        ("📰", "News", "Latest News and Updates"),
        ("📚", "Education", "Learning, Tutorials, Courses"),
        ("🎭", "Movies", "Films, Reviews, Trailers"),
        ("💄", "Beauty", "Makeup, Skincare, Tips"),
        ("🎤", "Songs", "Latest hits and music videos"),
        ("😂", "Memes", "Funny content and viral memes"),
        ("🎪", "Comedy", "Stand-up, sketches, funny videos"),
        ("🌟", "Lifestyle", "Daily life, trends, vlogs"),
        ("🎨", "Art", "Creative content, tutorials"),
        ("💼", "Business", "Entrepreneurship, finance, tips"),
    ]
    .iter()
    .map(|(icon, title, desc)| NicheCategory::new(icon, title, desc, 0))
    .collect()
}

impl Aggregator {
    /// Pull each source's seed feed and derive categories from it.
    pub async fn discover_categories(&self) -> Vec<NicheCategory> {
        let batch = self
            .fetch_sources(PlatformFilter::All, |p| discovery_query(p).to_string())
            .await;
        let items: Vec<ContentItem> = batch
            .items
            .into_iter()
            .flat_map(|(_, items)| items)
            .collect();
        tracing::info!(
            "Discovering categories from {} items ({} sources failed)",
            items.len(),
            batch.failures.len()
        );
        discover_categories(&items)
    }
}
