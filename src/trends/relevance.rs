use std::collections::HashSet;

use super::item::ContentItem;

/// Niche that means "no filtering".
pub const GENERIC_NICHE: &str = "trending";

pub fn is_generic(niche: &str) -> bool {
    let niche = niche.trim();
    niche.is_empty() || niche.eq_ignore_ascii_case(GENERIC_NICHE)
}

/// Lower-cased keywords for a niche: the whole label plus each word of three
/// or more characters.
pub fn niche_keywords(niche: &str) -> Vec<String> {
    let phrase = niche.trim().to_lowercase();
    if phrase.is_empty() {
        return Vec::new();
    }

    let mut keywords = vec![phrase.clone()];
    for word in phrase.split(|c: char| !c.is_alphanumeric()) {
        if word.chars().count() >= 3 && !keywords.iter().any(|k| k == word) {
            keywords.push(word.to_string());
        }
    }
    keywords
}

/// True when any of title, category, subreddit, topic or a hashtag contains one
/// of the keywords, ignoring case.
pub fn is_relevant(item: &ContentItem, keywords: &[String]) -> bool {
    let fields = [
        Some(item.title.as_str()),
        item.category.as_deref(),
        item.subreddit.as_deref(),
        item.topic.as_deref(),
    ];
    let haystacks = fields
        .into_iter()
        .flatten()
        .chain(item.hashtags.iter().map(String::as_str))
        .map(str::to_lowercase);

    haystacks
        .into_iter()
        .any(|text| keywords.iter().any(|k| text.contains(k.as_str())))
}

/// Collapse items sharing `(url, lower-cased trimmed title)`. First occurrence wins.
pub fn dedupe(items: Vec<ContentItem>) -> Vec<ContentItem> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert((item.url.clone(), item.title.trim().to_lowercase())))
        .collect()
}

/// Keep the items relevant to `niche`. When fewer than `min_relevant` match, pad
/// with unmatched items (in their original order) until `pad_to` is reached.
pub fn filter_relevant(
    items: Vec<ContentItem>,
    niche: &str,
    min_relevant: usize,
    pad_to: usize,
) -> Vec<ContentItem> {
    if is_generic(niche) {
        return items;
    }

    let keywords = niche_keywords(niche);
    let (mut matched, rest): (Vec<_>, Vec<_>) = items
        .into_iter()
        .partition(|item| is_relevant(item, &keywords));

    if matched.len() < min_relevant {
        let missing = pad_to.saturating_sub(matched.len());
        tracing::debug!(
            "Only {} items match '{}', padding with up to {} more",
            matched.len(),
            niche,
            missing
        );
        matched.extend(rest.into_iter().take(missing));
    }
    matched
}
