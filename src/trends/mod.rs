pub mod aggregator;
pub mod categories;
pub mod envelope;
pub mod item;
pub mod relevance;

pub use aggregator::{
    AggregateError, Aggregator, ScraperSource, SourceFailure, TrendReport, TrendSource,
};
pub use categories::{discover_categories, NicheCategory};
pub use item::{normalize, ContentItem, Platform, PlatformFilter};
pub use relevance::{dedupe, filter_relevant, is_relevant, niche_keywords};
