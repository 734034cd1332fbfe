use async_trait::async_trait;
use futures::future::join_all;
use rand::seq::SliceRandom;
use rand::Rng;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::item::{normalize, ContentItem, Platform, PlatformFilter};
use super::relevance::{dedupe, filter_relevant};
use crate::api::{ApiClient, ApiRequest};
use crate::config::TrendsConfig;
use crate::error::ApiResult;

/// One upstream provider of trending content.
#[async_trait]
pub trait TrendSource: Send + Sync {
    fn platform(&self) -> Platform;

    /// Raw response body for a query. Envelope shape is up to the source.
    async fn fetch(&self, query: &str) -> ApiResult<Value>;
}

/// Scraper backend endpoint for one platform: `GET /api/scrape/{platform}/?q=`.
pub struct ScraperSource {
    platform: Platform,
    client: ApiClient,
}

impl ScraperSource {
    pub fn new(platform: Platform, client: ApiClient) -> Self {
        Self { platform, client }
    }

    /// One source per known platform, all sharing `client`.
    pub fn all(client: &ApiClient) -> Vec<Arc<dyn TrendSource>> {
        Platform::ALL
            .iter()
            .map(|p| Arc::new(Self::new(*p, client.clone())) as Arc<dyn TrendSource>)
            .collect()
    }
}

#[async_trait]
impl TrendSource for ScraperSource {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn fetch(&self, query: &str) -> ApiResult<Value> {
        let path = format!("/api/scrape/{}/", self.platform.slug());
        self.client.send(ApiRequest::get(path).query("q", query)).await
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    pub platform: Platform,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AggregateError {
    #[error("All {attempted} content sources are unavailable")]
    AllSourcesFailed { attempted: usize },
    #[error("No content source is configured for the selected platform")]
    NoSourceSelected,
}

/// Outcome of one aggregation. Never an `Err`: failed sources are listed and
/// `error` is set only when nothing answered or nothing was asked.
#[derive(Debug, Clone)]
pub struct TrendReport {
    pub items: Vec<ContentItem>,
    pub failures: Vec<SourceFailure>,
    pub error: Option<AggregateError>,
}

impl TrendReport {
    pub fn all_failed(&self) -> bool {
        matches!(self.error, Some(AggregateError::AllSourcesFailed { .. }))
    }
}

/// Items per source, in source order, with per-source failures.
pub struct SourceBatch {
    pub items: Vec<(Platform, Vec<ContentItem>)>,
    pub failures: Vec<SourceFailure>,
}

pub struct Aggregator {
    sources: Vec<Arc<dyn TrendSource>>,
    timeout: Duration,
    options: TrendsConfig,
}

impl Aggregator {
    pub fn new(
        sources: Vec<Arc<dyn TrendSource>>,
        timeout: Duration,
        options: TrendsConfig,
    ) -> Self {
        Self {
            sources,
            timeout,
            options,
        }
    }

    pub fn platforms(&self) -> Vec<Platform> {
        self.sources.iter().map(|s| s.platform()).collect()
    }

    /// Deduplicated, relevance-filtered, shuffled trending items for a niche.
    pub async fn collect(&self, niche: &str, filter: PlatformFilter) -> TrendReport {
        let batch = self
            .fetch_sources(filter, |_| niche.to_string())
            .await;

        let attempted = batch.items.len() + batch.failures.len();
        let error = if attempted == 0 {
            tracing::warn!("No source selected by {:?}", filter);
            Some(AggregateError::NoSourceSelected)
        } else if batch.items.is_empty() {
            let err = AggregateError::AllSourcesFailed { attempted };
            tracing::error!("{}", err);
            Some(err)
        } else {
            None
        };

        let pooled = batch.items.into_iter().flat_map(|(_, items)| items).collect();
        let items = arrange(pooled, niche, &self.options, &mut rand::thread_rng());

        TrendReport {
            items,
            failures: batch.failures,
            error,
        }
    }

    /// Query the selected sources concurrently. Each fetch has its own timeout and a
    /// failing or slow source only removes its own items.
    pub async fn fetch_sources(
        &self,
        filter: PlatformFilter,
        query_for: impl Fn(Platform) -> String,
    ) -> SourceBatch {
        let fetches = self
            .sources
            .iter()
            .filter(|s| filter.includes(s.platform()))
            .map(|source| {
                let platform = source.platform();
                let query = query_for(platform);
                async move {
                    match tokio::time::timeout(self.timeout, source.fetch(&query)).await {
                        Ok(Ok(body)) => Ok((platform, normalize(&body, platform))),
                        Ok(Err(e)) => Err(SourceFailure {
                            platform,
                            reason: e.to_string(),
                        }),
                        Err(_) => Err(SourceFailure {
                            platform,
                            reason: format!("Timed out after {}s", self.timeout.as_secs_f32()),
                        }),
                    }
                }
            });

        let mut batch = SourceBatch {
            items: Vec::new(),
            failures: Vec::new(),
        };
        for settled in join_all(fetches).await {
            match settled {
                Ok((platform, items)) => {
                    tracing::debug!("{}: {} items", platform, items.len());
                    batch.items.push((platform, items));
                }
                Err(failure) => {
                    tracing::warn!("{} source failed: {}", failure.platform, failure.reason);
                    batch.failures.push(failure);
                }
            }
        }
        batch
    }
}

/// Dedupe, filter for the niche, shuffle and cap.
pub fn arrange<R: Rng + ?Sized>(
    items: Vec<ContentItem>,
    niche: &str,
    options: &TrendsConfig,
    rng: &mut R,
) -> Vec<ContentItem> {
    let mut items = filter_relevant(dedupe(items), niche, options.min_relevant, options.pad_to);
    items.shuffle(rng);
    items.truncate(options.max_items);
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ApiError;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    enum Behaviour {
        Answer(Value),
        Fail,
        Hang,
    }

    struct StubSource {
        platform: Platform,
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl StubSource {
        fn new(platform: Platform, behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                platform,
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl TrendSource for StubSource {
        fn platform(&self) -> Platform {
            self.platform
        }

        async fn fetch(&self, _query: &str) -> ApiResult<Value> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Answer(v) => Ok(v.clone()),
                Behaviour::Fail => Err(ApiError::Server {
                    status: 502,
                    message: "Bad Gateway".into(),
                }),
                Behaviour::Hang => {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    Ok(json!([]))
                }
            }
        }
    }

    fn titled(prefix: &str, n: usize) -> Value {
        Value::Array(
            (0..n)
                .map(|i| {
                    json!({
                        "title": format!("{} {}", prefix, i),
                        "url": format!("{}-{}", prefix, i)
                    })
                })
                .collect(),
        )
    }

    fn aggregator(sources: Vec<Arc<StubSource>>) -> Aggregator {
        let sources = sources
            .into_iter()
            .map(|s| s as Arc<dyn TrendSource>)
            .collect();
        Aggregator::new(sources, Duration::from_millis(100), TrendsConfig::default())
    }

    #[tokio::test]
    async fn timed_out_source_does_not_block_the_others() {
        let agg = aggregator(vec![
            StubSource::new(Platform::YouTube, Behaviour::Answer(titled("yt", 3))),
            StubSource::new(Platform::Reddit, Behaviour::Answer(json!({"posts": titled("rd", 2)}))),
            StubSource::new(Platform::Pinterest, Behaviour::Hang),
        ]);

        let report = agg.collect("Trending", PlatformFilter::All).await;
        assert!(!report.all_failed());
        assert_eq!(report.items.len(), 5);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].platform, Platform::Pinterest);
        assert!(report.failures[0].reason.contains("Timed out"));
    }

    #[tokio::test]
    async fn all_sources_failing_is_an_empty_report_with_error() {
        let agg = aggregator(vec![
            StubSource::new(Platform::YouTube, Behaviour::Fail),
            StubSource::new(Platform::Reddit, Behaviour::Fail),
            StubSource::new(Platform::Pinterest, Behaviour::Hang),
        ]);

        let report = agg.collect("Music", PlatformFilter::All).await;
        assert!(report.items.is_empty());
        assert_eq!(
            report.error,
            Some(AggregateError::AllSourcesFailed { attempted: 3 })
        );
        assert_eq!(report.failures.len(), 3);
    }

    #[tokio::test]
    async fn empty_answers_are_not_failures() {
        let agg = aggregator(vec![StubSource::new(
            Platform::YouTube,
            Behaviour::Answer(json!({"results": []})),
        )]);
        let report = agg.collect("Music", PlatformFilter::All).await;
        assert!(report.items.is_empty());
        assert!(!report.all_failed());
    }

    #[tokio::test]
    async fn unconfigured_platform_is_not_a_source_failure() {
        let yt = StubSource::new(Platform::YouTube, Behaviour::Answer(titled("yt", 2)));
        let agg = aggregator(vec![yt.clone()]);

        let report = agg
            .collect("Music", PlatformFilter::Only(Platform::Pinterest))
            .await;
        assert!(report.items.is_empty());
        assert!(report.failures.is_empty());
        assert!(!report.all_failed());
        assert_eq!(report.error, Some(AggregateError::NoSourceSelected));
        assert_eq!(yt.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn specific_platform_queries_one_source() {
        let yt = StubSource::new(Platform::YouTube, Behaviour::Answer(titled("yt", 2)));
        let rd = StubSource::new(Platform::Reddit, Behaviour::Answer(titled("rd", 2)));
        let agg = aggregator(vec![yt.clone(), rd.clone()]);

        let report = agg
            .collect("Trending", PlatformFilter::Only(Platform::Reddit))
            .await;
        assert_eq!(report.items.len(), 2);
        assert!(report.items.iter().all(|i| i.platform == "Reddit"));
        assert_eq!(yt.calls.load(Ordering::SeqCst), 0);
        assert_eq!(rd.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn duplicates_across_sources_collapse() {
        let agg = aggregator(vec![
            StubSource::new(Platform::YouTube, Behaviour::Answer(titled("same", 3))),
            StubSource::new(Platform::Reddit, Behaviour::Answer(titled("same", 3))),
        ]);
        let report = agg.collect("Trending", PlatformFilter::All).await;
        assert_eq!(report.items.len(), 3);
    }

    #[test]
    fn arrange_caps_at_max_items() {
        let items = normalize(&titled("x", 40), Platform::YouTube);
        let mut rng = StdRng::seed_from_u64(7);
        let arranged = arrange(items, "Trending", &TrendsConfig::default(), &mut rng);
        assert_eq!(arranged.len(), 16);
    }

    #[test]
    fn arrange_shuffles_but_keeps_the_same_set() {
        let items = normalize(&titled("x", 10), Platform::YouTube);
        let mut rng = StdRng::seed_from_u64(42);
        let arranged = arrange(items.clone(), "Trending", &TrendsConfig::default(), &mut rng);

        let mut before: Vec<_> = items.iter().map(|i| i.id.clone()).collect();
        let mut after: Vec<_> = arranged.iter().map(|i| i.id.clone()).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);
    }

    #[test]
    fn arrange_pads_sparse_niche_results() {
        let mut raw = titled("sport", 10);
        raw.as_array_mut()
            .unwrap()
            .push(json!({"title": "Music news", "url": "m"}));
        let items = normalize(&raw, Platform::YouTube);
        let mut rng = StdRng::seed_from_u64(1);
        let arranged = arrange(items, "Music", &TrendsConfig::default(), &mut rng);
        assert_eq!(arranged.len(), 8);
        assert!(arranged.iter().any(|i| i.title == "Music news"));
    }
}
