//! Periodic pings that keep free-tier backends from idling out.

use async_trait::async_trait;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::api::{ApiClient, CaptionClient, HealthStatus};
use crate::config::Config;

#[async_trait]
pub trait Probe: Send + Sync {
    /// Never fails; an unreachable service is reported in the status.
    async fn check(&self) -> HealthStatus;
}

#[async_trait]
impl Probe for ApiClient {
    async fn check(&self) -> HealthStatus {
        self.health().await
    }
}

#[async_trait]
impl Probe for CaptionClient {
    async fn check(&self) -> HealthStatus {
        self.check_service().await
    }
}

#[derive(Clone)]
pub struct Target {
    pub name: &'static str,
    pub every: Duration,
    pub probe: Arc<dyn Probe>,
}

impl Target {
    pub fn new(name: &'static str, every: Duration, probe: Arc<dyn Probe>) -> Self {
        Self { name, every, probe }
    }
}

pub struct KeepAlive {
    targets: Vec<Target>,
    tasks: Mutex<Vec<(&'static str, JoinHandle<()>)>>,
}

impl KeepAlive {
    pub fn new(targets: Vec<Target>) -> Self {
        Self {
            targets,
            tasks: Mutex::new(Vec::new()),
        }
    }

    /// API, scraper and caption service at their configured periods.
    pub fn from_config(
        config: &Config,
        api: ApiClient,
        scraper: ApiClient,
        captions: CaptionClient,
    ) -> Self {
        let periods = &config.keepalive;
        Self::new(vec![
            Target::new("api", Duration::from_secs(periods.api_secs), Arc::new(api)),
            Target::new(
                "scraper",
                Duration::from_secs(periods.scraper_secs),
                Arc::new(scraper),
            ),
            Target::new(
                "caption",
                Duration::from_secs(periods.caption_secs),
                Arc::new(captions),
            ),
        ])
    }

    /// Spawn one ping loop per target. Calling it again while running does nothing.
    pub async fn start(&self) {
        let mut tasks = self.tasks.lock().await;
        if !tasks.is_empty() {
            tracing::debug!("Keep-alive already running");
            return;
        }

        for target in &self.targets {
            let Target { name, every, probe } = target.clone();
            let handle = tokio::spawn(async move {
                let mut ticker = tokio::time::interval(every);
                // The first tick completes immediately.
                ticker.tick().await;
                loop {
                    ticker.tick().await;
                    let status = probe.check().await;
                    if status.available {
                        tracing::debug!("Keep-alive ping to {} ok", name);
                    } else {
                        tracing::warn!("Keep-alive ping to {} failed: {}", name, status.status);
                    }
                }
            });
            tasks.push((name, handle));
        }
        tracing::info!("Keep-alive started for {} services", tasks.len());
    }

    /// Probe every target once, concurrently.
    pub async fn initial_checks(&self) -> Vec<(&'static str, HealthStatus)> {
        let checks = self.targets.iter().map(|t| async move { (t.name, t.probe.check().await) });
        join_all(checks).await
    }

    pub async fn stop(&self) {
        let mut tasks = self.tasks.lock().await;
        for (_, handle) in tasks.drain(..) {
            handle.abort();
        }
        tracing::info!("Keep-alive stopped");
    }

    /// Names of the services with a live ping loop.
    pub async fn status(&self) -> Vec<&'static str> {
        self.tasks
            .lock()
            .await
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(name, _)| *name)
            .collect()
    }
}
