use std::sync::Arc;

use crate::api::{ApiClient, CaptionClient};
use crate::auth::{LoginRoute, SessionContext};
use crate::chat::{ChatService, ChatStore};
use crate::config::Config;
use crate::error::ApiResult;
use crate::keepalive::KeepAlive;
use crate::trends::{Aggregator, ScraperSource};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub session: Arc<SessionContext>,
    pub route: Arc<LoginRoute>,
    pub api: ApiClient,
    /// Same session as `api`, pointed at the scraper backend.
    pub scraper: ApiClient,
    pub captions: CaptionClient,
    pub aggregator: Arc<Aggregator>,
    pub chats: Arc<ChatService>,
    pub keepalive: Arc<KeepAlive>,
}

impl AppState {
    /// Tokens and chats persisted in the configured data directory.
    pub fn open(config: Config) -> ApiResult<Self> {
        let data_dir = config.storage_dir();
        let session = SessionContext::open(&data_dir)?;
        let chats = ChatStore::open(&data_dir)?;
        tracing::debug!("Using data directory {}", data_dir.display());
        Self::build(config, session, chats)
    }

    /// Nothing touches disk.
    pub fn in_memory(config: Config) -> ApiResult<Self> {
        Self::build(config, SessionContext::in_memory(), ChatStore::in_memory())
    }

    pub fn build(config: Config, session: SessionContext, chats: ChatStore) -> ApiResult<Self> {
        let session = Arc::new(session);
        let route = Arc::new(LoginRoute::new());

        let api = ApiClient::new(
            config.api_url(),
            config.http.timeout(),
            session.clone(),
            route.clone(),
        )?;
        let scraper = api.with_base_url(config.scraper_url());
        let captions = CaptionClient::new(config.caption_url(), config.http.caption_timeout())?;

        let aggregator = Aggregator::new(
            ScraperSource::all(&scraper),
            config.http.source_timeout(),
            config.trends.clone(),
        );
        let chats = ChatService::new(api.clone(), captions.clone(), chats);
        let keepalive =
            KeepAlive::from_config(&config, api.clone(), scraper.clone(), captions.clone());

        Ok(Self {
            config,
            session,
            route,
            api,
            scraper,
            captions,
            aggregator: Arc::new(aggregator),
            chats: Arc::new(chats),
            keepalive: Arc::new(keepalive),
        })
    }
}
