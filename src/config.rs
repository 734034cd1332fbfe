use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "trendmorph", about = "Trending content explorer and content generator")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Path to data directory
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Backend API base URL
    #[arg(long, global = true)]
    pub api_url: Option<String>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Log in and store access/refresh tokens
    Login {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        password: String,
    },
    /// Create an account
    Register {
        #[arg(short, long)]
        username: String,
        #[arg(short, long)]
        email: String,
        #[arg(short, long)]
        password: String,
    },
    /// Clear stored tokens
    Logout,
    /// Show the logged in user's profile
    Profile,
    /// Show the backend's view of the current session
    Session,
    /// Check an access token with the backend (defaults to the stored one)
    Verify {
        #[arg(long)]
        token: Option<String>,
    },
    /// Print the Google OAuth login URL
    GoogleUrl,
    /// Complete a Google OAuth login with the callback code
    GoogleCallback {
        #[arg(long)]
        code: String,
        #[arg(long)]
        state: Option<String>,
    },
    /// Show trending content for a niche
    Trends {
        #[arg(short, long, default_value = "Trending")]
        niche: String,
        /// all, youtube, reddit or pinterest
        #[arg(short, long, default_value = "all")]
        platform: String,
    },
    /// Discover niche categories from scraped content
    Niches,
    /// Fetch trending hashtags for a niche
    Hashtags {
        #[arg(short, long)]
        niche: String,
        #[arg(short, long)]
        platform: Option<String>,
    },
    /// Fetch caption suggestions for a niche
    Captions {
        #[arg(short, long)]
        niche: String,
        #[arg(short, long)]
        platform: Option<String>,
    },
    /// Chat-style content generator
    Chat {
        #[command(subcommand)]
        action: ChatAction,
    },
    /// Generate a caption for an image
    Caption { image: PathBuf },
    /// Check every backend once
    Health,
    /// Keep the backends warm until interrupted
    Keepalive,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ChatAction {
    /// Start a new chat for a niche/platform pair
    New {
        #[arg(short, long)]
        niche: Option<String>,
        #[arg(short, long)]
        platform: Option<String>,
    },
    /// Send a message to the current chat
    Send { message: String },
    /// Upload an image to the current chat for caption generation
    Image { path: PathBuf },
    /// List local chats
    List,
    /// Show remote chat history
    History,
    /// Switch the current chat and load its messages
    Open { id: String },
    /// Delete a chat
    Delete { id: String },
    /// Deselect the current chat, niche and platform
    Reset,
    /// Delete one message from the legacy history
    DeleteMessage { id: String },
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
    pub http: HttpConfig,
    pub trends: TrendsConfig,
    pub keepalive: KeepAliveConfig,
    pub storage: StorageConfig,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct BackendConfig {
    pub api_url: String,
    pub scraper_url: Option<String>,
    pub caption_url: String,
    pub oauth_client_id: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub source_timeout_secs: u64,
    pub caption_timeout_secs: u64,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct TrendsConfig {
    pub max_items: usize,
    pub min_relevant: usize,
    pub pad_to: usize,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(default)]
pub struct KeepAliveConfig {
    pub api_secs: u64,
    pub scraper_secs: u64,
    pub caption_secs: u64,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(default)]
pub struct StorageConfig {
    pub data_dir: Option<PathBuf>,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            api_url: "https://trendmorph-ai-backend.onrender.com".to_string(),
            scraper_url: None,
            caption_url: "http://127.0.0.1:5000".to_string(),
            oauth_client_id: None,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            source_timeout_secs: 12,
            caption_timeout_secs: 60,
        }
    }
}

impl Default for TrendsConfig {
    fn default() -> Self {
        Self {
            max_items: 16,
            min_relevant: 4,
            pad_to: 8,
        }
    }
}

impl Default for KeepAliveConfig {
    fn default() -> Self {
        Self {
            api_secs: 12 * 60,
            scraper_secs: 10 * 60,
            caption_secs: 15 * 60,
        }
    }
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn caption_timeout(&self) -> Duration {
        Duration::from_secs(self.caption_timeout_secs)
    }
}

impl Config {
    pub fn load(cli: &Cli) -> anyhow::Result<Self> {
        Self::load_with_env(cli, |key| std::env::var(key).ok())
    }

    /// Layer defaults, the TOML file, environment and CLI flags, in that order.
    pub fn load_with_env(
        cli: &Cli,
        env: impl Fn(&str) -> Option<String>,
    ) -> anyhow::Result<Self> {
        let data_dir = Self::data_dir(cli);
        let config_path = cli
            .config
            .clone()
            .unwrap_or_else(|| data_dir.join("config.toml"));

        let mut config = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Config::default()
        };

        // Environment overrides
        if let Some(url) = env("TRENDMORPH_API_URL") {
            config.backend.api_url = url;
        }
        if let Some(url) = env("TRENDMORPH_SCRAPER_URL") {
            config.backend.scraper_url = Some(url);
        }
        if let Some(url) = env("TRENDMORPH_CAPTION_URL") {
            config.backend.caption_url = url;
        }
        if let Some(id) = env("TRENDMORPH_OAUTH_CLIENT_ID") {
            config.backend.oauth_client_id = Some(id);
        }

        // CLI overrides
        if let Some(ref url) = cli.api_url {
            config.backend.api_url = url.clone();
        }

        if config.storage.data_dir.is_none() {
            config.storage.data_dir = Some(data_dir);
        }

        config.validate()?;
        Ok(config)
    }

    /// Every backend URL must be an absolute http(s) URL.
    pub fn validate(&self) -> anyhow::Result<()> {
        for (name, raw) in [
            ("api_url", self.api_url()),
            ("scraper_url", self.scraper_url()),
            ("caption_url", self.caption_url()),
        ] {
            let url = url::Url::parse(raw)
                .map_err(|e| anyhow::anyhow!("Invalid {} '{}': {}", name, raw, e))?;
            if !matches!(url.scheme(), "http" | "https") {
                anyhow::bail!("Invalid {} '{}': expected http or https", name, raw);
            }
        }
        Ok(())
    }

    pub fn data_dir(cli: &Cli) -> PathBuf {
        cli.data_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".trendmorph")
        })
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.storage
            .data_dir
            .clone()
            .unwrap_or_else(|| PathBuf::from(".trendmorph"))
    }

    pub fn api_url(&self) -> &str {
        self.backend.api_url.trim_end_matches('/')
    }

    pub fn scraper_url(&self) -> &str {
        self.backend
            .scraper_url
            .as_deref()
            .unwrap_or(&self.backend.api_url)
            .trim_end_matches('/')
    }

    pub fn caption_url(&self) -> &str {
        self.backend.caption_url.trim_end_matches('/')
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_for(dir: &std::path::Path) -> Cli {
        Cli {
            config: None,
            data_dir: Some(dir.to_path_buf()),
            api_url: None,
            verbose: false,
            command: Command::Health,
        }
    }

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn default_config_has_expected_values() {
        let config = Config::default();
        assert_eq!(
            config.backend.api_url,
            "https://trendmorph-ai-backend.onrender.com"
        );
        assert_eq!(config.backend.caption_url, "http://127.0.0.1:5000");
        assert_eq!(config.http.timeout_secs, 30);
        assert_eq!(config.http.source_timeout_secs, 12);
        assert_eq!(config.trends.max_items, 16);
        assert_eq!(config.trends.min_relevant, 4);
        assert_eq!(config.keepalive.api_secs, 720);
    }

    #[test]
    fn data_dir_defaults_to_home_dot_trendmorph() {
        let mut cli = cli_for(std::path::Path::new("/tmp"));
        cli.data_dir = None;
        assert!(Config::data_dir(&cli).ends_with(".trendmorph"));
    }

    #[test]
    fn scraper_url_falls_back_to_api_url() {
        let mut config = Config::default();
        config.backend.api_url = "http://localhost:8000/".to_string();
        assert_eq!(config.scraper_url(), "http://localhost:8000");
        assert_eq!(config.api_url(), "http://localhost:8000");

        config.backend.scraper_url = Some("http://scraper:9000".to_string());
        assert_eq!(config.scraper_url(), "http://scraper:9000");
    }

    #[test]
    fn load_with_no_config_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let config = Config::load_with_env(&cli_for(tmp.path()), no_env).unwrap();
        assert_eq!(config.http.caption_timeout_secs, 60);
        assert_eq!(config.storage_dir(), tmp.path().to_path_buf());
    }

    #[test]
    fn load_reads_toml_file() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            r#"
[backend]
api_url = "http://10.0.0.5:8000"
caption_url = "http://10.0.0.6:5000"

[trends]
max_items = 10
"#,
        )
        .unwrap();

        let config = Config::load_with_env(&cli_for(tmp.path()), no_env).unwrap();
        assert_eq!(config.api_url(), "http://10.0.0.5:8000");
        assert_eq!(config.caption_url(), "http://10.0.0.6:5000");
        assert_eq!(config.trends.max_items, 10);
        assert_eq!(config.trends.pad_to, 8);
    }

    #[test]
    fn env_beats_toml_and_cli_beats_env() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join("config.toml"),
            "[backend]\napi_url = \"http://from-toml\"\n",
        )
        .unwrap();

        let env = |key: &str| match key {
            "TRENDMORPH_API_URL" => Some("http://from-env".to_string()),
            "TRENDMORPH_CAPTION_URL" => Some("http://caption-env".to_string()),
            _ => None,
        };

        let config = Config::load_with_env(&cli_for(tmp.path()), env).unwrap();
        assert_eq!(config.api_url(), "http://from-env");
        assert_eq!(config.caption_url(), "http://caption-env");

        let mut cli = cli_for(tmp.path());
        cli.api_url = Some("http://from-cli".to_string());
        let config = Config::load_with_env(&cli, env).unwrap();
        assert_eq!(config.api_url(), "http://from-cli");
    }

    #[test]
    fn malformed_urls_are_rejected() {
        let tmp = tempfile::tempdir().unwrap();
        let mut cli = cli_for(tmp.path());
        cli.api_url = Some("not a url".to_string());
        assert!(Config::load_with_env(&cli, no_env).is_err());

        let mut config = Config::default();
        config.backend.caption_url = "ftp://files".to_string();
        assert!(config.validate().is_err());
    }
}
