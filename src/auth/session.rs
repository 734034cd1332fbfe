use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

pub const TOKEN_FILE: &str = "tokens.json";

/// Access/refresh pair as persisted in client storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

/// Persistent key/value backing for [`SessionContext`].
pub trait TokenStore: Send + Sync {
    fn load(&self) -> std::io::Result<Tokens>;
    fn save(&self, tokens: &Tokens) -> std::io::Result<()>;
}

/// Keeps nothing beyond the process lifetime.
#[derive(Debug, Default)]
pub struct MemoryTokenStore;

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> std::io::Result<Tokens> {
        Ok(Tokens::default())
    }

    fn save(&self, _tokens: &Tokens) -> std::io::Result<()> {
        Ok(())
    }
}

/// JSON file in the data directory.
#[derive(Debug)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(TOKEN_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> std::io::Result<Tokens> {
        if !self.path.exists() {
            return Ok(Tokens::default());
        }
        let json = fs::read_to_string(&self.path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }

    fn save(&self, tokens: &Tokens) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(tokens).map_err(std::io::Error::other)?;
        fs::write(&self.path, json)
    }
}

/// Session credentials shared by the API client and the login/logout flow.
///
/// The in-memory copy is authoritative for the running process; every write is
/// mirrored to the [`TokenStore`].
pub struct SessionContext {
    tokens: RwLock<Tokens>,
    store: Box<dyn TokenStore>,
}

impl SessionContext {
    pub fn new(store: Box<dyn TokenStore>) -> std::io::Result<Self> {
        let tokens = store.load()?;
        Ok(Self {
            tokens: RwLock::new(tokens),
            store,
        })
    }

    pub fn in_memory() -> Self {
        Self {
            tokens: RwLock::new(Tokens::default()),
            store: Box::new(MemoryTokenStore),
        }
    }

    /// Open the file-backed session in `data_dir`.
    pub fn open(data_dir: &Path) -> std::io::Result<Self> {
        Self::new(Box::new(FileTokenStore::new(data_dir)))
    }

    pub async fn access_token(&self) -> Option<String> {
        self.tokens.read().await.access_token.clone()
    }

    pub async fn refresh_token(&self) -> Option<String> {
        self.tokens.read().await.refresh_token.clone()
    }

    pub async fn snapshot(&self) -> Tokens {
        self.tokens.read().await.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.tokens.read().await.access_token.is_some()
    }

    /// Store both tokens after a login.
    pub async fn store(&self, access: &str, refresh: Option<&str>) -> std::io::Result<()> {
        let mut tokens = self.tokens.write().await;
        tokens.access_token = Some(access.to_string());
        if let Some(refresh) = refresh {
            tokens.refresh_token = Some(refresh.to_string());
        }
        self.store.save(&tokens)
    }

    /// Replace the access token, keeping the refresh token.
    pub async fn set_access_token(&self, access: &str) -> std::io::Result<()> {
        let mut tokens = self.tokens.write().await;
        tokens.access_token = Some(access.to_string());
        self.store.save(&tokens)
    }

    /// Drop both tokens under a single write lock.
    pub async fn clear(&self) -> std::io::Result<()> {
        let mut tokens = self.tokens.write().await;
        *tokens = Tokens::default();
        self.store.save(&tokens)
    }
}
