//! Application state

use anyhow::{Context, Result};
use novella_core::storage::{LocalStorage, StorageProvider};
use novella_core::{Importer, Language, MemoryContentStore};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Server settings read from `NOVELLA_*` environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Root for the library index and stored assets
    pub storage_path: PathBuf,

    /// Base URL under which `/assets` is reachable from clients
    pub public_url: String,

    /// Listen address
    pub bind: SocketAddr,

    /// `*` or a comma-separated origin list; `None` allows local dev origins
    pub cors_origins: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            storage_path: PathBuf::from("./novella_data"),
            public_url: "http://127.0.0.1:3000/assets".to_string(),
            bind: SocketAddr::from(([127, 0, 0, 1], 3000)),
            cors_origins: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("NOVELLA_STORAGE_PATH") {
            config.storage_path = PathBuf::from(path);
        }
        if let Ok(url) = std::env::var("NOVELLA_PUBLIC_URL") {
            config.public_url = url;
        }
        if let Ok(bind) = std::env::var("NOVELLA_BIND") {
            config.bind = bind
                .parse()
                .with_context(|| format!("Invalid NOVELLA_BIND address: {}", bind))?;
        }
        config.cors_origins = std::env::var("NOVELLA_CORS_ORIGINS").ok();
        Ok(config)
    }

    /// Defaults with a different storage root
    pub fn with_storage_path(path: impl Into<PathBuf>) -> Self {
        Self {
            storage_path: path.into(),
            ..Self::default()
        }
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Novel and chapter records (would be a database in production)
    pub store: Arc<MemoryContentStore>,

    /// Object storage for cover images
    pub storage: Arc<dyn StorageProvider>,

    /// Import pipeline bound to `store` and `storage`
    pub importer: Importer,

    pub config: ServerConfig,

    /// Channel for SSE events
    pub event_tx: broadcast::Sender<ServerEvent>,
}

/// Server-sent events
#[derive(Debug, Clone)]
pub enum ServerEvent {
    /// A new novel was created from an upload
    NovelImported {
        id: String,
        title: String,
        chapters: usize,
    },

    /// A language track was added to an existing novel
    LanguageAdded {
        id: String,
        language: Language,
        created: usize,
        updated: usize,
    },

    /// An import failed
    Error { message: String },
}

impl AppState {
    /// Create new application state
    pub async fn new(config: ServerConfig) -> Result<Self> {
        tokio::fs::create_dir_all(config.assets_path())
            .await
            .with_context(|| format!("Failed to create {}", config.storage_path.display()))?;

        let store = match MemoryContentStore::load(&config.library_path()).await {
            Ok(store) => store,
            Err(e) => {
                tracing::warn!("Failed to load library index, starting fresh: {}", e);
                MemoryContentStore::new()
            }
        };
        let store = Arc::new(store);

        let storage: Arc<dyn StorageProvider> =
            Arc::new(LocalStorage::new(config.assets_path(), config.public_url.clone()));
        let importer = Importer::new(store.clone(), storage.clone());
        let (event_tx, _) = broadcast::channel(100);

        Ok(Self {
            store,
            storage,
            importer,
            config,
            event_tx,
        })
    }

    /// Save the library index
    pub async fn save_library(&self) -> Result<()> {
        self.store
            .save(&self.config.library_path())
            .await
            .context("Failed to save library index")
    }

    /// Subscribe to server events
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.event_tx.subscribe()
    }

    /// Broadcast an event
    pub fn broadcast(&self, event: ServerEvent) {
        // Ignore errors (no subscribers)
        let _ = self.event_tx.send(event);
    }
}

impl ServerConfig {
    /// JSON snapshot of the content store
    pub fn library_path(&self) -> PathBuf {
        self.storage_path.join("library.json")
    }

    /// Directory served under `/assets`
    pub fn assets_path(&self) -> PathBuf {
        self.storage_path.join("assets")
    }
}
