//! A library directory: `library.json` plus an `assets/` folder

use anyhow::{Context, Result};
use novella_core::MemoryContentStore;
use std::path::{Path, PathBuf};

pub struct LibraryDir {
    root: PathBuf,
}

impl LibraryDir {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join("library.json")
    }

    pub fn assets_path(&self) -> PathBuf {
        self.root.join("assets")
    }

    /// Public URL base for stored assets: the absolute assets directory
    pub fn assets_url(&self) -> Result<String> {
        let assets = self.assets_path();
        std::fs::create_dir_all(&assets)
            .with_context(|| format!("Failed to create library at {}", self.root.display()))?;
        let absolute = assets
            .canonicalize()
            .with_context(|| format!("Failed to resolve {}", assets.display()))?;
        Ok(format!("file://{}", absolute.display()))
    }

    /// Load the index; a directory without one is an empty library
    pub async fn load(&self) -> Result<MemoryContentStore> {
        MemoryContentStore::load(&self.index_path())
            .await
            .with_context(|| format!("Failed to read {}", self.index_path().display()))
    }

    pub async fn save(&self, store: &MemoryContentStore) -> Result<()> {
        store
            .save(&self.index_path())
            .await
            .with_context(|| format!("Failed to write {}", self.index_path().display()))
    }
}
