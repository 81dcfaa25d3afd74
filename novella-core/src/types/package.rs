//! Package document (OPF) model

use std::collections::HashMap;

/// One manifest `<item>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestItem {
    pub id: String,

    /// Archive path, already resolved against the package directory
    pub path: String,

    pub media_type: String,

    /// Space-separated `properties` attribute, split
    pub properties: Vec<String>,

    /// Flagged as the cover image by property or metadata cross-reference
    pub is_cover_image: bool,
}

impl ManifestItem {
    pub fn has_property(&self, property: &str) -> bool {
        self.properties.iter().any(|p| p == property)
    }

    /// Whether the item is an (X)HTML content document
    pub fn is_document(&self) -> bool {
        matches!(
            self.media_type.as_str(),
            "application/xhtml+xml" | "text/html" | "application/html"
        )
    }

    pub fn is_image(&self) -> bool {
        self.media_type.starts_with("image/")
    }
}

/// One spine `<itemref>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpineItem {
    pub idref: String,

    /// `linear="no"` marks auxiliary content
    pub linear: bool,
}

/// Metadata, manifest and spine of an EPUB package
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PackageDocument {
    pub title: String,
    pub author: Option<String>,
    pub description: Option<String>,

    /// Items in document order
    pub manifest: Vec<ManifestItem>,

    /// Reading order, unique ids that all resolve in the manifest
    pub spine: Vec<SpineItem>,

    /// Manifest id of the guide's cover page, if declared
    pub guide_cover: Option<String>,

    index: HashMap<String, usize>,
}

impl PackageDocument {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    /// Append a manifest item; a repeated id keeps the first declaration
    pub fn add_item(&mut self, item: ManifestItem) -> bool {
        if self.index.contains_key(&item.id) {
            return false;
        }
        self.index.insert(item.id.clone(), self.manifest.len());
        self.manifest.push(item);
        true
    }

    /// Look up a manifest item by id
    pub fn item(&self, id: &str) -> Option<&ManifestItem> {
        self.index.get(id).map(|&i| &self.manifest[i])
    }

    pub fn item_mut(&mut self, id: &str) -> Option<&mut ManifestItem> {
        self.index.get(id).copied().map(|i| &mut self.manifest[i])
    }

    /// Find the manifest item whose resolved path matches
    pub fn item_by_path(&self, path: &str) -> Option<&ManifestItem> {
        self.manifest.iter().find(|item| item.path == path)
    }

    /// Spine entries paired with their manifest items
    pub fn spine_items(&self) -> impl Iterator<Item = (&SpineItem, &ManifestItem)> {
        self.spine
            .iter()
            .filter_map(|s| self.item(&s.idref).map(|item| (s, item)))
    }
}
