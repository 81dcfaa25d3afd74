//! OCF container reader
//!
//! Opens the uploaded bytes as a ZIP archive, loads every entry into memory and
//! follows `META-INF/container.xml` to the package document. Decompressed
//! sizes are bounded by [`ContainerLimits`]; declared sizes in the archive
//! headers are never trusted.

use super::xml;
use crate::error::FileFormatError;
use quick_xml::events::Event;
use quick_xml::reader::Reader;
use std::collections::HashMap;
use std::io::{Cursor, Read};

/// Fixed location of the container descriptor
pub const CONTAINER_PATH: &str = "META-INF/container.xml";

/// ZIP local file header signature
pub const ZIP_SIGNATURE: &[u8; 4] = b"PK\x03\x04";

/// Media type of the package document rootfile
const PACKAGE_MEDIA_TYPE: &str = "application/oebps-package+xml";

/// Caps on decompressed archive size
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerLimits {
    /// Largest single entry, in bytes
    pub max_entry_bytes: u64,

    /// Largest sum of all entries, in bytes
    pub max_total_bytes: u64,
}

impl Default for ContainerLimits {
    fn default() -> Self {
        Self {
            max_entry_bytes: 32 * 1024 * 1024,
            max_total_bytes: 256 * 1024 * 1024,
        }
    }
}

/// A single file read out of the archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub path: String,
    pub data: Vec<u8>,
}

/// An opened EPUB container
#[derive(Debug)]
pub struct Container {
    package_path: String,
    entries: HashMap<String, ArchiveEntry>,
}

/// Whether the bytes start with a ZIP local file header
pub fn has_zip_signature(data: &[u8]) -> bool {
    data.starts_with(ZIP_SIGNATURE)
}

impl Container {
    /// Open an archive with the default size limits
    pub fn open(data: &[u8]) -> Result<Self, FileFormatError> {
        Self::open_with_limits(data, ContainerLimits::default())
    }

    /// Open an archive and resolve its package document path
    pub fn open_with_limits(data: &[u8], limits: ContainerLimits) -> Result<Self, FileFormatError> {
        if !has_zip_signature(data) {
            return Err(FileFormatError::MissingSignature);
        }

        let entries = Self::read_entries(data, limits)?;

        let descriptor = entries
            .get(CONTAINER_PATH)
            .ok_or(FileFormatError::MissingContainer)?;
        let package_path = Self::parse_rootfile(&descriptor.data)?;

        let container = Self {
            package_path,
            entries,
        };
        if container.read(&container.package_path).is_none() {
            return Err(FileFormatError::MissingPackage(container.package_path));
        }

        tracing::debug!(
            package = %container.package_path,
            entries = container.entries.len(),
            "Opened EPUB container"
        );
        Ok(container)
    }

    /// Read every file entry of the archive
    fn read_entries(
        data: &[u8],
        limits: ContainerLimits,
    ) -> Result<HashMap<String, ArchiveEntry>, FileFormatError> {
        let mut archive = zip::ZipArchive::new(Cursor::new(data))
            .map_err(|e| FileFormatError::InvalidArchive(e.to_string()))?;

        let mut entries = HashMap::with_capacity(archive.len());
        let mut total: u64 = 0;
        for i in 0..archive.len() {
            let mut file = match archive.by_index(i) {
                Ok(file) => file,
                Err(e) => {
                    tracing::warn!(index = i, "Skipping unreadable archive entry: {}", e);
                    continue;
                }
            };
            if file.is_dir() {
                continue;
            }

            let path = file.name().to_string();
            let allowed = limits
                .max_entry_bytes
                .min(limits.max_total_bytes.saturating_sub(total));
            let mut content = Vec::new();
            if let Err(e) = file.by_ref().take(allowed + 1).read_to_end(&mut content) {
                // Left out of the lookup; whoever references it records the gap
                tracing::warn!(path = %path, "Skipping unreadable archive entry: {}", e);
                continue;
            }

            let size = content.len() as u64;
            if size > allowed {
                tracing::warn!(path = %path, "Archive entry exceeds size limit");
                return Err(if allowed == limits.max_entry_bytes {
                    FileFormatError::EntryTooLarge {
                        path,
                        limit: limits.max_entry_bytes,
                    }
                } else {
                    FileFormatError::ArchiveTooLarge {
                        limit: limits.max_total_bytes,
                    }
                });
            }
            total += size;

            entries.insert(
                path.clone(),
                ArchiveEntry {
                    path,
                    data: content,
                },
            );
        }

        Ok(entries)
    }

    /// Extract the package document path from the container descriptor
    fn parse_rootfile(descriptor: &[u8]) -> Result<String, FileFormatError> {
        let mut reader = Reader::from_reader(descriptor);
        reader.config_mut().trim_text(true);

        let mut first = None;
        let mut buf = Vec::new();
        loop {
            match reader.read_event_into(&mut buf) {
                Ok(Event::Start(e)) | Ok(Event::Empty(e)) if xml::local_name(&e) == "rootfile" => {
                    let full_path = xml::attr(&e, "full-path");
                    if let Some(path) = full_path.filter(|p| !p.trim().is_empty()) {
                        let path = path.trim().trim_start_matches('/').to_string();
                        let is_package = xml::attr(&e, "media-type")
                            .map(|m| m == PACKAGE_MEDIA_TYPE)
                            .unwrap_or(false);
                        if is_package {
                            return Ok(path);
                        }
                        first.get_or_insert(path);
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(FileFormatError::MalformedContainer(e.to_string())),
                _ => {}
            }
            buf.clear();
        }

        first.ok_or(FileFormatError::MissingRootfile)
    }

    /// Path of the package document inside the archive
    pub fn package_path(&self) -> &str {
        &self.package_path
    }

    /// Directory containing the package document, without trailing slash
    pub fn package_dir(&self) -> &str {
        self.package_path
            .rsplit_once('/')
            .map(|(dir, _)| dir)
            .unwrap_or("")
    }

    /// Bytes of the package document
    pub fn package_document(&self) -> &[u8] {
        self.read(&self.package_path).unwrap_or_default()
    }

    /// Look up an entry, falling back to a case-insensitive match
    pub fn entry(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.get(path).or_else(|| {
            self.entries
                .values()
                .find(|entry| entry.path.eq_ignore_ascii_case(path))
        })
    }

    /// Bytes of an archive entry
    pub fn read(&self, path: &str) -> Option<&[u8]> {
        self.entry(path).map(|entry| entry.data.as_slice())
    }

    /// Number of file entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
