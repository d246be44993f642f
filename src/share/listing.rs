//! Directory listing.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::{debug, warn};

use super::root::{ResolvedPath, ShareRoot};

/// Media type reported for directories.
pub const FOLDER_TYPE: &str = "folder";

/// Errors returned by [`EntryLister`].
#[derive(Debug, Error)]
pub enum ListError {
    #[error("directory not found")]
    NotFound,

    #[error("not a directory")]
    NotADirectory,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Metadata for one entry in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryMetadata {
    pub name: String,
    /// Client-facing path relative to the share root.
    pub relative_path: String,
    /// Size in bytes, 0 for directories.
    pub size: u64,
    pub modified: DateTime<Utc>,
    pub is_directory: bool,
    /// `folder` for directories, a guessed MIME type otherwise.
    pub media_type: String,
}

/// Produces directory listings, hiding excluded names and anything whose
/// symlink target lies outside the share root.
#[derive(Debug, Clone)]
pub struct EntryLister {
    root: ShareRoot,
    exclusions: Arc<HashSet<String>>,
}

impl EntryLister {
    pub fn new<I, S>(root: &ShareRoot, exclusions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root: root.clone(),
            exclusions: Arc::new(exclusions.into_iter().map(Into::into).collect()),
        }
    }

    pub fn is_excluded(&self, name: &str) -> bool {
        self.exclusions.contains(name)
    }

    /// List the immediate children of `dir`.
    ///
    /// Children that cannot be inspected are logged and left out; they never
    /// fail the listing as a whole. Directories come first, then files, each
    /// group sorted by name.
    pub fn list(&self, dir: &ResolvedPath) -> Result<Vec<EntryMetadata>, ListError> {
        let metadata = fs::metadata(dir.as_path()).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ListError::NotFound,
            _ => ListError::Io(e),
        })?;
        if !metadata.is_dir() {
            return Err(ListError::NotADirectory);
        }

        let mut entries = Vec::new();
        for dir_entry in fs::read_dir(dir.as_path())? {
            let dir_entry = match dir_entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(dir = %dir.relative(), error = %e, "Skipping unreadable directory entry");
                    continue;
                }
            };

            let name = match dir_entry.file_name().into_string() {
                Ok(name) => name,
                Err(raw) => {
                    debug!(name = ?raw, "Skipping entry with non UTF-8 name");
                    continue;
                }
            };
            if self.is_excluded(&name) {
                continue;
            }

            let child = match self.root.locate_in(dir, &name) {
                Ok(child) => child,
                Err(_) => continue,
            };
            match self.describe(&child) {
                Ok(entry) => entries.push(entry),
                Err(e) => {
                    warn!(entry = %child.relative(), error = %e, "Skipping entry");
                }
            }
        }

        entries.sort_by(|a, b| {
            b.is_directory
                .cmp(&a.is_directory)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(entries)
    }

    /// Metadata for a single entry. Symlinks are followed only when their
    /// target is inside the share root.
    pub fn describe(&self, entry: &ResolvedPath) -> Result<EntryMetadata, ListError> {
        let path = entry.as_path();
        let link_meta = fs::symlink_metadata(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => ListError::NotFound,
            _ => ListError::Io(e),
        })?;

        let metadata = if link_meta.file_type().is_symlink() {
            if !self.root.confines(path) {
                return Err(ListError::Io(io::Error::new(
                    io::ErrorKind::PermissionDenied,
                    "symlink target outside the share root",
                )));
            }
            fs::metadata(path)?
        } else {
            link_meta
        };

        let name = entry
            .name()
            .map(str::to_string)
            .unwrap_or_default();
        let is_directory = metadata.is_dir();
        let media_type = if is_directory {
            FOLDER_TYPE.to_string()
        } else {
            media_type_for(Path::new(&name))
        };

        Ok(EntryMetadata {
            name,
            relative_path: entry.relative().to_string(),
            size: if is_directory { 0 } else { metadata.len() },
            modified: DateTime::<Utc>::from(metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH)),
            is_directory,
            media_type,
        })
    }
}

/// MIME type guessed from a file name, `application/octet-stream` if unknown.
pub fn media_type_for(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}
