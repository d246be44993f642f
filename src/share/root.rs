//! Share root and confined path resolution.
//!
//! Every client-supplied path goes through [`ShareRoot::resolve`] (or one of
//! its entry variants) before any other filesystem call is made with it. The
//! only way to obtain a [`ResolvedPath`] is through these functions, so code
//! that accepts a `ResolvedPath` never sees an unchecked location.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use soft_canonicalize::soft_canonicalize;
use thiserror::Error;

/// Reasons a client path is rejected.
///
/// Both variants carry no detail on purpose: the caller maps them to the same
/// generic response whether or not anything exists at the requested location.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PathError {
    /// The path tried to leave the share root (`..` or symlink indirection).
    #[error("path escapes the share root")]
    Traversal,

    /// The path contains characters or components that cannot name an entry.
    #[error("invalid path")]
    Invalid,
}

/// The confinement boundary: a canonical, existing directory.
///
/// Cheap to clone; immutable for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct ShareRoot {
    path: Arc<PathBuf>,
}

impl ShareRoot {
    /// Open the share root, creating the directory if it does not exist.
    pub fn open(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref();
        fs::create_dir_all(path)?;
        let canonical = soft_canonicalize(path)?;
        if !canonical.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("share root is not a directory: {}", canonical.display()),
            ));
        }
        Ok(Self {
            path: Arc::new(canonical),
        })
    }

    /// Canonical absolute path of the root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Resolve a client path to a location inside the root.
    ///
    /// The location does not have to exist. Existing prefixes are
    /// canonicalized (following symlinks, dangling ones included), the
    /// missing remainder is appended lexically. An empty candidate resolves
    /// to the root itself.
    pub fn resolve(&self, candidate: &str) -> Result<ResolvedPath, PathError> {
        let segments = normalize(candidate)?;

        let mut joined = self.path.to_path_buf();
        joined.extend(&segments);

        let canonical = soft_canonicalize(&joined).map_err(|e| {
            tracing::debug!(path = %joined.display(), error = %e, "Canonicalization failed");
            PathError::Invalid
        })?;
        if !canonical.starts_with(self.path.as_path()) {
            return Err(PathError::Traversal);
        }
        reject_file_ancestor(&canonical)?;

        Ok(ResolvedPath {
            absolute: canonical,
            relative: segments.join("/"),
        })
    }

    /// Resolve `name` inside the directory `parent`, following a symlink at
    /// the final segment. Used when reading an entry.
    pub fn resolve_child(&self, parent: &str, name: &str) -> Result<ResolvedPath, PathError> {
        validate_name(name)?;
        self.resolve(&format!("{parent}/{name}"))
    }

    /// Locate the entry `name` inside the directory `parent` without
    /// dereferencing the final segment. Used when mutating an entry, so a
    /// symlink is renamed or removed itself instead of its target.
    pub fn locate_entry(&self, parent: &str, name: &str) -> Result<ResolvedPath, PathError> {
        validate_name(name)?;
        let parent = self.resolve(parent)?;
        self.locate_in(&parent, name)
    }

    /// Same as [`ShareRoot::locate_entry`] for an already resolved parent.
    pub fn locate_in(&self, parent: &ResolvedPath, name: &str) -> Result<ResolvedPath, PathError> {
        validate_name(name)?;
        let relative = if parent.relative.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", parent.relative, name)
        };
        Ok(ResolvedPath {
            absolute: parent.absolute.join(name),
            relative,
        })
    }

    /// Check whether `path`, after following every symlink, lies inside the
    /// root. Unresolvable paths (dangling links, permission errors) are not
    /// confined.
    pub fn confines(&self, path: &Path) -> bool {
        if !path.exists() {
            return false;
        }
        match soft_canonicalize(path) {
            Ok(canonical) => canonical.starts_with(self.path.as_path()),
            Err(_) => false,
        }
    }
}

/// An absolute path proven to lie inside the share root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    absolute: PathBuf,
    relative: String,
}

impl ResolvedPath {
    /// Absolute filesystem location.
    pub fn as_path(&self) -> &Path {
        &self.absolute
    }

    /// Normalized client-facing path relative to the root, `/`-separated.
    /// Empty for the root itself.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    /// Whether this is the share root.
    pub fn is_root(&self) -> bool {
        self.relative.is_empty()
    }

    /// Last segment of the relative path, `None` for the root.
    pub fn name(&self) -> Option<&str> {
        if self.relative.is_empty() {
            return None;
        }
        self.relative.rsplit('/').next()
    }

    /// Relative path of the containing directory.
    pub fn parent_relative(&self) -> &str {
        match self.relative.rfind('/') {
            Some(idx) => &self.relative[..idx],
            None => "",
        }
    }
}

impl AsRef<Path> for ResolvedPath {
    fn as_ref(&self) -> &Path {
        &self.absolute
    }
}

/// Split a candidate into plain segments.
///
/// `..` is rejected before anything else is looked at, with both separators
/// considered so a Windows-style `a\..\b` cannot slip through.
fn normalize(candidate: &str) -> Result<Vec<&str>, PathError> {
    if candidate.split(['/', '\\']).any(|segment| segment == "..") {
        return Err(PathError::Traversal);
    }
    if candidate.contains('\0') {
        return Err(PathError::Invalid);
    }

    let mut segments = Vec::new();
    for segment in candidate.split('/') {
        if segment.is_empty() || segment == "." {
            continue;
        }
        for component in Path::new(segment).components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir => return Err(PathError::Traversal),
                Component::RootDir | Component::Prefix(_) => return Err(PathError::Invalid),
            }
        }
        segments.push(segment);
    }
    Ok(segments)
}

/// Validate a single entry name (file or folder name supplied by a client).
fn validate_name(name: &str) -> Result<(), PathError> {
    if name == ".." {
        return Err(PathError::Traversal);
    }
    if name.is_empty()
        || name == "."
        || name.contains(['/', '\\', '\0'])
        || name.trim().is_empty()
    {
        return Err(PathError::Invalid);
    }
    Ok(())
}

/// Fail if some existing ancestor of `path` is not a directory, e.g.
/// `docs/readme.txt/inner`.
fn reject_file_ancestor(path: &Path) -> Result<(), PathError> {
    for ancestor in path.ancestors().skip(1) {
        if let Ok(metadata) = fs::metadata(ancestor) {
            if metadata.is_dir() {
                return Ok(());
            }
            return Err(PathError::Invalid);
        }
    }
    Ok(())
}
