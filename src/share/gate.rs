//! Permission and size checks applied before any transfer starts.

use std::fmt;

use thiserror::Error;

/// Kinds of operation a client can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    List,
    Upload,
    Download,
    Delete,
    Rename,
    Move,
    CreateFolder,
    Preview,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::List => "list",
            OperationKind::Upload => "upload",
            OperationKind::Download => "download",
            OperationKind::Delete => "delete",
            OperationKind::Rename => "rename",
            OperationKind::Move => "move",
            OperationKind::CreateFolder => "create_folder",
            OperationKind::Preview => "preview",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which operations are enabled. Listing is always permitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PermissionSet {
    pub upload: bool,
    pub download: bool,
    pub delete: bool,
    pub rename: bool,
    pub move_entries: bool,
    pub create_folder: bool,
    pub preview: bool,
}

impl PermissionSet {
    /// Every operation enabled.
    pub fn all() -> Self {
        Self {
            upload: true,
            download: true,
            delete: true,
            rename: true,
            move_entries: true,
            create_folder: true,
            preview: true,
        }
    }

    pub fn allows(&self, op: OperationKind) -> bool {
        match op {
            OperationKind::List => true,
            OperationKind::Upload => self.upload,
            OperationKind::Download => self.download,
            OperationKind::Delete => self.delete,
            OperationKind::Rename => self.rename,
            OperationKind::Move => self.move_entries,
            OperationKind::CreateFolder => self.create_folder,
            OperationKind::Preview => self.preview,
        }
    }
}

/// Byte limits for transfers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferLimits {
    /// Total bytes accepted by one upload request.
    pub max_upload_size: u64,
    /// Inline preview ceiling for non-text content.
    pub max_preview_size: u64,
    /// Inline preview ceiling for text content.
    pub max_text_preview_size: u64,
}

impl Default for TransferLimits {
    fn default() -> Self {
        Self {
            max_upload_size: 100 * 1024 * 1024,
            max_preview_size: 5 * 1024 * 1024,
            max_text_preview_size: 10 * 1024 * 1024,
        }
    }
}

impl TransferLimits {
    /// Size ceiling that applies to `op`, if any.
    ///
    /// Previews are bounded by the larger of the two preview ceilings here;
    /// the per-kind ceiling is applied by the preview classifier.
    pub fn limit_for(&self, op: OperationKind) -> Option<u64> {
        match op {
            OperationKind::Upload => Some(self.max_upload_size),
            OperationKind::Preview => Some(self.max_preview_size.max(self.max_text_preview_size)),
            _ => None,
        }
    }
}

/// Why the gate refused an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Denied {
    #[error("operation not permitted: {0}")]
    Forbidden(OperationKind),

    #[error("declared size {declared} exceeds the limit of {limit} bytes")]
    TooLarge { limit: u64, declared: u64 },
}

/// Pure decision point consulted before filesystem or archive work.
#[derive(Debug, Clone, Copy)]
pub struct TransferGate {
    permissions: PermissionSet,
    limits: TransferLimits,
}

impl TransferGate {
    pub fn new(permissions: PermissionSet, limits: TransferLimits) -> Self {
        Self {
            permissions,
            limits,
        }
    }

    pub fn permissions(&self) -> &PermissionSet {
        &self.permissions
    }

    pub fn limits(&self) -> &TransferLimits {
        &self.limits
    }

    /// Decide whether `op` may proceed.
    ///
    /// The permission check runs first, so a disabled operation is reported
    /// as forbidden whatever its size. `declared_size` is the size the client
    /// announced (or the size found on disk for previews); `None` skips the
    /// size check.
    pub fn authorize(&self, op: OperationKind, declared_size: Option<u64>) -> Result<(), Denied> {
        if !self.permissions.allows(op) {
            return Err(Denied::Forbidden(op));
        }

        if let (Some(declared), Some(limit)) = (declared_size, self.limits.limit_for(op)) {
            if declared > limit {
                return Err(Denied::TooLarge { limit, declared });
            }
        }

        Ok(())
    }
}
