//! Request DTOs for the Sharebox API.

use serde::Deserialize;
use utoipa::ToSchema;
use validator::Validate;

use super::validation::{entry_name, no_control_chars};

/// `?path=` query parameter addressing a directory inside the share.
#[derive(Debug, Default, Deserialize)]
pub struct PathQuery {
    /// Directory relative to the share root. Empty or absent means the root.
    #[serde(default)]
    pub path: Option<String>,
}

impl PathQuery {
    pub fn path(&self) -> &str {
        self.path.as_deref().unwrap_or("")
    }
}

/// Rename a file or folder.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct RenameRequest {
    /// New entry name (a single path segment).
    #[serde(rename = "newName")]
    #[validate(
        length(max = 255, message = "Name must be at most 255 characters"),
        custom(function = "entry_name")
    )]
    pub new_name: String,
}

/// Move a file or folder into another directory.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct MoveRequest {
    /// Destination directory relative to the share root; empty for the root.
    #[serde(rename = "targetPath", default)]
    #[validate(custom(function = "no_control_chars"))]
    pub target_path: String,
}

/// Create a folder.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateFolderRequest {
    /// Folder name (a single path segment).
    #[validate(
        length(max = 255, message = "Name must be at most 255 characters"),
        custom(function = "entry_name")
    )]
    pub name: String,
}
