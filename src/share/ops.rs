//! Mutating operations on shared entries: create, delete, rename, move.
//!
//! Entries are addressed without dereferencing the final segment, so a
//! symlink is handled as the link itself and never as its target.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::info;

use super::root::{PathError, ResolvedPath, ShareRoot};

/// Whether an operation targets a file or a folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    File,
    Folder,
}

#[derive(Debug, Error)]
pub enum OpError {
    #[error(transparent)]
    Path(#[from] PathError),

    #[error("entry not found")]
    NotFound,

    #[error("destination already exists")]
    AlreadyExists,

    #[error("entry is not a folder")]
    NotADirectory,

    #[error("entry is a folder")]
    IsADirectory,

    #[error("cannot move a folder into itself")]
    MoveIntoItself,

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Mutations confined to a share root.
#[derive(Debug, Clone)]
pub struct ShareOps {
    root: ShareRoot,
}

impl ShareOps {
    pub fn new(root: &ShareRoot) -> Self {
        Self { root: root.clone() }
    }

    /// Create folder `name` inside `parent`. Missing parents are created.
    pub fn create_folder(&self, parent: &ResolvedPath, name: &str) -> Result<ResolvedPath, OpError> {
        let target = self.root.locate_in(parent, name)?;
        if exists(target.as_path()) {
            return Err(OpError::AlreadyExists);
        }
        fs::create_dir_all(target.as_path())?;
        info!(folder = %target.relative(), "Folder created");
        Ok(target)
    }

    /// Make sure `dir` exists as a directory.
    pub fn ensure_directory(&self, dir: &ResolvedPath) -> Result<(), OpError> {
        match fs::metadata(dir.as_path()) {
            Ok(meta) if meta.is_dir() => Ok(()),
            Ok(_) => Err(OpError::NotADirectory),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                fs::create_dir_all(dir.as_path())?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Delete a file, or a folder with all its contents.
    pub fn delete(&self, entry: &ResolvedPath, kind: EntryKind) -> Result<(), OpError> {
        guard_root(entry)?;
        let is_link = check_kind(entry.as_path(), kind)?;

        if is_link || kind == EntryKind::File {
            fs::remove_file(entry.as_path())?;
        } else {
            fs::remove_dir_all(entry.as_path())?;
        }
        info!(entry = %entry.relative(), ?kind, "Entry deleted");
        Ok(())
    }

    /// Rename an entry within its parent directory.
    pub fn rename(
        &self,
        entry: &ResolvedPath,
        new_name: &str,
        kind: EntryKind,
    ) -> Result<ResolvedPath, OpError> {
        guard_root(entry)?;
        let target = self.root.locate_entry(entry.parent_relative(), new_name)?;
        check_kind(entry.as_path(), kind)?;
        if exists(target.as_path()) {
            return Err(OpError::AlreadyExists);
        }

        fs::rename(entry.as_path(), target.as_path())?;
        info!(from = %entry.relative(), to = %target.relative(), "Entry renamed");
        Ok(target)
    }

    /// Move an entry into `target_dir`, creating the directory if needed.
    pub fn move_entry(
        &self,
        entry: &ResolvedPath,
        target_dir: &ResolvedPath,
        kind: EntryKind,
    ) -> Result<ResolvedPath, OpError> {
        guard_root(entry)?;
        check_kind(entry.as_path(), kind)?;

        if kind == EntryKind::Folder && target_dir.as_path().starts_with(entry.as_path()) {
            return Err(OpError::MoveIntoItself);
        }

        let name = entry.name().ok_or(OpError::Path(PathError::Invalid))?;
        let target = self.root.locate_in(target_dir, name)?;
        if exists(target.as_path()) {
            return Err(OpError::AlreadyExists);
        }

        self.ensure_directory(target_dir)?;
        fs::rename(entry.as_path(), target.as_path())?;
        info!(from = %entry.relative(), to = %target.relative(), "Entry moved");
        Ok(target)
    }
}

/// The root itself can never be deleted, renamed or moved.
fn guard_root(entry: &ResolvedPath) -> Result<(), OpError> {
    if entry.is_root() {
        return Err(OpError::Path(PathError::Invalid));
    }
    Ok(())
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Check that `path` is of `kind` and report whether it is a symlink.
///
/// A symlink counts as whatever it points to, the same way listings report
/// it; one that cannot be followed counts as a file.
fn check_kind(path: &Path, kind: EntryKind) -> Result<bool, OpError> {
    let link_meta = fs::symlink_metadata(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => OpError::NotFound,
        _ => OpError::Io(e),
    })?;
    let is_link = link_meta.file_type().is_symlink();
    let is_dir = if is_link {
        fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
    } else {
        link_meta.is_dir()
    };

    match kind {
        EntryKind::Folder if !is_dir => Err(OpError::NotADirectory),
        EntryKind::File if is_dir => Err(OpError::IsADirectory),
        _ => Ok(is_link),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (TempDir, ShareRoot, ShareOps) {
        let temp = TempDir::new().unwrap();
        let root = ShareRoot::open(temp.path()).unwrap();
        fs::create_dir_all(root.path().join("docs/inner")).unwrap();
        fs::write(root.path().join("docs/a.txt"), "alpha").unwrap();
        fs::write(root.path().join("docs/inner/b.txt"), "bravo").unwrap();
        let ops = ShareOps::new(&root);
        (temp, root, ops)
    }

    #[test]
    fn test_create_folder() {
        let (_temp, root, ops) = setup();

        let created = ops
            .create_folder(&root.resolve("docs").unwrap(), "new")
            .unwrap();
        assert_eq!(created.relative(), "docs/new");
        assert!(root.path().join("docs/new").is_dir());

        let err = ops
            .create_folder(&root.resolve("docs").unwrap(), "new")
            .unwrap_err();
        assert!(matches!(err, OpError::AlreadyExists));
    }

    #[test]
    fn test_create_folder_missing_parent() {
        let (_temp, root, ops) = setup();

        ops.create_folder(&root.resolve("x/y").unwrap(), "z").unwrap();
        assert!(root.path().join("x/y/z").is_dir());
    }

    #[test]
    fn test_create_folder_invalid_name() {
        let (_temp, root, ops) = setup();
        let parent = root.resolve("").unwrap();

        assert!(matches!(
            ops.create_folder(&parent, ".."),
            Err(OpError::Path(PathError::Traversal))
        ));
        assert!(matches!(
            ops.create_folder(&parent, "a/b"),
            Err(OpError::Path(PathError::Invalid))
        ));
    }

    #[test]
    fn test_delete_file_and_folder() {
        let (_temp, root, ops) = setup();

        let file = root.locate_entry("docs", "a.txt").unwrap();
        ops.delete(&file, EntryKind::File).unwrap();
        assert!(!root.path().join("docs/a.txt").exists());

        let folder = root.locate_entry("docs", "inner").unwrap();
        ops.delete(&folder, EntryKind::Folder).unwrap();
        assert!(!root.path().join("docs/inner").exists());
    }

    #[test]
    fn test_delete_kind_mismatch() {
        let (_temp, root, ops) = setup();

        let folder = root.locate_entry("docs", "inner").unwrap();
        assert!(matches!(
            ops.delete(&folder, EntryKind::File),
            Err(OpError::IsADirectory)
        ));

        let file = root.locate_entry("docs", "a.txt").unwrap();
        assert!(matches!(
            ops.delete(&file, EntryKind::Folder),
            Err(OpError::NotADirectory)
        ));
    }

    #[test]
    fn test_delete_missing() {
        let (_temp, root, ops) = setup();

        let missing = root.locate_entry("docs", "nope.txt").unwrap();
        assert!(matches!(
            ops.delete(&missing, EntryKind::File),
            Err(OpError::NotFound)
        ));
    }

    #[test]
    fn test_root_is_protected() {
        let (_temp, root, ops) = setup();
        let top = root.resolve("").unwrap();

        assert!(matches!(
            ops.delete(&top, EntryKind::Folder),
            Err(OpError::Path(PathError::Invalid))
        ));
        assert!(root.path().exists());
    }

    #[test]
    fn test_rename() {
        let (_temp, root, ops) = setup();

        let file = root.locate_entry("docs", "a.txt").unwrap();
        let renamed = ops.rename(&file, "c.txt", EntryKind::File).unwrap();
        assert_eq!(renamed.relative(), "docs/c.txt");
        assert_eq!(
            fs::read_to_string(root.path().join("docs/c.txt")).unwrap(),
            "alpha"
        );
    }

    #[test]
    fn test_rename_conflict_and_traversal() {
        let (_temp, root, ops) = setup();
        fs::write(root.path().join("docs/taken.txt"), "x").unwrap();
        let file = root.locate_entry("docs", "a.txt").unwrap();

        assert!(matches!(
            ops.rename(&file, "taken.txt", EntryKind::File),
            Err(OpError::AlreadyExists)
        ));
        assert!(matches!(
            ops.rename(&file, "..", EntryKind::File),
            Err(OpError::Path(PathError::Traversal))
        ));
        assert!(root.path().join("docs/a.txt").exists());
    }

    #[test]
    fn test_move_creates_target_directory() {
        let (_temp, root, ops) = setup();

        let file = root.locate_entry("docs", "a.txt").unwrap();
        let target = root.resolve("archive/2024").unwrap();
        let moved = ops.move_entry(&file, &target, EntryKind::File).unwrap();

        assert_eq!(moved.relative(), "archive/2024/a.txt");
        assert!(root.path().join("archive/2024/a.txt").is_file());
        assert!(!root.path().join("docs/a.txt").exists());
    }

    #[test]
    fn test_move_folder_into_itself() {
        let (_temp, root, ops) = setup();

        let folder = root.locate_entry("", "docs").unwrap();
        let target = root.resolve("docs/inner").unwrap();
        assert!(matches!(
            ops.move_entry(&folder, &target, EntryKind::Folder),
            Err(OpError::MoveIntoItself)
        ));

        let same = root.resolve("docs").unwrap();
        assert!(matches!(
            ops.move_entry(&folder, &same, EntryKind::Folder),
            Err(OpError::MoveIntoItself)
        ));
    }

    #[test]
    fn test_move_conflict() {
        let (_temp, root, ops) = setup();
        fs::write(root.path().join("a.txt"), "top").unwrap();

        let file = root.locate_entry("docs", "a.txt").unwrap();
        let target = root.resolve("").unwrap();
        assert!(matches!(
            ops.move_entry(&file, &target, EntryKind::File),
            Err(OpError::AlreadyExists)
        ));
    }

    #[test]
    fn test_ensure_directory() {
        let (_temp, root, ops) = setup();

        ops.ensure_directory(&root.resolve("fresh/dir").unwrap())
            .unwrap();
        assert!(root.path().join("fresh/dir").is_dir());

        assert!(matches!(
            ops.ensure_directory(&root.resolve("docs/a.txt").unwrap()),
            Err(OpError::NotADirectory)
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_directory_symlink_handled_as_folder() {
        use std::os::unix::fs::symlink;

        let (_temp, root, ops) = setup();
        symlink(root.path().join("docs/inner"), root.path().join("shortcut")).unwrap();

        let link = root.locate_entry("", "shortcut").unwrap();
        assert!(matches!(
            ops.delete(&link, EntryKind::File),
            Err(OpError::IsADirectory)
        ));

        let renamed = ops.rename(&link, "quick", EntryKind::Folder).unwrap();
        assert_eq!(renamed.relative(), "quick");

        let target = root.resolve("docs").unwrap();
        let moved = ops.move_entry(&renamed, &target, EntryKind::Folder).unwrap();
        assert_eq!(moved.relative(), "docs/quick");
        assert!(fs::symlink_metadata(root.path().join("docs/quick"))
            .unwrap()
            .file_type()
            .is_symlink());

        ops.delete(&moved, EntryKind::Folder).unwrap();
        assert!(fs::symlink_metadata(root.path().join("docs/quick")).is_err());
        assert_eq!(
            fs::read_to_string(root.path().join("docs/inner/b.txt")).unwrap(),
            "bravo"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_delete_symlink_leaves_target() {
        use std::os::unix::fs::symlink;

        let (_temp, root, ops) = setup();
        let outside = TempDir::new().unwrap();
        fs::write(outside.path().join("keep.txt"), "keep").unwrap();
        symlink(outside.path().join("keep.txt"), root.path().join("link.txt")).unwrap();

        let link = root.locate_entry("", "link.txt").unwrap();
        ops.delete(&link, EntryKind::File).unwrap();

        assert!(outside.path().join("keep.txt").exists());
        assert!(fs::symlink_metadata(root.path().join("link.txt")).is_err());
    }
}
