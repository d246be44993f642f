//! Delete, rename and move, shared by the file and folder routes.
//!
//! The two route families differ only in the [`EntryKind`] they expect.

use crate::share::{EntryKind, OperationKind};
use crate::web::dto::EntryResponse;
use crate::web::error::ApiError;

use super::{run_blocking, AppState};

pub(crate) async fn delete_entry(
    state: &AppState,
    parent: &str,
    name: &str,
    kind: EntryKind,
) -> Result<(), ApiError> {
    state.gate.authorize(OperationKind::Delete, None)?;
    let entry = state.root.locate_entry(parent, name)?;

    let ops = state.ops.clone();
    run_blocking(move || ops.delete(&entry, kind)).await??;
    Ok(())
}

pub(crate) async fn rename_entry(
    state: &AppState,
    parent: &str,
    name: &str,
    new_name: String,
    kind: EntryKind,
) -> Result<EntryResponse, ApiError> {
    state.gate.authorize(OperationKind::Rename, None)?;
    let entry = state.root.locate_entry(parent, name)?;

    let ops = state.ops.clone();
    let lister = state.lister.clone();
    let renamed = run_blocking(move || {
        let target = ops.rename(&entry, &new_name, kind)?;
        Ok::<_, ApiError>(lister.describe(&target)?)
    })
    .await??;
    Ok(renamed.into())
}

pub(crate) async fn move_entry(
    state: &AppState,
    parent: &str,
    name: &str,
    target_path: &str,
    kind: EntryKind,
) -> Result<EntryResponse, ApiError> {
    state.gate.authorize(OperationKind::Move, None)?;
    let entry = state.root.locate_entry(parent, name)?;
    let target_dir = state.root.resolve(target_path)?;

    let ops = state.ops.clone();
    let lister = state.lister.clone();
    let moved = run_blocking(move || {
        let target = ops.move_entry(&entry, &target_dir, kind)?;
        Ok::<_, ApiError>(lister.describe(&target)?)
    })
    .await??;
    Ok(moved.into())
}
