//! Folder handlers.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::share::{EntryKind, OperationKind};
use crate::web::dto::{
    ApiResponse, CreateFolderRequest, EntryResponse, MoveRequest, PathQuery, RenameRequest,
    ValidatedJson,
};
use crate::web::error::ApiError;

use super::entries::{delete_entry, move_entry, rename_entry};
use super::{run_blocking, AppState};

/// POST /api/folders - Create a folder.
#[utoipa::path(
    post,
    path = "/api/folders",
    tag = "folders",
    params(
        ("path" = Option<String>, Query, description = "Parent directory")
    ),
    request_body = CreateFolderRequest,
    responses(
        (status = 201, description = "Folder created", body = EntryResponse),
        (status = 400, description = "Invalid path or name"),
        (status = 403, description = "Creating folders not permitted"),
        (status = 409, description = "Folder already exists"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
    ValidatedJson(req): ValidatedJson<CreateFolderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<EntryResponse>>), ApiError> {
    state.gate.authorize(OperationKind::CreateFolder, None)?;
    let parent = state.root.resolve(query.path())?;

    let ops = state.ops.clone();
    let lister = state.lister.clone();
    let created = run_blocking(move || {
        let folder = ops.create_folder(&parent, &req.name)?;
        Ok::<_, ApiError>(lister.describe(&folder)?)
    })
    .await??;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::new(EntryResponse::from(created))),
    ))
}

/// DELETE /api/folders/:foldername - Delete a folder and its contents.
#[utoipa::path(
    delete,
    path = "/api/folders/{foldername}",
    tag = "folders",
    params(
        ("foldername" = String, Path, description = "Folder name"),
        ("path" = Option<String>, Query, description = "Parent directory")
    ),
    responses(
        (status = 200, description = "Folder deleted"),
        (status = 400, description = "Invalid path or entry is not a folder"),
        (status = 403, description = "Delete not permitted"),
        (status = 404, description = "Folder not found")
    )
)]
pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    Path(foldername): Path<String>,
    Query(query): Query<PathQuery>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    delete_entry(&state, query.path(), &foldername, EntryKind::Folder).await?;
    Ok(Json(ApiResponse::new(())))
}

/// PUT /api/folders/rename/:foldername - Rename a folder.
#[utoipa::path(
    put,
    path = "/api/folders/rename/{foldername}",
    tag = "folders",
    params(
        ("foldername" = String, Path, description = "Current folder name"),
        ("path" = Option<String>, Query, description = "Parent directory")
    ),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "Folder renamed", body = EntryResponse),
        (status = 400, description = "Invalid path or name"),
        (status = 403, description = "Rename not permitted"),
        (status = 404, description = "Folder not found"),
        (status = 409, description = "Destination already exists")
    )
)]
pub async fn rename_folder(
    State(state): State<Arc<AppState>>,
    Path(foldername): Path<String>,
    Query(query): Query<PathQuery>,
    ValidatedJson(req): ValidatedJson<RenameRequest>,
) -> Result<Json<ApiResponse<EntryResponse>>, ApiError> {
    let renamed = rename_entry(
        &state,
        query.path(),
        &foldername,
        req.new_name,
        EntryKind::Folder,
    )
    .await?;
    Ok(Json(ApiResponse::new(renamed)))
}

/// PUT /api/folders/move/:foldername - Move a folder into another directory.
#[utoipa::path(
    put,
    path = "/api/folders/move/{foldername}",
    tag = "folders",
    params(
        ("foldername" = String, Path, description = "Folder name"),
        ("path" = Option<String>, Query, description = "Parent directory")
    ),
    request_body = MoveRequest,
    responses(
        (status = 200, description = "Folder moved", body = EntryResponse),
        (status = 400, description = "Invalid path, or move into itself"),
        (status = 403, description = "Move not permitted"),
        (status = 404, description = "Folder not found"),
        (status = 409, description = "Destination already exists")
    )
)]
pub async fn move_folder(
    State(state): State<Arc<AppState>>,
    Path(foldername): Path<String>,
    Query(query): Query<PathQuery>,
    ValidatedJson(req): ValidatedJson<MoveRequest>,
) -> Result<Json<ApiResponse<EntryResponse>>, ApiError> {
    let moved = move_entry(
        &state,
        query.path(),
        &foldername,
        &req.target_path,
        EntryKind::Folder,
    )
    .await?;
    Ok(Json(ApiResponse::new(moved)))
}
