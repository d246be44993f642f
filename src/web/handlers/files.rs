//! File handlers: listing, upload, download, preview and file mutations.

use axum::{
    body::Body,
    extract::{multipart::Field, Multipart, Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::{headers::ContentLength, TypedHeader};
use std::path::Path as FsPath;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use crate::share::{
    archive_label, chunk_stream, media_type_for, ChannelSink, EntryKind, OperationKind,
    PreviewDecision, PreviewKind, ResolvedPath, CHANNEL_DEPTH,
};
use crate::web::dto::{
    ApiResponse, EntryResponse, ListingResponse, MoveRequest, PathQuery, RenameRequest,
    UploadResponse, UploadedFile, ValidatedJson,
};
use crate::web::error::ApiError;

use super::entries::{delete_entry, move_entry, rename_entry};
use super::{content_disposition_header, run_blocking, AppState};

/// Multipart field names accepted as file parts.
const FILE_FIELDS: [&str; 2] = ["files", "file"];

/// GET /api/files - List a directory.
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(
        ("path" = Option<String>, Query, description = "Directory relative to the share root")
    ),
    responses(
        (status = 200, description = "Directory listing", body = ListingResponse),
        (status = 400, description = "Invalid path"),
        (status = 404, description = "Directory not found")
    )
)]
pub async fn list_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
) -> Result<Json<ApiResponse<ListingResponse>>, ApiError> {
    state.gate.authorize(OperationKind::List, None)?;
    let dir = state.root.resolve(query.path())?;
    let path = dir.relative().to_string();

    let lister = state.lister.clone();
    let entries = run_blocking(move || lister.list(&dir)).await??;

    Ok(Json(ApiResponse::new(ListingResponse {
        path,
        entries: entries.into_iter().map(EntryResponse::from).collect(),
    })))
}

/// POST /api/files/upload - Upload one or more files.
///
/// Request body: multipart/form-data with one or more `files` parts. Each
/// part is streamed to a temporary file next to its destination and renamed
/// into place once complete, replacing an existing file of the same name.
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    params(
        ("path" = Option<String>, Query, description = "Destination directory")
    ),
    responses(
        (status = 200, description = "All files stored", body = UploadResponse),
        (status = 207, description = "Some files could not be stored", body = UploadResponse),
        (status = 400, description = "Invalid path or multipart body"),
        (status = 403, description = "Upload not permitted"),
        (status = 413, description = "Upload exceeds the size limit")
    )
)]
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
    content_length: Option<TypedHeader<ContentLength>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    let declared = content_length.map(|TypedHeader(ContentLength(len))| len);
    state.gate.authorize(OperationKind::Upload, declared)?;

    let dir = state.root.resolve(query.path())?;
    let ops = state.ops.clone();
    let target_dir = dir.clone();
    run_blocking(move || ops.ensure_directory(&target_dir)).await??;

    let limit = state.gate.limits().max_upload_size;
    let mut received: u64 = 0;
    let mut results = Vec::new();

    while let Some(mut field) = multipart.next_field().await.map_err(|e| {
        tracing::warn!("Failed to read multipart field: {}", e);
        ApiError::bad_request("Invalid multipart data")
    })? {
        if !field.name().is_some_and(|name| FILE_FIELDS.contains(&name)) {
            continue;
        }
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let target = match state.root.locate_in(&dir, &file_name) {
            Ok(target) => target,
            Err(_) => {
                results.push(UploadedFile::failed(file_name, "Invalid file name"));
                continue;
            }
        };

        match store_field(&mut field, &target, &mut received, limit).await {
            Ok(size) => {
                tracing::info!(file = %target.relative(), size, "File uploaded");
                let media_type = media_type_for(FsPath::new(&file_name));
                results.push(UploadedFile::stored(
                    file_name,
                    target.relative().to_string(),
                    size,
                    media_type,
                ));
            }
            Err(StoreError::TooLarge) => {
                return Err(ApiError::payload_too_large(format!(
                    "Upload exceeds the limit of {limit} bytes"
                )));
            }
            Err(StoreError::Failed(reason)) => {
                results.push(UploadedFile::failed(file_name, reason));
            }
        }
    }

    if results.is_empty() {
        return Err(ApiError::bad_request("No files provided"));
    }

    let status = if results.iter().any(UploadedFile::is_failed) {
        StatusCode::MULTI_STATUS
    } else {
        StatusCode::OK
    };

    Ok((
        status,
        Json(ApiResponse::new(UploadResponse { files: results })),
    )
        .into_response())
}

enum StoreError {
    /// The request as a whole went over the upload limit.
    TooLarge,
    /// This file could not be stored; others may still succeed.
    Failed(&'static str),
}

/// Stream one multipart part to `target` through a temporary file.
async fn store_field(
    field: &mut Field<'_>,
    target: &ResolvedPath,
    received: &mut u64,
    limit: u64,
) -> Result<u64, StoreError> {
    let Some(parent) = target.as_path().parent() else {
        return Err(StoreError::Failed("Invalid file name"));
    };

    let (mut file, staged) = StagedUpload::create_in(parent).await.map_err(|e| {
        tracing::error!("Failed to create upload file: {}", e);
        StoreError::Failed("Failed to store file")
    })?;

    let written = copy_field(field, &mut file, received, limit).await?;
    drop(file);

    if let Ok(existing) = tokio::fs::symlink_metadata(target.as_path()).await {
        if existing.is_dir() {
            return Err(StoreError::Failed("A folder with that name already exists"));
        }
    }

    staged.commit(target).await.map_err(|e| {
        tracing::error!("Failed to move upload into place: {}", e);
        StoreError::Failed("Failed to store file")
    })?;

    Ok(written)
}

/// A partially received upload, staged next to its destination.
///
/// The file is removed when this is dropped without [`StagedUpload::commit`],
/// which also covers the request future being dropped when a client goes
/// away mid-upload.
struct StagedUpload {
    path: tempfile::TempPath,
}

impl StagedUpload {
    async fn create_in(dir: &FsPath) -> std::io::Result<(tokio::fs::File, Self)> {
        let dir = dir.to_path_buf();
        let named = tokio::task::spawn_blocking(move || {
            tempfile::Builder::new()
                .prefix(".upload-")
                .suffix(".part")
                .tempfile_in(dir)
        })
        .await
        .map_err(std::io::Error::other)??;

        let (file, path) = named.into_parts();
        Ok((tokio::fs::File::from_std(file), Self { path }))
    }

    /// Move the staged file to `target`, replacing any existing file.
    async fn commit(self, target: &ResolvedPath) -> std::io::Result<()> {
        let target = target.as_path().to_path_buf();
        tokio::task::spawn_blocking(move || self.path.persist(target).map_err(|e| e.error))
            .await
            .map_err(std::io::Error::other)?
    }
}

async fn copy_field(
    field: &mut Field<'_>,
    file: &mut tokio::fs::File,
    received: &mut u64,
    limit: u64,
) -> Result<u64, StoreError> {
    let mut written: u64 = 0;

    loop {
        let chunk = match field.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!("Failed to read upload body: {}", e);
                return Err(StoreError::Failed("Failed to read file"));
            }
        };

        *received += chunk.len() as u64;
        if *received > limit {
            return Err(StoreError::TooLarge);
        }

        file.write_all(&chunk).await.map_err(|e| {
            tracing::error!("Failed to write upload: {}", e);
            StoreError::Failed("Failed to store file")
        })?;
        written += chunk.len() as u64;
    }

    file.flush().await.map_err(|e| {
        tracing::error!("Failed to flush upload: {}", e);
        StoreError::Failed("Failed to store file")
    })?;

    Ok(written)
}

/// Open a regular file for streaming. Returns the handle and its size.
async fn open_file(target: &ResolvedPath) -> Result<(tokio::fs::File, u64), ApiError> {
    let file = match tokio::fs::File::open(target.as_path()).await {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("File not found"));
        }
        Err(e) => {
            tracing::error!("Failed to open file: {}", e);
            return Err(ApiError::internal("Failed to read file"));
        }
    };

    let metadata = file.metadata().await.map_err(|e| {
        tracing::error!("Failed to read file metadata: {}", e);
        ApiError::internal("Failed to read file")
    })?;
    if metadata.is_dir() {
        return Err(ApiError::bad_request("Path is a folder"));
    }

    Ok((file, metadata.len()))
}

/// GET /api/files/download/:filename - Download a file.
#[utoipa::path(
    get,
    path = "/api/files/download/{filename}",
    tag = "files",
    params(
        ("filename" = String, Path, description = "File name"),
        ("path" = Option<String>, Query, description = "Directory containing the file")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 400, description = "Invalid path"),
        (status = 403, description = "Download not permitted"),
        (status = 404, description = "File not found")
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    state.gate.authorize(OperationKind::Download, None)?;
    let target = state.root.resolve_child(query.path(), &filename)?;
    let (file, size) = open_file(&target).await?;

    Response::builder()
        .header(header::CONTENT_TYPE, media_type_for(FsPath::new(&filename)))
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header("attachment", &filename),
        )
        .header(header::CONTENT_LENGTH, size)
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET /api/files/download-folder - Download a directory as `.tar.gz`.
///
/// The archive is generated while it is sent; nothing is staged on disk.
#[utoipa::path(
    get,
    path = "/api/files/download-folder",
    tag = "files",
    params(
        ("path" = Option<String>, Query, description = "Directory to archive")
    ),
    responses(
        (status = 200, description = "Gzip-compressed tar archive", content_type = "application/gzip"),
        (status = 400, description = "Invalid path"),
        (status = 403, description = "Download not permitted"),
        (status = 404, description = "Folder not found")
    )
)]
pub async fn download_folder(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    state.gate.authorize(OperationKind::Download, None)?;
    let dir = state.root.resolve(query.path())?;

    match tokio::fs::metadata(dir.as_path()).await {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => return Err(ApiError::bad_request("Path is not a directory")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(ApiError::not_found("Folder not found"));
        }
        Err(e) => {
            tracing::error!("Failed to read folder metadata: {}", e);
            return Err(ApiError::internal("Failed to read folder"));
        }
    }

    let label = archive_label(&dir);
    let filename = format!("{label}.tar.gz");
    let (sink, rx) = ChannelSink::channel(CHANNEL_DEPTH);

    let archiver = state.archiver.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = archiver.stream(&dir, &label, sink) {
            tracing::warn!(folder = %dir.relative(), error = %e, "Folder archive aborted");
        }
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "application/gzip")
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header("attachment", &filename),
        )
        .body(Body::from_stream(chunk_stream(rx)))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET /api/files/preview/:filename - Serve a file for inline display.
#[utoipa::path(
    get,
    path = "/api/files/preview/{filename}",
    tag = "files",
    params(
        ("filename" = String, Path, description = "File name"),
        ("path" = Option<String>, Query, description = "Directory containing the file")
    ),
    responses(
        (status = 200, description = "File content for inline display"),
        (status = 400, description = "Invalid path"),
        (status = 403, description = "Preview not permitted"),
        (status = 404, description = "File not found"),
        (status = 413, description = "File too large to preview"),
        (status = 415, description = "File type cannot be previewed")
    )
)]
pub async fn preview_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Query(query): Query<PathQuery>,
) -> Result<Response, ApiError> {
    state.gate.authorize(OperationKind::Preview, None)?;
    let target = state.root.resolve_child(query.path(), &filename)?;
    let (file, size) = open_file(&target).await?;
    state.gate.authorize(OperationKind::Preview, Some(size))?;

    let media_type = media_type_for(FsPath::new(&filename));
    let kind = match state.previews.classify(&filename, size, &media_type) {
        PreviewDecision::Inline(kind) => kind,
        PreviewDecision::TooLarge => {
            return Err(ApiError::payload_too_large("File too large to preview"));
        }
        PreviewDecision::Unsupported => {
            return Err(ApiError::unsupported_media_type(
                "Preview not available for this file type",
            ));
        }
    };

    // Markup is shown as source, never rendered in the app's origin.
    let content_type = match kind {
        PreviewKind::Text => "text/plain; charset=utf-8".to_string(),
        _ => media_type,
    };

    let mut builder = Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header("inline", &filename),
        )
        .header(header::CONTENT_LENGTH, size);
    if kind == PreviewKind::Image {
        builder = builder.header(
            header::CONTENT_SECURITY_POLICY,
            "default-src 'none'; style-src 'unsafe-inline'; sandbox",
        );
    }

    builder
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// DELETE /api/files/:filename - Delete a file.
#[utoipa::path(
    delete,
    path = "/api/files/{filename}",
    tag = "files",
    params(
        ("filename" = String, Path, description = "File name"),
        ("path" = Option<String>, Query, description = "Directory containing the file")
    ),
    responses(
        (status = 200, description = "File deleted"),
        (status = 400, description = "Invalid path or entry is a folder"),
        (status = 403, description = "Delete not permitted"),
        (status = 404, description = "File not found")
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Query(query): Query<PathQuery>,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    delete_entry(&state, query.path(), &filename, EntryKind::File).await?;
    Ok(Json(ApiResponse::new(())))
}

/// PUT /api/files/rename/:filename - Rename a file.
#[utoipa::path(
    put,
    path = "/api/files/rename/{filename}",
    tag = "files",
    params(
        ("filename" = String, Path, description = "Current file name"),
        ("path" = Option<String>, Query, description = "Directory containing the file")
    ),
    request_body = RenameRequest,
    responses(
        (status = 200, description = "File renamed", body = EntryResponse),
        (status = 400, description = "Invalid path or name"),
        (status = 403, description = "Rename not permitted"),
        (status = 404, description = "File not found"),
        (status = 409, description = "Destination already exists"),
        (status = 422, description = "Validation error")
    )
)]
pub async fn rename_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Query(query): Query<PathQuery>,
    ValidatedJson(req): ValidatedJson<RenameRequest>,
) -> Result<Json<ApiResponse<EntryResponse>>, ApiError> {
    let renamed = rename_entry(
        &state,
        query.path(),
        &filename,
        req.new_name,
        EntryKind::File,
    )
    .await?;
    Ok(Json(ApiResponse::new(renamed)))
}

/// PUT /api/files/move/:filename - Move a file to another directory.
#[utoipa::path(
    put,
    path = "/api/files/move/{filename}",
    tag = "files",
    params(
        ("filename" = String, Path, description = "File name"),
        ("path" = Option<String>, Query, description = "Directory containing the file")
    ),
    request_body = MoveRequest,
    responses(
        (status = 200, description = "File moved", body = EntryResponse),
        (status = 400, description = "Invalid path"),
        (status = 403, description = "Move not permitted"),
        (status = 404, description = "File not found"),
        (status = 409, description = "Destination already exists")
    )
)]
pub async fn move_file(
    State(state): State<Arc<AppState>>,
    Path(filename): Path<String>,
    Query(query): Query<PathQuery>,
    ValidatedJson(req): ValidatedJson<MoveRequest>,
) -> Result<Json<ApiResponse<EntryResponse>>, ApiError> {
    let moved = move_entry(
        &state,
        query.path(),
        &filename,
        &req.target_path,
        EntryKind::File,
    )
    .await?;
    Ok(Json(ApiResponse::new(moved)))
}
