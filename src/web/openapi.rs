//! OpenAPI document for the HTTP API.

use utoipa::OpenApi;

use super::dto::{
    CreateFolderRequest, EntryResponse, ListingResponse, MoveRequest, RenameRequest,
    UploadResponse, UploadedFile,
};
use super::handlers::{files, folders};

#[derive(OpenApi)]
#[openapi(
    info(title = "Sharebox API", description = "Browse and transfer files in a shared directory"),
    paths(
        files::list_files,
        files::upload_files,
        files::download_file,
        files::download_folder,
        files::preview_file,
        files::delete_file,
        files::rename_file,
        files::move_file,
        folders::create_folder,
        folders::delete_folder,
        folders::rename_folder,
        folders::move_folder,
    ),
    components(schemas(
        EntryResponse,
        ListingResponse,
        UploadedFile,
        UploadResponse,
        RenameRequest,
        MoveRequest,
        CreateFolderRequest,
    )),
    tags(
        (name = "files", description = "File listing and transfer"),
        (name = "folders", description = "Folder management")
    )
)]
pub struct ApiDoc;
