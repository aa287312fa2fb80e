use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::{ApiError, ApiResult};
use crate::models::{FileDescriptor, FileListResponse, MessageResponse};
use crate::storage::keys;
use crate::AppState;

/// GET /files
///
/// A single listing page over the whole bucket. Names lose their `uploads/`
/// prefix for display; URLs are built from the full key.
pub async fn list_files(State(state): State<AppState>) -> ApiResult<Json<FileListResponse>> {
    let object_keys = state.store.list().await.map_err(|e| {
        tracing::error!("Failed to list files: {}", e);
        ApiError::storage("Error listing files", e)
    })?;

    let files = object_keys
        .iter()
        .map(|key| FileDescriptor {
            name: keys::display_name(key).to_string(),
            url: state.urls.url_for(key),
        })
        .collect::<Vec<_>>();

    tracing::debug!(count = files.len(), "Listed files");
    Ok(Json(FileListResponse { files }))
}

/// DELETE /delete/:file_name
///
/// Succeeds whether or not the object existed.
pub async fn delete_file(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let key = keys::lookup_key(&file_name);

    state.store.delete(&key).await.map_err(|e| {
        tracing::error!(key = %key, "Failed to delete file: {}", e);
        ApiError::storage("Error deleting file", e)
    })?;

    tracing::info!(key = %key, "File deleted");
    Ok(Json(MessageResponse {
        message: "File deleted successfully".to_string(),
    }))
}
