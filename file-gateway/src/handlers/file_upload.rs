use std::collections::HashMap;

use axum::{
    extract::{Multipart, State},
    Json,
};
use bytes::Bytes;
use chrono::Utc;
use futures::future::try_join_all;

use crate::error::{ApiError, ApiResult};
use crate::models::{FileDescriptor, UploadResponse};
use crate::storage::{keys, StorageError};
use crate::AppState;

/// Multipart field carrying the files
pub const FILES_FIELD: &str = "files";

/// Maximum number of files accepted in one request
pub const MAX_FILES_PER_UPLOAD: usize = 10;

// Used when a part in `files` carries no filename
const DEFAULT_FILENAME: &str = "file";

#[derive(Debug)]
struct IncomingFile {
    filename: String,
    content_type: Option<String>,
    data: Bytes,
}

/// POST /upload
///
/// Stores every file of the `files` field under `uploads/<ms-epoch>_<filename>`.
/// The puts run concurrently; the first failure fails the whole request and no
/// partial list is reported.
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    tracing::debug!("Received file upload request");

    let files = read_files(&mut multipart).await?;
    if files.is_empty() {
        return Err(ApiError::bad_request("No files uploaded"));
    }

    let timestamp = Utc::now().timestamp_millis();
    let keyed = assign_keys(timestamp, files);
    let uploads = keyed.into_iter().map(|(key, file)| {
        let state = &state;
        async move {
            let size = file.data.len();
            state
                .store
                .put(&key, file.data, file.content_type)
                .await?;
            tracing::info!(key = %key, size, "File uploaded");
            Ok::<_, StorageError>(FileDescriptor {
                url: state.urls.url_for(&key),
                name: key,
            })
        }
    });

    let descriptors = try_join_all(uploads).await.map_err(|e| {
        tracing::error!("Failed to upload files: {}", e);
        ApiError::storage("Error uploading files", e)
    })?;

    Ok(Json(UploadResponse {
        message: "Files uploaded successfully".to_string(),
        files: descriptors,
    }))
}

/// Pair each file with its upload key.
///
/// Repeated filenames within one request take the next millisecond, so every
/// file of the request lands under a distinct key.
fn assign_keys(timestamp: i64, files: Vec<IncomingFile>) -> Vec<(String, IncomingFile)> {
    let mut seen: HashMap<String, i64> = HashMap::new();
    files
        .into_iter()
        .map(|file| {
            let occurrence = seen.entry(file.filename.clone()).or_insert(0);
            let key = keys::upload_key(timestamp + *occurrence, &file.filename);
            if *occurrence > 0 {
                tracing::warn!(key = %key, "Duplicate filename in upload request");
            }
            *occurrence += 1;
            (key, file)
        })
        .collect()
}

/// Drain the multipart body, keeping parts of the `files` field in order
async fn read_files(multipart: &mut Multipart) -> ApiResult<Vec<IncomingFile>> {
    let mut files = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(invalid_multipart)? {
        if field.name() != Some(FILES_FIELD) {
            tracing::debug!("Ignoring multipart field: {:?}", field.name());
            continue;
        }

        if files.len() == MAX_FILES_PER_UPLOAD {
            return Err(ApiError::BadRequest {
                message: "Too many files".to_string(),
                error: Some(format!(
                    "At most {} files can be uploaded at once",
                    MAX_FILES_PER_UPLOAD
                )),
            });
        }

        let filename = field
            .file_name()
            .filter(|name| !name.is_empty())
            .unwrap_or(DEFAULT_FILENAME)
            .to_string();
        let content_type = field.content_type().and_then(|ct| match ct.parse::<mime::Mime>() {
            Ok(parsed) => Some(parsed.to_string()),
            Err(_) => {
                tracing::warn!("Ignoring invalid content type {:?} for {}", ct, filename);
                None
            }
        });

        let data = field.bytes().await.map_err(invalid_multipart)?;
        files.push(IncomingFile {
            filename,
            content_type,
            data,
        });
    }

    Ok(files)
}

fn invalid_multipart(err: axum::extract::multipart::MultipartError) -> ApiError {
    tracing::warn!("Invalid multipart request: {}", err);
    ApiError::BadRequest {
        message: "Invalid multipart request".to_string(),
        error: Some(err.body_text()),
    }
}
