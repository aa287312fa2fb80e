use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::{IntoResponse, Response},
};
use futures::TryStreamExt;

use crate::error::{ApiError, ApiResult};
use crate::storage::keys;
use crate::AppState;

/// GET /download/:file_name
///
/// The object is opened before any header is written, so a missing key or a
/// store failure still yields a clean JSON error. The body is pulled from the
/// store in bounded chunks as the client consumes it.
pub async fn download_file(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> ApiResult<Response> {
    let key = keys::lookup_key(&file_name);

    let object = state.store.get(&key).await.map_err(|e| {
        tracing::error!(key = %key, "Failed to open file for download: {}", e);
        ApiError::storage("Error downloading file", e)
    })?;

    tracing::info!(
        key = %key,
        size = ?object.content_length,
        stored_type = ?object.content_type,
        "Streaming file download"
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_DISPOSITION, content_disposition(&file_name));
    if let Some(length) = object.content_length {
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from(length));
    }

    // Headers are already committed once streaming starts; a failure here can
    // only abort the connection.
    let stream = object.stream.inspect_err(move |e| {
        tracing::error!(key = %key, "Download stream aborted: {}", e);
    });

    Ok((headers, Body::from_stream(stream)).into_response())
}

/// `attachment` disposition naming the requested file.
///
/// Non-ASCII or quote characters are replaced in the plain `filename`
/// parameter and carried exactly in the RFC 5987 `filename*` parameter.
fn content_disposition(file_name: &str) -> HeaderValue {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            ' '..='~' if c != '"' && c != '\\' => c,
            _ => '_',
        })
        .collect();

    let value = if fallback == file_name {
        format!("attachment; filename=\"{}\"", file_name)
    } else {
        format!(
            "attachment; filename=\"{}\"; filename*=UTF-8''{}",
            fallback,
            urlencoding::encode(file_name)
        )
    };

    HeaderValue::from_str(&value).unwrap_or_else(|_| HeaderValue::from_static("attachment"))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::http::StatusCode;
    use bytes::Bytes;
    use futures::stream;
    use pretty_assertions::assert_eq;
    use tower::ServiceExt;

    use super::*;
    use crate::handlers::test_support::*;
    use crate::models::UploadResponse;
    use crate::storage::{MemoryStore, MockObjectStore, ObjectBody, StorageError};

    #[tokio::test]
    async fn test_upload_then_download_roundtrip() {
        let store = Arc::new(MemoryStore::new());
        let app = app_with_store(store.clone());
        let content: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();

        let (status, _, body) =
            send(&app, upload_request(&[Part::file("photo.jpg", "image/jpeg", &content)])).await;
        assert_eq!(status, StatusCode::OK);
        let uploaded: UploadResponse = serde_json::from_slice(&body).unwrap();
        let key = &uploaded.files[0].name;

        let uri = format!("/download/{}", keys::display_name(key));
        let (status, headers, body) = send(&app, empty_request("GET", &uri)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_ref(), content.as_slice());
        assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
        assert_eq!(headers[header::CONTENT_LENGTH], content.len().to_string().as_str());
        let disposition = headers[header::CONTENT_DISPOSITION].to_str().unwrap();
        assert!(disposition.starts_with("attachment"));
        assert!(disposition.contains(keys::display_name(key)));

        let stored = store.object(key).await.unwrap();
        assert_eq!(stored.content_type.as_deref(), Some("image/jpeg"));
    }

    #[tokio::test]
    async fn test_download_missing_file_is_server_error() {
        let app = app_with_store(Arc::new(MemoryStore::new()));
        let (status, headers, body) =
            send(&app, empty_request("GET", "/download/does-not-exist.txt")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(headers.get(header::CONTENT_DISPOSITION).is_none());
        let json = json(&body);
        assert_eq!(json["message"], "Error downloading file");
        assert!(json["error"].as_str().unwrap().contains("uploads/does-not-exist.txt"));
    }

    #[tokio::test]
    async fn test_download_reads_prefixed_key_and_streams_chunks() {
        let mut mock = MockObjectStore::new();
        mock.expect_get()
            .withf(|key| key.to_string() == "uploads/7_notes.txt")
            .times(1)
            .returning(|_| {
                let chunks: Vec<std::io::Result<Bytes>> = vec![
                    Ok(Bytes::from_static(b"hello ")),
                    Ok(Bytes::from_static(b"world")),
                ];
                Ok(ObjectBody {
                    content_type: Some("text/plain".to_string()),
                    content_length: None,
                    stream: Box::pin(stream::iter(chunks)),
                })
            });
        let app = app_with_store(Arc::new(mock));

        let (status, headers, body) = send(&app, empty_request("GET", "/download/7_notes.txt")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, Bytes::from_static(b"hello world"));
        assert_eq!(
            headers[header::CONTENT_DISPOSITION],
            "attachment; filename=\"7_notes.txt\""
        );
    }

    #[tokio::test]
    async fn test_download_store_failure_is_server_error() {
        let mut mock = MockObjectStore::new();
        mock.expect_get()
            .returning(|_| Err(StorageError::Backend("connection reset".to_string())));
        let app = app_with_store(Arc::new(mock));

        let (status, _, body) = send(&app, empty_request("GET", "/download/a.txt")).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json(&body)["error"], "connection reset");
    }

    #[tokio::test]
    async fn test_stream_failure_aborts_body() {
        let mut mock = MockObjectStore::new();
        mock.expect_get().returning(|_| {
            let chunks: Vec<std::io::Result<Bytes>> = vec![
                Ok(Bytes::from_static(b"partial ")),
                Err(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                )),
            ];
            Ok(ObjectBody {
                content_type: None,
                content_length: Some(1024),
                stream: Box::pin(stream::iter(chunks)),
            })
        });
        let app = app_with_store(Arc::new(mock));

        let response = app
            .oneshot(empty_request("GET", "/download/cut.bin"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await;
        assert!(body.is_err());
    }

    #[test]
    fn test_content_disposition_escapes_unsafe_names() {
        assert_eq!(
            content_disposition("report.pdf"),
            "attachment; filename=\"report.pdf\""
        );
        assert_eq!(
            content_disposition("résumé.pdf"),
            "attachment; filename=\"r_sum_.pdf\"; filename*=UTF-8''r%C3%A9sum%C3%A9.pdf"
        );
        assert_eq!(
            content_disposition("say \"hi\".txt"),
            "attachment; filename=\"say _hi_.txt\"; filename*=UTF-8''say%20%22hi%22.txt"
        );
    }
}
