pub mod file_download;
pub mod file_management;
pub mod file_upload;
pub mod health;


#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{header, Request, StatusCode},
    };

    use super::test_support::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn test_health_check() {
        let app = app_with_store(Arc::new(MemoryStore::new()));
        let (status, _, body) = send(&app, empty_request("GET", "/health")).await;

        assert_eq!(status, StatusCode::OK);
        let json = json(&body);
        assert_eq!(json["status"], "healthy");
        assert_eq!(json["storage"], "memory");
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_any_origin() {
        let app = app_with_store(Arc::new(MemoryStore::new()));
        let request = Request::builder()
            .method("OPTIONS")
            .uri("/delete/1_a.txt")
            .header(header::ORIGIN, "http://localhost:3000")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
            .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "content-type")
            .body(Body::empty())
            .unwrap();
        let (status, headers, _) = send(&app, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS].to_str().unwrap();
        for method in ["GET", "POST", "DELETE"] {
            assert!(methods.contains(method), "missing {} in {}", method, methods);
        }
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "content-type");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let app = app_with_store(Arc::new(MemoryStore::new()));
        let (status, _, _) = send(&app, empty_request("GET", "/nope")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
