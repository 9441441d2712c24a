use std::time::{SystemTime, UNIX_EPOCH};

use axum::body::Bytes;
use axum::http::StatusCode;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct StorageUpstreamError {
    pub status: StatusCode,
    pub body: Option<Value>,
}

fn storage_base_url() -> String {
    std::env::var("STORAGE_API_URL").unwrap_or_else(|_| "http://127.0.0.1:9000".to_string())
}

fn storage_public_url() -> String {
    // Browsers may reach the bucket through a different host than the server
    // does, so the public base is overridable.
    std::env::var("STORAGE_PUBLIC_URL").unwrap_or_else(|_| storage_base_url())
}

fn storage_bucket() -> String {
    std::env::var("STORAGE_BUCKET").unwrap_or_else(|_| "participant-uploads".to_string())
}

fn connect_failed(url: &str, err: impl ToString) -> StorageUpstreamError {
    StorageUpstreamError {
        status: StatusCode::BAD_GATEWAY,
        body: Some(serde_json::json!({
            "error": "storage_connect_failed",
            "detail": err.to_string(),
            "url": url
        })),
    }
}

/// Object keys are the upload timestamp plus the client's file name, which
/// keeps repeated uploads of the same file distinct.
pub fn object_key(file_name: &str) -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("{}-{}", millis, file_name)
}

/// Uploads a submitted profile picture to the configured bucket and returns
/// the public URL to store on the participant record.
pub async fn upload_profile_picture(
    file_name: &str,
    content_type: &str,
    bytes: Bytes,
) -> Result<String, StorageUpstreamError> {
    upload_object(
        &storage_base_url(),
        &storage_public_url(),
        &storage_bucket(),
        &object_key(file_name),
        content_type,
        bytes,
    )
    .await
}

async fn upload_object(
    base_url: &str,
    public_url: &str,
    bucket: &str,
    key: &str,
    content_type: &str,
    bytes: Bytes,
) -> Result<String, StorageUpstreamError> {
    let url = format!("{}/{}/{}", base_url.trim_end_matches('/'), bucket, key);

    let client = reqwest::Client::new();
    let resp = client
        .put(&url)
        .header("Content-Type", content_type)
        .body(bytes)
        .send()
        .await
        .map_err(|e| connect_failed(&url, e))?;

    let status = StatusCode::from_u16(resp.status().as_u16()).unwrap_or(StatusCode::BAD_GATEWAY);
    if !status.is_success() {
        let body = resp.text().await.ok().map(|detail| {
            serde_json::json!({
                "error": "storage_upload_failed",
                "detail": detail,
                "url": url
            })
        });
        return Err(StorageUpstreamError { status, body });
    }

    Ok(format!(
        "{}/{}/{}",
        public_url.trim_end_matches('/'),
        bucket,
        key
    ))
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;

    use super::*;

    #[test]
    fn object_key_keeps_original_file_name() {
        let key = object_key("photo.png");
        let (prefix, rest) = key.split_once('-').unwrap();
        assert!(prefix.bytes().all(|b| b.is_ascii_digit()));
        assert_eq!(rest, "photo.png");
    }

    #[tokio::test]
    async fn upload_returns_public_object_url() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path("/badges/1-photo.png")
                    .header("content-type", "image/png")
                    .body("bytes");
                then.status(200);
            })
            .await;

        let url = upload_object(
            &server.base_url(),
            "https://cdn.example.test",
            "badges",
            "1-photo.png",
            "image/png",
            Bytes::from_static(b"bytes"),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(url, "https://cdn.example.test/badges/1-photo.png");
    }

    #[tokio::test]
    async fn upstream_failure_maps_to_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT).path("/badges/1-photo.png");
                then.status(403).body("denied");
            })
            .await;

        let err = upload_object(
            &server.base_url(),
            &server.base_url(),
            "badges",
            "1-photo.png",
            "image/png",
            Bytes::from_static(b"bytes"),
        )
        .await
        .unwrap_err();

        assert_eq!(err.status, StatusCode::FORBIDDEN);
    }
}
