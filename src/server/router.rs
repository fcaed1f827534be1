//! HTTP request routing
//!
//! Maps each endpoint onto a [`FileStore`] operation. Client paths are
//! resolved before any storage call is made; API errors come back as JSON,
//! download errors as plain text.

use axum::body::{Body, Bytes};
use axum::extract::multipart::{Multipart, MultipartError, MultipartRejection};
use axum::extract::{DefaultBodyLimit, Path, Query, State};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::middleware;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures_util::StreamExt;
use log::debug;
use serde::Deserialize;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use url::form_urlencoded;

use crate::error::{FileManagerError, plain_response};
use crate::middleware::log_request;
use crate::protocol::{ListResponse, MessageResponse};
use crate::storage::validation::ROOT_LOGICAL;
use crate::storage::{DownloadOutcome, FileStore, StorageBackend};
use crate::transfer::StagedUpload;

/// Allowance for multipart boundaries and part headers on top of the file bytes
pub const MULTIPART_ENVELOPE: u64 = 64 * 1024;

const INDEX_HTML: &str = include_str!("../../assets/index.html");

type SharedStore<B> = Arc<FileStore<B>>;

/// Builds the application router over `store`
pub fn build_router<B: StorageBackend>(store: SharedStore<B>) -> Router {
    let upload_body_limit = usize::try_from(store.max_upload_size().saturating_add(MULTIPART_ENVELOPE))
        .unwrap_or(usize::MAX);

    Router::new()
        .route("/", get(index).fallback(plain_method_not_allowed))
        .route(
            "/api/files",
            get(list_files::<B>).fallback(json_method_not_allowed),
        )
        .route(
            "/api/upload",
            post(upload_file::<B>)
                .fallback(json_method_not_allowed)
                .layer(DefaultBodyLimit::max(upload_body_limit)),
        )
        .route(
            "/api/mkdir",
            post(make_directory::<B>).fallback(json_method_not_allowed),
        )
        .route(
            "/download",
            get(download_root::<B>).fallback(plain_method_not_allowed),
        )
        .route(
            "/download/",
            get(download_root::<B>).fallback(plain_method_not_allowed),
        )
        .route(
            "/download/{*path}",
            get(download_file::<B>).fallback(plain_method_not_allowed),
        )
        .layer(middleware::from_fn(log_request))
        .with_state(store)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn json_method_not_allowed() -> FileManagerError {
    FileManagerError::MethodNotAllowed
}

async fn plain_method_not_allowed() -> Response {
    plain_response(FileManagerError::MethodNotAllowed)
}

#[derive(Debug, Deserialize)]
struct ListQuery {
    path: Option<String>,
}

async fn list_files<B: StorageBackend>(
    State(store): State<SharedStore<B>>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, FileManagerError> {
    let requested = query
        .path
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| ROOT_LOGICAL.to_string());

    let dir = store.resolve(&requested)?;
    let files = store.list_directory(&dir).await?;
    Ok(Json(ListResponse::new(requested, files)))
}

#[derive(Default)]
struct UploadForm {
    dir: Option<String>,
    file: Option<(String, StagedUpload)>,
}

async fn upload_file<B: StorageBackend>(
    State(store): State<SharedStore<B>>,
    headers: HeaderMap,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<MessageResponse>, FileManagerError> {
    let limit = store.max_upload_size();
    if content_length(&headers).is_some_and(|len| len > limit.saturating_add(MULTIPART_ENVELOPE)) {
        return Err(FileManagerError::UploadTooLarge { limit });
    }

    let mut multipart =
        multipart.map_err(|_| FileManagerError::MalformedRequest("Failed to parse form"))?;

    let mut form = UploadForm::default();
    if let Err(e) = read_upload_form(&store, &mut multipart, &mut form).await {
        if let Some((_, staged)) = form.file.take() {
            store.discard_upload(staged).await;
        }
        return Err(e);
    }

    let Some((file_name, staged)) = form.file else {
        return Err(FileManagerError::MalformedRequest("Failed to get file from form"));
    };

    // Fields may arrive in any order, so the directory is resolved last
    let dir = match store.resolve(form.dir.as_deref().unwrap_or_default()) {
        Ok(dir) => dir,
        Err(e) => {
            store.discard_upload(staged).await;
            return Err(e);
        }
    };

    let target = store.commit_upload(staged, &dir, &file_name).await?;
    Ok(Json(MessageResponse::new(format!(
        "File uploaded successfully to {}",
        target.logical()
    ))))
}

/// Reads the `path` and `file` fields, staging the file part as it streams in
async fn read_upload_form<B: StorageBackend>(
    store: &FileStore<B>,
    multipart: &mut Multipart,
    form: &mut UploadForm,
) -> Result<(), FileManagerError> {
    let limit = store.max_upload_size();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        let name = field.name().map(str::to_owned);
        match name.as_deref() {
            Some("path") => {
                let dir = field.text().await.map_err(|e| multipart_error(e, limit))?;
                form.dir = Some(dir);
            }
            Some("file") if form.file.is_none() => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                if file_name.is_empty() {
                    return Err(FileManagerError::MalformedRequest(
                        "Failed to get file from form",
                    ));
                }

                // Reject early when the directory is already known
                if let Some(dir) = form.dir.as_deref() {
                    let dir = store.resolve(dir)?;
                    store.resolver().resolve_child(&dir, &file_name)?;
                }

                let content = field.map(move |chunk| chunk.map_err(|e| multipart_error(e, limit)));
                let staged = store.stage_upload(content).await?;
                form.file = Some((file_name, staged));
            }
            _ => {}
        }
    }

    Ok(())
}

fn multipart_error(error: MultipartError, limit: u64) -> FileManagerError {
    if error.status() == StatusCode::PAYLOAD_TOO_LARGE {
        FileManagerError::UploadTooLarge { limit }
    } else {
        debug!("Multipart error: {}", error);
        FileManagerError::MalformedRequest("Failed to parse form")
    }
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
}

#[derive(Debug, Deserialize)]
struct MkdirRequest {
    #[serde(default)]
    path: String,
    #[serde(default)]
    name: String,
}

async fn make_directory<B: StorageBackend>(
    State(store): State<SharedStore<B>>,
    body: Bytes,
) -> Result<Json<MessageResponse>, FileManagerError> {
    let request: MkdirRequest = serde_json::from_slice(&body)
        .map_err(|_| FileManagerError::MalformedRequest("Invalid request"))?;

    if request.name.is_empty() {
        return Err(FileManagerError::MalformedRequest("Directory name is required"));
    }

    let parent = store.resolve(&request.path)?;
    store.create_directory(&parent, &request.name).await?;

    Ok(Json(MessageResponse::new(format!(
        "Directory '{}' created successfully",
        request.name
    ))))
}

async fn download_root<B: StorageBackend>(State(store): State<SharedStore<B>>) -> Response {
    serve_download(&store, ROOT_LOGICAL).await
}

async fn download_file<B: StorageBackend>(
    State(store): State<SharedStore<B>>,
    Path(path): Path<String>,
) -> Response {
    serve_download(&store, &format!("/{}", path)).await
}

async fn serve_download<B: StorageBackend>(store: &FileStore<B>, logical: &str) -> Response {
    let target = match store.resolve(logical) {
        Ok(target) => target,
        Err(e) => return plain_response(e),
    };

    match store.dispatch_download(&target).await {
        Ok(DownloadOutcome::File {
            reader,
            len,
            file_name,
            content_type,
        }) => {
            let mut headers = HeaderMap::new();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_str(&content_type)
                    .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream")),
            );
            headers.insert(header::CONTENT_LENGTH, HeaderValue::from(len));
            if let Ok(value) = HeaderValue::from_str(&content_disposition(&file_name)) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }

            let body = Body::from_stream(ReaderStream::new(reader));
            (StatusCode::OK, headers, body).into_response()
        }
        Ok(DownloadOutcome::Redirect { location }) => {
            (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
        }
        Ok(DownloadOutcome::NotFound) => {
            plain_response(FileManagerError::NotFound(target.logical().to_string()))
        }
        Err(e) => plain_response(e),
    }
}

/// `attachment` disposition carrying the original base name.
/// Names outside printable ASCII also get an RFC 5987 `filename*`.
fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| match c {
            '"' | '\\' => '_',
            c if c == ' ' || c.is_ascii_graphic() => c,
            _ => '_',
        })
        .collect();

    if fallback == file_name {
        return format!("attachment; filename=\"{}\"", file_name);
    }

    let encoded = form_urlencoded::byte_serialize(file_name.as_bytes())
        .collect::<String>()
        .replace('+', "%20");
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback, encoded
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_disposition_plain_name() {
        assert_eq!(
            content_disposition("a.txt"),
            "attachment; filename=\"a.txt\""
        );
        assert_eq!(
            content_disposition("my report.pdf"),
            "attachment; filename=\"my report.pdf\""
        );
    }

    #[test]
    fn test_content_disposition_escapes_unsafe_names() {
        let value = content_disposition("résumé \"final\".txt");
        assert!(value.starts_with("attachment; filename=\"r_sum_ _final_.txt\""));
        assert!(value.ends_with("filename*=UTF-8''r%C3%A9sum%C3%A9%20%22final%22.txt"));
        assert!(HeaderValue::from_str(&value).is_ok());
    }

    #[test]
    fn test_content_length_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(content_length(&headers), None);
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("42"));
        assert_eq!(content_length(&headers), Some(42));
    }
}
