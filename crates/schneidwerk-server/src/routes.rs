// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// HTTP routes.
//
// This layer only moves bytes between HTTP and the engine: multipart
// extraction, size enforcement, and response framing.  All split/validation
// logic lives behind the engine.

use std::convert::Infallible;
use std::path::Path;

use axum::Router;
use axum::body::{Body, Bytes};
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use schneidwerk_core::error::SchneidwerkError;
use schneidwerk_document::RepairOutcome;
use schneidwerk_service::{ArchivePackager, MultipartPackager, SplitProduct};

use crate::state::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    // Allow multipart framing overhead on top of the document cap.
    let body_limit = state.engine.config().max_upload_bytes() as usize + 1024 * 1024;

    Router::new()
        .route("/v1/split", post(split))
        .route("/v1/validate", post(validate))
        .route("/v1/repair", post(repair))
        .route("/v1/health", get(health))
        .route("/v1/healthz", get(health))
        .route("/v1/ready", get(ready))
        .route("/v1/readyz", get(ready))
        .route("/metrics", get(metrics))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct SplitQuery {
    /// `zip` switches the response from multipart/mixed to a ZIP archive.
    format: Option<String>,
}

async fn split(
    State(state): State<AppState>,
    Query(query): Query<SplitQuery>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let upload = Upload::read(multipart, &state).await?;
    let stem = upload.stem();

    let product = state
        .engine
        .split(upload.bytes, upload.separators, upload.filename.clone())
        .await?;

    match query.format.as_deref() {
        Some("zip") => zip_response(&stem, product),
        _ => multipart_response(&stem, product),
    }
}

async fn validate(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Json<schneidwerk_core::types::ValidationReport>, ApiError> {
    let upload = Upload::read(multipart, &state).await?;
    let report = state.engine.validate(upload.bytes).await?;
    Ok(Json(report))
}

async fn repair(
    State(state): State<AppState>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let upload = Upload::read(multipart, &state).await?;
    let stem = upload.stem();

    match state.engine.repair(upload.bytes).await? {
        RepairOutcome::Repaired(document) => Response::builder()
            .header(header::CONTENT_TYPE, "application/pdf")
            .header(
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{stem}_repaired.pdf\""),
            )
            .body(Body::from(document.into_bytes()))
            .map_err(ApiError::internal),
        RepairOutcome::Failed { reason } => Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("repair failed: {reason}"),
        )),
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({"status": "ok"}))
}

async fn ready() -> StatusCode {
    StatusCode::NO_CONTENT
}

async fn metrics(State(state): State<AppState>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
        .into_response()
}

// ---------------------------------------------------------------------------
// Upload extraction
// ---------------------------------------------------------------------------

/// The fields of a document upload form.
struct Upload {
    filename: String,
    bytes: Vec<u8>,
    separators: String,
}

impl Upload {
    /// Pull the `file` and optional `separators` fields out of the form and
    /// enforce the configured byte cap.
    async fn read(mut multipart: Multipart, state: &AppState) -> Result<Self, ApiError> {
        let mut file: Option<(String, Vec<u8>)> = None;
        let mut separators = String::new();

        while let Some(field) = multipart.next_field().await.map_err(|err| {
            ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("invalid multipart body: {err}"),
            )
        })? {
            match field.name() {
                Some("file") => {
                    let filename = field
                        .file_name()
                        .unwrap_or("document.pdf")
                        .to_string();
                    let bytes = field.bytes().await.map_err(|err| {
                        ApiError::new(
                            StatusCode::UNPROCESSABLE_ENTITY,
                            format!("failed to read file field: {err}"),
                        )
                    })?;
                    file = Some((filename, bytes.to_vec()));
                }
                Some("separators") => {
                    separators = field.text().await.map_err(|err| {
                        ApiError::new(
                            StatusCode::UNPROCESSABLE_ENTITY,
                            format!("failed to read separators field: {err}"),
                        )
                    })?;
                }
                _ => {
                    // Drain unknown fields so the stream stays consumable.
                    let _ = field.bytes().await;
                }
            }
        }

        let Some((filename, bytes)) = file else {
            return Err(ApiError::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                "missing file field".to_string(),
            ));
        };

        if bytes.len() as u64 > state.engine.config().max_upload_bytes() {
            return Err(ApiError::new(
                StatusCode::PAYLOAD_TOO_LARGE,
                "file too large".to_string(),
            ));
        }

        debug!(%filename, bytes_len = bytes.len(), "upload received");
        Ok(Self {
            filename,
            bytes,
            separators,
        })
    }

    /// Upload filename without its extension.
    fn stem(&self) -> String {
        Path::new(&self.filename)
            .file_stem()
            .and_then(|stem| stem.to_str())
            .unwrap_or("document")
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// Response framing
// ---------------------------------------------------------------------------

/// Stream the parts as multipart/mixed.
///
/// The artifact guard rides at the tail of the stream: it is disarmed only
/// after the last chunk goes out, so a consumer that disconnects mid-stream
/// drops it armed and the published artifact is reclaimed immediately.
fn multipart_response(stem: &str, product: SplitProduct) -> Result<Response, ApiError> {
    let packager = MultipartPackager::new();
    let content_type = packager.content_type();

    let (parts, guard) = product.into_parts_and_guard();
    let chunks = packager.chunks(stem, parts);

    let stream = futures::stream::iter(
        chunks.map(|chunk| Ok::<Bytes, Infallible>(Bytes::from(chunk))),
    )
    .chain(futures::stream::once(async move {
        guard.disarm();
        Ok(Bytes::new())
    }));

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_DISPOSITION, "inline")
        .body(Body::from_stream(stream))
        .map_err(ApiError::internal)
}

/// Pack the parts into a single ZIP download.
fn zip_response(stem: &str, product: SplitProduct) -> Result<Response, ApiError> {
    let (parts, guard) = product.into_parts_and_guard();
    let archive = ArchivePackager::package(&parts)?;
    guard.disarm();

    Response::builder()
        .header(header::CONTENT_TYPE, "application/zip")
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{stem}_parts.zip\""),
        )
        .body(Body::from(archive))
        .map_err(ApiError::internal)
}

// ---------------------------------------------------------------------------
// Error envelope
// ---------------------------------------------------------------------------

/// JSON error response: `{"error": <detail>, "code": <status>}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    fn new(status: StatusCode, message: String) -> Self {
        Self { status, message }
    }

    fn internal(err: impl std::fmt::Display) -> Self {
        error!(%err, "internal error while building response");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    }
}

impl From<SchneidwerkError> for ApiError {
    fn from(err: SchneidwerkError) -> Self {
        let status = match &err {
            SchneidwerkError::DocumentCorrupt(_) => StatusCode::BAD_REQUEST,
            SchneidwerkError::PageLimit { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            SchneidwerkError::Pdf(_) => StatusCode::BAD_REQUEST,
            SchneidwerkError::Archive(_)
            | SchneidwerkError::Storage(_)
            | SchneidwerkError::Io(_)
            | SchneidwerkError::Serialization(_)
            | SchneidwerkError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        if status.is_server_error() {
            error!(%err, "request failed");
        }
        Self::new(status, err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": self.message,
            "code": self.status.as_u16(),
        }));
        (self.status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::http::Request;
    use lopdf::{Document, Object, dictionary};
    use tower::util::ServiceExt;

    use schneidwerk_core::config::ServiceConfig;
    use schneidwerk_core::metrics::MetricsSink;
    use schneidwerk_service::Engine;

    use crate::metrics::PrometheusMetrics;

    /// Minimal blank-page PDF, enough for routing tests.
    fn tiny_pdf(pages: usize) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let mut kids: Vec<Object> = Vec::with_capacity(pages);
        for _ in 0..pages {
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            });
            kids.push(page_id.into());
        }
        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        let mut out = Vec::new();
        doc.save_to(&mut out).expect("serialize");
        out
    }

    fn test_router(temp_root: &std::path::Path) -> Router {
        let config = ServiceConfig {
            temp_dir: temp_root.to_path_buf(),
            ..ServiceConfig::default()
        };
        let metrics = Arc::new(PrometheusMetrics::new().expect("metrics"));
        let engine = Arc::new(
            Engine::new(config, Arc::clone(&metrics) as Arc<dyn MetricsSink>).expect("engine"),
        );
        router(AppState { engine, metrics })
    }

    /// Hand-built multipart/form-data body with a file and separators field.
    fn upload_request(uri: &str, pdf: &[u8], separators: &str) -> Request<Body> {
        let boundary = "test-boundary-7349";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\n\
                 Content-Disposition: form-data; name=\"file\"; filename=\"sample.pdf\"\r\n\
                 Content-Type: application/pdf\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(pdf);
        body.extend_from_slice(
            format!(
                "\r\n--{boundary}\r\n\
                 Content-Disposition: form-data; name=\"separators\"\r\n\r\n\
                 {separators}\r\n\
                 --{boundary}--\r\n"
            )
            .as_bytes(),
        );

        Request::builder()
            .method("POST")
            .uri(uri)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    async fn body_bytes(response: Response) -> Vec<u8> {
        axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("read body")
            .to_vec()
    }

    #[tokio::test]
    async fn health_reports_ok() {
        let root = tempfile::tempdir().expect("tempdir");
        let response = test_router(root.path())
            .oneshot(Request::get("/v1/health").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_bytes(response).await;
        assert_eq!(
            serde_json::from_slice::<serde_json::Value>(&body).expect("json"),
            json!({"status": "ok"})
        );
    }

    #[tokio::test]
    async fn ready_is_no_content() {
        let root = tempfile::tempdir().expect("tempdir");
        let response = test_router(root.path())
            .oneshot(Request::get("/v1/readyz").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn split_returns_a_multipart_stream() {
        let root = tempfile::tempdir().expect("tempdir");
        let response = test_router(root.path())
            .oneshot(upload_request("/v1/split", &tiny_pdf(3), "[2]"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("multipart/mixed; boundary="));

        let body = String::from_utf8_lossy(&body_bytes(response).await).to_string();
        assert!(body.contains("filename=\"sample_part1.pdf\""));
        assert!(body.contains("filename=\"sample_part2.pdf\""));
    }

    #[tokio::test]
    async fn split_zip_mode_returns_an_archive() {
        let root = tempfile::tempdir().expect("tempdir");
        let response = test_router(root.path())
            .oneshot(upload_request("/v1/split?format=zip", &tiny_pdf(3), "[2]"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_bytes(response).await;
        // ZIP local-file-header magic.
        assert_eq!(&body[..4], b"PK\x03\x04");
    }

    #[tokio::test]
    async fn corrupt_document_maps_to_bad_request_with_an_error_envelope() {
        let root = tempfile::tempdir().expect("tempdir");
        let response = test_router(root.path())
            .oneshot(upload_request("/v1/split", b"not a pdf", "[2]"))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body: serde_json::Value =
            serde_json::from_slice(&body_bytes(response).await).expect("json");
        assert_eq!(body["code"], 400);
        assert!(body["error"].as_str().unwrap_or_default().contains("corrupt"));
    }

    #[tokio::test]
    async fn missing_file_field_is_unprocessable() {
        let root = tempfile::tempdir().expect("tempdir");
        let boundary = "test-boundary-7349";
        let body = format!(
            "--{boundary}\r\n\
             Content-Disposition: form-data; name=\"separators\"\r\n\r\n\
             [2]\r\n\
             --{boundary}--\r\n"
        );
        let request = Request::builder()
            .method("POST")
            .uri("/v1/split")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .expect("request");

        let response = test_router(root.path())
            .oneshot(request)
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn validate_returns_a_report() {
        let root = tempfile::tempdir().expect("tempdir");
        let response = test_router(root.path())
            .oneshot(upload_request("/v1/validate", &tiny_pdf(1), ""))
            .await
            .expect("response");

        assert_eq!(response.status(), StatusCode::OK);
        let report: serde_json::Value =
            serde_json::from_slice(&body_bytes(response).await).expect("json");
        assert_eq!(report["is_valid"], true);
        assert_eq!(report["page_count"], 1);
    }

    #[tokio::test]
    async fn metrics_endpoint_exposes_split_counters() {
        let root = tempfile::tempdir().expect("tempdir");
        let app = test_router(root.path());

        let split = app
            .clone()
            .oneshot(upload_request("/v1/split", &tiny_pdf(3), "[2]"))
            .await
            .expect("split response");
        assert_eq!(split.status(), StatusCode::OK);
        // Drain the stream so the request fully completes.
        let _ = body_bytes(split).await;

        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).expect("request"))
            .await
            .expect("response");
        let text = String::from_utf8_lossy(&body_bytes(response).await).to_string();
        assert!(text.contains("split_pages_total 3"));
        assert!(text.contains("split_duration_seconds"));
    }
}
