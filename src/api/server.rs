//! HTTP server implementation for the API

use anyhow::Result;
use axum::{
    extract::{Multipart, State},
    http::{header, Method, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use std::path::Path;
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, warn};

use super::models::CompareResponse;
use crate::config::Config;
use crate::pipeline::Pipeline;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
    pub config: Arc<Config>,
}

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>clipseek</title></head>
<body>
  <h1>clipseek</h1>
  <p>Upload a video to search for it inside the reference library.</p>
  <form method="post" action="/api/compare" enctype="multipart/form-data">
    <input type="file" name="video" accept="video/*" required>
    <button type="submit">Compare</button>
  </form>
</body>
</html>
"#;

/// Configure and start the HTTP server
pub async fn start_http_server(
    pipeline: Arc<Pipeline>,
    config: Arc<Config>,
    port: u16,
) -> Result<()> {
    info!("🚀 Starting HTTP server on port {}", port);

    let app_state = AppState { pipeline, config };

    // Configure CORS to allow browser access
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    let app = Router::new()
        .route("/", get(index_handler))
        .route("/health", get(health_handler))
        .route("/api/compare", post(compare_handler))
        .with_state(app_state)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()).layer(cors));

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;
    info!("🌐 API server listening on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

async fn index_handler() -> impl IntoResponse {
    Html(INDEX_HTML)
}

/// Health check handler
async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "clipseek",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Accept an uploaded query video, run the comparison, and return every
/// matched time range.
async fn compare_handler(State(state): State<AppState>, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, &format!("bad upload: {}", e))
            }
        };

        if field.name() != Some("video") {
            continue;
        }

        let file_name = field
            .file_name()
            .map(sanitize_filename)
            .unwrap_or_else(|| "upload.mp4".to_string());

        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => {
                return error_response(StatusCode::BAD_REQUEST, &format!("bad upload: {}", e))
            }
        };

        if data.is_empty() {
            return error_response(StatusCode::BAD_REQUEST, "no file selected");
        }

        let upload_dir = &state.config.library.upload_dir;
        if let Err(e) = tokio::fs::create_dir_all(upload_dir).await {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
        }
        let save_path = upload_dir.join(&file_name);
        if let Err(e) = tokio::fs::write(&save_path, &data).await {
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string());
        }

        info!("📥 Comparing uploaded video: {}", save_path.display());

        return match state.pipeline.compare(&save_path).await {
            Ok(results) => (StatusCode::OK, Json(CompareResponse::from_results(results)))
                .into_response(),
            Err(e) => {
                warn!("Comparison failed for {}: {}", save_path.display(), e);
                error_response(StatusCode::UNPROCESSABLE_ENTITY, &e.to_string())
            }
        };
    }

    error_response(StatusCode::BAD_REQUEST, "no file part in the request")
}

fn error_response(status: StatusCode, message: &str) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

/// Keep only the final path component of a client-supplied file name.
fn sanitize_filename(name: &str) -> String {
    Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "upload.mp4".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("clip.mp4"), "clip.mp4");
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("dir/clip.mp4"), "clip.mp4");
    }
}
