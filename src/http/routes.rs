//! REST and static routes served from the cache directory.
//!
//! | Route               | File                          |
//! |---------------------|-------------------------------|
//! | `GET /config`       | `<cache>/config.json`         |
//! | `GET /joboverview`  | `<cache>/joboverview.json`    |
//! | `GET /jobs/{*path}` | `<cache>/jobs/<path>.json`    |
//! | `GET /*`            | `<cache>/*` (static files)    |

use axum::{
    body::Body,
    extract::{Path as UrlPath, State},
    http::{header, HeaderName, Request, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::http::request::{request_id, MakeRequestUuid, X_REQUEST_ID};
use crate::observability::metrics;

/// State shared by the REST handlers.
#[derive(Clone)]
struct WebState {
    root: Arc<PathBuf>,
}

/// Build the router serving `static_root`.
pub fn build_router(static_root: &Path) -> Router {
    let state = WebState {
        root: Arc::new(static_root.to_path_buf()),
    };
    let x_request_id = HeaderName::from_static(X_REQUEST_ID);

    Router::new()
        .route("/config", get(get_config))
        .route("/joboverview", get(get_job_overview))
        .route("/jobs/{*path}", get(get_job_resource))
        .fallback_service(ServeDir::new(static_root).append_index_html_on_directories(true))
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                    tracing::info_span!(
                        "request",
                        method = %request.method(),
                        path = %request.uri().path(),
                        request_id = %request_id(request),
                    )
                }))
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
}

async fn get_config(State(state): State<WebState>) -> Response {
    serve_json(&state, "config", "config").await
}

async fn get_job_overview(State(state): State<WebState>) -> Response {
    serve_json(&state, "joboverview", "joboverview").await
}

async fn get_job_resource(State(state): State<WebState>, UrlPath(path): UrlPath<String>) -> Response {
    serve_json(&state, &format!("jobs/{path}"), "jobs").await
}

/// Map `relative` (slash separated, no extension) to its JSON file under `root`.
///
/// Returns `None` for paths that could leave `root`.
fn json_file(root: &Path, relative: &str) -> Option<PathBuf> {
    let segments: Vec<&str> = relative.split('/').filter(|s| !s.is_empty()).collect();
    let (last, parents) = segments.split_last()?;
    if segments
        .iter()
        .any(|s| *s == "." || *s == ".." || s.contains('\\'))
    {
        return None;
    }

    let mut file = root.to_path_buf();
    file.extend(parents);
    file.push(format!("{last}.json"));
    Some(file)
}

async fn serve_json(state: &WebState, relative: &str, route: &'static str) -> Response {
    let Some(file) = json_file(&state.root, relative) else {
        metrics::record_request(route, StatusCode::NOT_FOUND.as_u16());
        return not_found();
    };

    match tokio::fs::read(&file).await {
        Ok(bytes) => {
            metrics::record_request(route, StatusCode::OK.as_u16());
            (StatusCode::OK, [(header::CONTENT_TYPE, "application/json")], bytes).into_response()
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            metrics::record_request(route, StatusCode::NOT_FOUND.as_u16());
            not_found()
        }
        Err(e) => {
            tracing::error!(file = %file.display(), error = %e, "Failed to read cached file");
            metrics::record_request(route, StatusCode::INTERNAL_SERVER_ERROR.as_u16());
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "errors": ["Internal server error."] })),
            )
                .into_response()
        }
    }
}

fn not_found() -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(serde_json::json!({ "errors": ["File not found."] })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    fn cache_with_files() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("config.json"), r#"{"refresh-interval":10000}"#).unwrap();
        std::fs::write(dir.path().join("joboverview.json"), r#"{"running":[],"finished":[]}"#).unwrap();
        std::fs::create_dir_all(dir.path().join("jobs/abc")).unwrap();
        std::fs::write(dir.path().join("jobs/abc.json"), r#"{"jid":"abc"}"#).unwrap();
        std::fs::write(dir.path().join("jobs/abc/vertices.json"), "[]").unwrap();
        std::fs::write(dir.path().join("index.html"), "<html></html>").unwrap();
        dir
    }

    async fn get(router: &Router, uri: &str) -> Response {
        router
            .clone()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap()
    }

    async fn body_string(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_rest_routes() {
        let cache = cache_with_files();
        let router = build_router(cache.path());

        let response = get(&router, "/config").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
        assert!(response.headers().contains_key(X_REQUEST_ID));
        assert_eq!(body_string(response).await, r#"{"refresh-interval":10000}"#);

        let response = get(&router, "/joboverview").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = get(&router, "/jobs/abc").await;
        assert_eq!(body_string(response).await, r#"{"jid":"abc"}"#);

        let response = get(&router, "/jobs/abc/vertices").await;
        assert_eq!(body_string(response).await, "[]");
    }

    #[tokio::test]
    async fn test_missing_job_is_not_found() {
        let cache = cache_with_files();
        let router = build_router(cache.path());

        let response = get(&router, "/jobs/unknown").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(body_string(response).await.contains("File not found."));
    }

    #[tokio::test]
    async fn test_static_fallback() {
        let cache = cache_with_files();
        let router = build_router(cache.path());

        let response = get(&router, "/").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "<html></html>");

        let response = get(&router, "/nothing-here.js").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_client_request_id_is_propagated() {
        let cache = cache_with_files();
        let router = build_router(cache.path());

        let response = router
            .oneshot(
                Request::builder()
                    .uri("/config")
                    .header(X_REQUEST_ID, "client-id")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()[X_REQUEST_ID], "client-id");
    }

    #[test]
    fn test_json_file_rejects_traversal() {
        let root = Path::new("/cache");
        assert_eq!(json_file(root, "jobs/abc/vertices"), Some(PathBuf::from("/cache/jobs/abc/vertices.json")));
        assert_eq!(json_file(root, "jobs/abc/"), Some(PathBuf::from("/cache/jobs/abc.json")));
        assert_eq!(json_file(root, "jobs/../../etc/passwd"), None);
        assert_eq!(json_file(root, ""), None);
    }
}
