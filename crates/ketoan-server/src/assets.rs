//! Embedded static assets served under `/static/`.

use axum::{
    extract::Path,
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
};
use include_dir::{Dir, include_dir};
use ketoan_api::ApiError;

static ASSETS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/static");

const CACHE_CONTROL: &str = "public, max-age=3600";

pub async fn static_asset(Path(path): Path<String>) -> Response {
    match lookup(&path) {
        Some((mime, body)) => (
            [
                (header::CONTENT_TYPE, mime),
                (header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL)),
            ],
            body,
        )
            .into_response(),
        None => {
            tracing::debug!(path = %path, "Static asset not found");
            ApiError::not_found(format!("Asset '{path}' not found")).into_response()
        }
    }
}

fn lookup(path: &str) -> Option<(HeaderValue, &'static [u8])> {
    let path = path.trim_start_matches('/');
    if path.is_empty() || path.split('/').any(|segment| segment == "..") {
        return None;
    }
    let file = ASSETS.get_file(path)?;
    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let mime = HeaderValue::from_str(mime.as_ref())
        .unwrap_or_else(|_| HeaderValue::from_static("application/octet-stream"));
    Some((mime, file.contents()))
}
