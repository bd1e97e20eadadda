use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use ketoan_session::{FlashCategory, Session};
use uuid::Uuid;

use crate::pages::Page;

pub const LOGIN_REQUIRED_MESSAGE: &str = "Vui lòng đăng nhập để tiếp tục";

// =============================================================================
// Login guard
// =============================================================================

/// Lets the request through only when the session carries a `user_id`.
///
/// Anonymous visitors get an error flash and a redirect to the login page.
/// Must run inside the session layer.
pub async fn require_login(session: Session, req: Request<Body>, next: Next) -> Response {
    if session.is_authenticated() {
        return next.run(req).await;
    }

    tracing::debug!(path = %req.uri().path(), "No user in session, redirecting to login");
    session.flash(FlashCategory::Error, LOGIN_REQUIRED_MESSAGE);
    Redirect::to(Page::Login.path()).into_response()
}

// =============================================================================
// Other Middleware
// =============================================================================

// Middleware that ensures each request has an X-Request-Id and mirrors it on the response
pub async fn request_id(mut req: Request<Body>, next: Next) -> Response {
    let header_name = HeaderName::from_static("x-request-id");

    // If the incoming request already has a request-id, preserve it; otherwise generate one
    let req_id_value = match req.headers().get(&header_name) {
        Some(v) => v.clone(),
        None => {
            let id = Uuid::new_v4().to_string();
            match HeaderValue::from_str(&id) {
                Ok(v) => v,
                Err(_) => return next.run(req).await,
            }
        }
    };

    // Make it visible to the trace span and to handlers
    req.headers_mut()
        .insert(header_name.clone(), req_id_value.clone());
    req.extensions_mut().insert(req_id_value.clone());

    let mut res = next.run(req).await;

    // Add/propagate the request id header to response
    res.headers_mut().insert(header_name, req_id_value);

    res
}
