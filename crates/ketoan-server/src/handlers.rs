use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    response::{Html, IntoResponse, Redirect},
};
use ketoan_api::{Ack, ApiError, ApiResult};
use ketoan_session::{FlashCategory, Session};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::pages::Page;
use crate::server::AppState;
use crate::templates::PageContext;

pub const LOGGED_OUT_MESSAGE: &str = "Bạn đã đăng xuất thành công";

#[derive(Serialize)]
pub struct HealthResponse<'a> {
    status: &'a str,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

/// Ready once the session store answers.
pub async fn readyz(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    state.sessions.store().count().await.map_err(|e| {
        tracing::error!(error = %e, "Session store not ready");
        ApiError::internal(e.to_string())
    })?;
    Ok((StatusCode::OK, Json(HealthResponse { status: "ready" })))
}

// ---- Pages ----

/// `/`: logged-in users land on the general diary.
pub async fn index() -> Redirect {
    Redirect::to(Page::HOME.path())
}

/// Login form. Credentials are checked by the backend from client-side
/// script, so a POST renders the same page.
pub async fn login(State(state): State<AppState>, session: Session) -> ApiResult<Html<String>> {
    render_page(&state, &session, Page::Login)
}

pub async fn logout(session: Session) -> Redirect {
    if let Some(user_id) = session.user_id() {
        tracing::info!(user_id = %user_id, "User logged out");
    }
    session.clear();
    session.flash(FlashCategory::Success, LOGGED_OUT_MESSAGE);
    Redirect::to(Page::Login.path())
}

/// Render a page template, consuming the session's pending flashes.
pub fn render_page(state: &AppState, session: &Session, page: Page) -> ApiResult<Html<String>> {
    let ctx = PageContext {
        username: session.username(),
        flashes: session.take_flashes(),
    };
    state.templates.render(page, &ctx).map(Html).map_err(|e| {
        tracing::error!(template = %page.template(), error = %e, "Failed to render template");
        ApiError::internal(format!("failed to render {}", page.template()))
    })
}

// ---- Session establishment ----

/// Body of `POST /set-session`, sent by the login script once the backend
/// accepted the credentials.
#[derive(Debug, Deserialize)]
pub struct SetSessionInput {
    #[serde(default)]
    pub user_id: Option<Value>,
    #[serde(default)]
    pub username: Option<String>,
}

pub async fn set_session(
    session: Session,
    payload: Result<Json<SetSessionInput>, JsonRejection>,
) -> ApiResult<Ack> {
    let Json(input) = payload.map_err(|e| {
        tracing::debug!(error = %e, "Rejected session payload");
        ApiError::from(e)
    })?;

    let user_id = normalize_user_id(input.user_id)?;
    let username = input
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    tracing::info!(user_id = %user_id, username = ?username, "Session established");
    session.establish(user_id, username);

    Ok(Ack::ok("Session established"))
}

/// Accept string or numeric ids; the backend uses integer keys but the
/// session keeps them as strings.
fn normalize_user_id(raw: Option<Value>) -> ApiResult<String> {
    match raw {
        None | Some(Value::Null) => Err(ApiError::bad_request("user_id is required")),
        Some(Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                Err(ApiError::bad_request("user_id is required"))
            } else {
                Ok(s.to_string())
            }
        }
        Some(Value::Number(n)) => Ok(n.to_string()),
        Some(_) => Err(ApiError::bad_request(
            "user_id must be a string or a number",
        )),
    }
}
