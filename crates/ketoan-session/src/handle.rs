//! Per-request session handle.

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use ketoan_api::ApiError;
use parking_lot::Mutex;
use time::OffsetDateTime;

use crate::types::{Flash, FlashCategory, SessionData, SessionId};

/// Mutable view of the current browser session.
///
/// Cloning is cheap and every clone refers to the same request-scoped state,
/// which the session layer commits once the handler has produced a response.
#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionState>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SessionState {
    /// Id the request arrived with, if it named a live session.
    pub(crate) id: Option<SessionId>,
    pub(crate) created_at: Option<OffsetDateTime>,
    pub(crate) data: SessionData,
    pub(crate) modified: bool,
    /// Issue a fresh id on commit and drop the old record.
    pub(crate) rotate: bool,
}

impl Session {
    /// A session that did not exist before this request.
    pub fn fresh() -> Self {
        Self::from_state(SessionState {
            id: None,
            created_at: None,
            data: SessionData::default(),
            modified: false,
            rotate: false,
        })
    }

    pub(crate) fn existing(id: SessionId, created_at: OffsetDateTime, data: SessionData) -> Self {
        Self::from_state(SessionState {
            id: Some(id),
            created_at: Some(created_at),
            data,
            modified: false,
            rotate: false,
        })
    }

    fn from_state(state: SessionState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    pub(crate) fn snapshot(&self) -> SessionState {
        self.inner.lock().clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.inner.lock().data.user_id.clone()
    }

    pub fn username(&self) -> Option<String> {
        self.inner.lock().data.username.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.lock().data.user_id.is_some()
    }

    /// Bind the session to a user. The session id is rotated on commit.
    pub fn establish(&self, user_id: impl Into<String>, username: Option<String>) {
        let mut state = self.inner.lock();
        state.data.user_id = Some(user_id.into());
        state.data.username = username;
        state.modified = true;
        state.rotate = true;
    }

    /// Forget everything in the session, pending flashes included.
    pub fn clear(&self) {
        let mut state = self.inner.lock();
        state.data = SessionData::default();
        state.modified = true;
        state.rotate = true;
    }

    /// Queue a message for the next rendered page.
    pub fn flash(&self, category: FlashCategory, message: impl Into<String>) {
        let mut state = self.inner.lock();
        state.data.flashes.push(Flash::new(category, message));
        state.modified = true;
    }

    /// Remove and return the queued flash messages.
    pub fn take_flashes(&self) -> Vec<Flash> {
        let mut state = self.inner.lock();
        if state.data.flashes.is_empty() {
            return Vec::new();
        }
        state.modified = true;
        std::mem::take(&mut state.data.flashes)
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts.extensions.get::<Session>().cloned().ok_or_else(|| {
            tracing::error!("Session extractor used on a route without the session layer");
            ApiError::internal("session layer is not installed")
        })
    }
}
