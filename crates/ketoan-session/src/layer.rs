//! Session middleware: load before the handler, commit after it.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};
use ketoan_api::ApiError;
use time::{Duration, OffsetDateTime};

use crate::config::SessionConfig;
use crate::error::SessionResult;
use crate::handle::{Session, SessionState};
use crate::store::SessionStore;
use crate::types::{SessionId, SessionRecord};

/// State required by [`session_middleware`].
#[derive(Clone)]
pub struct SessionLayerState {
    store: Arc<dyn SessionStore>,
    config: SessionConfig,
}

/// What has to happen to the stored record once the handler is done.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum CommitPlan {
    Nothing,
    Touch(SessionId),
    Destroy(SessionId),
    Save {
        id: SessionId,
        replaces: Option<SessionId>,
        created_at: Option<OffsetDateTime>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CookieAction {
    Set(SessionId),
    Remove,
    Keep,
}

pub(crate) fn plan_commit(state: &SessionState) -> CommitPlan {
    if state.data.is_empty() {
        return match state.id {
            Some(id) => CommitPlan::Destroy(id),
            None => CommitPlan::Nothing,
        };
    }

    if !state.modified {
        return match state.id {
            Some(id) => CommitPlan::Touch(id),
            None => CommitPlan::Nothing,
        };
    }

    match state.id {
        Some(id) if !state.rotate => CommitPlan::Save {
            id,
            replaces: None,
            created_at: state.created_at,
        },
        previous => CommitPlan::Save {
            id: SessionId::generate(),
            replaces: previous,
            created_at: None,
        },
    }
}

impl SessionLayerState {
    pub fn new(store: Arc<dyn SessionStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn SessionStore> {
        &self.store
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Resolve the session named by the request cookie.
    ///
    /// Returns the session and whether the cookie pointed at nothing usable.
    async fn load(&self, jar: &CookieJar) -> (Session, bool) {
        let Some(raw) = jar.get(&self.config.cookie_name).map(|c| c.value().to_string()) else {
            return (Session::fresh(), false);
        };

        let Ok(id) = raw.parse::<SessionId>() else {
            tracing::debug!("Ignoring malformed session cookie");
            return (Session::fresh(), true);
        };

        match self.store.load(&id).await {
            Ok(Some(record)) => (Session::existing(id, record.created_at, record.data), false),
            Ok(None) => (Session::fresh(), true),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load session, starting a new one");
                (Session::fresh(), true)
            }
        }
    }

    async fn commit(&self, session: &Session) -> SessionResult<CookieAction> {
        let state = session.snapshot();
        let now = OffsetDateTime::now_utc();

        match plan_commit(&state) {
            CommitPlan::Nothing => Ok(CookieAction::Keep),
            CommitPlan::Touch(id) => {
                self.store.touch(&id, now).await?;
                Ok(CookieAction::Keep)
            }
            CommitPlan::Destroy(id) => {
                self.store.delete(&id).await?;
                tracing::debug!(session_id = %id, "Session destroyed");
                Ok(CookieAction::Remove)
            }
            CommitPlan::Save {
                id,
                replaces,
                created_at,
            } => {
                if let Some(old) = replaces {
                    self.store.delete(&old).await?;
                }
                let record = SessionRecord {
                    data: state.data,
                    created_at: created_at.unwrap_or(now),
                    last_activity_at: now,
                };
                self.store.save(&id, record).await?;
                if state.id == Some(id) {
                    Ok(CookieAction::Keep)
                } else {
                    Ok(CookieAction::Set(id))
                }
            }
        }
    }

    fn session_cookie(&self, id: SessionId) -> Cookie<'static> {
        let secs = i64::try_from(self.config.absolute_timeout.as_secs()).unwrap_or(i64::MAX);
        let max_age = Duration::seconds(secs);

        Cookie::build((self.config.cookie_name.clone(), id.to_string()))
            .http_only(true)
            .secure(self.config.secure_cookies)
            .same_site(SameSite::Lax)
            .path("/")
            .max_age(max_age)
            .build()
    }

    fn removal_cookie(&self) -> Cookie<'static> {
        Cookie::build((self.config.cookie_name.clone(), "")).path("/").build()
    }
}

/// Session middleware.
///
/// Inserts a [`Session`] into the request extensions, runs the handler, then
/// persists whatever the handler changed and updates the cookie:
///
/// - empty session: the record is deleted and the cookie expired;
/// - changed session: the record is saved, under a new id when rotation
///   was requested, and the cookie is set;
/// - unchanged session: only its activity timestamp is refreshed.
pub async fn session_middleware(
    State(state): State<SessionLayerState>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let (session, stale_cookie) = state.load(&jar).await;
    req.extensions_mut().insert(session.clone());

    let response = next.run(req).await;

    match state.commit(&session).await {
        Ok(CookieAction::Set(id)) => (jar.add(state.session_cookie(id)), response).into_response(),
        Ok(CookieAction::Remove) => (jar.remove(state.removal_cookie()), response).into_response(),
        Ok(CookieAction::Keep) if stale_cookie => {
            (jar.remove(state.removal_cookie()), response).into_response()
        }
        Ok(CookieAction::Keep) => response,
        Err(e) => {
            tracing::error!(error = %e, "Failed to commit session");
            ApiError::internal(e.to_string()).into_response()
        }
    }
}
