use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;

use axum::{
    Router,
    extract::State,
    middleware,
    routing::{get, post},
};
use ketoan_session::{
    MemorySessionStore, Session, SessionLayerState, session_middleware, spawn_sweeper,
};
use tower_http::{compression::CompressionLayer, trace::TraceLayer};

use crate::{
    assets, config::AppConfig, handlers, middleware as app_middleware, pages::PROTECTED_PAGES,
    templates::TemplateRenderer,
};

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub templates: Arc<TemplateRenderer>,
    pub sessions: SessionLayerState,
}

impl AppState {
    pub fn from_config(cfg: &AppConfig) -> anyhow::Result<Self> {
        let templates = TemplateRenderer::new(cfg.backend_url())?;
        let store = Arc::new(MemorySessionStore::new(cfg.session.expiry_policy()));
        Ok(Self {
            config: Arc::new(cfg.clone()),
            templates: Arc::new(templates),
            sessions: SessionLayerState::new(store, cfg.session.clone()),
        })
    }
}

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.server.body_limit_bytes;

    let mut protected = Router::new().route("/", get(handlers::index));
    for page in PROTECTED_PAGES {
        protected = protected.route(
            page.path(),
            get(
                move |State(state): State<AppState>, session: Session| async move {
                    handlers::render_page(&state, &session, page)
                },
            ),
        );
    }
    let protected = protected.route_layer(middleware::from_fn(app_middleware::require_login));

    Router::new()
        // Health endpoints
        .route("/healthz", get(handlers::healthz))
        .route("/readyz", get(handlers::readyz))
        // Public pages and session endpoints
        .route("/login", get(handlers::login).post(handlers::login))
        .route("/logout", get(handlers::logout))
        .route("/set-session", post(handlers::set_session))
        .route("/static/{*path}", get(assets::static_asset))
        .merge(protected)
        // Middleware stack, innermost first: session -> compression -> trace -> request id -> body limit
        .layer(middleware::from_fn_with_state(
            state.sessions.clone(),
            session_middleware,
        ))
        .layer(CompressionLayer::new())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &axum::http::Request<_>| {
                    use tracing::field::Empty;
                    // Skip creating a span for asset requests to avoid noisy logs
                    if req.uri().path().starts_with("/static/") {
                        return tracing::span!(tracing::Level::TRACE, "noop");
                    }
                    let method = req.method().clone();
                    let uri = req.uri().clone();
                    let req_id = req
                        .headers()
                        .get("x-request-id")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or("")
                        .to_string();
                    tracing::info_span!(
                        "http.request",
                        http.method = %method,
                        http.target = %uri,
                        http.status_code = Empty,
                        request_id = %req_id
                    )
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &tracing::Span| {
                        span.record(
                            "http.status_code",
                            tracing::field::display(res.status().as_u16()),
                        );
                        // Only the real request span emits an access log line.
                        if let Some(meta) = span.metadata()
                            && meta.name() != "noop"
                        {
                            tracing::info!(
                                http.status = %res.status().as_u16(),
                                elapsed_ms = %latency.as_millis(),
                                "request handled"
                            );
                        }
                    },
                ),
        )
        .layer(middleware::from_fn(app_middleware::request_id))
        .layer(axum::extract::DefaultBodyLimit::max(body_limit))
        .with_state(state)
}

pub fn build_app(cfg: &AppConfig) -> anyhow::Result<Router> {
    Ok(build_router(AppState::from_config(cfg)?))
}

pub struct KetoanServer {
    addr: SocketAddr,
    app: Router,
    state: AppState,
}

pub struct ServerBuilder {
    addr: SocketAddr,
    config: AppConfig,
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ServerBuilder {
    pub fn new() -> Self {
        let cfg = AppConfig::default();
        Self {
            addr: cfg.addr(),
            config: cfg,
        }
    }

    pub fn with_addr(mut self, addr: SocketAddr) -> Self {
        self.addr = addr;
        self
    }

    pub fn with_config(mut self, cfg: AppConfig) -> Self {
        self.addr = cfg.addr();
        self.config = cfg;
        self
    }

    pub fn build(self) -> anyhow::Result<KetoanServer> {
        let state = AppState::from_config(&self.config)?;
        let app = build_router(state.clone());

        Ok(KetoanServer {
            addr: self.addr,
            app,
            state,
        })
    }
}

impl KetoanServer {
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Bind the listening socket without serving yet.
    pub async fn bind(self) -> anyhow::Result<BoundServer> {
        let listener = tokio::net::TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("failed to bind {}", self.addr))?;
        Ok(BoundServer {
            listener,
            app: self.app,
            state: self.state,
        })
    }

    pub async fn run(self) -> anyhow::Result<()> {
        self.bind().await?.serve().await
    }
}

/// A server whose socket is bound; [`BoundServer::serve`] runs it until Ctrl+C.
pub struct BoundServer {
    listener: tokio::net::TcpListener,
    app: Router,
    state: AppState,
}

impl BoundServer {
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn serve(self) -> anyhow::Result<()> {
        tracing::info!("listening on {}", self.local_addr()?);

        let sweeper = spawn_sweeper(
            self.state.sessions.store().clone(),
            self.state.config.session.sweep_interval,
        );

        let served = axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        sweeper.abort();
        served?;
        Ok(())
    }
}

async fn shutdown_signal() {
    // Wait for Ctrl+C
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}
