pub mod assets;
pub mod config;
pub mod handlers;
pub mod middleware;
pub mod observability;
pub mod pages;
pub mod server;
pub mod templates;

pub use config::{AppConfig, BackendConfig, LoggingConfig, ServerConfig};
pub use observability::init_tracing;
pub use pages::Page;
pub use server::{AppState, BoundServer, KetoanServer, ServerBuilder, build_app, build_router};
