//! Server-side browser sessions.
//!
//! A session is addressed by an opaque UUID carried in a cookie; its data
//! (`user_id`, optional `username`, pending flash messages) lives in a
//! [`SessionStore`]. The [`layer::session_middleware`] loads the session
//! before the handler runs and commits it afterwards, so handlers only work
//! with the [`Session`] handle.

pub mod config;
pub mod error;
pub mod handle;
pub mod layer;
pub mod store;
pub mod sweeper;
pub mod types;

pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use handle::Session;
pub use layer::{SessionLayerState, session_middleware};
pub use store::{ExpiryPolicy, MemorySessionStore, SessionStore};
pub use sweeper::spawn_sweeper;
pub use types::{Flash, FlashCategory, SessionData, SessionId, SessionRecord};
