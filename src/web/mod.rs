//! HTTP API for Sharebox.
//!
//! Thin axum layer over [`crate::share`]: each handler checks the transfer
//! gate, resolves its path inputs, then runs the filesystem work on a
//! blocking thread.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use handlers::AppState;
pub use router::{apply_layers, create_router};
pub use server::WebServer;
