//! Courier-RS Library
//!
//! Notification dispatch over pluggable channels with a redis or in-memory
//! job queue, delayed retries and a long-running queue worker.

use shadow_rs::shadow;
shadow!(build);

pub mod cli;
pub mod config;
pub mod error;
pub mod logger;
pub mod notifications;
pub mod queue;
pub mod state;

pub use error::{AppError, AppResult};
pub use state::AppState;

pub fn pkg_version() -> &'static str {
    build::PKG_VERSION
}

pub fn clap_long_version() -> &'static str {
    build::CLAP_LONG_VERSION
}
