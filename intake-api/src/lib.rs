//! intake-api library interface
//!
//! Franchise application intake: multipart submissions are transcoded into
//! a nested record, their files uploaded to object storage, and the result
//! stored in SQLite.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod intake;
pub mod server;
pub mod upload;

pub use crate::error::{ApiResult, IntakeError};

use std::sync::Arc;

use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::upload::{UploadPolicy, UploadSink};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Object storage for uploaded documents
    pub sink: Arc<dyn UploadSink>,
    /// Accept filter, size ceiling and destination folder
    pub uploads: UploadPolicy,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, sink: Arc<dyn UploadSink>, uploads: UploadPolicy) -> Self {
        Self {
            db,
            sink,
            uploads,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::health_routes())
        .merge(api::application_routes())
        .with_state(state)
}
