//! 🎬 cvx — incremental sync from a Postgres movie catalog to Elasticsearch.
//!
//! Three entity types (film_work, genre, person), three durable cursors,
//! one denormalized document per film, at-least-once delivery made harmless
//! by idempotent bulk upserts. The CLI loads config and calls [`run`];
//! everything else is this crate's business.

pub mod app_config;
mod catalog;
mod common;
mod cursor;
mod error;
mod orchestrator;
mod queries;
mod retry;
mod scheduler;
mod sink;

pub use common::{EntityKind, FilmDocument, PersonRef};
pub use error::{FaultKind, SyncError};

use anyhow::{Context, Result};

/// 🚀 Run the sync loop with the given configuration. Does not return unless
/// a bounded retry policy is configured and exhausted — this is a daemon,
/// not an errand.
pub async fn run(config: app_config::AppConfig) -> Result<()> {
    scheduler::run(config)
        .await
        .context("💀 the sync loop came to an unscheduled stop")
}
