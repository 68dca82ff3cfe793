//! 🐘 Catalog — the read-only window into the relational source of truth.
//!
//! 🎭 This module is the casting agency for "where do changed films come
//! from." The trait is the audition script; `PgCatalog` is the one that
//! actually got the part. Tests bring their own stand-ins.
//!
//! ## Knowledge Graph 🧠
//! - `Catalog::changed_film_ids` — the CHANGE DETECTOR. One call per entity
//!   kind per pass. Output: deduplicated film ids, order irrelevant, empty
//!   is fine (empty means "nothing to do," not "something is wrong").
//! - `Catalog::film_details` — the DOCUMENT ASSEMBLER. One bounded batch of
//!   ids in, at most that many [`FilmDocument`]s out. Ids whose film was
//!   deleted between detection and assembly vanish silently. That's the
//!   contract: omission, not error.
//!
//! ⚠️ Everything here is read-only. The pipeline never writes to the catalog.
//! The catalog has enough problems.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::common::{EntityKind, FilmDocument};
use crate::error::SyncError;

pub(crate) mod pg_catalog;
pub(crate) use pg_catalog::PgCatalog;

/// 🔍 A queryable film catalog: change detection plus document assembly.
///
/// The seam exists so the orchestrator can be tested against a catalog made
/// of vectors instead of a database made of regret.
#[async_trait]
pub(crate) trait Catalog {
    /// 📋 Film ids invalidated by `kind`-typed changes newer than `since`.
    ///
    /// For [`EntityKind::FilmWork`] that's the film's own timestamp; for
    /// genre/person it's the backward walk through the associative tables.
    /// Returned ids are unique. Zero matches is a perfectly good answer.
    async fn changed_film_ids(
        &self,
        kind: EntityKind,
        since: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, SyncError>;

    /// 📦 Assemble sink-ready documents for one bounded batch of film ids.
    ///
    /// Deleted films produce no document and no complaint. Malformed rows
    /// are a [`SyncError::RowShape`] — convert once, here, at the boundary.
    async fn film_details(&self, ids: &[Uuid]) -> Result<Vec<FilmDocument>, SyncError>;
}
