//! 🐘 PgCatalog — the Postgres implementation of the catalog seam.
//!
//! 🎬 COLD OPEN — INT. CONNECTION POOL — 3:12 AM
//!
//! A `tokio_postgres::Connection` hums on its own task, shoveling bytes so
//! the `Client` can live its best async life. If the task dies, the client's
//! next query returns an error and the outer retry loop handles the grief.
//! This is fine. This is the design. The driver task is the roommate who
//! pays rent in TCP frames.
//!
//! Change-set rows are STREAMED, not slurped: a first full backfill can be
//! every film ever written, and collecting that into one Vec before looking
//! at it is how processes get OOM-killed with their whole life ahead of
//! them. `query_raw` gives us rows one at a time and we count them off in
//! pages of `page_size` for the logs.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::{TryStreamExt, pin_mut};
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use super::Catalog;
use crate::app_config::CatalogConfig;
use crate::common::{EntityKind, FilmDocument, PersonRef};
use crate::error::SyncError;
use crate::queries;

/// 🔄 The `query_raw` parameter dance, as blessed by the tokio-postgres docs.
fn slice_iter<'a>(
    s: &'a [&'a (dyn ToSql + Sync)],
) -> impl ExactSizeIterator<Item = &'a dyn ToSql> + 'a {
    s.iter().map(|s| *s as _)
}

/// 🐘 A connected, read-only view of the `content` schema.
pub(crate) struct PgCatalog {
    client: tokio_postgres::Client,
    page_size: usize,
}

impl PgCatalog {
    /// 🚀 Connect to the catalog and spawn the connection driver task.
    ///
    /// Returns the catalog AND the driver's `JoinHandle`. The caller owns the
    /// handle and MUST abort it on every exit path — connections are scoped
    /// resources here, not pets. The scheduler does this; see `scheduler.rs`.
    pub(crate) async fn connect(
        config: &CatalogConfig,
        page_size: usize,
    ) -> Result<(Self, tokio::task::JoinHandle<()>), SyncError> {
        let conn_string = format!(
            "host={} port={} user={} password={} dbname={}",
            config.host, config.port, config.user, config.password, config.dbname
        );
        let (client, connection) = tokio_postgres::connect(&conn_string, NoTls)
            .await
            .map_err(SyncError::CatalogConnection)?;

        // 🧵 The driver hums along until the pass ends or the socket doesn't.
        // An error here surfaces on the client side as a failed query, so we
        // log it and let the pass boundary do the actual mourning.
        let driver = tokio::spawn(async move {
            if let Err(err) = connection.await {
                warn!("🐘 catalog connection driver exited with: {err}");
            }
        });

        debug!(host = %config.host, dbname = %config.dbname, "🐘 catalog connected");
        Ok((Self { client, page_size }, driver))
    }
}

#[async_trait::async_trait]
impl Catalog for PgCatalog {
    async fn changed_film_ids(
        &self,
        kind: EntityKind,
        since: DateTime<Utc>,
    ) -> Result<Vec<Uuid>, SyncError> {
        let params: &[&(dyn ToSql + Sync)] = &[&since];
        let stream = self
            .client
            .query_raw(queries::changes_sql(kind), slice_iter(params))
            .await
            .map_err(SyncError::CatalogQuery)?;
        pin_mut!(stream);

        // 🪪 GROUP BY already dedups the linked-film queries server-side;
        // the seen-set makes the guarantee unconditional for every kind.
        let mut seen = HashSet::new();
        let mut ids = Vec::new();
        let mut drained = 0usize;
        while let Some(row) = stream.try_next().await.map_err(SyncError::CatalogQuery)? {
            let id: Uuid = row
                .try_get(0)
                .map_err(|err| SyncError::RowShape(format!("change row without a film id: {err}")))?;
            if seen.insert(id) {
                ids.push(id);
            }
            drained += 1;
            if drained % self.page_size == 0 {
                trace!(kind = %kind, drained, "🔄 change-set page drained");
            }
        }

        debug!(kind = %kind, changed = ids.len(), "🔍 change detection complete");
        Ok(ids)
    }

    async fn film_details(&self, ids: &[Uuid]) -> Result<Vec<FilmDocument>, SyncError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        // One aggregate query per batch — the ids ride in as a uuid[].
        // A film deleted since detection simply yields no row, and that's
        // the last anyone speaks of it.
        let rows = self
            .client
            .query(queries::FILM_DETAILS, &[&ids])
            .await
            .map_err(SyncError::CatalogQuery)?;

        rows.into_iter().map(row_to_document).collect()
    }
}

/// 📦 The one place loose rows become typed documents.
///
/// Convert once, at the boundary, with real errors — not ad hoc `get`s
/// sprinkled across the codebase like confetti at a parade nobody enjoyed.
fn row_to_document(row: Row) -> Result<FilmDocument, SyncError> {
    let shape = |field: &str, err: tokio_postgres::Error| {
        SyncError::RowShape(format!("film row field '{field}': {err}"))
    };

    Ok(FilmDocument {
        id: row.try_get("id").map_err(|e| shape("id", e))?,
        imdb_rating: row.try_get("rating").map_err(|e| shape("rating", e))?,
        title: row.try_get("title").map_err(|e| shape("title", e))?,
        description: row.try_get("description").map_err(|e| shape("description", e))?,
        genre: row.try_get("genres").map_err(|e| shape("genres", e))?,
        director: row.try_get("directors").map_err(|e| shape("directors", e))?,
        actors_names: row.try_get("actors_names").map_err(|e| shape("actors_names", e))?,
        writers_names: row.try_get("writers_names").map_err(|e| shape("writers_names", e))?,
        actors: parse_person_refs("actors", row.try_get("actors").map_err(|e| shape("actors", e))?)?,
        writers: parse_person_refs(
            "writers",
            row.try_get("writers").map_err(|e| shape("writers", e))?,
        )?,
    })
}

/// 🪪 jsonb `[{"id": …, "name": …}, …]` → `Vec<PersonRef>`, or a loud error.
fn parse_person_refs(field: &str, value: serde_json::Value) -> Result<Vec<PersonRef>, SyncError> {
    serde_json::from_value(value).map_err(|err| {
        SyncError::RowShape(format!("field '{field}' is not a [{{id, name}}] array: {err}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn the_one_where_jsonb_people_become_typed_people() {
        let value = json!([
            {"id": "11111111-1111-1111-1111-111111111111", "name": "Ann"},
            {"id": "22222222-2222-2222-2222-222222222222", "name": "Bob"},
        ]);
        let refs = parse_person_refs("actors", value).expect("well-formed jsonb must parse");
        assert_eq!(refs.len(), 2);
        assert_eq!(refs[0].name, "Ann");
    }

    #[test]
    fn the_one_where_an_empty_jsonb_array_is_an_empty_cast_list() {
        // COALESCE hands us '[]'::jsonb for relation-less films.
        let refs = parse_person_refs("writers", json!([])).unwrap();
        assert!(refs.is_empty());
    }

    #[test]
    fn the_one_where_a_mangled_jsonb_blob_is_a_named_fault_not_a_shrug() {
        let err = parse_person_refs("actors", json!([{"id": "not-a-uuid", "name": 7}]))
            .expect_err("garbage must not parse");
        let msg = err.to_string();
        assert!(msg.contains("actors"), "fault should name the field: {msg}");
        assert_eq!(err.kind(), crate::error::FaultKind::PermanentData);
    }
}
