//! 🕳️ Sinks — where documents go to become searchable.
//!
//! 🚰 The drain at the end of the pipeline tub. A sink accepts one bounded
//! batch of [`FilmDocument`]s and lands every one of them as an upsert keyed
//! by its own id. Same document twice? Same index state. That idempotence is
//! not a nice-to-have — the whole at-least-once retry story leans on it like
//! a ladder leans on a wall.
//!
//! ## Knowledge Graph 🧠
//! - Production impl: [`ElasticsearchSink`] — NDJSON into `/_bulk`.
//! - Test twin: `InMemorySink` — a HashMap cosplaying as a cluster.
//! - Partial-batch failure is WHOLE-batch failure. No per-document error
//!   suppression. The outer retry re-runs the pass; idempotence absorbs it.

use async_trait::async_trait;

use crate::common::FilmDocument;
use crate::error::SyncError;

pub(crate) mod elasticsearch_sink;
pub(crate) use elasticsearch_sink::ElasticsearchSink;

/// 🕳️ A bulk, idempotent document destination.
///
/// # Contract
/// - `bulk_upsert` writes the whole batch in one operation, each document
///   keyed by `doc.id`. Re-upserting is a pure overwrite.
/// - Any failure — transport, status, or partial item rejection — fails the
///   whole call. The caller decides whether to retry. (It will.)
/// - An empty batch is a no-op, not a request.
#[async_trait]
pub(crate) trait DocumentSink: Send {
    async fn bulk_upsert(&mut self, docs: &[FilmDocument]) -> Result<(), SyncError>;
}

/// 🧪 The in-memory twin: an "index" that is just a map, the way all
/// infrastructure secretly wishes it could be.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct InMemorySink {
    /// Current index state, one document per id. Upserts overwrite.
    pub(crate) index: std::collections::HashMap<uuid::Uuid, FilmDocument>,
    /// Every batch as received, for asserting batching behavior.
    pub(crate) batches: Vec<Vec<FilmDocument>>,
}

#[cfg(test)]
impl InMemorySink {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
#[async_trait]
impl DocumentSink for InMemorySink {
    async fn bulk_upsert(&mut self, docs: &[FilmDocument]) -> Result<(), SyncError> {
        if docs.is_empty() {
            return Ok(());
        }
        for doc in docs {
            self.index.insert(doc.id, doc.clone());
        }
        self.batches.push(docs.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn film(title: &str) -> FilmDocument {
        FilmDocument {
            id: Uuid::new_v4(),
            imdb_rating: None,
            genre: vec![],
            title: title.to_string(),
            description: None,
            director: vec![],
            actors_names: vec![],
            writers_names: vec![],
            actors: vec![],
            writers: vec![],
        }
    }

    #[tokio::test]
    async fn the_one_where_upserting_twice_changes_exactly_nothing() {
        // 🎯 Idempotence: the load-bearing property of the whole retry story.
        let mut sink = InMemorySink::new();
        let doc = film("Groundhog Day");

        sink.bulk_upsert(std::slice::from_ref(&doc)).await.unwrap();
        let after_once = sink.index.clone();
        sink.bulk_upsert(std::slice::from_ref(&doc)).await.unwrap();

        assert_eq!(sink.index, after_once, "same doc twice must equal same doc once");
        assert_eq!(sink.index.len(), 1);
    }

    #[tokio::test]
    async fn the_one_where_an_empty_batch_is_a_polite_nothing() {
        let mut sink = InMemorySink::new();
        sink.bulk_upsert(&[]).await.unwrap();
        assert!(sink.batches.is_empty(), "empty batches must not even be recorded");
    }
}
