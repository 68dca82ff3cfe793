//! 🗄️ Cursor store — the pipeline's long-term memory.
//!
//! One timestamp per entity kind: "everything at or before this moment has
//! already been shipped." Lose it and you reprocess the whole catalog
//! (annoying, idempotent, survivable). Corrupt it silently and you SKIP
//! changes (quiet, wrong, career-limiting). So reads are loud about
//! garbage and only ever default on a genuinely missing key.
//!
//! ## Knowledge Graph 🧠
//! - Durable impl: [`RedisCursorStore`] — GET/SET of RFC 3339 strings.
//! - Test twin: `InMemoryCursorStore` — a HashMap with delusions of
//!   durability. Every backend in this codebase gets an in-memory twin;
//!   this is how the orchestrator tests stay honest without a Redis. 🦆
//! - The ORCHESTRATOR is the only writer. Everyone else reads.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::common::EntityKind;
use crate::error::SyncError;

pub(crate) mod redis_cursor;
pub(crate) use redis_cursor::RedisCursorStore;

/// 🗄️ Durable per-entity-kind watermark storage.
///
/// # Contract
/// - `get` on a never-written kind returns the minimum timestamp — a fresh
///   deployment means "everything is new," not "nothing is."
/// - `set` is durable and read-after-write visible: a `get` issued after a
///   successful `set` sees the new value. No write-behind surprises.
/// - An unreachable store is an error. It must NEVER be papered over as
///   "no changes" — that is the one lie this pipeline cannot recover from.
#[async_trait]
pub(crate) trait CursorStore: Send {
    async fn get(&mut self, kind: EntityKind) -> Result<DateTime<Utc>, SyncError>;
    async fn set(&mut self, kind: EntityKind, ts: DateTime<Utc>) -> Result<(), SyncError>;
}

/// 🧪 The in-memory twin. Remembers everything until the process forgets.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct InMemoryCursorStore {
    cursors: std::collections::HashMap<&'static str, DateTime<Utc>>,
}

#[cfg(test)]
impl InMemoryCursorStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
#[async_trait]
impl CursorStore for InMemoryCursorStore {
    async fn get(&mut self, kind: EntityKind) -> Result<DateTime<Utc>, SyncError> {
        Ok(self
            .cursors
            .get(kind.cursor_key())
            .copied()
            .unwrap_or_else(crate::common::min_cursor_timestamp))
    }

    async fn set(&mut self, kind: EntityKind, ts: DateTime<Utc>) -> Result<(), SyncError> {
        self.cursors.insert(kind.cursor_key(), ts);
        Ok(())
    }
}
