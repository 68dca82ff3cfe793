//! 🗄️ RedisCursorStore — watermarks with an actual pulse after restart.
//!
//! Keys are the entity-kind names (`film_work`, `genre`, `person`), values
//! are RFC 3339 timestamps. That's the whole schema. Redis has carried
//! heavier burdens.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::AsyncCommands;
use tracing::debug;

use super::CursorStore;
use crate::common::{EntityKind, min_cursor_timestamp};
use crate::error::SyncError;

/// 🗄️ A multiplexed async connection wearing a [`CursorStore`] badge.
pub(crate) struct RedisCursorStore {
    conn: redis::aio::MultiplexedConnection,
}

impl RedisCursorStore {
    /// 🚀 Connect to the cursor store. Fails fast — an unreachable store at
    /// connect time is the outer retry loop's problem, not a shrug.
    pub(crate) async fn connect(url: &str) -> Result<Self, SyncError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        debug!(url, "🗄️ cursor store connected");
        Ok(Self { conn })
    }
}

#[async_trait]
impl CursorStore for RedisCursorStore {
    async fn get(&mut self, kind: EntityKind) -> Result<DateTime<Utc>, SyncError> {
        let raw: Option<String> = self.conn.get(kind.cursor_key()).await?;
        decode_cursor(kind, raw)
    }

    async fn set(&mut self, kind: EntityKind, ts: DateTime<Utc>) -> Result<(), SyncError> {
        let () = self.conn.set(kind.cursor_key(), ts.to_rfc3339()).await?;
        debug!(kind = %kind, cursor = %ts.to_rfc3339(), "🗄️ cursor advanced");
        Ok(())
    }
}

/// 🔍 Turn a raw stored value into a watermark, or fail LOUDLY.
///
/// A missing key is the first run for this kind: everything is new. A
/// present-but-unparseable value is neither a cursor at zero nor a cursor
/// at "now" — treating it as the former would skip nothing, the latter
/// would skip everything, and neither guess is ours to make.
fn decode_cursor(kind: EntityKind, raw: Option<String>) -> Result<DateTime<Utc>, SyncError> {
    match raw {
        None => Ok(min_cursor_timestamp()),
        Some(value) => DateTime::parse_from_rfc3339(&value)
            .map(|ts| ts.with_timezone(&Utc))
            .map_err(|_| SyncError::CursorCorrupt { key: kind.cursor_key(), value }),
    }
}
