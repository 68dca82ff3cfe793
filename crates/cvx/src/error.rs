//! 💀 Errors — named, kinded, and carrying their receipts.
//!
//! The easy way out here is "catch everything, retry everything, forever."
//! Which works, in the way that duct tape works. But a
//! connection refused and a malformed jsonb blob are different animals: one
//! heals itself when the network stops having a moment, the other will be
//! exactly as broken on retry number nine thousand. So every fault here
//! carries a [`FaultKind`] — the retry policy still treats them the same
//! (for now), but the logs tell them apart, and the door stays open for a
//! smarter policy without re-plumbing the whole error type. 🦆

use thiserror::Error;

/// 🎯 The two temperaments of failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// 📡 Somebody's unreachable. Backoff and try again — the network owes us one.
    TransientConnection,
    /// 🧱 The data or the query is wrong. Retrying is cardio, not progress.
    PermanentData,
}

impl std::fmt::Display for FaultKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FaultKind::TransientConnection => f.write_str("transient-connection"),
            FaultKind::PermanentData => f.write_str("permanent-data"),
        }
    }
}

/// 💀 Everything that can go wrong inside one sync pass.
///
/// Variants are constructed at the seam where the fault happened, never
/// guessed from string matching after the fact. (The CLI still does a little
/// string-sniffing for its human-facing hint, but that's a courtesy, not a
/// classification.)
#[derive(Debug, Error)]
pub enum SyncError {
    /// 🗄️ Redis is unreachable or unhappy. An unreadable cursor must never be
    /// treated as "no changes," so this aborts the pass loudly.
    #[error("cursor store fault: {0}")]
    CursorStore(#[from] redis::RedisError),

    /// 🗄️ The cursor key existed but its value wasn't a timestamp. Somebody
    /// SET film_work "banana" and we refuse to pretend that's a watermark.
    #[error("cursor value for '{key}' is not a valid RFC 3339 timestamp: {value:?}")]
    CursorCorrupt { key: &'static str, value: String },

    /// 🐘 Could not reach or authenticate to the catalog.
    #[error("catalog connection fault: {0}")]
    CatalogConnection(#[source] tokio_postgres::Error),

    /// 🐘 A query made it to the catalog and the catalog said no.
    #[error("catalog query fault: {0}")]
    CatalogQuery(#[source] tokio_postgres::Error),

    /// 📦 A row came back in a shape we couldn't map into a `FilmDocument`.
    #[error("malformed catalog row: {0}")]
    RowShape(String),

    /// 📦 A document refused to become JSON. Should be unreachable for our
    /// shapes, but "should" is not a type system.
    #[error("bulk payload render fault: {0}")]
    PayloadRender(#[from] serde_json::Error),

    /// 📡 The bulk request never reached the sink, or timed out on the way.
    #[error("sink transport fault: {0}")]
    SinkTransport(#[from] reqwest::Error),

    /// 📡 The sink answered a health or index check with a bad status. A
    /// cluster mid-restart says 503; that's backoff territory, not a config
    /// bug, so this retries instead of accusing anyone.
    #[error("sink unavailable: {0}")]
    SinkUnavailable(String),

    /// 📡 The sink answered, and the answer was no — non-2xx status or a
    /// bulk body with `"errors": true`. Partial failure is whole failure.
    #[error("sink rejected bulk write: {0}")]
    SinkRejected(String),
}

impl SyncError {
    /// 🔍 Which temperament is this fault?
    pub fn kind(&self) -> FaultKind {
        match self {
            SyncError::CursorStore(_)
            | SyncError::CatalogConnection(_)
            | SyncError::SinkTransport(_)
            | SyncError::SinkUnavailable(_) => FaultKind::TransientConnection,
            SyncError::CursorCorrupt { .. }
            | SyncError::CatalogQuery(_)
            | SyncError::RowShape(_)
            | SyncError::PayloadRender(_)
            | SyncError::SinkRejected(_) => FaultKind::PermanentData,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_faults_know_their_own_temperament() {
        assert_eq!(
            SyncError::SinkRejected("mapping tantrum".into()).kind(),
            FaultKind::PermanentData
        );
        assert_eq!(
            SyncError::CursorCorrupt { key: "film_work", value: "banana".into() }.kind(),
            FaultKind::PermanentData
        );
        assert_eq!(
            SyncError::SinkUnavailable("503 and feelings".into()).kind(),
            FaultKind::TransientConnection
        );
    }

    #[test]
    fn the_one_where_error_messages_name_the_guilty_party() {
        let err = SyncError::CursorCorrupt { key: "genre", value: "yesterday-ish".into() };
        let msg = err.to_string();
        assert!(msg.contains("genre"), "the key should be in the message: {msg}");
        assert!(msg.contains("yesterday-ish"), "the offending value too: {msg}");
    }
}
