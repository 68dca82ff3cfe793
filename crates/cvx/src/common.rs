//! 📦 Common data structures — the building blocks of cinevex
//!
//! ---
//!
//! 🎬 COLD OPEN — INT. DATA CENTER — 3:47 AM
//!
//! 🌩️  Somewhere, a genre row gets renamed. "Sci-Fi" becomes "Science Fiction".
//! Nobody claps. Nobody notices. But forty-one thousand film documents in a
//! search index are now quietly, confidently wrong.
//!
//! ✅ And then — a pass begins. Cursors are read. Changed ids are gathered.
//! A `FilmDocument` is assembled, carrying its genre names like a responsible
//! adult carrying groceries in one trip (ALL of them, no second trips, this
//! is a point of honor). The index is made honest again. 🦆
//!
//! This module defines the humble yet load-bearing types that ferry catalog
//! rows from Postgres to Elasticsearch. They don't ask questions. They carry
//! the data. They are the postal workers of this codebase.
//!
//! ---
//!
//! ⚠️  The serde field names on [`FilmDocument`] are a WIRE CONTRACT. Other
//! systems read these documents out of the index. Rename a field here and a
//! stranger's dashboard breaks three timezones away. Do not rename fields.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 🎯 The three independently-tracked source entity types.
///
/// A film's own row has an `updated_at`. But a genre rename or a person
/// rename does NOT touch the film's timestamp — which is exactly why each
/// kind keeps its own cursor and its own change-detection query. One watermark
/// to rule them all would miss every indirect edit. Ask us how we know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    FilmWork,
    Genre,
    Person,
}

impl EntityKind {
    /// 🔄 Processing order for a pass. Deterministic on purpose — the tests
    /// depend on it, and "whatever HashMap iteration felt like today" is not
    /// an ordering, it's a mood.
    pub const ALL: [EntityKind; 3] = [EntityKind::FilmWork, EntityKind::Genre, EntityKind::Person];

    /// 🗄️ The cursor-store key for this kind. These strings are durable state
    /// in Redis — changing one orphans the old watermark and triggers a full
    /// reprocess. Idempotent, yes. Fun, no.
    pub fn cursor_key(self) -> &'static str {
        match self {
            EntityKind::FilmWork => "film_work",
            EntityKind::Genre => "genre",
            EntityKind::Person => "person",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.cursor_key())
    }
}

/// ⏰ The floor of cursor time: 0001-01-01T00:00:00Z.
///
/// A brand-new deployment has no cursor, which must mean "everything ever
/// written is new to me." We use year one rather than `DateTime::MIN_UTC`
/// because Postgres politely declines timestamps from before the Big Bang,
/// and we'd rather not negotiate with a range check at 3am.
pub fn min_cursor_timestamp() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(1, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// 🪪 A person reference as the index wants it: id plus display name.
///
/// Actors and writers get these id-preserving records in the document.
/// Directors do not — they only get a name list. That asymmetry is not a
/// bug, it's the contract this index has always shipped, and downstream
/// consumers have already built on it. We keep it with a straight face.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonRef {
    pub id: Uuid,
    pub name: String,
}

/// 📦 One fully denormalized film, ready for the index.
///
/// This is the output shape of the document assembler and the input shape of
/// the bulk upserter. Exactly one of these exists per film id per pass.
///
/// # Invariants
/// - Every list field is present and possibly empty — never null. A film with
///   zero genres serializes as `"genre": []`, not `"genre": null`, and
///   definitely not as a missing key. Search-side mappings count on it.
/// - `imdb_rating` and `description` are honestly nullable in the catalog,
///   so they stay `Option` here and serialize as JSON null when absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilmDocument {
    pub id: Uuid,
    pub imdb_rating: Option<f64>,
    pub genre: Vec<String>,
    pub title: String,
    pub description: Option<String>,
    pub director: Vec<String>,
    pub actors_names: Vec<String>,
    pub writers_names: Vec<String>,
    pub actors: Vec<PersonRef>,
    pub writers: Vec<PersonRef>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn bare_film(id: Uuid) -> FilmDocument {
        FilmDocument {
            id,
            imdb_rating: Some(7.5),
            genre: vec!["Drama".to_string()],
            title: "X".to_string(),
            description: None,
            director: vec![],
            actors_names: vec![],
            writers_names: vec![],
            actors: vec![],
            writers: vec![],
        }
    }

    #[test]
    fn the_one_where_the_wire_contract_is_carved_in_stone() {
        // 🧪 Field names are the contract. This test is the stone tablet.
        let doc = serde_json::to_value(bare_film(Uuid::nil())).expect("💀 FilmDocument must serialize");

        assert_eq!(
            doc,
            json!({
                "id": "00000000-0000-0000-0000-000000000000",
                "imdb_rating": 7.5,
                "genre": ["Drama"],
                "title": "X",
                "description": null,
                "director": [],
                "actors_names": [],
                "writers_names": [],
                "actors": [],
                "writers": []
            }),
            "The emitted document schema drifted. Somewhere, a dashboard just died."
        );
    }

    #[test]
    fn the_one_where_empty_lists_stay_lists_and_never_become_null() {
        let doc = serde_json::to_value(bare_film(Uuid::nil())).unwrap();
        for field in ["genre", "director", "actors_names", "writers_names", "actors", "writers"] {
            assert!(
                doc[field].is_array(),
                "'{field}' must serialize as an array even when empty. Null is not a list."
            );
        }
    }

    #[test]
    fn the_one_where_entity_kinds_march_in_a_fixed_order() {
        // 🎯 film_work, then genre, then person. Today, tomorrow, forever.
        let order: Vec<&str> = EntityKind::ALL.iter().map(|k| k.cursor_key()).collect();
        assert_eq!(order, vec!["film_work", "genre", "person"]);
    }

    #[test]
    fn the_one_where_the_minimum_cursor_fits_inside_postgres() {
        let floor = min_cursor_timestamp();
        assert_eq!(floor.to_rfc3339(), "0001-01-01T00:00:00+00:00");
        // Round-trips through the RFC 3339 form the cursor store writes.
        let reparsed = DateTime::parse_from_rfc3339(&floor.to_rfc3339()).unwrap();
        assert_eq!(reparsed.with_timezone(&Utc), floor);
    }

    #[test]
    fn the_one_where_person_refs_keep_their_ids_on() {
        let p = PersonRef { id: Uuid::nil(), name: "Ann".to_string() };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v, json!({"id": "00000000-0000-0000-0000-000000000000", "name": "Ann"}));
        let back: PersonRef = serde_json::from_value(v).unwrap();
        assert_eq!(back, p);
    }
}
