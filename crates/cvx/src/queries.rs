//! 🐘 Queries — the three SQL incantations that power change capture.
//!
//! 🎬 COLD OPEN — INT. QUERY PLANNER — DUSK
//!
//! The planner looks at four LEFT JOINs and a GROUP BY. It sighs. It has
//! seen worse. It has BEEN worse. It builds a hash aggregate and moves on
//! with its life, which is more than most of us manage.
//!
//! ## Knowledge Graph 🧠
//! - `FILM_CHANGES` — films whose OWN row moved past the watermark.
//! - `GENRE_LINKED_FILMS` / `PERSON_LINKED_FILMS` — films reachable
//!   *backward* through the associative tables from a changed genre/person.
//!   A genre edit never touches `film_work.updated_at`, so correctness
//!   requires walking the relation in reverse. This is the heart of the
//!   whole pipeline. Everything else is plumbing.
//! - `FILM_DETAILS` — the one-shot denormalizer: one row per film id,
//!   aggregates deduplicated and COALESCEd to empty so a film with zero
//!   relations still gets a row (LEFT JOIN, never INNER — a lonely film is
//!   still a film).
//!
//! ⚠️ All queries are parameterized (`$1`). String-splicing a timestamp into
//! SQL is a time-honored tradition that is always exactly one apostrophe
//! away from an incident report. We do not participate.

use crate::common::EntityKind;

/// 📋 Ids of films whose own `updated_at` exceeds the watermark ($1).
pub const FILM_CHANGES: &str = "\
SELECT fw.id \
FROM content.film_work fw \
WHERE fw.updated_at > $1";

/// 📋 Ids of films linked to any genre updated after the watermark ($1).
/// GROUP BY so each film shows up once no matter how many of its genres moved.
pub const GENRE_LINKED_FILMS: &str = "\
SELECT fw.id \
FROM content.genre_film_work gfw \
LEFT JOIN content.film_work fw ON fw.id = gfw.film_work_id \
LEFT JOIN content.genre g ON g.id = gfw.genre_id \
WHERE g.updated_at > $1 \
GROUP BY fw.id";

/// 📋 Ids of films linked to any person updated after the watermark ($1).
pub const PERSON_LINKED_FILMS: &str = "\
SELECT fw.id \
FROM content.person_film_work pfw \
LEFT JOIN content.film_work fw ON fw.id = pfw.film_work_id \
LEFT JOIN content.person p ON p.id = pfw.person_id \
WHERE p.updated_at > $1 \
GROUP BY fw.id";

/// 📦 The denormalizing join: full document material for a batch of film ids
/// (`$1` is a `uuid[]`).
///
/// Design notes, written in blood:
/// - `DISTINCT` inside every aggregate: the person join and the genre join
///   fan out against each other, so without it an actor on a two-genre film
///   appears twice. With it, exactly once. Dedup or die.
/// - `FILTER (WHERE pfw.role = '...')` splits one person join three ways by
///   role instead of joining three times. Directors get names only — no
///   `{id, name}` records. The wire contract says so. See `common.rs`.
/// - `COALESCE(..., '{}')` / `COALESCE(..., '[]'::jsonb)`: an aggregate over
///   zero rows is NULL, and NULL is not a list. The document contract wants
///   `[]`, so the database hands us `[]` and nobody has to null-check.
pub const FILM_DETAILS: &str = "\
SELECT \
  fw.id, \
  fw.rating, \
  fw.title, \
  fw.description, \
  COALESCE(ARRAY_AGG(DISTINCT g.name) FILTER (WHERE g.name IS NOT NULL), '{}') AS genres, \
  COALESCE(ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'director' AND p.full_name IS NOT NULL), '{}') AS directors, \
  COALESCE(ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'actor' AND p.full_name IS NOT NULL), '{}') AS actors_names, \
  COALESCE(ARRAY_AGG(DISTINCT p.full_name) FILTER (WHERE pfw.role = 'writer' AND p.full_name IS NOT NULL), '{}') AS writers_names, \
  COALESCE(JSONB_AGG(DISTINCT JSONB_BUILD_OBJECT('id', p.id, 'name', p.full_name)) FILTER (WHERE pfw.role = 'actor' AND p.id IS NOT NULL), '[]'::jsonb) AS actors, \
  COALESCE(JSONB_AGG(DISTINCT JSONB_BUILD_OBJECT('id', p.id, 'name', p.full_name)) FILTER (WHERE pfw.role = 'writer' AND p.id IS NOT NULL), '[]'::jsonb) AS writers \
FROM content.film_work fw \
LEFT JOIN content.person_film_work pfw ON pfw.film_work_id = fw.id \
LEFT JOIN content.person p ON p.id = pfw.person_id \
LEFT JOIN content.genre_film_work gfw ON gfw.film_work_id = fw.id \
LEFT JOIN content.genre g ON g.id = gfw.genre_id \
WHERE fw.id = ANY($1) \
GROUP BY fw.id";

/// 🔍 The change-detection query for a given entity kind.
///
/// FilmWork watches its own timestamp; the secondary kinds walk the
/// associative tables backward to find the films they invalidate.
pub fn changes_sql(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::FilmWork => FILM_CHANGES,
        EntityKind::Genre => GENRE_LINKED_FILMS,
        EntityKind::Person => PERSON_LINKED_FILMS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn the_one_where_every_kind_gets_its_own_detector() {
        assert!(changes_sql(EntityKind::FilmWork).contains("fw.updated_at > $1"));
        assert!(changes_sql(EntityKind::Genre).contains("g.updated_at > $1"));
        assert!(changes_sql(EntityKind::Person).contains("p.updated_at > $1"));
    }

    #[test]
    fn the_one_where_secondary_kinds_walk_the_relation_backward() {
        // 🎯 Indirect invalidation: the genre/person queries must select FILM
        // ids, grouped, via the associative table — not genre/person ids.
        for sql in [GENRE_LINKED_FILMS, PERSON_LINKED_FILMS] {
            assert!(sql.starts_with("SELECT fw.id"), "must yield film ids: {sql}");
            assert!(sql.contains("GROUP BY fw.id"), "each film exactly once: {sql}");
        }
        assert!(GENRE_LINKED_FILMS.contains("content.genre_film_work"));
        assert!(PERSON_LINKED_FILMS.contains("content.person_film_work"));
    }

    #[test]
    fn the_one_where_lonely_films_still_get_a_row() {
        // 🧪 Outer-join semantics: a film with no persons and no genres must
        // still assemble. INNER JOIN anywhere in FILM_DETAILS would drop it.
        assert!(!FILM_DETAILS.contains("INNER JOIN"));
        assert_eq!(FILM_DETAILS.matches("LEFT JOIN").count(), 4);
        // And aggregates over nothing must come back as empty, not NULL.
        assert_eq!(FILM_DETAILS.matches("COALESCE").count(), 6);
    }

    #[test]
    fn the_one_where_fan_out_joins_cannot_duplicate_anyone() {
        // Every aggregate dedups. Every single one. The genre×person fan-out
        // is lurking and it WILL double your actors if you let it.
        assert_eq!(FILM_DETAILS.matches("ARRAY_AGG(DISTINCT").count(), 4);
        assert_eq!(FILM_DETAILS.matches("JSONB_AGG(DISTINCT").count(), 2);
    }

    #[test]
    fn the_one_where_directors_are_names_only_by_contract() {
        // The asymmetry is deliberate: actors/writers get {id,name} records,
        // directors don't. Exactly two jsonb aggregates, neither for directors.
        assert!(!FILM_DETAILS.contains("role = 'director' AND p.id IS NOT NULL"));
        assert_eq!(FILM_DETAILS.matches("JSONB_BUILD_OBJECT").count(), 2);
    }

    #[test]
    fn the_one_where_batches_ride_in_on_a_uuid_array() {
        assert!(FILM_DETAILS.contains("fw.id = ANY($1)"));
    }
}
