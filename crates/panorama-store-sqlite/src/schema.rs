//! SQL schema for the Panorama SQLite store.
//!
//! Executed once at connection startup. Every collection of every namespace
//! shares one table; `seq` preserves insertion order across upserts.

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS documents (
    seq         INTEGER PRIMARY KEY AUTOINCREMENT,
    namespace   TEXT NOT NULL,
    collection  TEXT NOT NULL,
    doc_id      TEXT NOT NULL,
    body        TEXT NOT NULL,    -- JSON object, includes `_id`
    updated_at  TEXT NOT NULL,
    UNIQUE (namespace, collection, doc_id)
);

CREATE INDEX IF NOT EXISTS documents_collection
    ON documents (namespace, collection, seq);
";
