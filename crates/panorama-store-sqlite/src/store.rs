//! [`SqliteStore`], the SQLite implementation of [`DocumentStore`].

use std::path::Path;

use chrono::Utc;
use panorama_core::{
  document::Document,
  store::{DocumentStore, FieldMatch, UpsertResult},
};
use rusqlite::OptionalExtension as _;

use crate::{
  Result,
  encode::{RawDocument, decode_body, encode_body, encode_dt, json_path, with_storage_id},
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// Document collections backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

/// How a write combines with the document already stored under the same id.
#[derive(Clone, Copy)]
enum WriteMode {
  /// Overlay top-level fields onto the stored document.
  Merge,
  /// Discard the stored document.
  Replace,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store. Used by tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `SELECT body ...` query with positional text parameters.
  async fn query_bodies(
    &self,
    sql: String,
    params: Vec<String>,
  ) -> Result<Vec<Document>> {
    let raws: Vec<RawDocument> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), |row| {
            Ok(RawDocument { body: row.get(0)? })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawDocument::into_document).collect()
  }

  /// Read-modify-write one document inside a transaction so concurrent
  /// writers to the same id never interleave.
  async fn write(
    &self,
    namespace: &str,
    collection: &str,
    id: &str,
    incoming: Document,
    mode: WriteMode,
  ) -> Result<UpsertResult> {
    let ns = namespace.to_owned();
    let coll = collection.to_owned();
    let id = id.to_owned();
    let now = encode_dt(Utc::now());

    let result = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let stored: Option<String> = tx
          .query_row(
            "SELECT body FROM documents
             WHERE namespace = ?1 AND collection = ?2 AND doc_id = ?3",
            rusqlite::params![ns, coll, id],
            |r| r.get(0),
          )
          .optional()?;

        let (next, result) = match stored {
          None => (with_storage_id(incoming, &id), UpsertResult::Inserted),
          Some(raw) => {
            let current = decode_body(&raw).map_err(other)?;
            let next = match mode {
              WriteMode::Merge => {
                let mut next = current.clone();
                next.extend(incoming);
                next
              }
              WriteMode::Replace => with_storage_id(incoming, &id),
            };
            if next == current {
              return Ok(UpsertResult::Unchanged);
            }
            (next, UpsertResult::Updated)
          }
        };

        let body = encode_body(&next).map_err(other)?;
        tx.execute(
          "INSERT INTO documents (namespace, collection, doc_id, body, updated_at)
           VALUES (?1, ?2, ?3, ?4, ?5)
           ON CONFLICT (namespace, collection, doc_id)
           DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at",
          rusqlite::params![ns, coll, id, body, now],
        )?;
        tx.commit()?;
        Ok(result)
      })
      .await?;

    Ok(result)
  }
}

fn other(e: crate::Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(e))
}

// ─── DocumentStore impl ──────────────────────────────────────────────────────

impl DocumentStore for SqliteStore {
  type Error = crate::Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get(
    &self,
    namespace: &str,
    collection: &str,
    id: &str,
  ) -> Result<Option<Document>> {
    let ns = namespace.to_owned();
    let coll = collection.to_owned();
    let id = id.to_owned();

    let raw: Option<RawDocument> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT body FROM documents
               WHERE namespace = ?1 AND collection = ?2 AND doc_id = ?3",
              rusqlite::params![ns, coll, id],
              |row| Ok(RawDocument { body: row.get(0)? }),
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawDocument::into_document).transpose()
  }

  async fn find(
    &self,
    namespace: &str,
    collection: &str,
    filter: &[FieldMatch],
  ) -> Result<Vec<Document>> {
    // Build WHERE clause dynamically: two parameters per conjunct.
    let mut params = vec![namespace.to_owned(), collection.to_owned()];
    let mut conds = vec!["namespace = ?1".to_owned(), "collection = ?2".to_owned()];
    for m in filter {
      let path_idx = params.len() + 1;
      conds.push(format!(
        "CAST(json_extract(body, ?{path_idx}) AS TEXT) = ?{}",
        path_idx + 1
      ));
      params.push(json_path(&m.path));
      params.push(m.value.clone());
    }

    let sql = format!(
      "SELECT body FROM documents WHERE {} ORDER BY seq",
      conds.join(" AND ")
    );
    self.query_bodies(sql, params).await
  }

  async fn find_containing(
    &self,
    namespace: &str,
    collection: &str,
    array_path: &str,
    value: &str,
  ) -> Result<Vec<Document>> {
    let sql = "SELECT d.body FROM documents d
               WHERE d.namespace = ?1 AND d.collection = ?2
                 AND EXISTS (
                   SELECT 1 FROM json_each(d.body, ?3) AS e
                   WHERE CAST(e.value AS TEXT) = ?4
                 )
               ORDER BY d.seq"
      .to_owned();
    let params = vec![
      namespace.to_owned(),
      collection.to_owned(),
      json_path(array_path),
      value.to_owned(),
    ];
    self.query_bodies(sql, params).await
  }

  async fn list(&self, namespace: &str, collection: &str) -> Result<Vec<Document>> {
    let sql = "SELECT body FROM documents
               WHERE namespace = ?1 AND collection = ?2
               ORDER BY seq"
      .to_owned();
    self
      .query_bodies(sql, vec![namespace.to_owned(), collection.to_owned()])
      .await
  }

  // ── Writes ────────────────────────────────────────────────────────────────

  async fn upsert_fields(
    &self,
    namespace: &str,
    collection: &str,
    id: &str,
    fields: Document,
  ) -> Result<UpsertResult> {
    self
      .write(namespace, collection, id, fields, WriteMode::Merge)
      .await
  }

  async fn replace(
    &self,
    namespace: &str,
    collection: &str,
    id: &str,
    document: Document,
  ) -> Result<UpsertResult> {
    self
      .write(namespace, collection, id, document, WriteMode::Replace)
      .await
  }

  async fn delete(&self, namespace: &str, collection: &str, id: &str) -> Result<bool> {
    let ns = namespace.to_owned();
    let coll = collection.to_owned();
    let doc_id = id.to_owned();

    let removed = self
      .conn
      .call(move |conn| {
        let n = conn.execute(
          "DELETE FROM documents
           WHERE namespace = ?1 AND collection = ?2 AND doc_id = ?3",
          rusqlite::params![ns, coll, doc_id],
        )?;
        Ok(n > 0)
      })
      .await?;

    tracing::debug!(namespace, collection, id, removed, "delete");
    Ok(removed)
  }
}
