//! The `DocumentStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `panorama-store-sqlite`).
//! The engine depends on this abstraction, not on any concrete backend.
//!
//! Every operation is scoped by a namespace (the logical database of one
//! deployment) and a collection name.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::document::Document;

// ─── Query types ─────────────────────────────────────────────────────────────

/// One conjunct of a lookup: the field at `path` (dotted) must equal `value`
/// in canonical text form (see [`crate::document::canonical_text`]).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
  pub path:  String,
  pub value: String,
}

impl FieldMatch {
  pub fn new(path: impl Into<String>, value: impl Into<String>) -> Self {
    Self { path: path.into(), value: value.into() }
  }
}

/// What an upsert did to the stored document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertResult {
  Inserted,
  Updated,
  /// The write would not change the stored document.
  Unchanged,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a JSON document store.
///
/// Each write is atomic on its own; there are no multi-document transactions.
/// All methods return `Send` futures so the trait can be used from tasks
/// spawned on a multi-threaded tokio runtime.
pub trait DocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Fetch one document by its `_id`.
  fn get<'a>(
    &'a self,
    namespace: &'a str,
    collection: &'a str,
    id: &'a str,
  ) -> impl Future<Output = Result<Option<Document>, Self::Error>> + Send + 'a;

  /// All documents matching every conjunct of `filter`, in insertion order.
  fn find<'a>(
    &'a self,
    namespace: &'a str,
    collection: &'a str,
    filter: &'a [FieldMatch],
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + 'a;

  /// All documents whose array at `array_path` contains `value` (canonical
  /// text comparison), in insertion order.
  fn find_containing<'a>(
    &'a self,
    namespace: &'a str,
    collection: &'a str,
    array_path: &'a str,
    value: &'a str,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + 'a;

  /// Every document in a collection, in insertion order.
  fn list<'a>(
    &'a self,
    namespace: &'a str,
    collection: &'a str,
  ) -> impl Future<Output = Result<Vec<Document>, Self::Error>> + Send + 'a;

  // ── Writes ────────────────────────────────────────────────────────────

  /// Shallow `$set`: overwrite the top-level `fields` of document `id`,
  /// keeping every other field, creating the document if it does not exist.
  fn upsert_fields<'a>(
    &'a self,
    namespace: &'a str,
    collection: &'a str,
    id: &'a str,
    fields: Document,
  ) -> impl Future<Output = Result<UpsertResult, Self::Error>> + Send + 'a;

  /// Replace document `id` wholesale, creating it if it does not exist.
  fn replace<'a>(
    &'a self,
    namespace: &'a str,
    collection: &'a str,
    id: &'a str,
    document: Document,
  ) -> impl Future<Output = Result<UpsertResult, Self::Error>> + Send + 'a;

  /// Delete document `id`. Returns whether a document was removed.
  fn delete<'a>(
    &'a self,
    namespace: &'a str,
    collection: &'a str,
    id: &'a str,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}
