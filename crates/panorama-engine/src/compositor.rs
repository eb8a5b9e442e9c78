//! The single write path into the aggregate collections.
//!
//! Every aggregate write, whether it comes from a source change, an entity
//! change or a rebuild, goes through [`Compositor::composite`] or
//! [`Compositor::remove`]. A composite is a shallow `$set` of the entity's
//! scalar projection plus the patched sub-arrays, so writes that target
//! different sub-arrays never clobber one another.

use std::sync::Arc;

use panorama_core::{
  config::Collections,
  document::Document,
  source::{SourceType, SubjectKind},
  store::{DocumentStore, UpsertResult},
};
use serde_json::Value;

use crate::{
  Error, Result,
  projection::{project, universal_id},
};

// ─── Patch ───────────────────────────────────────────────────────────────────

/// The full current contents of one aggregate sub-array.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldPatch {
  pub source:  SourceType,
  pub records: Vec<Value>,
}

impl FieldPatch {
  pub fn new(source: SourceType, records: Vec<Value>) -> Self {
    Self { source, records }
  }
}

/// What a composite writes on top of the scalar projection.
#[derive(Debug, Clone, PartialEq)]
pub enum Patch {
  /// Replace one sub-array; every other sub-array is left as stored.
  Field(FieldPatch),
  /// Replace several sub-arrays in one write.
  Full(Vec<FieldPatch>),
}

impl Patch {
  pub fn field(source: SourceType, records: Vec<Value>) -> Self {
    Self::Field(FieldPatch::new(source, records))
  }

  fn into_fields(self) -> Vec<FieldPatch> {
    match self {
      Self::Field(one) => vec![one],
      Self::Full(all) => all,
    }
  }
}

// ─── Compositor ──────────────────────────────────────────────────────────────

pub struct Compositor<S> {
  store:       Arc<S>,
  collections: Arc<Collections>,
}

impl<S> Clone for Compositor<S> {
  fn clone(&self) -> Self {
    Self {
      store:       Arc::clone(&self.store),
      collections: Arc::clone(&self.collections),
    }
  }
}

impl<S: DocumentStore> Compositor<S> {
  pub fn new(store: Arc<S>, collections: Arc<Collections>) -> Self {
    Self { store, collections }
  }

  /// Upsert the aggregate for `entity`: scalar projection first, then the
  /// patched sub-arrays on top. Re-applying the same inputs is `Unchanged`.
  pub async fn composite(
    &self,
    namespace: &str,
    kind: SubjectKind,
    entity: &Document,
    patch: Patch,
  ) -> Result<UpsertResult> {
    let uid = universal_id(entity)?;
    let mut fields = project(kind, entity)?;
    for FieldPatch { source, records } in patch.into_fields() {
      debug_assert_eq!(source.subject(), kind, "{source:?} patched onto a {kind} aggregate");
      fields.insert(source.aggregate_field().into(), Value::Array(records));
    }

    let collection = kind.aggregate_collection(&self.collections);
    let result = self
      .store
      .upsert_fields(namespace, collection, &uid, fields)
      .await
      .map_err(Error::store)?;

    tracing::debug!(namespace, collection, uid, ?result, "composite");
    Ok(result)
  }

  /// Delete the aggregate keyed by `uid`. Returns whether it existed.
  pub async fn remove(
    &self,
    namespace: &str,
    kind: SubjectKind,
    uid: &str,
  ) -> Result<bool> {
    let collection = kind.aggregate_collection(&self.collections);
    self
      .store
      .delete(namespace, collection, uid)
      .await
      .map_err(Error::store)
  }

  /// Read the aggregate keyed by `uid`.
  pub async fn current(
    &self,
    namespace: &str,
    kind: SubjectKind,
    uid: &str,
  ) -> Result<Option<Document>> {
    let collection = kind.aggregate_collection(&self.collections);
    self
      .store
      .get(namespace, collection, uid)
      .await
      .map_err(Error::store)
  }
}

/// The stored contents of `source`'s sub-array on `aggregate`; anything that
/// is not an array reads as empty.
pub fn sub_array(aggregate: &Document, source: SourceType) -> Vec<Value> {
  match aggregate.get(source.aggregate_field()) {
    Some(Value::Array(items)) => items.clone(),
    _ => Vec::new(),
  }
}
