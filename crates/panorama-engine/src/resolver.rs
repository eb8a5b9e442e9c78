//! Reference fan-out: turn the foreign ids an entity lists into the source
//! records they name.

use std::{collections::HashSet, sync::Arc};

use panorama_core::{
  config::Collections,
  document::{Document, ForeignId, strip_storage_id},
  merge,
  source::{Binding, SourceType},
  store::DocumentStore,
};
use serde_json::Value;

use crate::{Error, Result, dispatch::key_of};

/// The outcome of resolving one reference list.
///
/// `records` is the complete replacement for the aggregate sub-array, never a
/// delta, and holds each identity key at most once. `missing` lists ids that
/// matched nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
  pub records: Vec<Value>,
  pub missing: Vec<ForeignId>,
}

pub struct Resolver<S> {
  store:       Arc<S>,
  collections: Arc<Collections>,
}

impl<S> Clone for Resolver<S> {
  fn clone(&self) -> Self {
    Self {
      store:       Arc::clone(&self.store),
      collections: Arc::clone(&self.collections),
    }
  }
}

impl<S: DocumentStore> Resolver<S> {
  pub fn new(store: Arc<S>, collections: Arc<Collections>) -> Self {
    Self { store, collections }
  }

  /// Look up every id in `ids` against `source`'s collection, in input order.
  ///
  /// A list binding takes one record per id. A primary binding is a
  /// one-to-many join and takes every record whose parent fields match.
  /// Repeated ids are looked up once, and records are folded in by identity
  /// key the same way a single source change is.
  pub async fn resolve(
    &self,
    namespace: &str,
    source: SourceType,
    ids: &[ForeignId],
  ) -> Result<Resolution> {
    let collection = source.collection(&self.collections);
    let mut resolution = Resolution::default();

    let mut seen = HashSet::with_capacity(ids.len());
    for id in ids {
      if !seen.insert(id) {
        continue;
      }
      let filter = source.lookup_filter(id)?;
      let mut found: Vec<Document> = self
        .store
        .find(namespace, collection, &filter)
        .await
        .map_err(Error::store)?;

      if found.is_empty() {
        tracing::warn!(
          namespace,
          collection,
          id = %id,
          "referenced source record not found"
        );
        resolution.missing.push(id.clone());
        continue;
      }

      if let Binding::List(_) = source.binding() {
        found.truncate(1);
      }
      for doc in found {
        let record = Value::Object(strip_storage_id(doc));
        resolution.records = merge::merge(
          std::mem::take(&mut resolution.records),
          record,
          |v| key_of(source, v),
        );
      }
    }

    tracing::debug!(
      namespace,
      collection,
      requested = ids.len(),
      resolved = resolution.records.len(),
      missing = resolution.missing.len(),
      "resolved references"
    );
    Ok(resolution)
  }
}
