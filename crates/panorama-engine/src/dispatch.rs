//! Source-record change propagation.
//!
//! A change to one source record touches exactly one sub-array of every
//! aggregate whose entity references that record. The record is folded in
//! (or removed) with the merge-by-key reducer and the shrunk or grown array
//! goes back through the compositor.

use std::sync::Arc;

use panorama_core::{
  change::{Change, ChangeEvent},
  config::Collections,
  document::{Document, ForeignId, IdentityKey, strip_storage_id},
  merge,
  source::{Binding, SourceType},
  store::{DocumentStore, FieldMatch, UpsertResult},
};
use serde::Serialize;
use serde_json::Value;

use crate::{
  Error, Result,
  compositor::{Compositor, Patch, sub_array},
  projection::universal_id,
};

/// What one source change did.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DispatchOutcome {
  pub source:    SourceType,
  pub reference: ForeignId,
  /// Universal ids of the aggregates written, in entity storage order.
  pub touched:   Vec<String>,
}

pub struct ChangeDispatcher<S> {
  store:       Arc<S>,
  collections: Arc<Collections>,
  compositor:  Compositor<S>,
}

impl<S> Clone for ChangeDispatcher<S> {
  fn clone(&self) -> Self {
    Self {
      store:       Arc::clone(&self.store),
      collections: Arc::clone(&self.collections),
      compositor:  self.compositor.clone(),
    }
  }
}

impl<S: DocumentStore> ChangeDispatcher<S> {
  pub fn new(store: Arc<S>, collections: Arc<Collections>) -> Self {
    let compositor = Compositor::new(Arc::clone(&store), Arc::clone(&collections));
    Self { store, collections, compositor }
  }

  pub async fn handle(
    &self,
    namespace: &str,
    source: SourceType,
    event: &ChangeEvent,
  ) -> Result<DispatchOutcome> {
    let change = event.classify()?;
    let record = match change {
      Change::Upsert(doc) | Change::Delete(doc) => doc,
    };
    let reference = source.reference_of(record)?;
    let identity = source.identity_of(record)?;

    let entities = self.dependents(namespace, source, &reference).await?;
    let mut outcome = DispatchOutcome {
      source,
      reference: reference.clone(),
      touched: Vec::new(),
    };

    if entities.is_empty() {
      tracing::warn!(
        namespace,
        ?source,
        reference = %reference,
        "no entity references this record yet"
      );
      return Ok(outcome);
    }

    for entity in &entities {
      let uid = universal_id(entity)?;
      let written = match change {
        Change::Upsert(record) => {
          self.fold_in(namespace, source, entity, &uid, record).await?
        }
        Change::Delete(_) => {
          self.take_out(namespace, source, entity, &uid, &identity).await?
        }
      };
      if let Some(result) = written {
        tracing::info!(namespace, ?source, uid, ?result, key = %identity, "aggregate patched");
        outcome.touched.push(uid);
      }
    }

    Ok(outcome)
  }

  /// Entity documents whose binding for `source` names `reference`.
  async fn dependents(
    &self,
    namespace: &str,
    source: SourceType,
    reference: &ForeignId,
  ) -> Result<Vec<Document>> {
    let collection = source.subject().entity_collection(&self.collections);
    match source.binding() {
      Binding::List(path) => self
        .store
        .find_containing(namespace, collection, path, reference.as_str())
        .await
        .map_err(Error::store),
      Binding::Primary(path) => {
        let filter = [FieldMatch::new(path, reference.as_str())];
        self
          .store
          .find(namespace, collection, &filter)
          .await
          .map_err(Error::store)
      }
    }
  }

  async fn fold_in(
    &self,
    namespace: &str,
    source: SourceType,
    entity: &Document,
    uid: &str,
    record: &Document,
  ) -> Result<Option<UpsertResult>> {
    let kind = source.subject();
    let existing = self
      .compositor
      .current(namespace, kind, uid)
      .await?
      .map(|aggregate| sub_array(&aggregate, source))
      .unwrap_or_default();

    let incoming = Value::Object(strip_storage_id(record.clone()));
    let merged = merge::merge(existing, incoming, |v| key_of(source, v));
    let result = self
      .compositor
      .composite(namespace, kind, entity, Patch::field(source, merged))
      .await?;
    Ok(Some(result))
  }

  async fn take_out(
    &self,
    namespace: &str,
    source: SourceType,
    entity: &Document,
    uid: &str,
    identity: &IdentityKey,
  ) -> Result<Option<UpsertResult>> {
    let kind = source.subject();
    let Some(aggregate) = self.compositor.current(namespace, kind, uid).await? else {
      tracing::debug!(namespace, uid, "no aggregate to shrink");
      return Ok(None);
    };

    let remaining = merge::remove(sub_array(&aggregate, source), identity, |v| {
      key_of(source, v)
    });
    let result = self
      .compositor
      .composite(namespace, kind, entity, Patch::field(source, remaining))
      .await?;
    Ok(Some(result))
  }
}

/// Identity key of one aggregate sub-array element, if it carries one.
pub(crate) fn key_of(source: SourceType, element: &Value) -> Option<IdentityKey> {
  element
    .as_object()
    .and_then(|d| IdentityKey::try_extract(d, source.identity_fields()))
}
