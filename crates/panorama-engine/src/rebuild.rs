//! Full rebuild: rewrite every entity document so each aggregate is
//! recomputed from scratch.

use std::sync::Arc;

use chrono::Utc;
use panorama_core::{
  change::ChangeEvent,
  config::{Collections, RebuildSettings},
  document::{Document, storage_id},
  source::SubjectKind,
  store::DocumentStore,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result, entity::EntityDispatcher};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RebuildMode {
  /// Rewrite only; the store's change feed re-fires the entity dispatcher.
  #[default]
  Touch,
  /// Rewrite, then run the entity dispatcher directly.
  Inline,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RebuildReport {
  pub touched:    usize,
  pub dispatched: usize,
}

pub struct RebuildJob<S> {
  store:       Arc<S>,
  collections: Arc<Collections>,
  settings:    RebuildSettings,
  entities:    EntityDispatcher<S>,
}

impl<S> RebuildJob<S>
where
  S: DocumentStore + 'static,
{
  pub fn new(
    store: Arc<S>,
    collections: Arc<Collections>,
    settings: RebuildSettings,
  ) -> Self {
    let entities = EntityDispatcher::new(Arc::clone(&store), Arc::clone(&collections));
    Self { store, collections, settings, entities }
  }

  /// Each entity gets an independent single-field upsert, so live traffic
  /// may interleave. Only the refresh stamp is written; the rest of the
  /// entity is never rewritten from the listing.
  pub async fn run(
    &self,
    namespace: &str,
    kind: SubjectKind,
    mode: RebuildMode,
  ) -> Result<RebuildReport> {
    let collection = kind.entity_collection(&self.collections);
    let documents = self
      .store
      .list(namespace, collection)
      .await
      .map_err(Error::store)?;
    tracing::info!(namespace, %kind, count = documents.len(), ?mode, "rebuild started");

    let mut report = RebuildReport::default();
    for listed in documents {
      let id = storage_id(&listed)?;
      // A stamp must not resurrect an entity deleted since the listing.
      if self.current(namespace, collection, &id).await?.is_none() {
        tracing::debug!(namespace, %kind, id, "entity deleted during rebuild");
        continue;
      }

      if self.settings.stamp_refresh {
        let mut stamp = Document::new();
        stamp.insert(
          self.settings.refresh_field.clone(),
          Value::from(Utc::now().timestamp_millis()),
        );
        self
          .store
          .upsert_fields(namespace, collection, &id, stamp)
          .await
          .map_err(Error::store)?;
      }
      report.touched += 1;

      if mode == RebuildMode::Inline {
        // Dispatch from the image as it is now, not as it was listed.
        let Some(current) = self.current(namespace, collection, &id).await? else {
          continue;
        };
        self
          .entities
          .handle(namespace, kind, &ChangeEvent::upsert(current))
          .await?;
        report.dispatched += 1;
      }
    }

    tracing::info!(namespace, %kind, ?report, "rebuild finished");
    Ok(report)
  }

  async fn current(
    &self,
    namespace: &str,
    collection: &str,
    id: &str,
  ) -> Result<Option<Document>> {
    self
      .store
      .get(namespace, collection, id)
      .await
      .map_err(Error::store)
  }
}
