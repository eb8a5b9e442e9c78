//! Incremental materialization of the Worker and Client 360 aggregates.
//!
//! [`Engine`] routes each change notification to the component registered
//! for its collection:
//!
//! | Collection            | Component                               |
//! |-----------------------|-----------------------------------------|
//! | entity (`workersEntity`, `clientsEntity`) | [`entity::EntityDispatcher`] |
//! | source (`bullhornCandidate`, ...)         | [`dispatch::ChangeDispatcher`] |
//! | pay statement parents                     | [`shadow::ShadowUnwinder`]     |
//!
//! Every aggregate write goes through [`compositor::Compositor`].

pub mod compositor;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod projection;
pub mod rebuild;
pub mod resolver;
pub mod shadow;


use std::sync::Arc;

use panorama_core::{
  change::ChangeEvent,
  config::{Collections, RebuildSettings},
  source::{SourceType, SubjectKind},
  store::DocumentStore,
};
use serde::Serialize;

pub use error::{Error, Result};

use dispatch::{ChangeDispatcher, DispatchOutcome};
use entity::{EntityDispatcher, EntityOutcome};
use rebuild::{RebuildJob, RebuildMode, RebuildReport};
use shadow::{ShadowUnwinder, UnwindReport};

/// Which component owns a collection's notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
  Entity(SubjectKind),
  Source(SourceType),
  ShadowParent,
}

/// The result of handling one notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "route", rename_all = "snake_case")]
pub enum Outcome {
  Entity(EntityOutcome),
  Source(DispatchOutcome),
  ShadowParent(UnwindReport),
}

pub struct Engine<S> {
  store:       Arc<S>,
  collections: Arc<Collections>,
  changes:     ChangeDispatcher<S>,
  entities:    EntityDispatcher<S>,
  shadow:      ShadowUnwinder<S>,
  rebuild:     RebuildJob<S>,
}

impl<S> Engine<S>
where
  S: DocumentStore + 'static,
{
  pub fn new(store: Arc<S>, collections: Collections, rebuild: RebuildSettings) -> Self {
    let collections = Arc::new(collections);
    Self {
      changes: ChangeDispatcher::new(Arc::clone(&store), Arc::clone(&collections)),
      entities: EntityDispatcher::new(Arc::clone(&store), Arc::clone(&collections)),
      shadow: ShadowUnwinder::new(Arc::clone(&store), Arc::clone(&collections)),
      rebuild: RebuildJob::new(Arc::clone(&store), Arc::clone(&collections), rebuild),
      store,
      collections,
    }
  }

  pub fn store(&self) -> &Arc<S> { &self.store }

  pub fn collections(&self) -> &Collections { &self.collections }

  /// Find the component registered for `collection`.
  pub fn route(&self, collection: &str) -> Option<Route> {
    let c = &*self.collections;
    if let Some(kind) = SubjectKind::ALL
      .into_iter()
      .find(|k| k.entity_collection(c) == collection)
    {
      return Some(Route::Entity(kind));
    }
    if let Some(source) = SourceType::ALL
      .into_iter()
      .find(|s| s.collection(c) == collection)
    {
      return Some(Route::Source(source));
    }
    (collection == c.paylocity_pay_statements).then_some(Route::ShadowParent)
  }

  /// Process one change notification on `collection` in `namespace`.
  pub async fn handle(
    &self,
    namespace: &str,
    collection: &str,
    event: &ChangeEvent,
  ) -> Result<Outcome> {
    let route = self
      .route(collection)
      .ok_or_else(|| Error::UnknownCollection(collection.to_owned()))?;
    tracing::debug!(namespace, collection, key = event.key_text(), ?route, "change received");

    Ok(match route {
      Route::Entity(kind) => {
        Outcome::Entity(self.entities.handle(namespace, kind, event).await?)
      }
      Route::Source(source) => {
        Outcome::Source(self.changes.handle(namespace, source, event).await?)
      }
      Route::ShadowParent => {
        Outcome::ShadowParent(self.shadow.handle(namespace, event).await?)
      }
    })
  }

  pub async fn rebuild(
    &self,
    namespace: &str,
    kind: SubjectKind,
    mode: RebuildMode,
  ) -> Result<RebuildReport> {
    self.rebuild.run(namespace, kind, mode).await
  }
}
