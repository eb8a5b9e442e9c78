//! Entity-level propagation: recompute every sub-array of one aggregate from
//! the entity's current reference lists.

use std::sync::Arc;

use panorama_core::{
  change::{Change, ChangeEvent},
  config::Collections,
  document::{Document, ForeignId},
  source::{SourceType, SubjectKind},
  store::{DocumentStore, UpsertResult},
};
use serde::Serialize;
use tokio::task::JoinSet;

use crate::{
  Result,
  compositor::{Compositor, Patch},
  projection::universal_id,
  resolver::Resolver,
};

/// One recomputed sub-array.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldOutcome {
  pub source:  SourceType,
  pub records: usize,
  pub missing: Vec<ForeignId>,
  pub result:  UpsertResult,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EntityOutcome {
  /// Sub-arrays in the order `SubjectKind::sources` declares them.
  Composed { uid: String, fields: Vec<FieldOutcome> },
  Removed { uid: String, existed: bool },
}

pub struct EntityDispatcher<S> {
  resolver:   Resolver<S>,
  compositor: Compositor<S>,
}

impl<S> Clone for EntityDispatcher<S> {
  fn clone(&self) -> Self {
    Self {
      resolver:   self.resolver.clone(),
      compositor: self.compositor.clone(),
    }
  }
}

impl<S> EntityDispatcher<S>
where
  S: DocumentStore + 'static,
{
  pub fn new(store: Arc<S>, collections: Arc<Collections>) -> Self {
    Self {
      resolver:   Resolver::new(Arc::clone(&store), Arc::clone(&collections)),
      compositor: Compositor::new(store, collections),
    }
  }

  pub async fn handle(
    &self,
    namespace: &str,
    kind: SubjectKind,
    event: &ChangeEvent,
  ) -> Result<EntityOutcome> {
    match event.classify()? {
      Change::Delete(before) => {
        let uid = universal_id(before)?;
        let existed = self.compositor.remove(namespace, kind, &uid).await?;
        tracing::info!(namespace, %kind, uid, existed, "aggregate removed");
        Ok(EntityOutcome::Removed { uid, existed })
      }
      Change::Upsert(entity) => self.recompose(namespace, kind, entity).await,
    }
  }

  /// Resolve every binding of `kind` concurrently, one composite per
  /// sub-array, and wait for all of them.
  async fn recompose(
    &self,
    namespace: &str,
    kind: SubjectKind,
    entity: &Document,
  ) -> Result<EntityOutcome> {
    let uid = universal_id(entity)?;

    // Read every binding up front so a malformed list fails the invocation
    // before any branch writes.
    let mut branches = Vec::with_capacity(kind.sources().len());
    for &source in kind.sources() {
      let ids = source.binding().references(entity)?;
      for id in &ids {
        source.lookup_filter(id)?;
      }
      branches.push((source, ids));
    }

    let entity = Arc::new(entity.clone());
    let namespace: Arc<str> = Arc::from(namespace);
    let mut join_set: JoinSet<Result<FieldOutcome>> = JoinSet::new();

    for (source, ids) in branches {
      let resolver = self.resolver.clone();
      let compositor = self.compositor.clone();
      let entity = Arc::clone(&entity);
      let namespace = Arc::clone(&namespace);

      join_set.spawn(async move {
        // An empty list still writes, clearing whatever was stored.
        let resolution = if ids.is_empty() {
          Default::default()
        } else {
          resolver.resolve(&namespace, source, &ids).await?
        };
        let records = resolution.records.len();
        let result = compositor
          .composite(&namespace, kind, &entity, Patch::field(source, resolution.records))
          .await?;
        Ok(FieldOutcome {
          source,
          records,
          missing: resolution.missing,
          result,
        })
      });
    }

    let mut fields = Vec::with_capacity(join_set.len());
    while let Some(joined) = join_set.join_next().await {
      fields.push(joined??);
    }
    fields.sort_by_key(|f| {
      kind.sources().iter().position(|s| *s == f.source)
    });

    tracing::info!(
      namespace = &*namespace,
      %kind,
      uid,
      missing = fields.iter().map(|f| f.missing.len()).sum::<usize>(),
      "aggregate recomposed"
    );
    Ok(EntityOutcome::Composed { uid, fields })
  }
}
