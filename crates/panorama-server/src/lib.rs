//! HTTP surface for the Panorama engine.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/{namespace}/changes/{collection}` | Body: a change notification |
//! | `POST` | `/{namespace}/rebuild/{subject}` | Optional `?inline=true` |
//! | `GET`  | `/{namespace}/aggregates/{subject}/{id}` | 404 if absent |
//! | `GET`  | `/health` | Liveness |
//!
//! A failed change request is safe to redeliver: every write the engine makes
//! is an idempotent upsert.

pub mod error;
pub mod settings;

use std::sync::Arc;

use axum::{
  Json, Router,
  body::Bytes,
  extract::{Path, Query, State},
  routing::{get, post},
};
use panorama_core::{
  change::ChangeEvent,
  document::Document,
  source::SubjectKind,
  store::DocumentStore,
};
use panorama_engine::{
  Engine, Outcome,
  rebuild::{RebuildMode, RebuildReport},
};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use settings::Settings;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
pub struct AppState<S> {
  pub engine: Arc<Engine<S>>,
}

impl<S> Clone for AppState<S> {
  fn clone(&self) -> Self { Self { engine: Arc::clone(&self.engine) } }
}

// ─── Router ───────────────────────────────────────────────────────────────────

pub fn router<S>(state: AppState<S>) -> Router
where
  S: DocumentStore + 'static,
{
  Router::new()
    .route("/health", get(health))
    .route("/{namespace}/changes/{collection}", post(changes::<S>))
    .route("/{namespace}/rebuild/{subject}", post(rebuild::<S>))
    .route("/{namespace}/aggregates/{subject}/{id}", get(aggregate::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

fn subject(raw: &str) -> Result<SubjectKind, ApiError> {
  raw.parse().map_err(|_| ApiError::NotFound(format!("subject {raw:?}")))
}

// ─── Handlers ─────────────────────────────────────────────────────────────────

async fn health() -> Json<Value> { Json(json!({ "status": "ok" })) }

/// `POST /{namespace}/changes/{collection}`
async fn changes<S>(
  State(state): State<AppState<S>>,
  Path((namespace, collection)): Path<(String, String)>,
  body: Bytes,
) -> Result<Json<Outcome>, ApiError>
where
  S: DocumentStore + 'static,
{
  let event: ChangeEvent = serde_json::from_slice(&body)
    .map_err(|e| ApiError::Unprocessable(e.to_string()))?;
  let outcome = state.engine.handle(&namespace, &collection, &event).await?;
  Ok(Json(outcome))
}

#[derive(Debug, Default, Deserialize)]
struct RebuildParams {
  #[serde(default)]
  inline: bool,
}

/// `POST /{namespace}/rebuild/{subject}[?inline=true]`
async fn rebuild<S>(
  State(state): State<AppState<S>>,
  Path((namespace, subject_name)): Path<(String, String)>,
  Query(params): Query<RebuildParams>,
) -> Result<Json<RebuildReport>, ApiError>
where
  S: DocumentStore + 'static,
{
  let kind = subject(&subject_name)?;
  let mode = if params.inline { RebuildMode::Inline } else { RebuildMode::Touch };
  let report = state.engine.rebuild(&namespace, kind, mode).await?;
  Ok(Json(report))
}

/// `GET /{namespace}/aggregates/{subject}/{id}`
async fn aggregate<S>(
  State(state): State<AppState<S>>,
  Path((namespace, subject_name, id)): Path<(String, String, String)>,
) -> Result<Json<Document>, ApiError>
where
  S: DocumentStore + 'static,
{
  let kind = subject(&subject_name)?;
  let collection = kind.aggregate_collection(state.engine.collections());
  state
    .engine
    .store()
    .get(&namespace, collection, &id)
    .await
    .map_err(|e| ApiError::Store(Box::new(e)))?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("{kind} aggregate {id}")))
}
