//! Error types for `panorama-engine`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// Malformed input. Fails the invocation before anything is written.
  #[error(transparent)]
  Core(#[from] panorama_core::Error),

  /// The backing store failed; the notification should be redelivered.
  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("dispatch branch failed: {0}")]
  Join(#[from] tokio::task::JoinError),

  #[error("no dispatcher registered for collection {0:?}")]
  UnknownCollection(String),
}

impl Error {
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
