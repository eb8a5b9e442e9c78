//! Error types for `panorama-core`.
//!
//! Everything here is malformed input: the engine fails fast on these rather
//! than writing a partial aggregate.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("missing required field: {0}")]
  MissingField(String),

  #[error("field {field} has an unexpected shape: expected {expected}")]
  InvalidField {
    field:    String,
    expected: &'static str,
  },

  #[error("reference {reference:?} does not split into {parts} parts")]
  MalformedReference { reference: String, parts: usize },

  #[error("delete notification for {0} carries no before-image")]
  MissingBeforeImage(String),

  #[error("unknown subject kind: {0:?}")]
  UnknownSubject(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
