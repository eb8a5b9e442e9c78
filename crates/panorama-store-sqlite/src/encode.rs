//! Encoding and decoding helpers between documents and the plain-text
//! representations stored in SQLite columns.
//!
//! Bodies are compact JSON. Timestamps are RFC 3339 strings. Dotted field
//! paths become quoted JSON1 paths so any key is addressable.

use chrono::{DateTime, Utc};
use panorama_core::document::{Document, STORAGE_ID, into_document};
use serde_json::Value;

use crate::Result;

// ─── Bodies ──────────────────────────────────────────────────────────────────

pub fn encode_body(doc: &Document) -> Result<String> {
  Ok(serde_json::to_string(doc)?)
}

pub fn decode_body(s: &str) -> Result<Document> {
  let value: Value = serde_json::from_str(s)?;
  Ok(into_document(value)?)
}

/// Ensure a document about to be written carries its storage key.
pub fn with_storage_id(mut doc: Document, id: &str) -> Document {
  doc
    .entry(STORAGE_ID)
    .or_insert_with(|| Value::String(id.to_owned()));
  doc
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

// ─── Paths ───────────────────────────────────────────────────────────────────

/// `after.primary_paylocity_reference` → `$."after"."primary_paylocity_reference"`
pub fn json_path(path: &str) -> String {
  let mut out = String::from("$");
  for segment in path.split('.') {
    out.push_str(".\"");
    out.push_str(&segment.replace('"', "\\\""));
    out.push('"');
  }
  out
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw JSON text read directly from a `documents` row.
pub struct RawDocument {
  pub body: String,
}

impl RawDocument {
  pub fn into_document(self) -> Result<Document> { decode_body(&self.body) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn json_path_quotes_every_segment() {
    assert_eq!(json_path("id"), r#"$."id""#);
    assert_eq!(json_path("after.id"), r#"$."after"."id""#);
  }

  #[test]
  fn storage_id_is_only_added_when_missing() {
    let doc = with_storage_id(Document::new(), "W1");
    assert_eq!(doc[STORAGE_ID], Value::String("W1".into()));

    let mut numeric = Document::new();
    numeric.insert(STORAGE_ID.into(), Value::from(5));
    let kept = with_storage_id(numeric, "5");
    assert_eq!(kept[STORAGE_ID], Value::from(5));
  }

  #[test]
  fn decode_rejects_non_object_bodies() {
    assert!(decode_body("[1, 2]").is_err());
    assert!(decode_body(r#"{"_id":"a"}"#).is_ok());
  }
}
