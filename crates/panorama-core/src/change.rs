//! Change notifications as delivered by the store's change feed.
//!
//! The wire shape is `{ documentKey, fullDocument?, fullDocumentBeforeChange? }`.
//! There is no operation type: a missing `fullDocument` means the document was
//! deleted and `fullDocumentBeforeChange` carries its last image.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Error, Result,
  document::{Document, STORAGE_ID},
};

/// One change notification for one document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEvent {
  /// Usually `{ "_id": ... }`; only used for diagnostics.
  #[serde(default)]
  pub document_key:                Value,
  #[serde(default)]
  pub full_document:               Option<Document>,
  #[serde(default)]
  pub full_document_before_change: Option<Document>,
}

/// A classified notification, borrowing the relevant image.
#[derive(Debug, Clone, Copy)]
pub enum Change<'a> {
  /// Insert, update or replace: the after-image.
  Upsert(&'a Document),
  /// Delete: the before-image.
  Delete(&'a Document),
}

impl ChangeEvent {
  /// Build an insert/update notification for `doc`.
  pub fn upsert(doc: Document) -> Self {
    Self {
      document_key:                key_of(&doc),
      full_document:               Some(doc),
      full_document_before_change: None,
    }
  }

  /// Build a delete notification carrying `before` as the pre-delete image.
  pub fn delete(before: Document) -> Self {
    Self {
      document_key:                key_of(&before),
      full_document:               None,
      full_document_before_change: Some(before),
    }
  }

  /// Decide which propagation path this notification takes.
  ///
  /// A delete without a before-image is malformed: the engine cannot tell
  /// which aggregate slice to shrink, so it fails instead of guessing.
  pub fn classify(&self) -> Result<Change<'_>> {
    match (&self.full_document, &self.full_document_before_change) {
      (Some(after), _) => Ok(Change::Upsert(after)),
      (None, Some(before)) => Ok(Change::Delete(before)),
      (None, None) => Err(Error::MissingBeforeImage(self.key_text())),
    }
  }

  /// A printable form of the document key for log lines.
  pub fn key_text(&self) -> String {
    match self.document_key.get(STORAGE_ID) {
      Some(Value::String(s)) => s.clone(),
      Some(other) => other.to_string(),
      None => self.document_key.to_string(),
    }
  }
}

fn key_of(doc: &Document) -> Value {
  match doc.get(STORAGE_ID) {
    Some(id) => {
      let mut key = Document::new();
      key.insert(STORAGE_ID.to_owned(), id.clone());
      Value::Object(key)
    }
    None => Value::Null,
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  #[test]
  fn deserialises_wire_shape_with_missing_after_image() {
    let event: ChangeEvent = serde_json::from_value(json!({
      "documentKey": { "_id": "abc" },
      "fullDocumentBeforeChange": { "_id": "abc", "id": 77 }
    }))
    .unwrap();

    assert_eq!(event.key_text(), "abc");
    match event.classify().unwrap() {
      Change::Delete(before) => assert_eq!(before["id"], json!(77)),
      Change::Upsert(_) => panic!("expected a delete"),
    }
  }

  #[test]
  fn explicit_null_after_image_is_a_delete() {
    let event: ChangeEvent = serde_json::from_value(json!({
      "documentKey": { "_id": 5 },
      "fullDocument": null,
      "fullDocumentBeforeChange": { "_id": 5 }
    }))
    .unwrap();
    assert!(matches!(event.classify().unwrap(), Change::Delete(_)));
    assert_eq!(event.key_text(), "5");
  }

  #[test]
  fn delete_without_before_image_is_rejected() {
    let event: ChangeEvent =
      serde_json::from_value(json!({ "documentKey": { "_id": "gone" } })).unwrap();
    assert!(matches!(
      event.classify(),
      Err(Error::MissingBeforeImage(k)) if k == "gone"
    ));
  }

  #[test]
  fn upsert_constructor_sets_document_key() {
    let doc = json!({ "_id": "W1", "after": {} });
    let event = ChangeEvent::upsert(doc.as_object().unwrap().clone());
    assert_eq!(event.document_key, json!({ "_id": "W1" }));
    assert!(matches!(event.classify().unwrap(), Change::Upsert(_)));
  }
}
