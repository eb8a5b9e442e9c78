//! The JSON document model shared by entity, source, aggregate and shadow
//! collections.
//!
//! Upstream payloads are schemaless, so documents stay as JSON objects. The
//! engine only ever reads the handful of fields named in
//! [`crate::source::SourceType`] and [`crate::source::SubjectKind`].

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Error, Result};

/// A stored document: a JSON object that carries its storage key in `_id`.
pub type Document = serde_json::Map<String, Value>;

/// The storage-internal key field present on every stored document.
pub const STORAGE_ID: &str = "_id";

// ─── Field access ────────────────────────────────────────────────────────────

/// Walk a dotted path (`after.primary_paylocity_reference`) through nested
/// objects. Returns `None` as soon as a segment is missing or not an object.
pub fn field<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
  let mut segments = path.split('.');
  let first = segments.next()?;
  let mut current = doc.get(first)?;
  for segment in segments {
    current = current.as_object()?.get(segment)?;
  }
  Some(current)
}

/// Like [`field`], but `null` counts as absent.
pub fn present<'a>(doc: &'a Document, path: &str) -> Option<&'a Value> {
  field(doc, path).filter(|v| !v.is_null())
}

/// Canonical text form of a scalar identifier.
///
/// Upstream systems disagree on whether ids are numbers or strings, so every
/// identity comparison goes through this: `77` and `"77"` are the same id.
pub fn canonical_text(value: &Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s.clone()),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

/// Read a required scalar field in canonical text form.
pub fn required_text(doc: &Document, path: &str) -> Result<String> {
  let value =
    present(doc, path).ok_or_else(|| Error::MissingField(path.to_owned()))?;
  canonical_text(value).ok_or_else(|| Error::InvalidField {
    field:    path.to_owned(),
    expected: "a string or number",
  })
}

/// The storage key of a document in canonical text form.
pub fn storage_id(doc: &Document) -> Result<String> {
  required_text(doc, STORAGE_ID)
}

/// Drop the storage-internal `_id`, keeping the record's natural identity
/// fields. This is the shape source records take inside an aggregate.
pub fn strip_storage_id(mut doc: Document) -> Document {
  doc.remove(STORAGE_ID);
  doc
}

/// Interpret an arbitrary JSON value as a document.
pub fn into_document(value: Value) -> Result<Document> {
  match value {
    Value::Object(map) => Ok(map),
    _ => Err(Error::InvalidField {
      field:    "<document>".to_owned(),
      expected: "a JSON object",
    }),
  }
}

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// A foreign identifier as listed on an entity document, in canonical text
/// form. Composite ids use `.` between parts (`company.employee`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForeignId(String);

impl ForeignId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }

  /// Split a composite id into exactly `n` non-empty parts. The last part
  /// keeps any further `.` characters.
  pub fn parts(&self, n: usize) -> Result<Vec<&str>> {
    let parts: Vec<&str> = self.0.splitn(n, '.').collect();
    if parts.len() != n || parts.iter().any(|p| p.is_empty()) {
      return Err(Error::MalformedReference {
        reference: self.0.clone(),
        parts:     n,
      });
    }
    Ok(parts)
  }

  /// Parse a JSON scalar into a foreign id.
  pub fn from_value(value: &Value, field: &str) -> Result<Self> {
    canonical_text(value).map(Self).ok_or_else(|| Error::InvalidField {
      field:    field.to_owned(),
      expected: "a string or number id",
    })
  }
}

impl fmt::Display for ForeignId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

/// The identity of a record inside an aggregate sub-array (or a shadow row):
/// the canonical text of each identity field, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IdentityKey(Vec<String>);

impl IdentityKey {
  pub fn new(parts: Vec<String>) -> Self { Self(parts) }

  pub fn parts(&self) -> &[String] { &self.0 }

  /// Extract the key from `doc`; every field is required.
  pub fn extract(doc: &Document, fields: &[&str]) -> Result<Self> {
    fields
      .iter()
      .map(|f| required_text(doc, f))
      .collect::<Result<Vec<_>>>()
      .map(Self)
  }

  /// Extract the key when every field is present; `None` otherwise.
  pub fn try_extract(doc: &Document, fields: &[&str]) -> Option<Self> {
    fields
      .iter()
      .map(|f| present(doc, f).and_then(canonical_text))
      .collect::<Option<Vec<_>>>()
      .map(Self)
  }

  /// Concatenate two keys (parent key followed by child key).
  pub fn join(&self, other: &IdentityKey) -> IdentityKey {
    let mut parts = self.0.clone();
    parts.extend(other.0.iter().cloned());
    IdentityKey(parts)
  }
}

impl fmt::Display for IdentityKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0.join("."))
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn doc(value: Value) -> Document { into_document(value).unwrap() }

  #[test]
  fn field_walks_nested_objects() {
    let d = doc(json!({ "after": { "id": "W1", "refs": [1, 2] } }));
    assert_eq!(field(&d, "after.id"), Some(&json!("W1")));
    assert_eq!(field(&d, "after.refs"), Some(&json!([1, 2])));
    assert_eq!(field(&d, "after.missing"), None);
    assert_eq!(field(&d, "after.id.deeper"), None);
  }

  #[test]
  fn numbers_and_strings_share_canonical_text() {
    assert_eq!(canonical_text(&json!(77)), canonical_text(&json!("77")));
    assert_eq!(canonical_text(&json!(null)), None);
    assert_eq!(canonical_text(&json!({ "a": 1 })), None);
  }

  #[test]
  fn composite_reference_splits_on_first_dot() {
    let id = ForeignId::new("ACME.00042");
    assert_eq!(id.parts(2).unwrap(), vec!["ACME", "00042"]);

    let parent = ForeignId::new("ACME.00042.2021");
    assert_eq!(parent.parts(3).unwrap(), vec!["ACME", "00042", "2021"]);
  }

  #[test]
  fn composite_reference_rejects_wrong_arity() {
    assert!(matches!(
      ForeignId::new("ACME").parts(2),
      Err(Error::MalformedReference { parts: 2, .. })
    ));
    assert!(ForeignId::new("ACME.").parts(2).is_err());
  }

  #[test]
  fn identity_key_requires_every_field() {
    let d = doc(json!({ "companyId": "ACME", "employeeId": 42 }));
    let key = IdentityKey::extract(&d, &["companyId", "employeeId"]).unwrap();
    assert_eq!(key.to_string(), "ACME.42");

    let err = IdentityKey::extract(&d, &["companyId", "detCode"]).unwrap_err();
    assert!(matches!(err, Error::MissingField(f) if f == "detCode"));
    assert!(IdentityKey::try_extract(&d, &["detCode"]).is_none());
  }

  #[test]
  fn non_object_documents_are_malformed_input() {
    for value in [json!([1]), json!("W1"), json!(null)] {
      assert!(matches!(
        into_document(value),
        Err(Error::InvalidField { expected: "a JSON object", .. })
      ));
    }
  }

  #[test]
  fn strip_storage_id_keeps_natural_fields() {
    let d = doc(json!({ "_id": "abc", "id": 77, "name": "X" }));
    assert_eq!(
      Value::Object(strip_storage_id(d)),
      json!({ "id": 77, "name": "X" })
    );
  }
}
