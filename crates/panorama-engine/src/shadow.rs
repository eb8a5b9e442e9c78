//! Unwinds pay statement parents into one shadow row per statement line.
//!
//! A parent's `_id` is `companyId.employeeId.year` and its lines live in the
//! embedded `payStatement` array. Each row is keyed by the full parent key
//! plus the line's natural key, and always carries the parent's key fields,
//! so a parent owns exactly the rows its key finds. Rows are diffed against
//! the new array and written row by row, so readers never see the parent's
//! rows vanish while they are being rewritten.

use std::{collections::HashSet, sync::Arc};

use panorama_core::{
  Error as CoreError,
  change::{Change, ChangeEvent},
  config::Collections,
  document::{
    Document, ForeignId, IdentityKey, STORAGE_ID, canonical_text, storage_id,
    strip_storage_id,
  },
  store::{DocumentStore, FieldMatch, UpsertResult},
};
use serde::Serialize;
use serde_json::Value;

use crate::{Error, Result};

/// Embedded array on the parent document.
pub const LINES_FIELD: &str = "payStatement";

/// Parent key fields, in `_id` order.
const PARENT_FIELDS: [&str; 3] = ["companyId", "employeeId", "year"];

/// What distinguishes one line from its siblings under the same parent.
const LINE_FIELDS: [&str; 3] = ["transactionNumber", "detCode", "detType"];

/// Where a line's own `year` is kept when it disagrees with its parent's.
pub const LINE_YEAR_FIELD: &str = "lineYear";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UnwindReport {
  /// Rows inserted or changed.
  pub upserted: usize,
  pub deleted:  usize,
}

/// The parent a set of shadow rows hangs off.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ParentKey {
  company:  String,
  employee: String,
  year:     String,
}

impl ParentKey {
  fn of(parent: &Document) -> Result<Self> {
    let id = ForeignId::new(storage_id(parent)?);
    let parts = id.parts(PARENT_FIELDS.len())?;
    Ok(Self {
      company:  parts[0].to_owned(),
      employee: parts[1].to_owned(),
      year:     parts[2].to_owned(),
    })
  }

  fn filter(&self) -> Vec<FieldMatch> {
    PARENT_FIELDS
      .iter()
      .zip([&self.company, &self.employee, &self.year])
      .map(|(f, v)| FieldMatch::new(*f, v.as_str()))
      .collect()
  }

  fn row_id(&self, line: &IdentityKey) -> String {
    IdentityKey::new(vec![
      self.company.clone(),
      self.employee.clone(),
      self.year.clone(),
    ])
    .join(line)
    .to_string()
  }
}

pub struct ShadowUnwinder<S> {
  store:       Arc<S>,
  collections: Arc<Collections>,
}

impl<S> Clone for ShadowUnwinder<S> {
  fn clone(&self) -> Self {
    Self {
      store:       Arc::clone(&self.store),
      collections: Arc::clone(&self.collections),
    }
  }
}

impl<S: DocumentStore> ShadowUnwinder<S> {
  pub fn new(store: Arc<S>, collections: Arc<Collections>) -> Self {
    Self { store, collections }
  }

  pub async fn handle(
    &self,
    namespace: &str,
    event: &ChangeEvent,
  ) -> Result<UnwindReport> {
    match event.classify()? {
      Change::Delete(before) => {
        let parent = ParentKey::of(before)?;
        let existing = self.rows_of(namespace, &parent).await?;
        let mut report = UnwindReport::default();
        for row in &existing {
          if self.delete_row(namespace, row).await? {
            report.deleted += 1;
          }
        }
        tracing::info!(namespace, ?report, "shadow rows removed with parent");
        Ok(report)
      }
      Change::Upsert(after) => self.unwind(namespace, after).await,
    }
  }

  async fn unwind(&self, namespace: &str, parent_doc: &Document) -> Result<UnwindReport> {
    let parent = ParentKey::of(parent_doc)?;
    let lines = lines_of(parent_doc)?;

    let mut keyed = Vec::with_capacity(lines.len());
    for line in lines {
      let key = IdentityKey::extract(&line, &LINE_FIELDS)?;
      keyed.push((key, line));
    }
    let wanted: HashSet<&IdentityKey> = keyed.iter().map(|(k, _)| k).collect();

    let mut report = UnwindReport::default();

    // Diff first: rows whose line disappeared are removed.
    for row in self.rows_of(namespace, &parent).await? {
      let keep = IdentityKey::try_extract(&row, &LINE_FIELDS)
        .is_some_and(|k| wanted.contains(&k));
      if !keep && self.delete_row(namespace, &row).await? {
        report.deleted += 1;
      }
    }

    let collection = &self.collections.paylocity_pay_statement;
    for (key, line) in keyed {
      let row_id = parent.row_id(&key);
      let row = stamp(line, &parent);
      let result = self
        .store
        .replace(namespace, collection, &row_id, row)
        .await
        .map_err(Error::store)?;
      if result != UpsertResult::Unchanged {
        report.upserted += 1;
      }
    }

    tracing::info!(
      namespace,
      company = parent.company,
      employee = parent.employee,
      year = parent.year,
      ?report,
      "pay statements unwound"
    );
    Ok(report)
  }

  async fn rows_of(&self, namespace: &str, parent: &ParentKey) -> Result<Vec<Document>> {
    let filter = parent.filter();
    self
      .store
      .find(namespace, &self.collections.paylocity_pay_statement, &filter)
      .await
      .map_err(Error::store)
  }

  async fn delete_row(&self, namespace: &str, row: &Document) -> Result<bool> {
    let id = storage_id(row)?;
    tracing::debug!(namespace, id, "deleting stale shadow row");
    self
      .store
      .delete(namespace, &self.collections.paylocity_pay_statement, &id)
      .await
      .map_err(Error::store)
  }
}

/// The embedded lines of a parent; a missing array means no lines.
fn lines_of(parent: &Document) -> Result<Vec<Document>> {
  match parent.get(LINES_FIELD) {
    None | Some(Value::Null) => Ok(Vec::new()),
    Some(Value::Array(items)) => items
      .iter()
      .map(|item| match item {
        Value::Object(line) => Ok(line.clone()),
        _ => Err(Error::from(CoreError::InvalidField {
          field:    LINES_FIELD.to_owned(),
          expected: "an array of objects",
        })),
      })
      .collect(),
    Some(_) => Err(Error::from(CoreError::InvalidField {
      field:    LINES_FIELD.to_owned(),
      expected: "an array of objects",
    })),
  }
}

/// Tag a line with its parent key so the row is found by exactly that parent.
fn stamp(line: Document, parent: &ParentKey) -> Document {
  let mut row = strip_storage_id(line);
  row.insert("companyId".into(), Value::from(parent.company.as_str()));
  row.insert("employeeId".into(), Value::from(parent.employee.as_str()));
  let own_year = row.insert("year".into(), Value::from(parent.year.as_str()));
  if let Some(year) = own_year
    && !year.is_null()
    && canonical_text(&year).as_deref() != Some(parent.year.as_str())
  {
    row.insert(LINE_YEAR_FIELD.into(), year);
  }
  debug_assert!(!row.contains_key(STORAGE_ID));
  row
}

#[cfg(test)]
mod tests {
  use panorama_core::document::into_document;
  use serde_json::json;

  use super::*;

  fn doc(value: Value) -> Document { into_document(value).unwrap() }

  #[test]
  fn parent_key_splits_storage_id() {
    let parent = ParentKey::of(&doc(json!({ "_id": "ACME.42.2021" }))).unwrap();
    assert_eq!(parent.company, "ACME");
    assert_eq!(parent.year, "2021");

    let line = IdentityKey::new(vec!["9".into(), "REG".into(), "E".into()]);
    assert_eq!(parent.row_id(&line), "ACME.42.2021.9.REG.E");
  }

  #[test]
  fn parent_key_rejects_short_ids() {
    assert!(ParentKey::of(&doc(json!({ "_id": "ACME.42" }))).is_err());
  }

  #[test]
  fn stamp_always_takes_parent_key() {
    let parent = ParentKey::of(&doc(json!({ "_id": "ACME.42.2021" }))).unwrap();

    let row = stamp(doc(json!({ "_id": "x", "year": 2020, "employeeId": "old" })), &parent);
    assert_eq!(row["year"], json!("2021"));
    assert_eq!(row[LINE_YEAR_FIELD], json!(2020));
    assert_eq!(row["employeeId"], json!("42"));
    assert!(!row.contains_key(STORAGE_ID));

    let row = stamp(doc(json!({ "year": 2021 })), &parent);
    assert_eq!(row["year"], json!("2021"));
    assert!(!row.contains_key(LINE_YEAR_FIELD));

    let row = stamp(doc(json!({})), &parent);
    assert_eq!(row["year"], json!("2021"));
  }

  #[test]
  fn lines_default_to_empty() {
    assert!(lines_of(&doc(json!({ "_id": "a.b.c" }))).unwrap().is_empty());
    assert!(lines_of(&doc(json!({ "payStatement": null }))).unwrap().is_empty());
    assert!(lines_of(&doc(json!({ "payStatement": [1] }))).is_err());
    assert!(lines_of(&doc(json!({ "payStatement": {} }))).is_err());
  }
}
