//! The closed set of subject kinds and upstream source types.
//!
//! Each [`SourceType`] statically declares where its records live, how an
//! entity document refers to them, which aggregate field holds them, and how
//! to extract a record's identity. Components iterate this table instead of
//! switching on field names at runtime.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Error, Result,
  config::Collections,
  document::{Document, ForeignId, IdentityKey, present},
  store::FieldMatch,
};

/// Path to the universal id on an entity document.
pub const ENTITY_ID: &str = "after.id";

// ─── SubjectKind ─────────────────────────────────────────────────────────────

/// The kind of subject an aggregate describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
  Worker,
  Client,
}

impl SubjectKind {
  pub const ALL: [SubjectKind; 2] = [SubjectKind::Worker, SubjectKind::Client];

  pub fn as_str(self) -> &'static str {
    match self {
      Self::Worker => "worker",
      Self::Client => "client",
    }
  }

  /// The source types whose records are folded into this subject's aggregate.
  pub fn sources(self) -> &'static [SourceType] {
    match self {
      Self::Worker => &[
        SourceType::BullhornCandidate,
        SourceType::PaylocityEmployee,
        SourceType::PaylocityPayStatement,
      ],
      Self::Client => &[
        SourceType::BullhornClientCorporation,
        SourceType::SalesforceAccount,
        SourceType::NetsuiteCustomer,
      ],
    }
  }

  pub fn entity_collection(self, c: &Collections) -> &str {
    match self {
      Self::Worker => &c.workers_entity,
      Self::Client => &c.clients_entity,
    }
  }

  pub fn aggregate_collection(self, c: &Collections) -> &str {
    match self {
      Self::Worker => &c.worker_360,
      Self::Client => &c.client_360,
    }
  }
}

impl fmt::Display for SubjectKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SubjectKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self> {
    match s {
      "worker" => Ok(Self::Worker),
      "client" => Ok(Self::Client),
      other => Err(Error::UnknownSubject(other.to_owned())),
    }
  }
}

// ─── Binding ─────────────────────────────────────────────────────────────────

/// How an entity document refers to records of one source type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
  /// An ordered list of foreign ids; one source record per id.
  List(&'static str),
  /// A single primary reference; every source record whose parent fields
  /// match it belongs to the entity (one-to-many join).
  Primary(&'static str),
}

impl Binding {
  pub fn path(self) -> &'static str {
    match self {
      Self::List(p) | Self::Primary(p) => p,
    }
  }

  /// Read the foreign ids this binding currently lists on `entity`.
  ///
  /// Absent, `null` and empty references all yield an empty list, which the
  /// entity dispatcher turns into an explicit clear of the aggregate field.
  pub fn references(self, entity: &Document) -> Result<Vec<ForeignId>> {
    let path = self.path();
    let Some(value) = present(entity, path) else {
      return Ok(Vec::new());
    };
    match (self, value) {
      (Self::List(_), Value::Array(items)) => items
        .iter()
        .filter(|v| !v.is_null())
        .map(|v| ForeignId::from_value(v, path))
        .collect(),
      (Self::List(_), _) => Err(Error::InvalidField {
        field:    path.to_owned(),
        expected: "an array of ids",
      }),
      (Self::Primary(_), Value::String(s)) if s.is_empty() => Ok(Vec::new()),
      (Self::Primary(_), v) => Ok(vec![ForeignId::from_value(v, path)?]),
    }
  }
}

// ─── SourceType ──────────────────────────────────────────────────────────────

/// An upstream source-of-record collection folded into a 360 aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
  BullhornCandidate,
  PaylocityEmployee,
  PaylocityPayStatement,
  BullhornClientCorporation,
  SalesforceAccount,
  NetsuiteCustomer,
}

impl SourceType {
  pub const ALL: [SourceType; 6] = [
    SourceType::BullhornCandidate,
    SourceType::PaylocityEmployee,
    SourceType::PaylocityPayStatement,
    SourceType::BullhornClientCorporation,
    SourceType::SalesforceAccount,
    SourceType::NetsuiteCustomer,
  ];

  pub fn subject(self) -> SubjectKind {
    match self {
      Self::BullhornCandidate
      | Self::PaylocityEmployee
      | Self::PaylocityPayStatement => SubjectKind::Worker,
      Self::BullhornClientCorporation
      | Self::SalesforceAccount
      | Self::NetsuiteCustomer => SubjectKind::Client,
    }
  }

  pub fn collection(self, c: &Collections) -> &str {
    match self {
      Self::BullhornCandidate => &c.bullhorn_candidate,
      Self::PaylocityEmployee => &c.paylocity_employee,
      Self::PaylocityPayStatement => &c.paylocity_pay_statement,
      Self::BullhornClientCorporation => &c.bullhorn_client_corporation,
      Self::SalesforceAccount => &c.salesforce_account,
      Self::NetsuiteCustomer => &c.netsuite_customer,
    }
  }

  pub fn binding(self) -> Binding {
    match self {
      Self::BullhornCandidate => {
        Binding::List("after.bullhorn_candidate_references")
      }
      Self::PaylocityEmployee => {
        Binding::List("after.paylocity_candidate_references")
      }
      Self::PaylocityPayStatement => {
        Binding::Primary("after.primary_paylocity_reference")
      }
      Self::BullhornClientCorporation => {
        Binding::List("after.bullhorn_client_references")
      }
      Self::SalesforceAccount => {
        Binding::List("after.salesforce_client_references")
      }
      Self::NetsuiteCustomer => {
        Binding::List("after.netsuite_client_references")
      }
    }
  }

  /// The aggregate sub-array that holds this source type's records.
  pub fn aggregate_field(self) -> &'static str {
    match self {
      Self::BullhornCandidate => "bullhornCandidate",
      Self::PaylocityEmployee => "paylocityEmployee",
      Self::PaylocityPayStatement => "paylocityPayStatements",
      Self::BullhornClientCorporation => "bullhornClientCorporations",
      Self::SalesforceAccount => "salesforceAccounts",
      Self::NetsuiteCustomer => "netsuiteCustomers",
    }
  }

  /// Record fields that together form the foreign id an entity lists. For
  /// pay statements this is the parent employee, not the statement itself.
  pub fn reference_fields(self) -> &'static [&'static str] {
    match self {
      Self::PaylocityEmployee | Self::PaylocityPayStatement => {
        &["companyId", "employeeId"]
      }
      _ => &["id"],
    }
  }

  /// Record fields that identify one element of the aggregate sub-array.
  pub fn identity_fields(self) -> &'static [&'static str] {
    match self {
      Self::PaylocityEmployee => &["companyId", "employeeId"],
      Self::PaylocityPayStatement => &[
        "companyId",
        "employeeId",
        "year",
        "transactionNumber",
        "detCode",
        "detType",
      ],
      _ => &["id"],
    }
  }

  pub fn identity_of(self, record: &Document) -> Result<IdentityKey> {
    IdentityKey::extract(record, self.identity_fields())
  }

  /// The foreign id under which entity documents reference `record`.
  pub fn reference_of(self, record: &Document) -> Result<ForeignId> {
    let key = IdentityKey::extract(record, self.reference_fields())?;
    Ok(ForeignId::new(key.to_string()))
  }

  /// Field-equality filter locating the source record(s) behind `id`.
  pub fn lookup_filter(self, id: &ForeignId) -> Result<Vec<FieldMatch>> {
    let fields = self.reference_fields();
    let parts = if fields.len() == 1 {
      vec![id.as_str()]
    } else {
      id.parts(fields.len())?
    };
    Ok(
      fields
        .iter()
        .zip(parts)
        .map(|(f, v)| FieldMatch::new(*f, v))
        .collect(),
    )
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::document::into_document;

  fn doc(value: Value) -> Document { into_document(value).unwrap() }

  #[test]
  fn every_source_belongs_to_exactly_one_subject() {
    for kind in SubjectKind::ALL {
      for source in kind.sources() {
        assert_eq!(source.subject(), kind);
      }
    }
    let listed: usize = SubjectKind::ALL.iter().map(|k| k.sources().len()).sum();
    assert_eq!(listed, SourceType::ALL.len());
  }

  #[test]
  fn aggregate_fields_are_distinct() {
    let mut fields: Vec<_> =
      SourceType::ALL.iter().map(|s| s.aggregate_field()).collect();
    fields.sort_unstable();
    fields.dedup();
    assert_eq!(fields.len(), SourceType::ALL.len());
  }

  #[test]
  fn list_binding_reads_mixed_id_types() {
    let entity = doc(json!({ "after": { "bullhorn_candidate_references": [77, "78", null] } }));
    let refs = SourceType::BullhornCandidate.binding().references(&entity).unwrap();
    assert_eq!(refs, vec![ForeignId::new("77"), ForeignId::new("78")]);
  }

  #[test]
  fn absent_and_empty_references_are_empty() {
    let entity = doc(json!({ "after": { "primary_paylocity_reference": "" } }));
    for source in SourceType::ALL {
      assert!(source.binding().references(&entity).unwrap().is_empty());
    }
  }

  #[test]
  fn list_binding_rejects_scalar() {
    let entity = doc(json!({ "after": { "netsuite_client_references": 5 } }));
    assert!(SourceType::NetsuiteCustomer.binding().references(&entity).is_err());
  }

  #[test]
  fn pay_statement_references_its_parent_employee() {
    let record = doc(json!({
      "companyId": "ACME", "employeeId": "42", "year": "2021",
      "transactionNumber": 9, "detCode": "REG", "detType": "E"
    }));
    let source = SourceType::PaylocityPayStatement;
    assert_eq!(source.reference_of(&record).unwrap(), ForeignId::new("ACME.42"));
    assert_eq!(source.identity_of(&record).unwrap().to_string(), "ACME.42.2021.9.REG.E");
  }

  #[test]
  fn lookup_filter_splits_composite_ids() {
    let filter = SourceType::PaylocityEmployee
      .lookup_filter(&ForeignId::new("ACME.42"))
      .unwrap();
    assert_eq!(
      filter,
      vec![FieldMatch::new("companyId", "ACME"), FieldMatch::new("employeeId", "42")]
    );

    let single = SourceType::SalesforceAccount
      .lookup_filter(&ForeignId::new("001.A"))
      .unwrap();
    assert_eq!(single, vec![FieldMatch::new("id", "001.A")]);
  }

  #[test]
  fn subject_kind_parses_lowercase_names() {
    assert_eq!("worker".parse::<SubjectKind>().unwrap(), SubjectKind::Worker);
    assert!("Worker".parse::<SubjectKind>().is_err());
  }
}
