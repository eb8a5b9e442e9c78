//! Canonical scalar projections of entity documents into aggregate shape.

use panorama_core::{
  document::{Document, field, required_text},
  source::{ENTITY_ID, SourceType, SubjectKind},
};
use serde_json::Value;

use crate::Result;

/// The universal id of an entity document in canonical text form.
pub fn universal_id(entity: &Document) -> Result<String> {
  Ok(required_text(entity, ENTITY_ID)?)
}

/// Build the scalar part of an aggregate from its entity document.
pub fn project(kind: SubjectKind, entity: &Document) -> Result<Document> {
  match kind {
    SubjectKind::Worker => worker(entity),
    SubjectKind::Client => client(entity),
  }
}

fn after(entity: &Document, name: &str) -> Value {
  field(entity, &format!("after.{name}")).cloned().unwrap_or(Value::Null)
}

fn worker(entity: &Document) -> Result<Document> {
  let bullhorn = SourceType::BullhornCandidate.binding().references(entity)?;
  let paylocity = SourceType::PaylocityEmployee.binding().references(entity)?;

  let mut employee_ids = Vec::with_capacity(paylocity.len());
  let mut company_ids = Vec::with_capacity(paylocity.len());
  for reference in &paylocity {
    let parts = reference.parts(2)?;
    company_ids.push(Value::from(parts[0]));
    employee_ids.push(Value::from(parts[1]));
  }

  let mut out = Document::new();
  out.insert("uid".into(), after(entity, "id"));
  out.insert("firstName".into(), after(entity, "firstname"));
  out.insert("lastName".into(), after(entity, "lastname"));
  out.insert("email".into(), after(entity, "email"));
  out.insert("phone".into(), after(entity, "phone"));
  out.insert("dob".into(), after(entity, "dob"));
  out.insert("deleted".into(), after(entity, "deleted"));
  out.insert(
    "bullhornCandidateIds".into(),
    Value::Array(bullhorn.iter().map(|id| Value::from(id.as_str())).collect()),
  );
  out.insert("paylocityEmployeeIds".into(), Value::Array(employee_ids));
  out.insert("paylocityCompanyIds".into(), Value::Array(company_ids));
  out.insert(
    "primaryBullhornReference".into(),
    after(entity, "primary_bullhorn_reference"),
  );
  out.insert(
    "primaryPaylocityReference".into(),
    after(entity, "primary_paylocity_reference"),
  );
  Ok(out)
}

fn client(entity: &Document) -> Result<Document> {
  let mut address = Document::new();
  for name in ["address1", "address2", "city", "state", "zip"] {
    address.insert(name.into(), after(entity, name));
  }

  let mut out = Document::new();
  out.insert("uid".into(), after(entity, "id"));
  out.insert("name".into(), after(entity, "name"));
  out.insert("email".into(), after(entity, "email"));
  out.insert("phone".into(), after(entity, "phone"));
  out.insert("address".into(), Value::Object(address));
  out.insert("deleted".into(), after(entity, "deleted"));
  out.insert(
    "primaryBullhornReference".into(),
    after(entity, "primary_bullhorn_reference"),
  );
  out.insert(
    "primarySalesforceReference".into(),
    after(entity, "primary_salesforce_reference"),
  );
  out.insert(
    "primaryNetsuiteReference".into(),
    after(entity, "primary_netsuite_reference"),
  );
  Ok(out)
}

#[cfg(test)]
mod tests {
  use panorama_core::document::into_document;
  use pretty_assertions::assert_eq;
  use serde_json::json;

  use super::*;

  fn doc(value: Value) -> Document { into_document(value).unwrap() }

  #[test]
  fn worker_projection_splits_payroll_references() {
    let entity = doc(json!({
      "after": {
        "id": "W1",
        "firstname": "Ada",
        "lastname": "Lovelace",
        "bullhorn_candidate_references": [77, "78"],
        "paylocity_candidate_references": ["ACME.42", "INIT.7"],
        "primary_paylocity_reference": "ACME.42"
      }
    }));

    let projected = project(SubjectKind::Worker, &entity).unwrap();
    assert_eq!(
      Value::Object(projected),
      json!({
        "uid": "W1",
        "firstName": "Ada",
        "lastName": "Lovelace",
        "email": null,
        "phone": null,
        "dob": null,
        "deleted": null,
        "bullhornCandidateIds": ["77", "78"],
        "paylocityEmployeeIds": ["42", "7"],
        "paylocityCompanyIds": ["ACME", "INIT"],
        "primaryBullhornReference": null,
        "primaryPaylocityReference": "ACME.42"
      })
    );
  }

  #[test]
  fn worker_projection_rejects_malformed_payroll_reference() {
    let entity = doc(json!({
      "after": { "id": "W1", "paylocity_candidate_references": ["ACME"] }
    }));
    assert!(project(SubjectKind::Worker, &entity).is_err());
  }

  #[test]
  fn client_projection_assembles_address() {
    let entity = doc(json!({
      "after": { "id": 9, "name": "Initech", "city": "Austin", "zip": "78701" }
    }));

    let projected = project(SubjectKind::Client, &entity).unwrap();
    assert_eq!(projected["uid"], json!(9));
    assert_eq!(
      projected["address"],
      json!({
        "address1": null,
        "address2": null,
        "city": "Austin",
        "state": null,
        "zip": "78701"
      })
    );
  }

  #[test]
  fn universal_id_is_required() {
    assert_eq!(universal_id(&doc(json!({ "after": { "id": 5 } }))).unwrap(), "5");
    assert!(universal_id(&doc(json!({ "after": {} }))).is_err());
  }
}
