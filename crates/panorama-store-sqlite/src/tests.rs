//! Integration tests for `SqliteStore` against an in-memory database.

use panorama_core::{
  document::{Document, into_document},
  store::{DocumentStore, FieldMatch, UpsertResult},
};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};

use crate::SqliteStore;

const NS: &str = "view-service";

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

fn doc(value: Value) -> Document { into_document(value).unwrap() }

// ─── Get / replace / delete ──────────────────────────────────────────────────

#[tokio::test]
async fn replace_then_get_round_trips() {
  let s = store().await;
  let body = doc(json!({ "_id": "a", "id": 77, "name": "X" }));

  let r = s.replace(NS, "bullhornCandidate", "a", body.clone()).await.unwrap();
  assert_eq!(r, UpsertResult::Inserted);

  let fetched = s.get(NS, "bullhornCandidate", "a").await.unwrap();
  assert_eq!(fetched, Some(body));
}

#[tokio::test]
async fn get_missing_returns_none() {
  let s = store().await;
  assert!(s.get(NS, "bullhornCandidate", "nope").await.unwrap().is_none());
}

#[tokio::test]
async fn replace_adds_storage_id_when_absent() {
  let s = store().await;
  s.replace(NS, "c", "k1", doc(json!({ "v": 1 }))).await.unwrap();
  let fetched = s.get(NS, "c", "k1").await.unwrap().unwrap();
  assert_eq!(fetched["_id"], json!("k1"));
}

#[tokio::test]
async fn replace_discards_old_fields() {
  let s = store().await;
  s.replace(NS, "c", "k", doc(json!({ "a": 1, "b": 2 }))).await.unwrap();
  let r = s.replace(NS, "c", "k", doc(json!({ "a": 1 }))).await.unwrap();
  assert_eq!(r, UpsertResult::Updated);

  let fetched = s.get(NS, "c", "k").await.unwrap().unwrap();
  assert_eq!(Value::Object(fetched), json!({ "_id": "k", "a": 1 }));
}

#[tokio::test]
async fn identical_replace_is_unchanged() {
  let s = store().await;
  s.replace(NS, "c", "k", doc(json!({ "a": 1 }))).await.unwrap();
  let r = s.replace(NS, "c", "k", doc(json!({ "a": 1 }))).await.unwrap();
  assert_eq!(r, UpsertResult::Unchanged);
}

#[tokio::test]
async fn delete_reports_whether_removed() {
  let s = store().await;
  s.replace(NS, "c", "k", doc(json!({}))).await.unwrap();
  assert!(s.delete(NS, "c", "k").await.unwrap());
  assert!(!s.delete(NS, "c", "k").await.unwrap());
  assert!(s.get(NS, "c", "k").await.unwrap().is_none());
}

// ─── Shallow merge ───────────────────────────────────────────────────────────

#[tokio::test]
async fn upsert_fields_creates_then_overlays() {
  let s = store().await;

  let r = s
    .upsert_fields(NS, "360_Worker_v1", "W1", doc(json!({ "uid": "W1", "bullhornCandidate": [] })))
    .await
    .unwrap();
  assert_eq!(r, UpsertResult::Inserted);

  let r = s
    .upsert_fields(NS, "360_Worker_v1", "W1", doc(json!({ "paylocityEmployee": [{ "employeeId": "1" }] })))
    .await
    .unwrap();
  assert_eq!(r, UpsertResult::Updated);

  let fetched = s.get(NS, "360_Worker_v1", "W1").await.unwrap().unwrap();
  assert_eq!(
    Value::Object(fetched),
    json!({
      "_id": "W1",
      "uid": "W1",
      "bullhornCandidate": [],
      "paylocityEmployee": [{ "employeeId": "1" }]
    })
  );
}

#[tokio::test]
async fn upsert_fields_replaces_nested_values_wholesale() {
  let s = store().await;
  s.upsert_fields(NS, "c", "k", doc(json!({ "address": { "city": "A", "zip": "1" } })))
    .await
    .unwrap();
  s.upsert_fields(NS, "c", "k", doc(json!({ "address": { "city": "B" } })))
    .await
    .unwrap();

  let fetched = s.get(NS, "c", "k").await.unwrap().unwrap();
  assert_eq!(fetched["address"], json!({ "city": "B" }));
}

#[tokio::test]
async fn repeated_upsert_fields_is_unchanged() {
  let s = store().await;
  let fields = doc(json!({ "uid": "W1", "bullhornCandidate": [{ "id": 77 }] }));
  s.upsert_fields(NS, "c", "W1", fields.clone()).await.unwrap();
  let r = s.upsert_fields(NS, "c", "W1", fields).await.unwrap();
  assert_eq!(r, UpsertResult::Unchanged);
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn find_matches_numbers_and_strings_as_text() {
  let s = store().await;
  s.replace(NS, "paylocityEmployee", "1", doc(json!({ "companyId": "ACME", "employeeId": 42 })))
    .await
    .unwrap();
  s.replace(NS, "paylocityEmployee", "2", doc(json!({ "companyId": "ACME", "employeeId": "43" })))
    .await
    .unwrap();

  let found = s
    .find(NS, "paylocityEmployee", &[
      FieldMatch::new("companyId", "ACME"),
      FieldMatch::new("employeeId", "42"),
    ])
    .await
    .unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0]["_id"], json!("1"));
}

#[tokio::test]
async fn find_walks_nested_paths() {
  let s = store().await;
  s.replace(NS, "workersEntity", "e1", doc(json!({ "after": { "primary_paylocity_reference": "ACME.42" } })))
    .await
    .unwrap();
  s.replace(NS, "workersEntity", "e2", doc(json!({ "after": {} })))
    .await
    .unwrap();

  let found = s
    .find(NS, "workersEntity", &[FieldMatch::new("after.primary_paylocity_reference", "ACME.42")])
    .await
    .unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0]["_id"], json!("e1"));
}

#[tokio::test]
async fn find_containing_checks_array_membership() {
  let s = store().await;
  let path = "after.bullhorn_candidate_references";
  s.replace(NS, "workersEntity", "e1", doc(json!({ "after": { "bullhorn_candidate_references": [77, 78] } })))
    .await
    .unwrap();
  s.replace(NS, "workersEntity", "e2", doc(json!({ "after": { "bullhorn_candidate_references": ["77"] } })))
    .await
    .unwrap();
  s.replace(NS, "workersEntity", "e3", doc(json!({ "after": { "bullhorn_candidate_references": [79] } })))
    .await
    .unwrap();
  s.replace(NS, "workersEntity", "e4", doc(json!({ "after": {} })))
    .await
    .unwrap();

  let found = s.find_containing(NS, "workersEntity", path, "77").await.unwrap();
  let ids: Vec<_> = found.iter().map(|d| d["_id"].clone()).collect();
  assert_eq!(ids, vec![json!("e1"), json!("e2")]);
}

#[tokio::test]
async fn list_preserves_insertion_order_across_updates() {
  let s = store().await;
  for id in ["b", "a", "c"] {
    s.replace(NS, "c", id, doc(json!({ "v": 1 }))).await.unwrap();
  }
  s.replace(NS, "c", "b", doc(json!({ "v": 2 }))).await.unwrap();

  let ids: Vec<_> = s
    .list(NS, "c")
    .await
    .unwrap()
    .iter()
    .map(|d| d["_id"].clone())
    .collect();
  assert_eq!(ids, vec![json!("b"), json!("a"), json!("c")]);
}

#[tokio::test]
async fn namespaces_are_isolated() {
  let s = store().await;
  s.replace("prod", "c", "k", doc(json!({ "v": 1 }))).await.unwrap();
  assert!(s.get("staging", "c", "k").await.unwrap().is_none());
  assert!(s.list("staging", "c").await.unwrap().is_empty());
  assert_eq!(s.list("prod", "c").await.unwrap().len(), 1);
}
