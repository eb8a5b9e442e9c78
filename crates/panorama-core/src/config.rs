//! Collection naming and rebuild settings, shared by every component.
//!
//! One [`Collections`] value is built at startup and handed to each component
//! at construction; the logical database (namespace) is a per-call argument.

use serde::{Deserialize, Serialize};

/// Names of every collection the engine reads or writes.
///
/// Defaults match the production deployment; any subset can be overridden
/// from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Collections {
  // ── Entities ──────────────────────────────────────────────────────────
  pub workers_entity:              String,
  pub clients_entity:              String,

  // ── Aggregates ────────────────────────────────────────────────────────
  pub worker_360:                  String,
  pub client_360:                  String,

  // ── Worker sources ────────────────────────────────────────────────────
  pub bullhorn_candidate:          String,
  pub paylocity_employee:          String,
  /// Unwound pay statement rows (the shadow collection).
  pub paylocity_pay_statement:     String,
  /// Parent documents carrying the embedded `payStatement` array.
  pub paylocity_pay_statements:    String,

  // ── Client sources ────────────────────────────────────────────────────
  pub bullhorn_client_corporation: String,
  pub salesforce_account:          String,
  pub netsuite_customer:           String,
}

impl Default for Collections {
  fn default() -> Self {
    Self {
      workers_entity:              "workersEntity".into(),
      clients_entity:              "clientsEntity".into(),
      worker_360:                  "360_Worker_v1".into(),
      client_360:                  "360_Client_v1".into(),
      bullhorn_candidate:          "bullhornCandidate".into(),
      paylocity_employee:          "paylocityEmployee".into(),
      paylocity_pay_statement:     "paylocityPayStatement".into(),
      paylocity_pay_statements:    "paylocityPayStatements".into(),
      bullhorn_client_corporation: "bullhornClientCorporation".into(),
      salesforce_account:          "salesforceAccount".into(),
      netsuite_customer:           "netsuiteCustomer".into(),
    }
  }
}

/// How the full rebuild job rewrites entity documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RebuildSettings {
  /// Stamp each rewritten entity with the current time so the rewrite is a
  /// real change even when nothing else differs.
  pub stamp_refresh: bool,
  pub refresh_field: String,
}

impl Default for RebuildSettings {
  fn default() -> Self {
    Self { stamp_refresh: true, refresh_field: "refreshedAt".into() }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_override_keeps_remaining_defaults() {
    let c: Collections =
      serde_json::from_str(r#"{ "worker_360": "360_Worker_v2" }"#).unwrap();
    assert_eq!(c.worker_360, "360_Worker_v2");
    assert_eq!(c.client_360, "360_Client_v1");
    assert_eq!(c.workers_entity, "workersEntity");
  }

  #[test]
  fn rebuild_settings_default_to_stamping() {
    let r: RebuildSettings = serde_json::from_str("{}").unwrap();
    assert!(r.stamp_refresh);
    assert_eq!(r.refresh_field, "refreshedAt");
  }
}
