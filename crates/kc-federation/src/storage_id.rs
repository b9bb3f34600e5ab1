//! Namespaced identifiers for federated entities.
//!
//! Federated users and groups carry ids of the form
//! `f:<provider id>:<external id>`, so the host can route a lookup back to
//! the provider that owns the entity. Ids without the `f:` prefix belong to
//! local storage.

use uuid::Uuid;

const FEDERATED_PREFIX: &str = "f:";

/// Formats the host-side id for an external id owned by `provider_id`.
#[must_use]
pub fn keycloak_id(provider_id: Uuid, external_id: &str) -> String {
    format!("{FEDERATED_PREFIX}{provider_id}:{external_id}")
}

/// Extracts the external id from a host-side id.
///
/// Local ids are returned unchanged. The external part may contain colons.
#[must_use]
pub fn external_id_of(id: &str) -> &str {
    id.strip_prefix(FEDERATED_PREFIX)
        .and_then(|rest| rest.split_once(':'))
        .map_or(id, |(_, external)| external)
}
