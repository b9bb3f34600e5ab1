//! Read-only user adapter.

use kc_federation::storage_id;
use kc_federation::{Attributes, FederationError, FederationResult, UserChange, UserModel};
use uuid::Uuid;

use crate::entity::UserRecord;
use crate::group::GroupForest;

/// Attribute synthesized from the Crowd display name.
pub const DISPLAY_NAME_ATTRIBUTE: &str = "displayName";

/// A Crowd user as seen by the host.
///
/// Owns the user's resolved groups; an adapter cannot be built without them.
/// Emails are reported as verified, since Crowd is the authority for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrowdUserAdapter {
    id: String,
    provider_id: Uuid,
    record: UserRecord,
    groups: GroupForest,
}

impl CrowdUserAdapter {
    /// Wraps a Crowd record and its resolved groups.
    #[must_use]
    pub fn new(provider_id: Uuid, record: UserRecord, groups: GroupForest) -> Self {
        Self {
            id: storage_id::keycloak_id(provider_id, &record.name),
            provider_id,
            record,
            groups,
        }
    }

    /// Returns the underlying Crowd record.
    #[must_use]
    pub const fn record(&self) -> &UserRecord {
        &self.record
    }

    /// Returns the resolved groups.
    #[must_use]
    pub const fn groups(&self) -> &GroupForest {
        &self.groups
    }

    /// Returns the display name.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.record.display_name.as_deref()
    }
}

impl UserModel for CrowdUserAdapter {
    fn id(&self) -> &str {
        &self.id
    }

    fn username(&self) -> &str {
        &self.record.name
    }

    fn email(&self) -> Option<&str> {
        self.record.email.as_deref()
    }

    fn is_email_verified(&self) -> bool {
        true
    }

    fn first_name(&self) -> Option<&str> {
        self.record.first_name.as_deref()
    }

    fn last_name(&self) -> Option<&str> {
        self.record.last_name.as_deref()
    }

    fn is_enabled(&self) -> bool {
        self.record.active
    }

    fn federation_link(&self) -> Option<String> {
        Some(self.provider_id.to_string())
    }

    fn attributes(&self) -> Attributes {
        let mut all = self.record.attributes.clone();
        if let Some(display_name) = self.display_name() {
            all.insert(DISPLAY_NAME_ATTRIBUTE.to_string(), vec![display_name.to_string()]);
        }
        all
    }

    fn attribute(&self, name: &str) -> Vec<String> {
        if name == DISPLAY_NAME_ATTRIBUTE {
            return self.display_name().map(str::to_string).into_iter().collect();
        }
        self.record.attributes.get(name).cloned().unwrap_or_default()
    }

    fn group_ids(&self) -> Vec<&str> {
        self.groups.root_ids().iter().map(|id| id.as_str()).collect()
    }

    fn is_member_of(&self, group_id: &str) -> bool {
        self.groups.is_member(group_id)
    }

    fn role_mappings(&self) -> Vec<Uuid> {
        Vec::new()
    }

    fn update(&mut self, change: UserChange) -> FederationResult<()> {
        Err(FederationError::read_only(change.to_string()))
    }
}
