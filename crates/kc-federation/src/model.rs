//! Host identity model exposed by federation providers.
//!
//! Providers hand users and groups to the host through these traits rather
//! than through the host's own storage structs, so an adapter can read
//! straight from the external record it wraps.
//!
//! Every mutation goes through a single `update` entry point that takes a
//! change value. Read-only providers reject all of them with one check.

use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

use crate::error::FederationResult;

/// Multi-valued attribute map.
pub type Attributes = BTreeMap<String, Vec<String>>;

// ============================================================================
// Changes
// ============================================================================

/// A requested change to a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserChange {
    /// Rename the user.
    Username(String),
    /// Change the email address.
    Email(Option<String>),
    /// Change the email verification flag.
    EmailVerified(bool),
    /// Change the first name.
    FirstName(Option<String>),
    /// Change the last name.
    LastName(Option<String>),
    /// Enable or disable the account.
    Enabled(bool),
    /// Replace an attribute with a single value.
    SingleAttribute {
        /// Attribute name.
        name: String,
        /// New value.
        value: String,
    },
    /// Replace all values of an attribute.
    Attribute {
        /// Attribute name.
        name: String,
        /// New values.
        values: Vec<String>,
    },
    /// Remove an attribute.
    RemoveAttribute(String),
    /// Add membership in a group.
    JoinGroup(String),
    /// Remove membership in a group.
    LeaveGroup(String),
    /// Grant a role.
    GrantRole(Uuid),
    /// Remove a role mapping.
    DeleteRoleMapping(Uuid),
}

impl fmt::Display for UserChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username(_) => f.write_str("set username"),
            Self::Email(_) => f.write_str("set email"),
            Self::EmailVerified(_) => f.write_str("set email verified"),
            Self::FirstName(_) => f.write_str("set first name"),
            Self::LastName(_) => f.write_str("set last name"),
            Self::Enabled(_) => f.write_str("set enabled"),
            Self::SingleAttribute { name, .. } | Self::Attribute { name, .. } => {
                write!(f, "set attribute '{name}'")
            }
            Self::RemoveAttribute(name) => write!(f, "remove attribute '{name}'"),
            Self::JoinGroup(_) => f.write_str("join group"),
            Self::LeaveGroup(_) => f.write_str("leave group"),
            Self::GrantRole(_) => f.write_str("grant role"),
            Self::DeleteRoleMapping(_) => f.write_str("delete role mapping"),
        }
    }
}

/// A requested change to a group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupChange {
    /// Rename the group.
    Name(String),
    /// Replace an attribute with a single value.
    SingleAttribute {
        /// Attribute name.
        name: String,
        /// New value.
        value: String,
    },
    /// Replace all values of an attribute.
    Attribute {
        /// Attribute name.
        name: String,
        /// New values.
        values: Vec<String>,
    },
    /// Remove an attribute.
    RemoveAttribute(String),
    /// Move the group under another parent, or to the top level.
    Parent(Option<String>),
    /// Add a sub-group.
    AddChild(String),
    /// Remove a sub-group.
    RemoveChild(String),
    /// Grant a role.
    GrantRole(Uuid),
    /// Remove a role mapping.
    DeleteRoleMapping(Uuid),
}

impl fmt::Display for GroupChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(_) => f.write_str("set group name"),
            Self::SingleAttribute { name, .. } | Self::Attribute { name, .. } => {
                write!(f, "set group attribute '{name}'")
            }
            Self::RemoveAttribute(name) => write!(f, "remove group attribute '{name}'"),
            Self::Parent(_) => f.write_str("set group parent"),
            Self::AddChild(_) => f.write_str("add sub-group"),
            Self::RemoveChild(_) => f.write_str("remove sub-group"),
            Self::GrantRole(_) => f.write_str("grant group role"),
            Self::DeleteRoleMapping(_) => f.write_str("delete group role mapping"),
        }
    }
}

// ============================================================================
// Group Model
// ============================================================================

/// A group as seen by the host.
pub trait GroupModel {
    /// Host-side id.
    fn id(&self) -> &str;

    /// Group name.
    fn name(&self) -> &str;

    /// All attributes.
    fn attributes(&self) -> &Attributes;

    /// First value of an attribute.
    fn first_attribute(&self, name: &str) -> Option<&str> {
        self.attributes()
            .get(name)
            .and_then(|v| v.first())
            .map(String::as_str)
    }

    /// All values of an attribute; empty if the attribute is absent.
    fn attribute(&self, name: &str) -> Vec<String> {
        self.attributes().get(name).cloned().unwrap_or_default()
    }

    /// Id of the parent group, `None` for a top-level group.
    fn parent_id(&self) -> Option<&str>;

    /// Ids of the direct sub-groups.
    fn sub_group_ids(&self) -> Vec<&str>;

    /// Realm roles mapped to this group.
    fn realm_role_mappings(&self) -> Vec<Uuid>;

    /// Checks if a role is mapped to this group.
    fn has_role(&self, role_id: Uuid) -> bool {
        self.realm_role_mappings().contains(&role_id)
    }

    /// Applies a change.
    ///
    /// ## Errors
    ///
    /// Returns `FederationError::ReadOnly` if the group cannot be modified.
    fn update(&mut self, change: GroupChange) -> FederationResult<()>;
}

// ============================================================================
// User Model
// ============================================================================

/// A user as seen by the host.
pub trait UserModel {
    /// Host-side id.
    fn id(&self) -> &str;

    /// Username.
    fn username(&self) -> &str;

    /// Email address.
    fn email(&self) -> Option<&str>;

    /// Whether the email address is verified.
    fn is_email_verified(&self) -> bool;

    /// First name.
    fn first_name(&self) -> Option<&str>;

    /// Last name.
    fn last_name(&self) -> Option<&str>;

    /// Whether the account is enabled.
    fn is_enabled(&self) -> bool;

    /// Id of the federation provider that owns the user.
    fn federation_link(&self) -> Option<String>;

    /// All attributes.
    fn attributes(&self) -> Attributes;

    /// First value of an attribute.
    fn first_attribute(&self, name: &str) -> Option<String> {
        self.attribute(name).into_iter().next()
    }

    /// All values of an attribute; empty if the attribute is absent.
    fn attribute(&self, name: &str) -> Vec<String> {
        self.attributes().remove(name).unwrap_or_default()
    }

    /// Ids of the groups the user directly belongs to.
    fn group_ids(&self) -> Vec<&str>;

    /// Checks membership in a group, directly or through a sub-group.
    fn is_member_of(&self, group_id: &str) -> bool;

    /// Realm roles mapped to the user.
    fn role_mappings(&self) -> Vec<Uuid>;

    /// Checks if a role is mapped to the user.
    fn has_role(&self, role_id: Uuid) -> bool {
        self.role_mappings().contains(&role_id)
    }

    /// Applies a change.
    ///
    /// ## Errors
    ///
    /// Returns `FederationError::ReadOnly` if the user cannot be modified.
    fn update(&mut self, change: UserChange) -> FederationResult<()>;
}
