//! Raw records returned by the Crowd directory.
//!
//! These mirror the JSON entities of the usermanagement REST API. Attributes
//! arrive nested as `{"attributes": [{"name": .., "values": [..]}]}` and are
//! flattened into a multi-valued map on decode.

use kc_federation::Attributes;
use serde::{Deserialize, Serialize};

/// A user as stored in Crowd.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UserRecord {
    /// Username.
    pub name: String,

    /// Whether the account is active.
    #[serde(default = "default_active")]
    pub active: bool,

    /// First name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,

    /// Last name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,

    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Custom attributes.
    #[serde(default, with = "attribute_list")]
    pub attributes: Attributes,
}

impl UserRecord {
    /// Creates an active user with no profile data.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            active: true,
            first_name: None,
            last_name: None,
            display_name: None,
            email: None,
            attributes: Attributes::new(),
        }
    }

    /// Sets the first and last name.
    #[must_use]
    pub fn with_names(mut self, first: impl Into<String>, last: impl Into<String>) -> Self {
        self.first_name = Some(first.into());
        self.last_name = Some(last.into());
        self
    }

    /// Sets the display name.
    #[must_use]
    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = Some(display_name.into());
        self
    }

    /// Sets the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Sets whether the account is active.
    #[must_use]
    pub const fn with_active(mut self, active: bool) -> Self {
        self.active = active;
        self
    }

    /// Adds an attribute value.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.entry(name.into()).or_default().push(value.into());
        self
    }

    /// Reads a searchable property by its Crowd property name.
    ///
    /// Unknown names fall back to custom attributes.
    #[must_use]
    pub fn property(&self, name: &str) -> Vec<&str> {
        let single = match name {
            "name" => Some(self.name.as_str()),
            "email" => self.email.as_deref(),
            "firstName" => self.first_name.as_deref(),
            "lastName" => self.last_name.as_deref(),
            "displayName" => self.display_name.as_deref(),
            _ => {
                return self
                    .attributes
                    .get(name)
                    .map(|values| values.iter().map(String::as_str).collect())
                    .unwrap_or_default()
            }
        };
        single.into_iter().collect()
    }
}

/// A group as stored in Crowd.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupRecord {
    /// Group name.
    pub name: String,

    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Whether the group is active.
    #[serde(default = "default_active")]
    pub active: bool,

    /// Custom attributes.
    #[serde(default, with = "attribute_list")]
    pub attributes: Attributes,
}

impl GroupRecord {
    /// Creates an active group without attributes.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            active: true,
            attributes: Attributes::new(),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Adds an attribute value.
    #[must_use]
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.entry(name.into()).or_default().push(value.into());
        self
    }
}

const fn default_active() -> bool {
    true
}

/// Crowd's nested attribute list, flattened to a map.
mod attribute_list {
    use kc_federation::Attributes;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    #[derive(Serialize, Deserialize)]
    struct Wire {
        #[serde(default)]
        attributes: Vec<Entry>,
    }

    #[derive(Serialize, Deserialize)]
    struct Entry {
        name: String,
        #[serde(default)]
        values: Vec<String>,
    }

    pub fn serialize<S: Serializer>(attributes: &Attributes, serializer: S) -> Result<S::Ok, S::Error> {
        Wire {
            attributes: attributes
                .iter()
                .map(|(name, values)| Entry {
                    name: name.clone(),
                    values: values.clone(),
                })
                .collect(),
        }
        .serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Attributes, D::Error> {
        let wire = Option::<Wire>::deserialize(deserializer)?;
        let mut attributes = Attributes::new();
        for entry in wire.map(|w| w.attributes).unwrap_or_default() {
            attributes.entry(entry.name).or_default().extend(entry.values);
        }
        Ok(attributes)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_crowd_user_entity() {
        let body = json!({
            "name": "jdoe",
            "active": true,
            "first-name": "John",
            "last-name": "Doe",
            "display-name": "John Doe",
            "email": "jdoe@example.com",
            "key": "32769:jdoe",
            "attributes": {
                "attributes": [
                    {"name": "department", "values": ["R&D"]},
                    {"name": "phone", "values": ["1", "2"]}
                ]
            }
        });

        let user: UserRecord = serde_json::from_value(body).unwrap();
        assert_eq!(user.name, "jdoe");
        assert_eq!(user.display_name.as_deref(), Some("John Doe"));
        assert_eq!(user.attributes["phone"], vec!["1", "2"]);
        assert_eq!(user.property("firstName"), vec!["John"]);
        assert_eq!(user.property("department"), vec!["R&D"]);
        assert!(user.property("missing").is_empty());
    }

    #[test]
    fn missing_optional_fields_default() {
        let group: GroupRecord = serde_json::from_value(json!({"name": "devs"})).unwrap();
        assert!(group.active);
        assert!(group.attributes.is_empty());

        let user: UserRecord =
            serde_json::from_value(json!({"name": "jdoe", "attributes": null})).unwrap();
        assert!(user.attributes.is_empty());
        assert!(user.email.is_none());
    }
}
