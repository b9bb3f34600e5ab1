//! Translation of host search parameters into Crowd search restrictions.
//!
//! Host search keys are mapped through a small alias table (`first`,
//! `last`, `username`); any other key is passed through as a Crowd property
//! name. Every parameter becomes a `CONTAINS` term and the terms are
//! OR-combined. An empty parameter set maps to the shared match-all term,
//! never to an empty boolean restriction, because Crowd rejects those.

use std::borrow::Cow;
use std::sync::LazyLock;

use kc_federation::SearchParams;
use serde::{Deserialize, Serialize};

/// Crowd property holding the username.
pub const USERNAME_PROPERTY: &str = "name";

static MATCH_ALL: LazyLock<Restriction> =
    LazyLock::new(|| Restriction::term(USERNAME_PROPERTY, MatchMode::Contains, ""));

/// A Crowd search restriction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "restriction-type")]
pub enum Restriction {
    /// A single property comparison.
    #[serde(rename = "property-search-restriction")]
    Term(TermRestriction),
    /// A combination of restrictions.
    #[serde(rename = "boolean-search-restriction")]
    Boolean(BooleanRestriction),
}

/// Compares one property against a value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermRestriction {
    /// Property to compare.
    pub property: Property,
    /// Comparison mode.
    #[serde(rename = "match-mode")]
    pub match_mode: MatchMode,
    /// Value to compare against.
    pub value: String,
}

/// Combines restrictions with a boolean operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooleanRestriction {
    /// Operator.
    #[serde(rename = "boolean-logic")]
    pub logic: BooleanLogic,
    /// Operands.
    pub restrictions: Vec<Restriction>,
}

/// A named, typed Crowd property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Property {
    /// Property name.
    pub name: String,
    /// Property type.
    #[serde(rename = "type")]
    pub property_type: PropertyType,
}

/// Type of a Crowd property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PropertyType {
    /// Text.
    String,
}

/// How a term compares its property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchMode {
    /// Case-insensitive equality.
    ExactlyMatches,
    /// Case-insensitive substring.
    Contains,
    /// Case-insensitive prefix.
    StartsWith,
}

/// Boolean operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanLogic {
    /// All operands match.
    And,
    /// Any operand matches.
    Or,
}

impl Restriction {
    /// Creates a term on a string property.
    #[must_use]
    pub fn term(property: impl Into<String>, match_mode: MatchMode, value: impl Into<String>) -> Self {
        Self::Term(TermRestriction {
            property: Property {
                name: property.into(),
                property_type: PropertyType::String,
            },
            match_mode,
            value: value.into(),
        })
    }

    /// Combines restrictions with OR.
    #[must_use]
    pub fn any(restrictions: Vec<Restriction>) -> Self {
        Self::Boolean(BooleanRestriction {
            logic: BooleanLogic::Or,
            restrictions,
        })
    }

    /// Returns the shared restriction that matches every user.
    #[must_use]
    pub fn match_all() -> &'static Restriction {
        &MATCH_ALL
    }

    /// Checks if this is the match-all restriction.
    #[must_use]
    pub fn is_match_all(&self) -> bool {
        self == Self::match_all()
    }
}

/// Maps a host search key to the Crowd property it searches.
#[must_use]
pub fn property_name(param: &str) -> &str {
    match param {
        "first" => "firstName",
        "last" => "lastName",
        "username" => USERNAME_PROPERTY,
        other => other,
    }
}

/// Builds the restriction for a set of host search parameters.
///
/// Total: every input, including the empty map, yields a restriction.
#[must_use]
pub fn build(params: &SearchParams) -> Cow<'static, Restriction> {
    if params.is_empty() {
        return Cow::Borrowed(Restriction::match_all());
    }

    let terms = params
        .iter()
        .map(|(key, value)| Restriction::term(property_name(key), MatchMode::Contains, value.as_str()))
        .collect();

    Cow::Owned(Restriction::any(terms))
}
