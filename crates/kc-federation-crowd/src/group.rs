//! Resolved group hierarchy of a single user.
//!
//! Groups live in a [`GroupForest`] arena keyed by [`GroupId`]; parent and
//! child relations are stored as key references, never as owned nodes, so a
//! node can be shared between several paths without copies or cycles of
//! ownership.
//!
//! Relations are directional, as Crowd reports them: ascending from a
//! group sets that group's parent, descending sets the group's children.
//! The forest is only mutated by the resolver and is handed out through
//! shared references afterwards.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;

use kc_federation::storage_id;
use kc_federation::{Attributes, FederationError, FederationResult, GroupChange, GroupModel};
use uuid::Uuid;

use crate::entity::GroupRecord;

// ============================================================================
// Group Id
// ============================================================================

/// Namespaced group key, `f:<provider id>:<group name>`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(String);

impl GroupId {
    /// Creates the key of a group owned by `provider_id`.
    #[must_use]
    pub fn new(provider_id: Uuid, group_name: &str) -> Self {
        Self(storage_id::keycloak_id(provider_id, group_name))
    }

    /// Returns the full key.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the Crowd group name encoded in the key.
    #[must_use]
    pub fn group_name(&self) -> &str {
        storage_id::external_id_of(&self.0)
    }
}

impl Borrow<str> for GroupId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Group Node
// ============================================================================

/// A Crowd group with its resolved links.
///
/// Equality and hashing cover the id and the links, not the attributes.
#[derive(Debug, Clone)]
pub struct GroupNode {
    id: GroupId,
    record: GroupRecord,
    parent: Option<GroupId>,
    children: BTreeSet<GroupId>,
}

impl GroupNode {
    fn new(id: GroupId, record: GroupRecord) -> Self {
        Self {
            id,
            record,
            parent: None,
            children: BTreeSet::new(),
        }
    }

    /// Returns the group key.
    #[must_use]
    pub const fn group_id(&self) -> &GroupId {
        &self.id
    }

    /// Returns the underlying Crowd record.
    #[must_use]
    pub const fn record(&self) -> &GroupRecord {
        &self.record
    }

    /// Returns the parent key, if an ancestor was resolved.
    #[must_use]
    pub const fn parent(&self) -> Option<&GroupId> {
        self.parent.as_ref()
    }

    /// Returns the keys of the resolved sub-groups.
    #[must_use]
    pub const fn children(&self) -> &BTreeSet<GroupId> {
        &self.children
    }
}

impl PartialEq for GroupNode {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.parent == other.parent && self.children == other.children
    }
}

impl Eq for GroupNode {}

impl Hash for GroupNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
        self.parent.hash(state);
        self.children.hash(state);
    }
}

impl GroupModel for GroupNode {
    fn id(&self) -> &str {
        self.id.as_str()
    }

    fn name(&self) -> &str {
        &self.record.name
    }

    fn attributes(&self) -> &Attributes {
        &self.record.attributes
    }

    fn parent_id(&self) -> Option<&str> {
        self.parent.as_ref().map(GroupId::as_str)
    }

    fn sub_group_ids(&self) -> Vec<&str> {
        self.children.iter().map(GroupId::as_str).collect()
    }

    fn realm_role_mappings(&self) -> Vec<Uuid> {
        Vec::new()
    }

    fn update(&mut self, change: GroupChange) -> FederationResult<()> {
        Err(FederationError::read_only(change.to_string()))
    }
}

// ============================================================================
// Group Forest
// ============================================================================

/// Arena of resolved groups.
///
/// Roots are the groups the user directly belongs to. The parent relation
/// and the child relation are each acyclic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupForest {
    nodes: BTreeMap<GroupId, GroupNode>,
    roots: BTreeSet<GroupId>,
}

impl GroupForest {
    /// Creates an empty forest.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resolved groups, roots and relatives.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Checks if no group was resolved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Looks up a resolved group by key.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<GroupRef<'_>> {
        self.nodes.get(id).map(|node| GroupRef { forest: self, node })
    }

    /// Iterates the user's direct groups.
    pub fn roots(&self) -> impl Iterator<Item = GroupRef<'_>> {
        self.roots.iter().filter_map(move |id| self.get(id.as_str()))
    }

    /// Iterates all resolved groups.
    pub fn nodes(&self) -> impl Iterator<Item = GroupRef<'_>> {
        self.nodes.values().map(move |node| GroupRef { forest: self, node })
    }

    /// Keys of the user's direct groups.
    #[must_use]
    pub const fn root_ids(&self) -> &BTreeSet<GroupId> {
        &self.roots
    }

    /// Checks if a direct group is `group_id` or descends from it.
    #[must_use]
    pub fn is_member(&self, group_id: &str) -> bool {
        self.roots
            .iter()
            .any(|root| self.ancestry(root).any(|id| id.as_str() == group_id))
    }

    /// Walks the parent chain starting at `id`, inclusive.
    fn ancestry<'a>(&'a self, id: &'a GroupId) -> impl Iterator<Item = &'a GroupId> + 'a {
        std::iter::successors(Some(id), move |current| {
            self.nodes.get(*current).and_then(|node| node.parent.as_ref())
        })
    }

    // === Resolver Operations ===

    /// Inserts a group unless it is already present.
    pub(crate) fn insert(&mut self, id: GroupId, record: GroupRecord) {
        self.nodes
            .entry(id.clone())
            .or_insert_with(|| GroupNode::new(id, record));
    }

    /// Marks an inserted group as a direct group of the user.
    pub(crate) fn add_root(&mut self, id: GroupId) {
        self.roots.insert(id);
    }

    /// Links `child` to `parent` in the parent relation.
    pub(crate) fn set_parent(&mut self, child: &GroupId, parent: GroupId) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    /// Links `child` under `parent` in the child relation.
    pub(crate) fn add_child(&mut self, parent: &GroupId, child: GroupId) {
        if let Some(node) = self.nodes.get_mut(parent) {
            node.children.insert(child);
        }
    }

    /// Checks if `target` is on the parent chain of `start`, inclusive.
    pub(crate) fn parent_chain_contains(&self, start: &GroupId, target: &GroupId) -> bool {
        self.ancestry(start).any(|id| id == target)
    }

    /// Checks if `target` is `start` or one of its resolved descendants.
    pub(crate) fn descendants_contain(&self, start: &GroupId, target: &GroupId) -> bool {
        let mut seen = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if current == target {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(node) = self.nodes.get(current) {
                stack.extend(node.children.iter());
            }
        }
        false
    }
}

// ============================================================================
// Group Reference
// ============================================================================

/// A group within its forest, able to follow links.
#[derive(Clone, Copy)]
pub struct GroupRef<'a> {
    forest: &'a GroupForest,
    node: &'a GroupNode,
}

impl<'a> GroupRef<'a> {
    /// Returns the node.
    #[must_use]
    pub const fn node(&self) -> &'a GroupNode {
        self.node
    }

    /// Returns the resolved parent.
    #[must_use]
    pub fn parent(&self) -> Option<GroupRef<'a>> {
        let (forest, node) = (self.forest, self.node);
        node.parent.as_ref().and_then(|id| forest.get(id.as_str()))
    }

    /// Iterates the resolved sub-groups.
    pub fn sub_groups(&self) -> impl Iterator<Item = GroupRef<'a>> + 'a {
        let (forest, node) = (self.forest, self.node);
        node.children
            .iter()
            .filter_map(move |id| forest.get(id.as_str()))
    }
}

impl Deref for GroupRef<'_> {
    type Target = GroupNode;

    fn deref(&self) -> &GroupNode {
        self.node
    }
}

impl PartialEq for GroupRef<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.node == other.node
    }
}

impl fmt::Debug for GroupRef<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GroupRef")
            .field("id", &self.node.id)
            .field("parent", &self.node.parent)
            .field("children", &self.node.children)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use super::*;

    fn forest(provider: Uuid) -> (GroupForest, GroupId, GroupId, GroupId) {
        let a = GroupId::new(provider, "a");
        let b = GroupId::new(provider, "b");
        let c = GroupId::new(provider, "c");

        let mut forest = GroupForest::new();
        forest.insert(a.clone(), GroupRecord::new("a").with_attribute("dept", "R&D"));
        forest.insert(b.clone(), GroupRecord::new("b"));
        forest.insert(c.clone(), GroupRecord::new("c"));
        forest.add_root(a.clone());
        forest.set_parent(&a, b.clone());
        forest.add_child(&a, c.clone());
        (forest, a, b, c)
    }

    fn hash_of(node: &GroupNode) -> u64 {
        let mut hasher = DefaultHasher::new();
        node.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn group_id_encodes_name() {
        let provider = Uuid::now_v7();
        let id = GroupId::new(provider, "team:ops");

        assert_eq!(id.as_str(), format!("f:{provider}:team:ops"));
        assert_eq!(id.group_name(), "team:ops");
    }

    #[test]
    fn navigates_links() {
        let (forest, a, b, c) = forest(Uuid::now_v7());

        let root = forest.roots().next().unwrap();
        assert_eq!(root.group_id(), &a);
        assert_eq!(root.parent().unwrap().group_id(), &b);
        assert!(root.parent().unwrap().parent().is_none());
        assert_eq!(root.sub_groups().map(|g| g.group_id().clone()).collect::<Vec<_>>(), vec![c]);
        assert_eq!(root.first_attribute("dept"), Some("R&D"));
        assert_eq!(root.parent_id(), Some(b.as_str()));
        assert_eq!(forest.len(), 3);
    }

    #[test]
    fn equality_ignores_attributes() {
        let provider = Uuid::now_v7();
        let id = GroupId::new(provider, "a");

        let plain = GroupNode::new(id.clone(), GroupRecord::new("a"));
        let rich = GroupNode::new(id, GroupRecord::new("a").with_attribute("k", "v"));

        assert_eq!(plain, rich);
        assert_eq!(hash_of(&plain), hash_of(&rich));
    }

    #[test]
    fn equality_covers_links() {
        let provider = Uuid::now_v7();
        let (linked, a, ..) = forest(provider);

        let mut bare = GroupForest::new();
        bare.insert(a.clone(), GroupRecord::new("a"));

        assert_ne!(linked.get(a.as_str()).unwrap().node(), bare.get(a.as_str()).unwrap().node());
    }

    #[test]
    fn membership_includes_ancestors() {
        let (forest, a, b, c) = forest(Uuid::now_v7());

        assert!(forest.is_member(a.as_str()));
        assert!(forest.is_member(b.as_str()));
        assert!(!forest.is_member(c.as_str()));
    }

    #[test]
    fn cycle_checks() {
        let (forest, a, b, c) = forest(Uuid::now_v7());

        assert!(forest.parent_chain_contains(&a, &b));
        assert!(!forest.parent_chain_contains(&b, &a));
        assert!(forest.descendants_contain(&a, &c));
        assert!(forest.descendants_contain(&c, &c));
        assert!(!forest.descendants_contain(&c, &a));
    }

    #[test]
    fn insert_keeps_first_record() {
        let provider = Uuid::now_v7();
        let id = GroupId::new(provider, "a");

        let mut forest = GroupForest::new();
        forest.insert(id.clone(), GroupRecord::new("a").with_description("first"));
        forest.insert(id.clone(), GroupRecord::new("a").with_description("second"));

        assert_eq!(
            forest.get(id.as_str()).unwrap().record().description.as_deref(),
            Some("first")
        );
    }

    #[test]
    fn group_changes_are_rejected() {
        let (forest, a, ..) = forest(Uuid::now_v7());
        let mut node = forest.get(a.as_str()).unwrap().node().clone();

        for change in [
            GroupChange::Name("renamed".to_string()),
            GroupChange::SingleAttribute {
                name: "k".to_string(),
                value: "v".to_string(),
            },
            GroupChange::RemoveAttribute("dept".to_string()),
            GroupChange::Parent(None),
            GroupChange::AddChild("x".to_string()),
            GroupChange::GrantRole(Uuid::now_v7()),
        ] {
            assert!(node.update(change).unwrap_err().is_read_only());
        }
        assert!(node.realm_role_mappings().is_empty());
    }
}
