//! Group hierarchy resolution.
//!
//! Crowd exposes memberships and nesting as flat, paged lookups. The
//! resolver rebuilds the linked hierarchy of one user from them:
//!
//! 1. load the user's direct groups,
//! 2. for each of them, walk up the parent chain one nearest parent at a time,
//! 3. and walk down all children, depth first.
//!
//! Each group is ascended and descended at most once per call. A link that
//! would close a cycle is handled according to [`HierarchyCyclePolicy`].
//! A group or user that vanishes mid-walk ends that branch; any other
//! directory failure aborts the whole resolution.

use std::collections::BTreeSet;

use kc_federation::{FederationError, FederationResult};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::client::{CrowdClient, ALL_RESULTS};
use crate::config::HierarchyCyclePolicy;
use crate::error::directory_failure;
use crate::group::{GroupForest, GroupId};

/// Rebuilds group hierarchies from a Crowd directory.
pub struct GroupResolver<'a> {
    client: &'a dyn CrowdClient,
    provider_id: Uuid,
    cycle_policy: HierarchyCyclePolicy,
}

/// Per-call traversal state.
#[derive(Default)]
struct Walk {
    forest: GroupForest,
    ascended: BTreeSet<GroupId>,
    descended: BTreeSet<GroupId>,
}

impl<'a> GroupResolver<'a> {
    /// Creates a resolver for groups owned by `provider_id`.
    #[must_use]
    pub fn new(
        client: &'a dyn CrowdClient,
        provider_id: Uuid,
        cycle_policy: HierarchyCyclePolicy,
    ) -> Self {
        Self {
            client,
            provider_id,
            cycle_policy,
        }
    }

    /// Resolves the groups of `username`.
    ///
    /// The forest's roots are the user's direct groups, linked to their
    /// ancestors and descendants.
    ///
    /// ## Errors
    ///
    /// - `FederationError::DirectoryAccess` if any directory call fails for
    ///   a reason other than a vanished user or group
    /// - `FederationError::HierarchyCycle` if a cycle is found under
    ///   [`HierarchyCyclePolicy::Fail`]
    pub async fn resolve_for_user(&self, username: &str) -> FederationResult<GroupForest> {
        let direct = match self.client.get_groups_for_user(username, 0, ALL_RESULTS).await {
            Ok(groups) => groups,
            Err(e) if e.is_user_not_found() => {
                debug!(username = %username, "User vanished before its groups were loaded");
                return Ok(GroupForest::new());
            }
            Err(e) => return Err(directory_failure("load groups of user", e)),
        };

        let mut walk = Walk::default();
        for record in direct {
            let id = self.group_id(&record.name);
            walk.forest.insert(id.clone(), record);
            walk.forest.add_root(id.clone());

            self.ascend(&mut walk, id.clone()).await?;
            self.descend(&mut walk, id).await?;
        }

        debug!(
            username = %username,
            direct = walk.forest.root_ids().len(),
            total = walk.forest.len(),
            "Resolved Crowd groups"
        );

        Ok(walk.forest)
    }

    /// Links `start` to its chain of nearest parents.
    async fn ascend(&self, walk: &mut Walk, start: GroupId) -> FederationResult<()> {
        let mut current = start;
        while walk.ascended.insert(current.clone()) {
            let parents = match self
                .client
                .get_parent_groups_for_group(current.group_name(), 0, 1)
                .await
            {
                Ok(parents) => parents,
                Err(e) if e.is_group_not_found() => {
                    debug!(group = %current.group_name(), "Group vanished while loading its parent");
                    break;
                }
                Err(e) => return Err(directory_failure("load parent group", e)),
            };

            let Some(parent) = parents.into_iter().next() else {
                break;
            };

            let parent_id = self.group_id(&parent.name);
            walk.forest.insert(parent_id.clone(), parent);

            if walk.forest.parent_chain_contains(&parent_id, &current) {
                self.on_cycle(&current, &parent_id)?;
                break;
            }

            walk.forest.set_parent(&current, parent_id.clone());
            current = parent_id;
        }
        Ok(())
    }

    /// Links `start` to all of its descendants.
    async fn descend(&self, walk: &mut Walk, start: GroupId) -> FederationResult<()> {
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if !walk.descended.insert(current.clone()) {
                continue;
            }

            let children = match self
                .client
                .get_child_groups_of_group(current.group_name(), 0, ALL_RESULTS)
                .await
            {
                Ok(children) => children,
                Err(e) if e.is_group_not_found() => {
                    debug!(group = %current.group_name(), "Group vanished while loading its children");
                    continue;
                }
                Err(e) => return Err(directory_failure("load child groups", e)),
            };

            for child in children {
                let child_id = self.group_id(&child.name);
                walk.forest.insert(child_id.clone(), child);

                if walk.forest.descendants_contain(&child_id, &current) {
                    self.on_cycle(&current, &child_id)?;
                    continue;
                }

                walk.forest.add_child(&current, child_id.clone());
                stack.push(child_id);
            }
        }
        Ok(())
    }

    fn on_cycle(&self, group: &GroupId, linked: &GroupId) -> FederationResult<()> {
        match self.cycle_policy {
            HierarchyCyclePolicy::Truncate => {
                warn!(
                    group = %group.group_name(),
                    linked = %linked.group_name(),
                    "Dropping group link that would close a hierarchy cycle"
                );
                Ok(())
            }
            HierarchyCyclePolicy::Fail => Err(FederationError::HierarchyCycle {
                group: group.group_name().to_string(),
            }),
        }
    }

    fn group_id(&self, group_name: &str) -> GroupId {
        GroupId::new(self.provider_id, group_name)
    }
}
