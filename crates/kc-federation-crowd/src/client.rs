//! Directory client boundary.
//!
//! Everything the provider needs from Crowd goes through [`CrowdClient`].
//! Implementations classify failures into [`CrowdError`] variants; the
//! provider decides which of them are absences and which are failures.
//!
//! [`CrowdError`]: crate::error::CrowdError

use async_trait::async_trait;

use crate::entity::{GroupRecord, UserRecord};
use crate::error::CrowdResult;
use crate::restriction::Restriction;

/// Page size meaning "everything"; Crowd's own upper bound for `max-results`.
pub const ALL_RESULTS: usize = i32::MAX as usize;

/// Operations against a Crowd directory.
///
/// All paging uses `start` (zero-based offset) and `max` (page size).
#[async_trait]
pub trait CrowdClient: Send + Sync {
    /// Loads a user with attributes.
    ///
    /// Fails with `UserNotFound` if the user does not exist.
    async fn get_user(&self, username: &str) -> CrowdResult<UserRecord>;

    /// Searches users with attributes.
    async fn search_users(
        &self,
        restriction: &Restriction,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<UserRecord>>;

    /// Searches usernames only.
    async fn search_user_names(
        &self,
        restriction: &Restriction,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<String>>;

    /// Lists the groups a user directly belongs to.
    async fn get_groups_for_user(
        &self,
        username: &str,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<GroupRecord>>;

    /// Lists the direct parents of a group.
    async fn get_parent_groups_for_group(
        &self,
        group_name: &str,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<GroupRecord>>;

    /// Lists the direct children of a group.
    async fn get_child_groups_of_group(
        &self,
        group_name: &str,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<GroupRecord>>;

    /// Lists the direct members of a group.
    async fn get_users_of_group(
        &self,
        group_name: &str,
        start: usize,
        max: usize,
    ) -> CrowdResult<Vec<UserRecord>>;

    /// Authenticates a user with a password.
    ///
    /// ## Security
    ///
    /// Implementations must never log `password`.
    async fn authenticate_user(&self, username: &str, password: &str) -> CrowdResult<UserRecord>;

    /// Checks that the server is reachable and accepts the application credentials.
    async fn test_connection(&self) -> CrowdResult<()>;
}
