//! User profile repository.

use crate::error::MetadataResult;
use crate::models::UserProfileRow;
use async_trait::async_trait;

/// Contact data previously fetched from the code host.
///
/// Profiles are only refreshed after an explicit delete.
#[async_trait]
pub trait UserProfileRepo: Send + Sync {
    /// Get a profile by handle.
    async fn get_user_profile(&self, handle: &str) -> MetadataResult<Option<UserProfileRow>>;

    /// Insert or replace a profile.
    async fn put_user_profile(&self, profile: &UserProfileRow) -> MetadataResult<()>;

    /// Delete a profile. Returns whether one existed.
    async fn delete_user_profile(&self, handle: &str) -> MetadataResult<bool>;
}
