//! Contact lookups backed by the profile store.

use crate::api::ApiClient;
use crate::error::ClientResult;
use async_trait::async_trait;
use herald_core::Contact;
use herald_metadata::{UserProfileRepo, UserProfileRow};
use std::sync::Arc;
use time::OffsetDateTime;

/// Resolves a handle to contact data.
#[async_trait]
pub trait ContactLookup: Send + Sync {
    /// Returns the contact and whether it was served without an upstream call.
    async fn user_info(&self, handle: &str) -> ClientResult<(Contact, bool)>;
}

/// Profile store in front of the code-host API.
pub struct ProfileDirectory {
    api: ApiClient,
    profiles: Arc<dyn UserProfileRepo>,
}

impl ProfileDirectory {
    pub fn new(api: ApiClient, profiles: Arc<dyn UserProfileRepo>) -> Self {
        Self { api, profiles }
    }
}

#[async_trait]
impl ContactLookup for ProfileDirectory {
    async fn user_info(&self, handle: &str) -> ClientResult<(Contact, bool)> {
        if let Some(row) = self.profiles.get_user_profile(handle).await? {
            return Ok((row.into(), true));
        }

        let (user, from_cache) = self.api.user_info(handle).await?;
        let contact = user.into_contact();
        self.profiles
            .put_user_profile(&UserProfileRow::from_contact(
                &contact,
                OffsetDateTime::now_utc(),
            ))
            .await?;
        tracing::debug!(handle = handle, from_cache, "Stored user profile");
        Ok((contact, from_cache))
    }
}
