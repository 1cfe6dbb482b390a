//! Invitee discovery for a repository.

use crate::api::ApiClient;
use crate::error::ClientResult;
use herald_core::INVALID_EMAIL_HANDLE;
use std::collections::BTreeSet;

/// Handles of everyone connected to `owner/repo`: collaborators,
/// contributors, org members (when `org` is set), fork owners and watchers.
///
/// `requester` and the code host's placeholder handle are left out.
pub async fn discover_invitees(
    client: &ApiClient,
    owner: &str,
    repo: &str,
    org: Option<&str>,
    requester: &str,
) -> ClientResult<BTreeSet<String>> {
    let mut handles = BTreeSet::new();
    handles.extend(client.collaborators(owner, repo).await?);
    handles.extend(client.contributors(owner, repo).await?);
    if let Some(org) = org {
        handles.extend(client.org_members(org).await?);
    }
    handles.extend(client.forkers(owner, repo).await?);
    handles.extend(client.watchers(owner, repo).await?);

    handles.remove(requester);
    handles.remove(INVALID_EMAIL_HANDLE);
    tracing::debug!(owner, repo, count = handles.len(), "Discovered invitees");
    Ok(handles)
}
