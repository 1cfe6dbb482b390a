//! List creation.

use crate::auth::require_bearer_token;
use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;
use crate::xsrf;
use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use herald_client::{Application, GroupMembership, MemberInvite, discover_invitees};
use herald_core::{NewInvite, WelcomeMessage};
use herald_metadata::repos::InviteQueueRepo;
use serde::{Deserialize, Serialize};

/// XSRF action name for list creation.
pub const CREATE_LIST_ACTION: &str = "create_list";

/// Request to create a list for a repository.
#[derive(Debug, Deserialize)]
pub struct CreateListRequest {
    pub owner: String,
    pub repo: String,
    /// Also invite members of this organization.
    #[serde(default)]
    pub org: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CreateListResponse {
    pub group_id: String,
    /// Address that bypasses the list service's size limit.
    pub list_address: String,
    /// Number of invites queued.
    pub queued: usize,
    /// Whether the creator was subscribed (requires a public email).
    pub creator_subscribed: bool,
}

/// POST /v1/lists
///
/// All code-host reads happen before the group is created. The group gets a
/// public page, a subject prefix and an archive; the creator is subscribed
/// and one invite per discovered collaborator is queued for the dispatcher.
pub async fn create_list(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<CreateListRequest>,
) -> ApiResult<(StatusCode, Json<CreateListResponse>)> {
    let token = require_bearer_token(&headers)?;
    let credential = state.credential(token);
    xsrf::check(
        &state.signer,
        &headers,
        CREATE_LIST_ACTION,
        credential.scope(),
        state.config.server.xsrf_timeout(),
    )?;

    if req.owner.trim().is_empty() || req.repo.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "owner and repo are required".to_string(),
        ));
    }

    let client = state.api_client(credential)?;
    let requester = client.current_user().await?;

    if let Some(org) = req.org.as_deref() {
        let orgs = client.orgs().await?;
        if !orgs.iter().any(|o| o.login == org) {
            return Err(ApiError::NotFound(format!(
                "{} is not a member of {org}",
                requester.login
            )));
        }
    }

    let repo = client.repo(&req.owner, &req.repo).await?;
    let invitees = discover_invitees(
        &client,
        &req.owner,
        &req.repo,
        req.org.as_deref(),
        &requester.login,
    )
    .await?;

    let description = req
        .description
        .clone()
        .or_else(|| repo.description.clone())
        .unwrap_or_else(|| format!("Discussion of {}", repo.full_name));
    let group_id = state.groups.create_group(&repo.name, &description).await?;
    for application in [
        Application::public(&repo.name),
        Application::subject_prefix(&repo.name),
        Application::archive(),
    ] {
        state.groups.add_application(&group_id, &application).await?;
    }

    let list_domain = &state.config.groups.list_domain;
    let creator_subscribed = match requester.email.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(address) => {
            let member = MemberInvite {
                address: address.to_string(),
                display_name: requester.name.clone(),
                welcome_message: WelcomeMessage::list_created(
                    &repo.name,
                    &repo.html_url,
                    &group_id,
                    list_domain,
                ),
                send_invite: false,
            };
            state.groups.add_member(&group_id, &member).await?;
            true
        }
        None => {
            tracing::warn!(
                user = %requester.login,
                group_id = %group_id,
                "Creator has no public email; not subscribed"
            );
            false
        }
    };

    for invitee in &invitees {
        let invite = NewInvite {
            repo_name: repo.name.clone(),
            repo_url: repo.html_url.clone(),
            inviter: requester.login.clone(),
            invitee: invitee.clone(),
            group_id: group_id.clone(),
        };
        state.metadata.enqueue_invite(&invite).await?;
        metrics::INVITES_ENQUEUED.inc();
    }

    tracing::info!(
        repo = %repo.full_name,
        group_id = %group_id,
        inviter = %requester.login,
        queued = invitees.len(),
        "List created"
    );

    Ok((
        StatusCode::ACCEPTED,
        Json(CreateListResponse {
            list_address: format!(
                "{}@{}",
                state.signer.list_size_exempt(&repo.name),
                list_domain
            ),
            group_id,
            queued: invitees.len(),
            creator_subscribed,
        }),
    ))
}
