//! Database models mapping to the metadata schema.

use herald_core::{Contact, PendingInvite};
use sqlx::FromRow;
use time::OffsetDateTime;

// =============================================================================
// Invite queue
// =============================================================================

/// Queued invitation record.
#[derive(Debug, Clone, FromRow)]
pub struct PendingInviteRow {
    pub invite_id: i64,
    pub repo_name: String,
    pub repo_url: String,
    pub inviter: String,
    pub invitee: String,
    pub group_id: String,
    pub created_at: OffsetDateTime,
}

impl From<PendingInviteRow> for PendingInvite {
    fn from(row: PendingInviteRow) -> Self {
        Self {
            invite_id: row.invite_id,
            repo_name: row.repo_name,
            repo_url: row.repo_url,
            inviter: row.inviter,
            invitee: row.invitee,
            group_id: row.group_id,
            created_at: row.created_at,
        }
    }
}

// =============================================================================
// User profiles
// =============================================================================

/// Contact data cached for a code-host handle.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct UserProfileRow {
    pub handle: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub fetched_at: OffsetDateTime,
}

impl UserProfileRow {
    /// Build a row for `contact` fetched at `fetched_at`.
    pub fn from_contact(contact: &Contact, fetched_at: OffsetDateTime) -> Self {
        Self {
            handle: contact.handle.clone(),
            email: contact.email.clone(),
            display_name: contact.display_name.clone(),
            fetched_at,
        }
    }
}

impl From<UserProfileRow> for Contact {
    fn from(row: UserProfileRow) -> Self {
        Self {
            handle: row.handle,
            email: row.email,
            display_name: row.display_name,
        }
    }
}
