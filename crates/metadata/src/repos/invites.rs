//! Invite queue repository.

use crate::error::MetadataResult;
use async_trait::async_trait;
use herald_core::{NewInvite, PendingInvite};

/// Durable FIFO queue of invitations waiting to be sent.
#[async_trait]
pub trait InviteQueueRepo: Send + Sync {
    /// Append an invite. Returns the store-assigned identifier, which is
    /// strictly greater than every identifier assigned before it.
    async fn enqueue_invite(&self, invite: &NewInvite) -> MetadataResult<i64>;

    /// Atomically remove and return the oldest invite.
    ///
    /// Safe under concurrent callers: each record is returned to exactly one
    /// of them. The record is gone before the caller processes it, so
    /// delivery is attempted at most once.
    async fn dequeue_invite(&self) -> MetadataResult<Option<PendingInvite>>;

    /// Number of invites waiting.
    async fn count_pending_invites(&self) -> MetadataResult<u64>;
}
