//! Background invite dispatcher.
//!
//! A single task drains the durable invite queue. Each invite is removed
//! from the queue before it is processed, so delivery is attempted at most
//! once. Contact lookups that reach the code host are followed by a pause of
//! `sleep_interval`, which keeps every dispatcher within its share of the
//! upstream call budget.

use crate::metrics;
use herald_client::{ClientError, ContactLookup, GroupMembership, MemberInvite};
use herald_core::PendingInvite;
use herald_metadata::InviteQueueRepo;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// What one dispatcher iteration did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// The queue was empty.
    Idle,
    /// The invitee was added to the group.
    Sent { invite_id: i64 },
    /// The invitee has no public email address.
    Skipped { invite_id: i64 },
    /// Lookup or delivery failed; the invite is dropped.
    Failed { invite_id: i64 },
    /// The queue could not be read.
    StoreUnavailable,
}

struct Step {
    outcome: TickOutcome,
    pause: bool,
}

impl Step {
    fn paused(outcome: TickOutcome) -> Self {
        Self {
            outcome,
            pause: true,
        }
    }
}

/// Drains the invite queue into the list service.
pub struct InviteDispatcher {
    queue: Arc<dyn InviteQueueRepo>,
    contacts: Arc<dyn ContactLookup>,
    groups: Arc<dyn GroupMembership>,
    list_domain: String,
    sleep_interval: Duration,
}

impl InviteDispatcher {
    pub fn new(
        queue: Arc<dyn InviteQueueRepo>,
        contacts: Arc<dyn ContactLookup>,
        groups: Arc<dyn GroupMembership>,
        list_domain: String,
        sleep_interval: Duration,
    ) -> Self {
        Self {
            queue,
            contacts,
            groups,
            list_domain,
            sleep_interval,
        }
    }

    /// Process at most one invite, then pause unless no upstream call was
    /// needed.
    pub async fn tick(&self) -> TickOutcome {
        let step = self.step().await;
        if step.pause {
            tokio::time::sleep(self.sleep_interval).await;
        }
        step.outcome
    }

    /// Run until `shutdown` is cancelled.
    ///
    /// Cancellation is observed between invites and during pauses, never
    /// while an invite is being delivered.
    pub async fn run(self, shutdown: CancellationToken) {
        tracing::info!(
            interval_ms = self.sleep_interval.as_millis() as u64,
            "Invite dispatcher started"
        );

        while !shutdown.is_cancelled() {
            let step = self.step().await;
            if step.pause {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = tokio::time::sleep(self.sleep_interval) => {}
                }
            }
        }

        tracing::info!("Invite dispatcher stopped");
    }

    /// Spawn [`InviteDispatcher::run`] on the runtime.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }

    async fn step(&self) -> Step {
        let invite = match self.queue.dequeue_invite().await {
            Ok(Some(invite)) => invite,
            Ok(None) => return Step::paused(TickOutcome::Idle),
            Err(e) => {
                tracing::error!(error = %e, "Failed to read invite queue");
                return Step::paused(TickOutcome::StoreUnavailable);
            }
        };
        metrics::INVITES_DEQUEUED.inc();

        let (contact, from_cache) = match self.contacts.user_info(&invite.invitee).await {
            Ok(found) => found,
            Err(e) => {
                record_failure(&invite, "lookup", &e);
                return Step::paused(TickOutcome::Failed {
                    invite_id: invite.invite_id,
                });
            }
        };

        let outcome = match contact.email() {
            Some(address) => {
                let member = MemberInvite {
                    address: address.to_string(),
                    display_name: contact.display_name.clone(),
                    welcome_message: invite.welcome_message(&self.list_domain),
                    send_invite: true,
                };
                match self.groups.add_member(&invite.group_id, &member).await {
                    Ok(()) => {
                        metrics::INVITES_SENT.inc();
                        tracing::info!(
                            invite_id = invite.invite_id,
                            invitee = %invite.invitee,
                            group_id = %invite.group_id,
                            "Invite sent"
                        );
                        TickOutcome::Sent {
                            invite_id: invite.invite_id,
                        }
                    }
                    Err(e) => {
                        record_failure(&invite, "add_member", &e);
                        TickOutcome::Failed {
                            invite_id: invite.invite_id,
                        }
                    }
                }
            }
            None => {
                metrics::INVITES_SKIPPED.inc();
                tracing::info!(
                    invite_id = invite.invite_id,
                    invitee = %invite.invitee,
                    "No public email, skipping invite"
                );
                TickOutcome::Skipped {
                    invite_id: invite.invite_id,
                }
            }
        };

        Step {
            outcome,
            pause: !from_cache,
        }
    }
}

fn record_failure(invite: &PendingInvite, stage: &str, error: &ClientError) {
    match error.signal() {
        Some(signal) => {
            metrics::record_signal(signal);
            metrics::record_invite_failure(signal.as_str());
            tracing::warn!(
                invite_id = invite.invite_id,
                invitee = %invite.invitee,
                stage = stage,
                signal = signal.as_str(),
                "Upstream refused invite; dropping it"
            );
        }
        None => {
            metrics::record_invite_failure(stage);
            tracing::error!(
                invite_id = invite.invite_id,
                invitee = %invite.invitee,
                stage = stage,
                error = %error,
                "Failed to deliver invite"
            );
        }
    }
}
