//! Test data builders.

use herald_core::NewInvite;

/// An invite for `invitee` on the `widgets` list.
#[allow(dead_code)]
pub fn new_invite(invitee: &str) -> NewInvite {
    NewInvite {
        repo_name: "widgets".to_string(),
        repo_url: "https://github.com/acme/widgets".to_string(),
        inviter: "octocat".to_string(),
        invitee: invitee.to_string(),
        group_id: "grp-widgets".to_string(),
    }
}
