//! Pending invitations and the messages sent with them.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// Invitation waiting in the durable queue.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInvite {
    /// Store-assigned, insertion-ordered identifier.
    pub invite_id: i64,
    /// Repository the list was created for.
    pub repo_name: String,
    /// Web URL of the repository on the code host.
    pub repo_url: String,
    /// Handle of the user who created the list.
    pub inviter: String,
    /// Handle of the user being invited.
    pub invitee: String,
    /// Group identifier on the list service.
    pub group_id: String,
    /// When the invite was enqueued.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl PendingInvite {
    /// Build the welcome message sent with this invitation.
    ///
    /// `$invite_url` is left in the body for the list service to substitute.
    pub fn welcome_message(&self, list_domain: &str) -> WelcomeMessage {
        let inviter_url = format!("https://github.com/{}", self.inviter);
        WelcomeMessage {
            subject: format!("Invitation to {}@{}", self.repo_name, list_domain),
            markdown: format!(
                "\n[{inviter}]({inviter_url}) invited you to a [list](https://{list_domain}) for \
                 [{repo}]({repo_url}). These are dead-simple mailing lists for GitHub projects.\n\n\
                 [Click here]($invite_url) to join the list. If you don't want to join, \
                 just ignore this message.\n\nHave a great day!\n",
                inviter = self.inviter,
                repo = self.repo_name,
                repo_url = self.repo_url,
            ),
        }
    }
}

/// Invitation submitted for enqueueing; the store assigns the identifier.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewInvite {
    pub repo_name: String,
    pub repo_url: String,
    pub inviter: String,
    pub invitee: String,
    pub group_id: String,
}

impl NewInvite {
    /// Reject records with empty required fields.
    pub fn validate(&self) -> crate::Result<()> {
        let fields = [
            ("repo_name", &self.repo_name),
            ("repo_url", &self.repo_url),
            ("inviter", &self.inviter),
            ("invitee", &self.invitee),
            ("group_id", &self.group_id),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(crate::Error::InvalidInvite(format!("{name} is empty")));
            }
        }
        Ok(())
    }
}

/// Subject and markdown body of a welcome email.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeMessage {
    pub subject: String,
    pub markdown: String,
}

impl WelcomeMessage {
    /// Message sent to the creator once their list exists.
    pub fn list_created(
        repo_name: &str,
        repo_url: &str,
        group_id: &str,
        list_domain: &str,
    ) -> Self {
        Self {
            subject: format!("Welcome to {repo_name}@{list_domain}"),
            markdown: format!(
                "\nYour [list](https://{list_domain}) for [{repo_name}]({repo_url}) has been \
                 created.\n\nThe [list page](https://{list_domain}/list/{group_id}) is the \
                 archive *and* where new members will need to go to join the list, so you might \
                 want to add it to your repo's README.\n\nHave a great day!\n"
            ),
        }
    }
}

/// Contact data resolved for a code-host handle.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub handle: String,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

impl Contact {
    /// The public email address, if the account has a usable one.
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref().filter(|e| !e.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invite() -> PendingInvite {
        PendingInvite {
            invite_id: 7,
            repo_name: "widgets".to_string(),
            repo_url: "https://github.com/acme/widgets".to_string(),
            inviter: "alice".to_string(),
            invitee: "bob".to_string(),
            group_id: "g-123".to_string(),
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_welcome_message_mentions_repo_and_inviter() {
        let message = invite().welcome_message("lists.example.com");
        assert_eq!(message.subject, "Invitation to widgets@lists.example.com");
        assert!(message.markdown.contains("[alice](https://github.com/alice)"));
        assert!(
            message
                .markdown
                .contains("[widgets](https://github.com/acme/widgets)")
        );
        assert!(message.markdown.contains("$invite_url"));
    }

    #[test]
    fn test_list_created_message_links_list_page() {
        let message = WelcomeMessage::list_created(
            "widgets",
            "https://github.com/acme/widgets",
            "g-123",
            "lists.example.com",
        );
        assert_eq!(message.subject, "Welcome to widgets@lists.example.com");
        assert!(message.markdown.contains("has been created"));
        assert!(
            message
                .markdown
                .contains("(https://lists.example.com/list/g-123)")
        );
        assert!(!message.markdown.contains("$invite_url"));
    }

    #[test]
    fn test_new_invite_validation() {
        let mut new = NewInvite {
            repo_name: "widgets".to_string(),
            repo_url: "https://github.com/acme/widgets".to_string(),
            inviter: "alice".to_string(),
            invitee: "bob".to_string(),
            group_id: "g-123".to_string(),
        };
        assert!(new.validate().is_ok());

        new.invitee = "  ".to_string();
        let err = new.validate().unwrap_err();
        assert!(err.to_string().contains("invitee"));
    }

    #[test]
    fn test_contact_blank_email_is_absent() {
        let contact = Contact {
            handle: "bob".to_string(),
            email: Some(" ".to_string()),
            display_name: None,
        };
        assert_eq!(contact.email(), None);
    }
}
