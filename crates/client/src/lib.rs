//! Upstream clients for Herald.
//!
//! - [`ApiClient`]: code-host reads, memoized in the response cache, with
//!   expired credentials and rate limiting surfaced as [`Signal`]s
//! - [`ProfileDirectory`]: contact lookups through the profile store
//! - [`GroupsClient`]: group creation and membership on the list service

pub mod api;
pub mod directory;
pub mod discover;
pub mod error;
pub mod groups;

pub use api::{Account, ApiClient, Credential, Fetched, Repo, RequestOptions, User};
pub use directory::{ContactLookup, ProfileDirectory};
pub use discover::discover_invitees;
pub use error::{ClientError, ClientResult, Signal};
pub use groups::{AccessToken, Application, GroupMembership, GroupsClient, MemberInvite};
