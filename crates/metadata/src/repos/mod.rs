//! Repository traits for metadata operations.

pub mod invites;
pub mod profiles;
pub mod responses;

pub use invites::InviteQueueRepo;
pub use profiles::UserProfileRepo;
pub use responses::ResponseCacheRepo;
