//! HTTP request handlers.

pub mod auth;
pub mod health;
pub mod lists;
pub mod xsrf;

pub use auth::*;
pub use health::*;
pub use lists::*;
pub use xsrf::*;
