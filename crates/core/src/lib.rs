//! Core domain types and shared logic for Herald.
//!
//! This crate defines the pieces every other crate builds on:
//! - URL-safe integer, base32 and base64 codecs
//! - Pending invite records and welcome messages
//! - Contact data resolved for an invitee
//! - Application configuration

pub mod codec;
pub mod config;
pub mod error;
pub mod invite;

pub use error::{Error, Result};
pub use invite::{Contact, NewInvite, PendingInvite, WelcomeMessage};

/// Handle the code host reports for accounts without a usable email address.
pub const INVALID_EMAIL_HANDLE: &str = "invalid-email-address";
