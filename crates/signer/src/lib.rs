//! Token signing for Herald.
//!
//! This crate provides:
//! - Loading the process-wide HMAC secret from configuration
//! - Timestamped signatures with optional expiry checks (XSRF tokens)
//! - Untimed base32/base64 signatures for compact keys and addresses

pub mod error;
pub mod key;
pub mod signer;

pub use error::{SignerError, SignerResult};
pub use key::SecretKey;
pub use signer::{SignatureStatus, TokenSigner};
