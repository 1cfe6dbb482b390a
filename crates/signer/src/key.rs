//! Process-wide HMAC secret.

use crate::error::{SignerError, SignerResult};
use herald_core::config::SecretSource;
use rand_core::{OsRng, RngCore};
use std::fmt;

/// Length of generated secrets in bytes.
const GENERATED_SECRET_LEN: usize = 32;

/// Symmetric secret shared by every signature this process issues.
///
/// Must stay constant for the lifetime of all outstanding tokens.
#[derive(Clone)]
pub struct SecretKey {
    bytes: Vec<u8>,
}

impl SecretKey {
    /// Wrap raw secret bytes.
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> SignerResult<Self> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(SignerError::KeyLoading("secret is empty".to_string()));
        }
        Ok(Self { bytes })
    }

    /// Generate a new random secret.
    pub fn generate() -> Self {
        let mut bytes = vec![0u8; GENERATED_SECRET_LEN];
        OsRng.fill_bytes(&mut bytes);
        Self { bytes }
    }

    /// Load the secret from its configured source.
    pub fn from_source(source: &SecretSource) -> SignerResult<Self> {
        match source {
            SecretSource::File { path } => {
                let contents = std::fs::read_to_string(path)?;
                Self::from_bytes(contents.trim_end().as_bytes())
            }
            SecretSource::Env { var } => {
                let value = std::env::var(var).map_err(|e| {
                    SignerError::KeyLoading(format!("environment variable {var}: {e}"))
                })?;
                Self::from_bytes(value.into_bytes())
            }
            SecretSource::Value { secret } => Self::from_bytes(secret.as_bytes()),
            SecretSource::Generate => Ok(Self::generate()),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey([REDACTED])")
    }
}
