//! Response cache repository.

use crate::error::MetadataResult;
use async_trait::async_trait;

/// Memoized bodies of idempotent upstream reads, keyed by full request
/// identity.
///
/// Entries never expire and are never deleted here. Concurrent writers for
/// the same key are harmless: the last one wins and both hold the same data.
#[async_trait]
pub trait ResponseCacheRepo: Send + Sync {
    /// Get the cached body for `key`.
    async fn get_cached_response(&self, key: &str) -> MetadataResult<Option<Vec<u8>>>;

    /// Store `body` under `key`, replacing any previous value.
    async fn put_cached_response(&self, key: &str, body: &[u8]) -> MetadataResult<()>;
}
