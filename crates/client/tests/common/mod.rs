//! Common test utilities.

use herald_client::{ApiClient, Credential};
use herald_core::config::UpstreamConfig;
use herald_metadata::{MetadataStore, SqliteStore};
use std::net::TcpListener;
use std::sync::Arc;

#[allow(dead_code)]
pub const TOKEN: &str = "gho_test_token";

/// httpmock needs a loopback listener; some sandboxes forbid it.
pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Fresh in-memory metadata store.
#[allow(dead_code)]
pub async fn store() -> Arc<dyn MetadataStore> {
    Arc::new(SqliteStore::in_memory().await.expect("in-memory store"))
}

/// Client for `base_url` authenticated with [`TOKEN`].
#[allow(dead_code)]
pub fn client(base_url: &str, store: Arc<dyn MetadataStore>) -> ApiClient {
    let config = UpstreamConfig {
        base_url: base_url.to_string(),
        page_size: 50,
        ..Default::default()
    };
    let credential = Credential::new(Some(TOKEN.to_string()), &signer());
    ApiClient::new(&config, credential, store).expect("client")
}

#[allow(dead_code)]
pub fn signer() -> herald_signer::TokenSigner {
    let key = herald_signer::SecretKey::from_bytes(b"test-secret".to_vec()).expect("key");
    herald_signer::TokenSigner::new(&key).expect("signer")
}
