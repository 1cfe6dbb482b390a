//! Server test utilities.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use herald_core::config::{AppConfig, MetadataConfig};
use herald_metadata::{MetadataStore, SqliteStore};
use herald_server::{AppState, create_router};
use herald_signer::{SecretKey, TokenSigner};
use serde_json::Value;
use std::net::TcpListener;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

/// Code-host token used by test requests.
#[allow(dead_code)]
pub const TOKEN: &str = "gho_test_token";

/// httpmock needs a loopback listener; some sandboxes forbid it.
#[allow(dead_code)]
pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// A test server wrapper with all dependencies.
/// Note: #[allow(dead_code)] because each test file compiles common/ separately.
#[allow(dead_code)]
pub struct TestServer {
    pub router: axum::Router,
    pub state: AppState,
    _temp_dir: TempDir,
}

#[allow(dead_code)]
impl TestServer {
    /// Server whose upstream clients point at an unreachable address.
    pub async fn new() -> Self {
        Self::with_config(|_| {}).await
    }

    /// Server with both upstream APIs served from `base_url`.
    pub async fn with_upstream(base_url: &str) -> Self {
        let base_url = base_url.to_string();
        Self::with_config(move |config| {
            config.upstream.base_url = base_url.clone();
            config.groups.base_url = base_url;
        })
        .await
    }

    /// Server with a customized test configuration.
    pub async fn with_config(customize: impl FnOnce(&mut AppConfig)) -> Self {
        let temp_dir = tempfile::tempdir().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("metadata.db");
        let metadata: Arc<dyn MetadataStore> = Arc::new(
            SqliteStore::new(&db_path)
                .await
                .expect("Failed to create metadata store"),
        );

        let mut config = AppConfig::for_testing();
        config.metadata = MetadataConfig::Sqlite { path: db_path };
        config.dispatcher.sleep_interval_ms = 10;
        customize(&mut config);

        let key = SecretKey::from_bytes(b"test-signing-secret".to_vec()).expect("key");
        let signer = TokenSigner::new(&key).expect("signer");
        let state = AppState::new(config, metadata, signer).expect("Failed to build state");
        let router = create_router(state.clone());

        Self {
            router,
            state,
            _temp_dir: temp_dir,
        }
    }

    /// Mint a valid XSRF token for `action` on behalf of [`TOKEN`].
    pub fn xsrf_token(&self, action: &str) -> String {
        let session = self.state.signer.cache_scope(TOKEN);
        herald_server::xsrf::mint(&self.state.signer, action, &session).expect("xsrf token")
    }

    /// Send a request and decode the JSON response.
    pub async fn request(&self, request: Request<Body>) -> (StatusCode, Value) {
        let (status, _, json) = self.request_with_headers(request).await;
        (status, json)
    }

    /// Send a request and return status, headers and decoded JSON body.
    pub async fn request_with_headers(
        &self,
        request: Request<Body>,
    ) -> (StatusCode, axum::http::HeaderMap, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };
        (status, headers, json)
    }
}
