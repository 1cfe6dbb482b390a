//! Application state shared across handlers.

use crate::dispatcher::InviteDispatcher;
use herald_client::{ApiClient, ClientResult, Credential, GroupsClient, ProfileDirectory};
use herald_core::config::AppConfig;
use herald_metadata::MetadataStore;
use herald_signer::TokenSigner;
use std::sync::Arc;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Durable store: response cache, invite queue and profiles.
    pub metadata: Arc<dyn MetadataStore>,
    /// Process-wide signer for XSRF tokens and cache scopes.
    pub signer: Arc<TokenSigner>,
    /// List service client.
    pub groups: Arc<GroupsClient>,
}

impl AppState {
    /// Create new application state.
    pub fn new(
        config: AppConfig,
        metadata: Arc<dyn MetadataStore>,
        signer: TokenSigner,
    ) -> ClientResult<Self> {
        let groups = GroupsClient::new(&config.groups)?;
        Ok(Self {
            config: Arc::new(config),
            metadata,
            signer: Arc::new(signer),
            groups: Arc::new(groups),
        })
    }

    /// Credential for a user's code-host token.
    pub fn credential(&self, token: &str) -> Credential {
        Credential::new(Some(token.to_string()), &self.signer)
    }

    /// Code-host client acting with `credential`.
    pub fn api_client(&self, credential: Credential) -> ClientResult<ApiClient> {
        ApiClient::new(&self.config.upstream, credential, self.metadata.clone())
    }

    /// Build the background dispatcher, looking up contacts with the
    /// configured service token.
    pub fn invite_dispatcher(&self) -> ClientResult<InviteDispatcher> {
        let credential = Credential::new(self.config.upstream.service_token.clone(), &self.signer);
        let directory = ProfileDirectory::new(self.api_client(credential)?, self.metadata.clone());
        Ok(InviteDispatcher::new(
            self.metadata.clone(),
            Arc::new(directory),
            self.groups.clone(),
            self.config.groups.list_domain.clone(),
            self.config.dispatcher.sleep_interval(),
        ))
    }
}
