//! Client for the list service's group API.

use crate::api::{classify_response, endpoint, parse_base_url};
use crate::error::ClientResult;
use async_trait::async_trait;
use herald_core::WelcomeMessage;
use herald_core::config::GroupsConfig;
use serde::{Deserialize, Serialize};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use url::Url;

/// Token issued by the list service's OAuth exchange.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// A member to add to a group.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct MemberInvite {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    pub welcome_message: WelcomeMessage,
    pub send_invite: bool,
}

#[derive(Serialize)]
struct CreateGroupRequest<'a> {
    default_group_name: &'a str,
    description: &'a str,
}

#[derive(Deserialize)]
struct CreateGroupResponse {
    data: GroupData,
}

#[derive(Deserialize)]
struct GroupData {
    group_id: String,
}

/// A list service application attached to a group, with its settings.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct Application {
    pub application_id: String,
    #[serde(flatten)]
    pub settings: BTreeMap<String, String>,
}

impl Application {
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),
            settings: BTreeMap::new(),
        }
    }

    /// Add a setting sent alongside the application id.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Public list page, listed under `group_name`.
    pub fn public(group_name: &str) -> Self {
        Self::new("public").with("group_name", group_name)
    }

    /// Tag subjects with `[prefix]`.
    pub fn subject_prefix(prefix: &str) -> Self {
        Self::new("subject_prefix").with("prefix", prefix)
    }

    /// Keep a browsable archive.
    pub fn archive() -> Self {
        Self::new("archive")
    }
}

/// Adds members to groups.
#[async_trait]
pub trait GroupMembership: Send + Sync {
    async fn add_member(&self, group_id: &str, member: &MemberInvite) -> ClientResult<()>;
}

/// List service client authenticated with the application's credentials.
#[derive(Clone)]
pub struct GroupsClient {
    http: reqwest::Client,
    base_url: Url,
    client_id: String,
    client_secret: String,
}

impl GroupsClient {
    pub fn new(config: &GroupsConfig) -> ClientResult<Self> {
        Ok(Self {
            http: reqwest::Client::new(),
            base_url: parse_base_url(&config.base_url)?,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }

    fn url(&self, path: &str) -> ClientResult<Url> {
        endpoint(&self.base_url, path)
    }

    async fn send(&self, req: reqwest::RequestBuilder) -> ClientResult<Vec<u8>> {
        let response = req
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();
        classify_response(status, &body)?;
        Ok(body)
    }

    async fn send_json<T: DeserializeOwned>(&self, req: reqwest::RequestBuilder) -> ClientResult<T> {
        let body = self.send(req).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> ClientResult<AccessToken> {
        let url = self.url("/token")?;
        let form = [("grant_type", "authorization_code"), ("code", code)];
        self.send_json(self.http.post(url).form(&form)).await
    }

    /// Create a group and return its identifier.
    pub async fn create_group(&self, default_name: &str, description: &str) -> ClientResult<String> {
        let url = self.url("/group")?;
        let request = CreateGroupRequest {
            default_group_name: default_name,
            description,
        };
        let response: CreateGroupResponse =
            self.send_json(self.http.post(url).json(&request)).await?;
        tracing::info!(group_id = %response.data.group_id, name = default_name, "Created group");
        Ok(response.data.group_id)
    }

    /// Attach an application to a group.
    pub async fn add_application(
        &self,
        group_id: &str,
        application: &Application,
    ) -> ClientResult<()> {
        let url = self.url(&format!("/group/{group_id}/application"))?;
        self.send(self.http.post(url).json(application)).await?;
        tracing::debug!(
            group_id,
            application = %application.application_id,
            "Attached application"
        );
        Ok(())
    }
}

#[async_trait]
impl GroupMembership for GroupsClient {
    async fn add_member(&self, group_id: &str, member: &MemberInvite) -> ClientResult<()> {
        let url = self.url(&format!("/membership/{group_id}"))?;
        self.send(self.http.post(url).json(member)).await?;
        Ok(())
    }
}
