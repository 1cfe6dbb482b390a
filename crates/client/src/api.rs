//! Memoizing client for the code-host API.
//!
//! Idempotent reads go through the durable response cache. Failures the
//! code host reports inside a successful response (an `error` field in the
//! JSON body) are classified into [`ClientError`] signals, and only clean
//! successes are ever written to the cache.

use crate::error::{ClientError, ClientResult};
use herald_core::Contact;
use herald_core::config::UpstreamConfig;
use herald_metadata::ResponseCacheRepo;
use herald_signer::TokenSigner;
use regex::Regex;
use reqwest::StatusCode;
use reqwest::header::ACCEPT;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::{Arc, LazyLock};
use url::Url;

static RATE_LIMIT_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)rate limit").expect("invalid rate limit pattern"));

/// Cache scope used for requests made without a token.
const ANONYMOUS_SCOPE: &str = "anonymous";

/// Code-host credential and the cache segment it maps to.
#[derive(Clone)]
pub struct Credential {
    token: Option<String>,
    scope: String,
}

impl Credential {
    /// Credential for `token`; `None` sends anonymous requests.
    ///
    /// The cache scope is derived with the signer so the token itself never
    /// reaches the cache.
    pub fn new(token: Option<String>, signer: &TokenSigner) -> Self {
        let scope = token
            .as_deref()
            .map(|t| signer.cache_scope(t))
            .unwrap_or_else(|| ANONYMOUS_SCOPE.to_string());
        Self { token, scope }
    }

    /// Anonymous credential.
    pub fn anonymous() -> Self {
        Self {
            token: None,
            scope: ANONYMOUS_SCOPE.to_string(),
        }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("scope", &self.scope)
            .finish()
    }
}

/// How a single request is issued.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RequestOptions {
    /// Append the configured page size.
    pub paged: bool,
    /// Serve from and write to the response cache.
    pub cacheable: bool,
}

impl RequestOptions {
    pub const UNCACHED: Self = Self {
        paged: false,
        cacheable: false,
    };
    pub const CACHED: Self = Self {
        paged: false,
        cacheable: true,
    };
    pub const PAGED: Self = Self {
        paged: true,
        cacheable: false,
    };
    pub const PAGED_CACHED: Self = Self {
        paged: true,
        cacheable: true,
    };
}

/// A response body and whether it came from the cache.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Fetched {
    pub body: Vec<u8>,
    pub from_cache: bool,
}

/// Code-host user account.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct User {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl User {
    pub fn into_contact(self) -> Contact {
        Contact {
            handle: self.login,
            email: self.email,
            display_name: self.name,
        }
    }
}

/// Account reference embedded in list responses.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Account {
    pub login: String,
}

/// Repository summary.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Repo {
    pub name: String,
    pub full_name: String,
    pub html_url: String,
    #[serde(default)]
    pub description: Option<String>,
    pub owner: Account,
}

#[derive(Deserialize)]
struct Fork {
    owner: Account,
}

/// Client bound to one credential.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    page_size: u32,
    credential: Credential,
    cache: Arc<dyn ResponseCacheRepo>,
}

impl ApiClient {
    pub fn new(
        config: &UpstreamConfig,
        credential: Credential,
        cache: Arc<dyn ResponseCacheRepo>,
    ) -> ClientResult<Self> {
        let base_url = parse_base_url(&config.base_url)?;
        let http = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            http,
            base_url,
            page_size: config.page_size,
            credential,
            cache,
        })
    }

    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    fn url(&self, path: &str, paged: bool) -> ClientResult<Url> {
        let mut url = endpoint(&self.base_url, path)?;
        if paged {
            url.query_pairs_mut()
                .append_pair("per_page", &self.page_size.to_string());
        }
        Ok(url)
    }

    /// Issue a GET for `path` and return the raw body.
    pub async fn request(&self, path: &str, options: RequestOptions) -> ClientResult<Vec<u8>> {
        Ok(self.fetch(path, options).await?.body)
    }

    /// Like [`ApiClient::request`], also reporting whether the network was
    /// skipped.
    pub async fn fetch(&self, path: &str, options: RequestOptions) -> ClientResult<Fetched> {
        let url = self.url(path, options.paged)?;
        let cache_key = format!("{url}#{}", self.credential.scope());

        if options.cacheable
            && let Some(body) = self.cache.get_cached_response(&cache_key).await?
        {
            tracing::debug!(url = %url, "Upstream response served from cache");
            return Ok(Fetched {
                body,
                from_cache: true,
            });
        }

        let mut req = self
            .http
            .get(url.clone())
            .header(ACCEPT, "application/json");
        if let Some(token) = self.credential.token() {
            req = req.bearer_auth(token);
        }

        let response = req.send().await?;
        let status = response.status();
        let body = response.bytes().await?.to_vec();

        if let Err(err) = classify_response(status, &body) {
            tracing::warn!(url = %url, status = status.as_u16(), error = %err, "Upstream request failed");
            return Err(err);
        }

        if options.cacheable {
            self.cache.put_cached_response(&cache_key, &body).await?;
        }
        Ok(Fetched {
            body,
            from_cache: false,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ClientResult<T> {
        let body = self.request(path, options).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_list<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ClientResult<Vec<T>> {
        let body = self.request(path, options).await?;
        parse_list(&body)
    }

    /// The authenticated user.
    pub async fn current_user(&self) -> ClientResult<User> {
        self.get_json("/user", RequestOptions::UNCACHED).await
    }

    /// Organizations the authenticated user belongs to.
    pub async fn orgs(&self) -> ClientResult<Vec<Account>> {
        self.get_list("/user/orgs", RequestOptions::PAGED).await
    }

    /// Repositories of the authenticated user, or of `org`.
    pub async fn repos(&self, org: Option<&str>) -> ClientResult<Vec<Repo>> {
        let path = match org {
            Some(org) => format!("/orgs/{org}/repos"),
            None => "/user/repos".to_string(),
        };
        self.get_list(&path, RequestOptions::PAGED).await
    }

    /// A single repository, as seen by this credential.
    pub async fn repo(&self, owner: &str, repo: &str) -> ClientResult<Repo> {
        self.get_json(&format!("/repos/{owner}/{repo}"), RequestOptions::UNCACHED)
            .await
    }

    /// Public profile of `handle`, and whether it was served from the cache.
    pub async fn user_info(&self, handle: &str) -> ClientResult<(User, bool)> {
        let fetched = self
            .fetch(&format!("/users/{handle}"), RequestOptions::CACHED)
            .await?;
        let user = serde_json::from_slice(&fetched.body)?;
        Ok((user, fetched.from_cache))
    }

    pub async fn collaborators(&self, owner: &str, repo: &str) -> ClientResult<Vec<String>> {
        let accounts: Vec<Account> = self
            .get_list(
                &format!("/repos/{owner}/{repo}/collaborators"),
                RequestOptions::PAGED_CACHED,
            )
            .await?;
        Ok(logins(accounts))
    }

    pub async fn contributors(&self, owner: &str, repo: &str) -> ClientResult<Vec<String>> {
        let accounts: Vec<Account> = self
            .get_list(
                &format!("/repos/{owner}/{repo}/contributors"),
                RequestOptions::PAGED_CACHED,
            )
            .await?;
        Ok(logins(accounts))
    }

    /// Owners of forks of the repository.
    pub async fn forkers(&self, owner: &str, repo: &str) -> ClientResult<Vec<String>> {
        let forks: Vec<Fork> = self
            .get_list(
                &format!("/repos/{owner}/{repo}/forks"),
                RequestOptions::PAGED_CACHED,
            )
            .await?;
        Ok(forks.into_iter().map(|f| f.owner.login).collect())
    }

    /// Accounts watching the repository.
    pub async fn watchers(&self, owner: &str, repo: &str) -> ClientResult<Vec<String>> {
        let accounts: Vec<Account> = self
            .get_list(
                &format!("/repos/{owner}/{repo}/subscribers"),
                RequestOptions::PAGED_CACHED,
            )
            .await?;
        Ok(logins(accounts))
    }

    pub async fn org_members(&self, org: &str) -> ClientResult<Vec<String>> {
        let accounts: Vec<Account> = self
            .get_list(
                &format!("/orgs/{org}/members"),
                RequestOptions::PAGED_CACHED,
            )
            .await?;
        Ok(logins(accounts))
    }
}

fn logins(accounts: Vec<Account>) -> Vec<String> {
    accounts.into_iter().map(|a| a.login).collect()
}

/// Decode a JSON array; any other JSON value is an empty list.
fn parse_list<T: DeserializeOwned>(body: &[u8]) -> ClientResult<Vec<T>> {
    match serde_json::from_slice::<Value>(body)? {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(ClientError::from))
            .collect(),
        _ => Ok(Vec::new()),
    }
}

/// Text of the `error` field of a JSON object body.
fn embedded_error(body: &[u8]) -> Option<String> {
    let value: Value = serde_json::from_slice(body).ok()?;
    match value.get("error")? {
        Value::Null => None,
        Value::String(message) => Some(message.clone()),
        other => Some(other.to_string()),
    }
}

/// Map an upstream response to a client error, if it carries one.
pub(crate) fn classify_response(status: StatusCode, body: &[u8]) -> ClientResult<()> {
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Reauthorize);
    }
    if !status.is_success() {
        return Err(ClientError::Api(format!(
            "HTTP {}: {}",
            status.as_u16(),
            String::from_utf8_lossy(body)
        )));
    }
    match embedded_error(body) {
        Some(message) if RATE_LIMIT_PATTERN.is_match(&message) => Err(ClientError::RateLimited),
        Some(message) => Err(ClientError::Api(message)),
        None => Ok(()),
    }
}

/// Parse a configured base URL so that endpoint paths extend it instead of
/// replacing its path.
pub(crate) fn parse_base_url(raw: &str) -> ClientResult<Url> {
    let mut url = Url::parse(raw)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

/// Resolve an endpoint `path` (with or without a leading `/`) under `base`.
pub(crate) fn endpoint(base: &Url, path: &str) -> ClientResult<Url> {
    Ok(base.join(path.trim_start_matches('/'))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_signer::SecretKey;

    #[test]
    fn endpoint_keeps_base_path() {
        let base = parse_base_url("https://ghe.example.com/api/v3").unwrap();
        assert_eq!(
            endpoint(&base, "/user").unwrap().as_str(),
            "https://ghe.example.com/api/v3/user"
        );
        assert_eq!(
            endpoint(&base, "repos/acme/widgets").unwrap().as_str(),
            "https://ghe.example.com/api/v3/repos/acme/widgets"
        );

        let base = parse_base_url("https://api.github.com/api/v3/").unwrap();
        assert_eq!(
            endpoint(&base, "/user").unwrap().as_str(),
            "https://api.github.com/api/v3/user"
        );
    }

    #[test]
    fn endpoint_on_bare_host() {
        let base = parse_base_url("https://api.github.com").unwrap();
        assert_eq!(
            endpoint(&base, "/users/alice").unwrap().as_str(),
            "https://api.github.com/users/alice"
        );
    }

    #[test]
    fn test_classify_unauthorized_is_reauthorize() {
        let err = classify_response(StatusCode::UNAUTHORIZED, b"{}").unwrap_err();
        assert!(matches!(err, ClientError::Reauthorize));
    }

    #[test]
    fn test_classify_embedded_rate_limit() {
        let body = br#"{"error": "API Rate Limit Exceeded for 10.0.0.1"}"#;
        let err = classify_response(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, ClientError::RateLimited));
    }

    #[test]
    fn test_classify_other_embedded_error() {
        let body = br#"{"error": "Not Found"}"#;
        let err = classify_response(StatusCode::OK, body).unwrap_err();
        assert!(matches!(err, ClientError::Api(ref m) if m == "Not Found"));
    }

    #[test]
    fn test_classify_non_success_status() {
        let err = classify_response(StatusCode::BAD_GATEWAY, b"upstream down").unwrap_err();
        assert!(matches!(err, ClientError::Api(ref m) if m == "HTTP 502: upstream down"));
    }

    #[test]
    fn test_classify_clean_bodies() {
        assert!(classify_response(StatusCode::OK, br#"{"login": "alice"}"#).is_ok());
        assert!(classify_response(StatusCode::OK, br#"[{"error": "x"}]"#).is_ok());
        assert!(classify_response(StatusCode::OK, br#"{"error": null}"#).is_ok());
        assert!(classify_response(StatusCode::OK, b"not json").is_ok());
    }

    #[test]
    fn test_parse_list_ignores_non_lists() {
        let accounts: Vec<Account> = parse_list(br#"{"message": "moved"}"#).unwrap();
        assert!(accounts.is_empty());

        let accounts: Vec<Account> = parse_list(br#"[{"login": "a"}, {"login": "b"}]"#).unwrap();
        assert_eq!(logins(accounts), ["a", "b"]);
    }

    #[test]
    fn test_credential_scope_hides_token() {
        let signer = TokenSigner::new(&SecretKey::from_bytes(b"secret".to_vec()).unwrap()).unwrap();
        let credential = Credential::new(Some("gho_abc123".to_string()), &signer);
        assert_eq!(credential.scope(), signer.cache_scope("gho_abc123"));
        assert!(!format!("{credential:?}").contains("gho_abc123"));
        assert_eq!(Credential::anonymous().scope(), "anonymous");
    }
}
