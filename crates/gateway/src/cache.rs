//! Short-lived provider token cache.
//!
//! Tokens live in a concurrent map keyed by provider id and are never
//! persisted. Concurrent refreshes for the same provider are allowed to
//! race — duplicate handshakes are harmless and the last writer wins on
//! the cache entry — but a token is never handed out at or past its
//! expiry.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use common::ProviderId;
use registry::{AuthMode, Provider};
use serde::Deserialize;
use tokio::sync::RwLock;

use crate::error::{GatewayError, Result};

/// Local ceiling on cached token lifetime, kept shorter than any real
/// provider token expiry to avoid using a token that dies mid-request.
const TTL_CEILING: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
    #[serde(rename = "expiresIn")]
    expires_in: Option<u64>,
}

/// Per-provider bearer token cache.
#[derive(Clone)]
pub struct CredentialCache {
    http: reqwest::Client,
    tokens: Arc<RwLock<HashMap<ProviderId, CachedToken>>>,
    ttl_ceiling: Duration,
}

impl CredentialCache {
    /// Creates a cache that performs handshakes over the given client.
    pub fn new(http: reqwest::Client) -> Self {
        Self {
            http,
            tokens: Arc::new(RwLock::new(HashMap::new())),
            ttl_ceiling: TTL_CEILING,
        }
    }

    /// Resolves the bearer token for a provider, if its auth mode uses one.
    ///
    /// Providers with no authentication or with per-request credentials
    /// deterministically yield `None` without a handshake. A cache miss or
    /// an expired entry triggers one fresh handshake against the
    /// provider's login endpoint.
    pub async fn token(&self, provider: &Provider) -> Result<Option<String>> {
        let (email, password) = match &provider.auth {
            AuthMode::None | AuthMode::Credentials { .. } => return Ok(None),
            AuthMode::BearerToken { email, password } => (email.clone(), password.clone()),
        };

        {
            let tokens = self.tokens.read().await;
            if let Some(cached) = tokens.get(&provider.id)
                && Utc::now() < cached.expires_at
            {
                return Ok(Some(cached.token.clone()));
            }
        }

        // Handshake outside the lock; a concurrent refresh for the same
        // provider may race, last writer wins.
        let fresh = self.handshake(provider, &email, &password).await?;
        let token = fresh.token.clone();
        self.tokens.write().await.insert(provider.id.clone(), fresh);

        Ok(Some(token))
    }

    #[tracing::instrument(skip(self, password), fields(provider = %provider.id))]
    async fn handshake(
        &self,
        provider: &Provider,
        email: &str,
        password: &str,
    ) -> Result<CachedToken> {
        metrics::counter!("credential_handshakes_total").increment(1);

        let url = format!("{}/api/auth/login", provider.base_url.trim_end_matches('/'));
        let body = serde_json::json!({ "email": email, "password": password });

        let response = self
            .http
            .post(&url)
            .timeout(provider.timeout())
            .json(&body)
            .send()
            .await
            .map_err(|e| GatewayError::Credential {
                provider: provider.id.clone(),
                reason: format!("login request failed: {e}"),
            })?;

        if !response.status().is_success() {
            return Err(GatewayError::Credential {
                provider: provider.id.clone(),
                reason: format!("login rejected with status {}", response.status().as_u16()),
            });
        }

        let login: LoginResponse =
            response
                .json()
                .await
                .map_err(|e| GatewayError::Credential {
                    provider: provider.id.clone(),
                    reason: format!("malformed login response: {e}"),
                })?;

        let server_ttl = login
            .expires_in
            .map(Duration::from_secs)
            .unwrap_or(self.ttl_ceiling);
        let ttl = server_ttl.min(self.ttl_ceiling);

        tracing::debug!(ttl_secs = ttl.as_secs(), "provider token refreshed");

        Ok(CachedToken {
            token: login.token,
            expires_at: Utc::now() + chrono::Duration::from_std(ttl).unwrap_or_default(),
        })
    }

    #[cfg(test)]
    async fn seed(&self, id: ProviderId, token: &str, expires_at: DateTime<Utc>) {
        self.tokens.write().await.insert(
            id,
            CachedToken {
                token: token.to_string(),
                expires_at,
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn bearer_provider(base_url: &str) -> Provider {
        Provider {
            id: ProviderId::new("SKYHIGH"),
            display_name: "SkyHigh".into(),
            base_url: base_url.to_string(),
            auth: AuthMode::BearerToken {
                email: "ws@agency.test".into(),
                password: "secret".into(),
            },
            timeout_secs: 2.0,
            markup_percent: 0.0,
            enabled: true,
        }
    }

    fn public_provider() -> Provider {
        Provider {
            id: ProviderId::new("OPEN"),
            display_name: "Open".into(),
            base_url: "http://open.test".into(),
            auth: AuthMode::None,
            timeout_secs: 2.0,
            markup_percent: 0.0,
            enabled: true,
        }
    }

    #[tokio::test]
    async fn test_unauthenticated_provider_never_handshakes() {
        // No mock server at all — a handshake attempt would error.
        let cache = CredentialCache::new(reqwest::Client::new());
        let token = cache.token(&public_provider()).await.unwrap();
        assert_eq!(token, None);
    }

    #[tokio::test]
    async fn test_second_request_within_ttl_reuses_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "tok-1",
                "expiresIn": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cache = CredentialCache::new(reqwest::Client::new());
        let provider = bearer_provider(&server.uri());

        let first = cache.token(&provider).await.unwrap();
        let second = cache.token(&provider).await.unwrap();
        assert_eq!(first.as_deref(), Some("tok-1"));
        assert_eq!(second.as_deref(), Some("tok-1"));
    }

    #[tokio::test]
    async fn test_expired_entry_triggers_one_new_handshake() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "tok-fresh",
                "expiresIn": 60
            })))
            .expect(1)
            .mount(&server)
            .await;

        let cache = CredentialCache::new(reqwest::Client::new());
        let provider = bearer_provider(&server.uri());
        cache
            .seed(
                provider.id.clone(),
                "tok-stale",
                Utc::now() - chrono::Duration::seconds(1),
            )
            .await;

        let token = cache.token(&provider).await.unwrap();
        assert_eq!(token.as_deref(), Some("tok-fresh"));

        let tokens = cache.tokens.read().await;
        assert!(tokens[&provider.id].expires_at > Utc::now());
    }

    #[tokio::test]
    async fn test_server_ttl_capped_by_local_ceiling() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token": "tok-long",
                "expiresIn": 86400
            })))
            .mount(&server)
            .await;

        let cache = CredentialCache::new(reqwest::Client::new());
        let provider = bearer_provider(&server.uri());
        cache.token(&provider).await.unwrap();

        let tokens = cache.tokens.read().await;
        let ceiling = Utc::now() + chrono::Duration::from_std(TTL_CEILING).unwrap();
        assert!(tokens[&provider.id].expires_at <= ceiling);
    }

    #[tokio::test]
    async fn test_failed_handshake_is_credential_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/auth/login"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let cache = CredentialCache::new(reqwest::Client::new());
        let err = cache.token(&bearer_provider(&server.uri())).await.unwrap_err();
        assert!(matches!(err, GatewayError::Credential { .. }));
    }
}
