//! The authenticated HTTP gateway for provider backends.

use async_trait::async_trait;
use registry::{AuthMode, Provider};
use reqwest::Method;
use serde_json::Value;

use crate::api::ProviderApi;
use crate::cache::CredentialCache;
use crate::error::{GatewayError, Result};
use crate::identity::Identity;
use crate::normalize;
use crate::types::{CheckoutReceipt, PaymentDetails, ProviderCart, ReservationDetail};

/// HTTP client for provider backends.
///
/// Every call is scoped to one provider and carries that provider's
/// configured timeout — there is no global default that could silently
/// override a misconfigured provider. Bearer tokens come from the
/// credential cache; webservice credentials go out as headers per request.
#[derive(Clone)]
pub struct ProviderGateway {
    http: reqwest::Client,
    cache: CredentialCache,
}

impl ProviderGateway {
    /// Creates a gateway with a fresh HTTP client and credential cache.
    pub fn new() -> Self {
        let http = reqwest::Client::new();
        Self {
            cache: CredentialCache::new(http.clone()),
            http,
        }
    }

    /// Performs one request against one provider.
    async fn request(
        &self,
        provider: &Provider,
        method: Method,
        path: &str,
        identity: &Identity,
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let raw_url = format!("{}{}", provider.base_url.trim_end_matches('/'), path);
        let url = url::Url::parse(&raw_url).map_err(|e| GatewayError::Unreachable {
            provider: provider.id.clone(),
            reason: format!("invalid provider URL {raw_url}: {e}"),
        })?;

        let mut request = self
            .http
            .request(method, url)
            .timeout(provider.timeout())
            .header(reqwest::header::ACCEPT, "application/json")
            .header("X-User-Id", identity.user_id.to_string());

        if let Some(email) = &identity.email {
            request = request.header("X-User-Email", email);
        }
        if let Some(name) = &identity.name {
            request = request.header("X-User-Name", name);
        }

        match &provider.auth {
            AuthMode::None => {}
            AuthMode::Credentials { email, password } => {
                request = request
                    .header("X-WebService-Email", email)
                    .header("X-WebService-Password", password);
            }
            AuthMode::BearerToken { .. } => {
                // A failed handshake fails the call: this mode has no
                // unauthenticated fallback.
                if let Some(token) = self.cache.token(provider).await? {
                    request = request.bearer_auth(token);
                }
            }
        }

        if let Some(body) = body {
            request = request.json(body);
        }

        metrics::counter!("provider_requests_total", "provider" => provider.id.to_string())
            .increment(1);

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                metrics::counter!("provider_timeouts_total", "provider" => provider.id.to_string())
                    .increment(1);
                GatewayError::Timeout {
                    provider: provider.id.clone(),
                }
            } else {
                GatewayError::Unreachable {
                    provider: provider.id.clone(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .ok()
                .and_then(|text| parse_error_message(&text))
                .unwrap_or_else(|| format!("Error {} from provider", status.as_u16()));
            return Err(GatewayError::Rejected {
                provider: provider.id.clone(),
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn request_json(
        &self,
        provider: &Provider,
        method: Method,
        path: &str,
        identity: &Identity,
        body: Option<&Value>,
    ) -> Result<Value> {
        let response = self.request(provider, method, path, identity, body).await?;
        response
            .json()
            .await
            .map_err(|e| GatewayError::InvalidResponse {
                provider: provider.id.clone(),
                reason: format!("body is not JSON: {e}"),
            })
    }
}

impl Default for ProviderGateway {
    fn default() -> Self {
        Self::new()
    }
}

/// Pulls a human-readable message out of a provider error body.
///
/// Providers disagree on the key (`error` vs `detail`); anything else
/// falls back to a generic status-keyed message at the call site.
fn parse_error_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    for key in ["error", "detail"] {
        if let Some(msg) = value.get(key).and_then(Value::as_str)
            && !msg.is_empty()
        {
            return Some(msg.to_string());
        }
    }
    None
}

#[async_trait]
impl ProviderApi for ProviderGateway {
    #[tracing::instrument(skip(self, identity), fields(provider = %provider.id))]
    async fn fetch_cart(&self, provider: &Provider, identity: &Identity) -> Result<ProviderCart> {
        let body = self
            .request_json(provider, Method::GET, "/api/compras/carrito", identity, None)
            .await?;
        Ok(normalize::cart(&body))
    }

    #[tracing::instrument(skip(self, identity), fields(provider = %provider.id))]
    async fn add_item(
        &self,
        provider: &Provider,
        identity: &Identity,
        flight_id: i64,
        fare_class_id: i64,
        quantity: u32,
        include_linked: bool,
    ) -> Result<()> {
        let path = if include_linked {
            "/api/compras/items?pair=true"
        } else {
            "/api/compras/items"
        };
        let payload = serde_json::json!({
            "idVuelo": flight_id,
            "idClase": fare_class_id,
            "cantidad": quantity,
        });
        self.request(provider, Method::POST, path, identity, Some(&payload))
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, identity), fields(provider = %provider.id))]
    async fn update_item(
        &self,
        provider: &Provider,
        identity: &Identity,
        item_id: &str,
        quantity: u32,
        sync_linked: bool,
    ) -> Result<()> {
        let suffix = if sync_linked { "?syncPareja=true" } else { "" };
        let path = format!("/api/compras/items/{item_id}{suffix}");
        let payload = serde_json::json!({ "cantidad": quantity });
        self.request(provider, Method::PUT, &path, identity, Some(&payload))
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, identity), fields(provider = %provider.id))]
    async fn remove_item(
        &self,
        provider: &Provider,
        identity: &Identity,
        item_id: &str,
        sync_linked: bool,
    ) -> Result<()> {
        let suffix = if sync_linked { "?syncPareja=true" } else { "" };
        let path = format!("/api/compras/items/{item_id}{suffix}");
        self.request(provider, Method::DELETE, &path, identity, None)
            .await?;
        Ok(())
    }

    #[tracing::instrument(skip(self, identity, payment), fields(provider = %provider.id))]
    async fn checkout(
        &self,
        provider: &Provider,
        identity: &Identity,
        payment: &PaymentDetails,
    ) -> Result<CheckoutReceipt> {
        let payload =
            serde_json::to_value(payment).map_err(|e| GatewayError::InvalidResponse {
                provider: provider.id.clone(),
                reason: format!("unserializable payment details: {e}"),
            })?;
        let body = self
            .request_json(
                provider,
                Method::POST,
                "/api/compras/checkout",
                identity,
                Some(&payload),
            )
            .await?;

        let reservation_id = normalize::id_field(&body, "idReserva").ok_or_else(|| {
            GatewayError::InvalidResponse {
                provider: provider.id.clone(),
                reason: "checkout response has no idReserva".to_string(),
            }
        })?;

        Ok(CheckoutReceipt { reservation_id })
    }

    #[tracing::instrument(skip(self, identity), fields(provider = %provider.id))]
    async fn reservation_detail(
        &self,
        provider: &Provider,
        identity: &Identity,
        reservation_id: &str,
    ) -> Result<ReservationDetail> {
        let path = format!("/api/compras/reservas/{reservation_id}");
        let body = self
            .request_json(provider, Method::GET, &path, identity, None)
            .await?;
        Ok(normalize::reservation_detail(reservation_id, body))
    }

    #[tracing::instrument(skip(self, identity), fields(provider = %provider.id))]
    async fn cancel_reservation(
        &self,
        provider: &Provider,
        identity: &Identity,
        reservation_id: &str,
    ) -> Result<()> {
        let path = format!("/api/compras/reservas/{reservation_id}/cancelar");
        self.request(provider, Method::POST, &path, identity, None)
            .await?;
        Ok(())
    }
}
