//! Cross-provider cart aggregation.
//!
//! Provider carts are fetched concurrently and merged into a single view.
//! A provider that errors or times out is logged and excluded from the
//! merged cart; it is never fatal for the read path.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use common::{Money, ProviderId, UserId};
use futures_util::future;
use gateway::{Identity, ProviderApi, ProviderCartItem};
use registry::{Provider, ProviderStore};
use serde::Serialize;

use crate::error::{BookingError, Result};

/// One merged cart line, tagged with its owning provider and priced with
/// the agency markup applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CartItem {
    pub item_id: String,
    pub provider_id: ProviderId,
    pub flight_id: i64,
    pub fare_class_id: i64,
    pub quantity: u32,
    /// Provider price before markup.
    pub unit_base_price: Money,
    /// Customer-facing price after the provider's markup.
    pub unit_final_price: Money,
    /// `unit_final_price * quantity`.
    pub subtotal: Money,
    pub linked_item_id: Option<String>,
    pub flight_code: Option<String>,
    pub fare_class: Option<String>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
}

impl CartItem {
    fn from_provider(provider: &Provider, raw: ProviderCartItem) -> Self {
        let unit_final_price = raw.unit_base_price.with_markup(provider.markup_percent);
        Self {
            item_id: raw.item_id,
            provider_id: provider.id.clone(),
            flight_id: raw.flight_id,
            fare_class_id: raw.fare_class_id,
            quantity: raw.quantity,
            unit_base_price: raw.unit_base_price,
            unit_final_price,
            subtotal: unit_final_price.times(raw.quantity),
            linked_item_id: raw.linked_item_id,
            flight_code: raw.flight_code,
            fare_class: raw.fare_class,
            departure: raw.departure,
            arrival: raw.arrival,
            origin: raw.origin,
            destination: raw.destination,
        }
    }
}

/// The merged cart across every reachable enabled provider.
///
/// The total is always recomputed from the line subtotals; it is never
/// taken from a provider body.
#[derive(Debug, Clone, Serialize)]
pub struct AggregatedCart {
    pub user_id: UserId,
    pub fetched_at: DateTime<Utc>,
    pub items: Vec<CartItem>,
    pub total: Money,
}

impl AggregatedCart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Merges provider carts and routes item mutations to the owning provider.
pub struct CartAggregator<R, P> {
    registry: Arc<R>,
    providers: Arc<P>,
}

impl<R, P> CartAggregator<R, P>
where
    R: ProviderStore,
    P: ProviderApi,
{
    pub fn new(registry: Arc<R>, providers: Arc<P>) -> Self {
        Self {
            registry,
            providers,
        }
    }

    /// Fetches and merges the carts of all enabled providers.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn cart(&self, identity: &Identity) -> Result<AggregatedCart> {
        let providers = self.registry.list_enabled().await?;

        let fetches = providers.iter().map(|provider| {
            let api = Arc::clone(&self.providers);
            async move { (provider, api.fetch_cart(provider, identity).await) }
        });

        let mut items = Vec::new();
        for (provider, result) in future::join_all(fetches).await {
            match result {
                Ok(cart) => {
                    items.extend(
                        cart.items
                            .into_iter()
                            .map(|raw| CartItem::from_provider(provider, raw)),
                    );
                }
                Err(e) => {
                    metrics::counter!("cart_provider_fetch_failures_total", "provider" => provider.id.to_string()).increment(1);
                    tracing::warn!(
                        provider_id = %provider.id,
                        error = %e,
                        "Excluding unreachable provider from merged cart"
                    );
                }
            }
        }

        let total = items.iter().map(|item| item.subtotal).sum();
        Ok(AggregatedCart {
            user_id: identity.user_id,
            fetched_at: Utc::now(),
            items,
            total,
        })
    }

    /// Adds an item to one provider's cart.
    ///
    /// When no provider is named, the first enabled provider is used.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn add_item(
        &self,
        identity: &Identity,
        provider_id: Option<&ProviderId>,
        flight_id: i64,
        fare_class_id: i64,
        quantity: u32,
        include_linked: bool,
    ) -> Result<()> {
        let provider = match provider_id {
            Some(id) => self.registry.get(id).await?,
            None => self
                .registry
                .list_enabled()
                .await?
                .into_iter()
                .next()
                .ok_or_else(|| {
                    BookingError::InvalidCartState("No enabled providers configured".to_string())
                })?,
        };
        if !provider.enabled {
            return Err(BookingError::InvalidCartState(format!(
                "Provider {} is disabled",
                provider.id
            )));
        }

        self.providers
            .add_item(
                &provider,
                identity,
                flight_id,
                fare_class_id,
                quantity,
                include_linked,
            )
            .await?;
        Ok(())
    }

    /// Changes a line item's quantity on its owning provider.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn update_item(
        &self,
        identity: &Identity,
        provider_id: Option<&ProviderId>,
        item_id: &str,
        quantity: u32,
        sync_linked: bool,
    ) -> Result<()> {
        let provider = self.resolve_owner(identity, provider_id, item_id).await?;
        self.providers
            .update_item(&provider, identity, item_id, quantity, sync_linked)
            .await?;
        Ok(())
    }

    /// Removes a line item from its owning provider.
    #[tracing::instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn remove_item(
        &self,
        identity: &Identity,
        provider_id: Option<&ProviderId>,
        item_id: &str,
        sync_linked: bool,
    ) -> Result<()> {
        let provider = self.resolve_owner(identity, provider_id, item_id).await?;
        self.providers
            .remove_item(&provider, identity, item_id, sync_linked)
            .await?;
        Ok(())
    }

    /// Finds which provider owns an item. A named provider short-circuits
    /// the search; otherwise the merged cart is consulted.
    async fn resolve_owner(
        &self,
        identity: &Identity,
        provider_id: Option<&ProviderId>,
        item_id: &str,
    ) -> Result<Provider> {
        if let Some(id) = provider_id {
            return Ok(self.registry.get(id).await?);
        }

        let cart = self.cart(identity).await?;
        let owner = cart
            .items
            .iter()
            .find(|item| item.item_id == item_id)
            .map(|item| item.provider_id.clone())
            .ok_or_else(|| BookingError::ItemNotFound(item_id.to_string()))?;
        Ok(self.registry.get(&owner).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gateway::InMemoryProviderApi;
    use registry::InMemoryProviderStore;

    fn provider(id: &str, markup: f64) -> Provider {
        Provider {
            id: ProviderId::new(id),
            display_name: id.to_uppercase(),
            base_url: format!("http://{id}.test"),
            auth: registry::AuthMode::None,
            timeout_secs: 1.0,
            markup_percent: markup,
            enabled: true,
        }
    }

    async fn setup(providers: Vec<Provider>) -> (CartAggregator<InMemoryProviderStore, InMemoryProviderApi>, Arc<InMemoryProviderApi>) {
        let registry = Arc::new(InMemoryProviderStore::with_providers(providers).await);
        let api = Arc::new(InMemoryProviderApi::new());
        (CartAggregator::new(registry, Arc::clone(&api)), api)
    }

    fn identity() -> Identity {
        Identity::new(UserId::new(7))
    }

    #[tokio::test]
    async fn test_merged_cart_applies_markup_and_totals() {
        let (aggregator, api) = setup(vec![provider("aerolineas", 10.0), provider("lowcost", 0.0)]).await;
        let identity = identity();

        let aero = ProviderId::new("aerolineas");
        let low = ProviderId::new("lowcost");
        api.set_price(&aero, 1, 1, Money::from_cents(10_000));
        api.set_price(&low, 9, 2, Money::from_cents(5_000));

        aggregator
            .add_item(&identity, Some(&aero), 1, 1, 2, false)
            .await
            .unwrap();
        aggregator
            .add_item(&identity, Some(&low), 9, 2, 1, false)
            .await
            .unwrap();

        let cart = aggregator.cart(&identity).await.unwrap();
        assert_eq!(cart.items.len(), 2);

        let aero_item = cart.items.iter().find(|i| i.provider_id == aero).unwrap();
        assert_eq!(aero_item.unit_base_price, Money::from_cents(10_000));
        assert_eq!(aero_item.unit_final_price, Money::from_cents(11_000));
        assert_eq!(aero_item.subtotal, Money::from_cents(22_000));

        // 22000 + 5000, recomputed from subtotals
        assert_eq!(cart.total, Money::from_cents(27_000));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_excluded_not_fatal() {
        let (aggregator, api) = setup(vec![provider("aerolineas", 0.0), provider("lowcost", 0.0)]).await;
        let identity = identity();

        let aero = ProviderId::new("aerolineas");
        let low = ProviderId::new("lowcost");
        api.set_price(&low, 9, 2, Money::from_cents(5_000));
        aggregator
            .add_item(&identity, Some(&low), 9, 2, 1, false)
            .await
            .unwrap();
        api.set_fail_on_cart(&aero, true);

        let cart = aggregator.cart(&identity).await.unwrap();
        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items[0].provider_id, low);
        assert_eq!(cart.total, Money::from_cents(5_000));
    }

    #[tokio::test]
    async fn test_add_defaults_to_first_enabled_provider() {
        let (aggregator, api) = setup(vec![provider("aerolineas", 0.0), provider("lowcost", 0.0)]).await;
        let identity = identity();

        let aero = ProviderId::new("aerolineas");
        api.set_price(&aero, 1, 1, Money::from_cents(100));
        aggregator.add_item(&identity, None, 1, 1, 1, false).await.unwrap();

        assert_eq!(api.cart_items(&aero).len(), 1);
    }

    #[tokio::test]
    async fn test_update_resolves_owner_from_merged_cart() {
        let (aggregator, api) = setup(vec![provider("aerolineas", 0.0), provider("lowcost", 0.0)]).await;
        let identity = identity();

        let low = ProviderId::new("lowcost");
        api.set_price(&low, 9, 2, Money::from_cents(5_000));
        aggregator
            .add_item(&identity, Some(&low), 9, 2, 1, false)
            .await
            .unwrap();
        let item_id = api.cart_items(&low)[0].item_id.clone();

        aggregator
            .update_item(&identity, None, &item_id, 3, false)
            .await
            .unwrap();
        assert_eq!(api.cart_items(&low)[0].quantity, 3);
    }

    #[tokio::test]
    async fn test_update_unknown_item_is_not_found() {
        let (aggregator, _api) = setup(vec![provider("aerolineas", 0.0)]).await;
        let identity = identity();

        let result = aggregator.update_item(&identity, None, "ghost", 2, false).await;
        assert!(matches!(result, Err(BookingError::ItemNotFound(id)) if id == "ghost"));
    }

    #[tokio::test]
    async fn test_remove_routes_to_owner() {
        let (aggregator, api) = setup(vec![provider("aerolineas", 0.0)]).await;
        let identity = identity();

        let aero = ProviderId::new("aerolineas");
        api.set_price(&aero, 1, 1, Money::from_cents(100));
        aggregator
            .add_item(&identity, Some(&aero), 1, 1, 1, false)
            .await
            .unwrap();
        let item_id = api.cart_items(&aero)[0].item_id.clone();

        aggregator
            .remove_item(&identity, None, &item_id, false)
            .await
            .unwrap();
        assert!(api.cart_items(&aero).is_empty());
    }

    #[tokio::test]
    async fn test_add_with_no_providers_is_invalid() {
        let (aggregator, _api) = setup(vec![]).await;
        let identity = identity();

        let result = aggregator.add_item(&identity, None, 1, 1, 1, false).await;
        assert!(matches!(result, Err(BookingError::InvalidCartState(_))));
    }
}
