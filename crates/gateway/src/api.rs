//! Provider API trait and in-memory implementation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use common::{Money, ProviderId};
use registry::Provider;

use crate::error::{GatewayError, Result};
use crate::identity::Identity;
use crate::types::{CheckoutReceipt, PaymentDetails, ProviderCart, ProviderCartItem, ReservationDetail};

/// Outbound operations against one provider backend.
///
/// The booking layer talks to providers only through this trait; the real
/// implementation is [`crate::ProviderGateway`].
#[async_trait]
pub trait ProviderApi: Send + Sync {
    /// Fetches the provider-side cart for the given user.
    async fn fetch_cart(&self, provider: &Provider, identity: &Identity) -> Result<ProviderCart>;

    /// Adds or increments a line item in the provider cart.
    async fn add_item(
        &self,
        provider: &Provider,
        identity: &Identity,
        flight_id: i64,
        fare_class_id: i64,
        quantity: u32,
        include_linked: bool,
    ) -> Result<()>;

    /// Updates a line item's quantity.
    async fn update_item(
        &self,
        provider: &Provider,
        identity: &Identity,
        item_id: &str,
        quantity: u32,
        sync_linked: bool,
    ) -> Result<()>;

    /// Removes a line item.
    async fn remove_item(
        &self,
        provider: &Provider,
        identity: &Identity,
        item_id: &str,
        sync_linked: bool,
    ) -> Result<()>;

    /// Commits the provider checkout, returning the reservation id.
    async fn checkout(
        &self,
        provider: &Provider,
        identity: &Identity,
        payment: &PaymentDetails,
    ) -> Result<CheckoutReceipt>;

    /// Fetches a reservation's detail.
    async fn reservation_detail(
        &self,
        provider: &Provider,
        identity: &Identity,
        reservation_id: &str,
    ) -> Result<ReservationDetail>;

    /// Cancels a reservation on the provider side.
    async fn cancel_reservation(
        &self,
        provider: &Provider,
        identity: &Identity,
        reservation_id: &str,
    ) -> Result<()>;
}

#[derive(Debug, Default)]
struct InMemoryState {
    carts: HashMap<ProviderId, Vec<ProviderCartItem>>,
    prices: HashMap<(ProviderId, i64, i64), Money>,
    reservations: HashMap<(ProviderId, String), ReservationDetail>,
    next_item: u32,
    next_reservation: u32,
    checkout_count: u32,
    cancel_count: u32,
    fail_cart: HashSet<ProviderId>,
    fail_checkout: HashSet<ProviderId>,
    fail_detail: HashSet<ProviderId>,
    fail_cancel: HashSet<ProviderId>,
}

/// In-memory provider backend for testing.
///
/// Holds one cart per provider id (identity is ignored), simple flight
/// pricing seeded per test, and failure switches for each operation so
/// partial-failure paths can be scripted.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProviderApi {
    state: Arc<RwLock<InMemoryState>>,
}

impl InMemoryProviderApi {
    /// Creates an empty in-memory provider backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the unit base price a provider quotes for a flight/fare pair.
    pub fn set_price(&self, provider: &ProviderId, flight_id: i64, fare_class_id: i64, price: Money) {
        self.state
            .write()
            .unwrap()
            .prices
            .insert((provider.clone(), flight_id, fare_class_id), price);
    }

    /// Makes `fetch_cart` time out for the given provider.
    pub fn set_fail_on_cart(&self, provider: &ProviderId, fail: bool) {
        Self::toggle(&mut self.state.write().unwrap().fail_cart, provider, fail);
    }

    /// Makes `checkout` fail for the given provider.
    pub fn set_fail_on_checkout(&self, provider: &ProviderId, fail: bool) {
        Self::toggle(&mut self.state.write().unwrap().fail_checkout, provider, fail);
    }

    /// Makes `reservation_detail` unreachable for the given provider.
    pub fn set_fail_on_detail(&self, provider: &ProviderId, fail: bool) {
        Self::toggle(&mut self.state.write().unwrap().fail_detail, provider, fail);
    }

    /// Makes `cancel_reservation` unreachable for the given provider.
    pub fn set_fail_on_cancel(&self, provider: &ProviderId, fail: bool) {
        Self::toggle(&mut self.state.write().unwrap().fail_cancel, provider, fail);
    }

    fn toggle(set: &mut HashSet<ProviderId>, provider: &ProviderId, fail: bool) {
        if fail {
            set.insert(provider.clone());
        } else {
            set.remove(provider);
        }
    }

    /// Returns the items currently in a provider's cart.
    pub fn cart_items(&self, provider: &ProviderId) -> Vec<ProviderCartItem> {
        self.state
            .read()
            .unwrap()
            .carts
            .get(provider)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns a reservation's current status code, if it exists.
    pub fn reservation_status(&self, provider: &ProviderId, reservation_id: &str) -> Option<i32> {
        self.state
            .read()
            .unwrap()
            .reservations
            .get(&(provider.clone(), reservation_id.to_string()))
            .map(|d| d.status_code)
    }

    /// Overrides a reservation's status code (simulates provider-side drift).
    pub fn set_reservation_status(&self, provider: &ProviderId, reservation_id: &str, status: i32) {
        if let Some(detail) = self
            .state
            .write()
            .unwrap()
            .reservations
            .get_mut(&(provider.clone(), reservation_id.to_string()))
        {
            detail.status_code = status;
        }
    }

    /// Returns the number of checkouts committed across all providers.
    pub fn checkout_count(&self) -> u32 {
        self.state.read().unwrap().checkout_count
    }

    /// Returns the number of cancellations performed across all providers.
    pub fn cancel_count(&self) -> u32 {
        self.state.read().unwrap().cancel_count
    }
}

#[async_trait]
impl ProviderApi for InMemoryProviderApi {
    async fn fetch_cart(&self, provider: &Provider, _identity: &Identity) -> Result<ProviderCart> {
        let state = self.state.read().unwrap();
        if state.fail_cart.contains(&provider.id) {
            return Err(GatewayError::Timeout {
                provider: provider.id.clone(),
            });
        }
        Ok(ProviderCart {
            created_at: None,
            items: state.carts.get(&provider.id).cloned().unwrap_or_default(),
        })
    }

    async fn add_item(
        &self,
        provider: &Provider,
        _identity: &Identity,
        flight_id: i64,
        fare_class_id: i64,
        quantity: u32,
        include_linked: bool,
    ) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let price = state
            .prices
            .get(&(provider.id.clone(), flight_id, fare_class_id))
            .copied()
            .unwrap_or_else(Money::zero);

        let cart = state.carts.entry(provider.id.clone()).or_default();
        // Quantity folding is the provider's own behavior: an existing
        // flight/fare line is incremented rather than duplicated.
        if let Some(existing) = cart
            .iter_mut()
            .find(|i| i.flight_id == flight_id && i.fare_class_id == fare_class_id)
        {
            existing.quantity += quantity.max(1);
            return Ok(());
        }

        state.next_item += 1;
        let item = ProviderCartItem {
            item_id: format!("ITEM-{:04}", state.next_item),
            flight_id,
            fare_class_id,
            quantity: quantity.max(1),
            unit_base_price: price,
            linked_item_id: include_linked.then(|| flight_id.to_string()),
            flight_code: None,
            fare_class: None,
            departure: None,
            arrival: None,
            origin: None,
            destination: None,
        };
        state.carts.entry(provider.id.clone()).or_default().push(item);
        Ok(())
    }

    async fn update_item(
        &self,
        provider: &Provider,
        _identity: &Identity,
        item_id: &str,
        quantity: u32,
        sync_linked: bool,
    ) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let cart = state.carts.entry(provider.id.clone()).or_default();
        let linked = match cart.iter_mut().find(|i| i.item_id == item_id) {
            Some(item) => {
                item.quantity = quantity;
                item.linked_item_id.clone()
            }
            None => {
                return Err(GatewayError::Rejected {
                    provider: provider.id.clone(),
                    status: 404,
                    message: "item not found".to_string(),
                });
            }
        };

        if sync_linked && let Some(linked) = linked {
            for item in cart
                .iter_mut()
                .filter(|i| i.item_id != item_id && i.linked_item_id.as_deref() == Some(&linked))
            {
                item.quantity = quantity;
            }
        }
        Ok(())
    }

    async fn remove_item(
        &self,
        provider: &Provider,
        _identity: &Identity,
        item_id: &str,
        sync_linked: bool,
    ) -> Result<()> {
        let mut state = self.state.write().unwrap();
        let cart = state.carts.entry(provider.id.clone()).or_default();
        let linked = match cart.iter().find(|i| i.item_id == item_id) {
            Some(item) => item.linked_item_id.clone(),
            None => {
                return Err(GatewayError::Rejected {
                    provider: provider.id.clone(),
                    status: 404,
                    message: "item not found".to_string(),
                });
            }
        };

        cart.retain(|i| i.item_id != item_id);
        if sync_linked && let Some(linked) = linked {
            cart.retain(|i| i.linked_item_id.as_deref() != Some(&linked));
        }
        Ok(())
    }

    async fn checkout(
        &self,
        provider: &Provider,
        _identity: &Identity,
        _payment: &PaymentDetails,
    ) -> Result<CheckoutReceipt> {
        let mut state = self.state.write().unwrap();
        if state.fail_checkout.contains(&provider.id) {
            return Err(GatewayError::Rejected {
                provider: provider.id.clone(),
                status: 402,
                message: "payment rejected by provider".to_string(),
            });
        }

        let items = state.carts.remove(&provider.id).unwrap_or_default();
        if items.is_empty() {
            return Err(GatewayError::Rejected {
                provider: provider.id.clone(),
                status: 400,
                message: "provider cart is empty".to_string(),
            });
        }

        state.next_reservation += 1;
        state.checkout_count += 1;
        let reservation_id = format!("RSV-{:04}", state.next_reservation);
        let total: Money = items
            .iter()
            .map(|i| i.unit_base_price.times(i.quantity))
            .sum();

        let detail = ReservationDetail {
            reservation_id: reservation_id.clone(),
            confirmation_code: Some(format!("CONF-{:04}", state.next_reservation)),
            status_code: 1,
            total,
            raw: serde_json::json!({
                "idReserva": reservation_id,
                "idEstado": 1,
                "total": total.as_decimal(),
                "items": items.len(),
            }),
        };
        state
            .reservations
            .insert((provider.id.clone(), reservation_id.clone()), detail);

        Ok(CheckoutReceipt { reservation_id })
    }

    async fn reservation_detail(
        &self,
        provider: &Provider,
        _identity: &Identity,
        reservation_id: &str,
    ) -> Result<ReservationDetail> {
        let state = self.state.read().unwrap();
        if state.fail_detail.contains(&provider.id) {
            return Err(GatewayError::Unreachable {
                provider: provider.id.clone(),
                reason: "connection refused".to_string(),
            });
        }
        state
            .reservations
            .get(&(provider.id.clone(), reservation_id.to_string()))
            .cloned()
            .ok_or_else(|| GatewayError::Rejected {
                provider: provider.id.clone(),
                status: 404,
                message: "reservation not found".to_string(),
            })
    }

    async fn cancel_reservation(
        &self,
        provider: &Provider,
        _identity: &Identity,
        reservation_id: &str,
    ) -> Result<()> {
        let mut state = self.state.write().unwrap();
        if state.fail_cancel.contains(&provider.id) {
            return Err(GatewayError::Unreachable {
                provider: provider.id.clone(),
                reason: "connection refused".to_string(),
            });
        }
        match state
            .reservations
            .get_mut(&(provider.id.clone(), reservation_id.to_string()))
        {
            Some(detail) => {
                detail.status_code = 2;
                state.cancel_count += 1;
                Ok(())
            }
            None => Err(GatewayError::Rejected {
                provider: provider.id.clone(),
                status: 404,
                message: "reservation not found".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::UserId;
    use registry::AuthMode;

    fn provider(id: &str) -> Provider {
        Provider {
            id: ProviderId::new(id),
            display_name: id.to_string(),
            base_url: format!("http://{}.test", id.to_lowercase()),
            auth: AuthMode::None,
            timeout_secs: 2.0,
            markup_percent: 0.0,
            enabled: true,
        }
    }

    fn identity() -> Identity {
        Identity::new(UserId::new(7))
    }

    fn payment() -> PaymentDetails {
        PaymentDetails {
            card: crate::types::CardDetails {
                holder: None,
                number: "4111111111111111".into(),
                exp_month: None,
                exp_year: None,
                cvv: "123".into(),
            },
            billing: Default::default(),
        }
    }

    #[tokio::test]
    async fn test_add_item_folds_quantity() {
        let api = InMemoryProviderApi::new();
        let prov = provider("A");
        api.set_price(&prov.id, 1, 1, Money::from_cents(1000));

        api.add_item(&prov, &identity(), 1, 1, 2, false).await.unwrap();
        api.add_item(&prov, &identity(), 1, 1, 1, false).await.unwrap();

        let items = api.cart_items(&prov.id);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].quantity, 3);
        assert_eq!(items[0].unit_base_price, Money::from_cents(1000));
    }

    #[tokio::test]
    async fn test_checkout_clears_cart_and_records_reservation() {
        let api = InMemoryProviderApi::new();
        let prov = provider("A");
        api.set_price(&prov.id, 1, 1, Money::from_cents(2500));
        api.add_item(&prov, &identity(), 1, 1, 2, false).await.unwrap();

        let receipt = api.checkout(&prov, &identity(), &payment()).await.unwrap();
        assert!(receipt.reservation_id.starts_with("RSV-"));
        assert!(api.cart_items(&prov.id).is_empty());

        let detail = api
            .reservation_detail(&prov, &identity(), &receipt.reservation_id)
            .await
            .unwrap();
        assert_eq!(detail.total, Money::from_cents(5000));
        assert_eq!(detail.status_code, 1);
    }

    #[tokio::test]
    async fn test_cancel_marks_reservation_cancelled() {
        let api = InMemoryProviderApi::new();
        let prov = provider("A");
        api.set_price(&prov.id, 1, 1, Money::from_cents(100));
        api.add_item(&prov, &identity(), 1, 1, 1, false).await.unwrap();
        let receipt = api.checkout(&prov, &identity(), &payment()).await.unwrap();

        api.cancel_reservation(&prov, &identity(), &receipt.reservation_id)
            .await
            .unwrap();
        assert_eq!(
            api.reservation_status(&prov.id, &receipt.reservation_id),
            Some(2)
        );
    }

    #[tokio::test]
    async fn test_fail_switches() {
        let api = InMemoryProviderApi::new();
        let prov = provider("A");
        api.set_fail_on_cart(&prov.id, true);

        let err = api.fetch_cart(&prov, &identity()).await.unwrap_err();
        assert!(matches!(err, GatewayError::Timeout { .. }));

        api.set_fail_on_cart(&prov.id, false);
        assert!(api.fetch_cart(&prov, &identity()).await.is_ok());
    }

    #[tokio::test]
    async fn test_update_missing_item_is_rejected() {
        let api = InMemoryProviderApi::new();
        let prov = provider("A");
        let err = api
            .update_item(&prov, &identity(), "ITEM-9999", 2, false)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected { status: 404, .. }));
    }
}
