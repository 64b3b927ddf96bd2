//! Canonical shapes produced at the gateway boundary.
//!
//! Providers return differently-shaped JSON; everything past the gateway
//! operates on these normalized types only.

use common::Money;
use serde::{Deserialize, Serialize};

/// One line of a provider-side cart, normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCartItem {
    /// Provider-assigned line item id.
    pub item_id: String,
    pub flight_id: i64,
    pub fare_class_id: i64,
    pub quantity: u32,
    /// Unit price before agency markup.
    pub unit_base_price: Money,
    /// Paired line (e.g. a round trip's return leg), if any.
    pub linked_item_id: Option<String>,
    // Display snapshot, best effort.
    pub flight_code: Option<String>,
    pub fare_class: Option<String>,
    pub departure: Option<String>,
    pub arrival: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
}

/// A provider's cart for one user, normalized.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderCart {
    pub created_at: Option<String>,
    pub items: Vec<ProviderCartItem>,
}

/// Payment details forwarded verbatim to provider checkouts.
///
/// Serialization uses the provider wire names; nothing here is persisted
/// by the agency.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentDetails {
    #[serde(rename = "tarjeta")]
    pub card: CardDetails,
    #[serde(rename = "facturacion")]
    pub billing: BillingDetails,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CardDetails {
    #[serde(rename = "nombre", skip_serializing_if = "Option::is_none")]
    pub holder: Option<String>,
    #[serde(rename = "numero")]
    pub number: String,
    #[serde(rename = "expMes", skip_serializing_if = "Option::is_none")]
    pub exp_month: Option<u8>,
    #[serde(rename = "expAnio", skip_serializing_if = "Option::is_none")]
    pub exp_year: Option<u16>,
    pub cvv: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BillingDetails {
    #[serde(rename = "direccion", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "ciudad", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(rename = "pais", skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub zip: Option<String>,
}

/// What a successful provider checkout returns.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutReceipt {
    /// Provider-assigned reservation id.
    pub reservation_id: String,
}

/// A provider reservation's detail, normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReservationDetail {
    pub reservation_id: String,
    pub confirmation_code: Option<String>,
    /// Provider status code: 1 = confirmed/active, 2 = cancelled.
    pub status_code: i32,
    /// Provider-assigned total for this reservation.
    pub total: Money,
    /// The raw provider body, kept as the flight-detail snapshot.
    pub raw: serde_json::Value,
}

impl ReservationDetail {
    /// Synthesized detail for a commit whose detail fetch failed.
    ///
    /// The provider-side commit already happened and must not be dropped,
    /// so the sub-reservation is recorded with a placeholder confirmation
    /// and a zero total.
    pub fn placeholder(reservation_id: impl Into<String>) -> Self {
        let reservation_id = reservation_id.into();
        Self {
            confirmation_code: Some(format!("RES-{reservation_id}")),
            status_code: 1,
            total: Money::zero(),
            raw: serde_json::Value::Null,
            reservation_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payment_details_wire_names() {
        let payment = PaymentDetails {
            card: CardDetails {
                holder: Some("Ada Lovelace".into()),
                number: "4111111111111111".into(),
                exp_month: Some(12),
                exp_year: Some(2030),
                cvv: "123".into(),
            },
            billing: BillingDetails {
                city: Some("Quito".into()),
                ..Default::default()
            },
        };

        let json = serde_json::to_value(&payment).unwrap();
        assert_eq!(json["tarjeta"]["numero"], "4111111111111111");
        assert_eq!(json["tarjeta"]["expMes"], 12);
        assert_eq!(json["facturacion"]["ciudad"], "Quito");
        assert!(json["facturacion"].get("direccion").is_none());
    }

    #[test]
    fn test_placeholder_detail() {
        let detail = ReservationDetail::placeholder("981");
        assert_eq!(detail.reservation_id, "981");
        assert_eq!(detail.confirmation_code.as_deref(), Some("RES-981"));
        assert_eq!(detail.status_code, 1);
        assert!(detail.total.is_zero());
    }
}
