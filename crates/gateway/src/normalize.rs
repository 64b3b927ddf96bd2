//! Tolerant normalization of provider JSON.
//!
//! Provider schemas disagree on price and date fields, so parsing here is
//! field-by-field with fallbacks rather than strict deserialization. An
//! item missing its identifying fields is dropped with a warning instead of
//! failing the whole response.

use common::Money;
use serde_json::Value;

use crate::types::{ProviderCart, ProviderCartItem, ReservationDetail};

/// Extracts a money amount from the first of the given keys that parses.
///
/// Accepts JSON numbers and numeric strings.
pub fn money_field(value: &Value, keys: &[&str]) -> Option<Money> {
    for key in keys {
        match value.get(key) {
            Some(Value::Number(n)) => {
                if let Some(f) = n.as_f64() {
                    return Some(Money::from_decimal(f));
                }
            }
            Some(Value::String(s)) => {
                if let Ok(f) = s.trim().parse::<f64>() {
                    return Some(Money::from_decimal(f));
                }
            }
            _ => {}
        }
    }
    None
}

/// Extracts an integer from the first of the given keys that parses.
fn int_field(value: &Value, keys: &[&str]) -> Option<i64> {
    for key in keys {
        match value.get(key) {
            Some(Value::Number(n)) => {
                if let Some(i) = n.as_i64() {
                    return Some(i);
                }
            }
            Some(Value::String(s)) => {
                if let Ok(i) = s.trim().parse::<i64>() {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Extracts an id-ish field as a string (providers send both numbers and
/// strings for the same field).
pub fn id_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(|s| s.to_string())
}

/// Normalizes a date-ish field.
///
/// Some providers serialize timestamps as `[year, month, day, hour, min,
/// sec]` arrays rather than ISO strings.
pub fn datetime_field(value: &Value, key: &str) -> Option<String> {
    match value.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Array(parts)) if parts.len() >= 3 => {
            let part = |i: usize| parts.get(i).and_then(Value::as_i64).unwrap_or(0);
            Some(format!(
                "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}",
                part(0),
                part(1),
                part(2),
                part(3),
                part(4),
                part(5)
            ))
        }
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    }
}

/// Normalizes a single cart line. Returns `None` when the line has no
/// usable item or flight id.
pub fn cart_item(value: &Value) -> Option<ProviderCartItem> {
    let item_id = id_field(value, "idItem")?;
    let flight_id = int_field(value, &["idVuelo"])?;

    Some(ProviderCartItem {
        item_id,
        flight_id,
        fare_class_id: int_field(value, &["idClase"]).unwrap_or(0),
        quantity: int_field(value, &["cantidad", "qty"]).unwrap_or(1).max(1) as u32,
        unit_base_price: money_field(value, &["precioBase", "precio", "precioUnitario"])
            .unwrap_or_else(Money::zero),
        linked_item_id: id_field(value, "parejaDe"),
        flight_code: str_field(value, "codigoVuelo"),
        fare_class: str_field(value, "clase"),
        departure: datetime_field(value, "fechaSalida"),
        arrival: datetime_field(value, "fechaLlegada"),
        origin: str_field(value, "ciudadOrigen"),
        destination: str_field(value, "ciudadDestino"),
    })
}

/// Normalizes a provider cart response.
pub fn cart(value: &Value) -> ProviderCart {
    let items = value
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    let parsed = cart_item(item);
                    if parsed.is_none() {
                        tracing::warn!(item = %item, "dropping unparseable cart item");
                    }
                    parsed
                })
                .collect()
        })
        .unwrap_or_default();

    ProviderCart {
        created_at: datetime_field(value, "fechaCreacion"),
        items,
    }
}

/// Normalizes a reservation detail response.
pub fn reservation_detail(reservation_id: &str, value: Value) -> ReservationDetail {
    ReservationDetail {
        reservation_id: reservation_id.to_string(),
        confirmation_code: str_field(&value, "codigo"),
        status_code: int_field(&value, &["idEstado"]).unwrap_or(1) as i32,
        total: money_field(&value, &["total"]).unwrap_or_else(Money::zero),
        raw: value,
    }
}
