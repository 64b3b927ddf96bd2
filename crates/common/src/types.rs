use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Numeric end-user identity forwarded to providers via `X-User-Id`.
///
/// Providers require a numeric id on the wire, so this wraps a `u64`
/// rather than a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u64);

impl UserId {
    /// Creates a user ID from a raw numeric value.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying numeric value.
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for UserId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::str::FromStr for UserId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<u64>().map(Self)
    }
}

/// Unique identifier for a configured provider (e.g. `"AEROLINEA_PRINCIPAL"`).
///
/// Wraps a string to prevent mixing provider ids with other string
/// identifiers such as cart item ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Creates a provider ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the provider ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ProviderId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ProviderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ProviderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Unique identifier for a purchase record in the agency ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PurchaseId(Uuid);

impl PurchaseId {
    /// Creates a new random purchase ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a purchase ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for PurchaseId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PurchaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for PurchaseId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl From<PurchaseId> for Uuid {
    fn from(id: PurchaseId) -> Self {
        id.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_parses_numeric_strings() {
        let id: UserId = "42".parse().unwrap();
        assert_eq!(id.as_u64(), 42);
        assert!("not-a-number".parse::<UserId>().is_err());
    }

    #[test]
    fn provider_id_preserves_value() {
        let id = ProviderId::new("AEROLINEAS");
        assert_eq!(id.as_str(), "AEROLINEAS");
        assert_eq!(id.to_string(), "AEROLINEAS");
    }

    #[test]
    fn purchase_id_new_creates_unique_ids() {
        let id1 = PurchaseId::new();
        let id2 = PurchaseId::new();
        assert_ne!(id1, id2);
    }

    #[test]
    fn purchase_id_serialization_roundtrip() {
        let id = PurchaseId::new();
        let json = serde_json::to_string(&id).unwrap();
        let deserialized: PurchaseId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
