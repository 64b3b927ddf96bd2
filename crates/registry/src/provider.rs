//! Provider configuration model.

use std::time::Duration;

use common::ProviderId;
use serde::{Deserialize, Serialize};

/// How the agency authenticates to a provider backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthMode {
    /// Public provider, no authentication required.
    #[default]
    None,
    /// Webservice credentials sent as headers on every request.
    Credentials { email: String, password: String },
    /// Short-lived bearer token obtained from the provider's login
    /// endpoint and held in the credential cache.
    BearerToken { email: String, password: String },
}

impl AuthMode {
    /// Returns true if requests to this provider must carry credentials.
    pub fn requires_auth(&self) -> bool {
        !matches!(self, AuthMode::None)
    }
}

/// A configured airline provider backend.
///
/// Identity is the `id`; everything else is administrative configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub display_name: String,
    /// Base endpoint, e.g. `http://localhost:8080`.
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthMode,
    /// Per-provider request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: f64,
    /// Agency markup applied to this provider's base prices.
    #[serde(default)]
    pub markup_percent: f64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_timeout_secs() -> f64 {
    20.0
}

fn default_enabled() -> bool {
    true
}

impl Provider {
    /// Returns the configured request timeout.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_defaults() {
        let p: Provider = serde_json::from_str(
            r#"{"id": "AEROLINEAS", "display_name": "Aerolíneas", "base_url": "http://localhost:8080"}"#,
        )
        .unwrap();
        assert_eq!(p.auth, AuthMode::None);
        assert_eq!(p.timeout(), Duration::from_secs(20));
        assert_eq!(p.markup_percent, 0.0);
        assert!(p.enabled);
    }

    #[test]
    fn test_auth_mode_tagged_serialization() {
        let p: Provider = serde_json::from_str(
            r#"{
                "id": "SKYHIGH",
                "display_name": "SkyHigh",
                "base_url": "http://skyhigh.test",
                "auth": {"mode": "bearer_token", "email": "ws@agency.test", "password": "secret"},
                "timeout_secs": 5.0,
                "markup_percent": 7.5,
                "enabled": false
            }"#,
        )
        .unwrap();
        assert!(matches!(p.auth, AuthMode::BearerToken { .. }));
        assert!(p.auth.requires_auth());
        assert!(!p.enabled);
    }
}
