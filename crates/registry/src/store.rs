//! Provider store trait and in-memory implementation.

use std::sync::Arc;

use async_trait::async_trait;
use common::ProviderId;
use tokio::sync::RwLock;

use crate::error::{RegistryError, Result};
use crate::provider::Provider;

/// Read/write access to the configured provider set.
///
/// Reads dominate; writes only happen through administrative updates.
#[async_trait]
pub trait ProviderStore: Send + Sync {
    /// Returns all enabled providers in configuration order.
    async fn list_enabled(&self) -> Result<Vec<Provider>>;

    /// Returns every configured provider, enabled or not.
    async fn list_all(&self) -> Result<Vec<Provider>>;

    /// Looks up a single provider by id.
    async fn get(&self, id: &ProviderId) -> Result<Provider>;

    /// Inserts or replaces a provider configuration.
    async fn upsert(&self, provider: Provider) -> Result<()>;

    /// Removes a provider configuration.
    async fn delete(&self, id: &ProviderId) -> Result<()>;
}

/// In-memory provider store.
///
/// Providers keep their insertion order, which fixes the "first enabled
/// provider" default used when a cart operation names no provider.
#[derive(Clone, Default)]
pub struct InMemoryProviderStore {
    providers: Arc<RwLock<Vec<Provider>>>,
}

impl InMemoryProviderStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store seeded with the given providers.
    pub async fn with_providers(providers: Vec<Provider>) -> Self {
        let store = Self::new();
        *store.providers.write().await = providers;
        store
    }

    /// Parses a JSON array of providers (bootstrap file format) into a
    /// seeded store.
    pub async fn from_json(json: &str) -> Result<Self> {
        let providers: Vec<Provider> = serde_json::from_str(json)?;
        Ok(Self::with_providers(providers).await)
    }

    /// Returns the number of configured providers.
    pub async fn len(&self) -> usize {
        self.providers.read().await.len()
    }

    /// Returns true if no providers are configured.
    pub async fn is_empty(&self) -> bool {
        self.providers.read().await.is_empty()
    }
}

#[async_trait]
impl ProviderStore for InMemoryProviderStore {
    async fn list_enabled(&self) -> Result<Vec<Provider>> {
        let providers = self.providers.read().await;
        Ok(providers.iter().filter(|p| p.enabled).cloned().collect())
    }

    async fn list_all(&self) -> Result<Vec<Provider>> {
        Ok(self.providers.read().await.clone())
    }

    async fn get(&self, id: &ProviderId) -> Result<Provider> {
        let providers = self.providers.read().await;
        providers
            .iter()
            .find(|p| &p.id == id)
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(id.clone()))
    }

    async fn upsert(&self, provider: Provider) -> Result<()> {
        let mut providers = self.providers.write().await;
        match providers.iter_mut().find(|p| p.id == provider.id) {
            Some(existing) => *existing = provider,
            None => providers.push(provider),
        }
        Ok(())
    }

    async fn delete(&self, id: &ProviderId) -> Result<()> {
        let mut providers = self.providers.write().await;
        let before = providers.len();
        providers.retain(|p| &p.id != id);
        if providers.len() == before {
            return Err(RegistryError::NotFound(id.clone()));
        }
        Ok(())
    }
}
