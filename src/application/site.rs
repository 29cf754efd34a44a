//! Site data facade.
//!
//! Wires the gateway, query cache, reads and writes together and owns the only
//! path that replaces the backend handle.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::cache::QueryCache;

use super::error::SyncError;
use super::gateway::{Connector, GatewayStatus, Identity, RemoteGateway};
use super::mutations::MutationDispatcher;
use super::queries::QueryService;

#[derive(Clone)]
pub struct SiteSync {
    gateway: Arc<RemoteGateway>,
    cache: QueryCache,
    queries: QueryService,
    mutations: MutationDispatcher,
}

impl SiteSync {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        let gateway = Arc::new(RemoteGateway::new(connector));
        let cache = QueryCache::new();
        Self {
            queries: QueryService::new(Arc::clone(&gateway), cache.clone()),
            mutations: MutationDispatcher::new(Arc::clone(&gateway), cache.clone()),
            gateway,
            cache,
        }
    }

    /// Build and connect in one step.
    pub async fn connect(
        connector: Arc<dyn Connector>,
        identity: Identity,
    ) -> Result<Self, SyncError> {
        let site = Self::new(connector);
        site.change_identity(identity).await?;
        Ok(site)
    }

    pub fn queries(&self) -> &QueryService {
        &self.queries
    }

    pub fn mutations(&self) -> &MutationDispatcher {
        &self.mutations
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn gateway_status(&self) -> GatewayStatus {
        self.gateway.status()
    }

    pub fn is_ready(&self) -> bool {
        self.gateway.status() == GatewayStatus::Ready
    }

    /// Replace the caller's identity (login, logout, account switch).
    ///
    /// The old handle is dropped and every key reset before the new handle is
    /// negotiated, so nothing fetched for the previous identity is served
    /// afterwards. Reads issued while connecting report not ready.
    #[instrument(skip_all, fields(anonymous = identity.is_anonymous()))]
    pub async fn change_identity(&self, identity: Identity) -> Result<(), SyncError> {
        let epoch = self.gateway.begin(&identity);
        self.cache.reset(epoch);
        self.gateway.establish(epoch, &identity).await?;
        info!(epoch, "Identity change complete");
        Ok(())
    }

    pub async fn logout(&self) -> Result<(), SyncError> {
        self.change_identity(Identity::anonymous()).await
    }
}
