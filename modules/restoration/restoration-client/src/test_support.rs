//! Test helpers backed by the in-memory restoration service.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use in_memory_backend::{InMemoryBackendConfig, InMemoryConnector, Service};
use restoration_sdk::{BackendConnector, Identity, Principal, RestorationBackendClient};
use uuid::Uuid;

use crate::cache::QueryCache;

pub(crate) struct Harness {
    pub connector: Arc<InMemoryConnector>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_admins(Vec::new())
    }

    pub fn with_admins(seed_admins: Vec<Principal>) -> Self {
        let cfg = InMemoryBackendConfig {
            seed_admins,
            ..InMemoryBackendConfig::default()
        };
        Self {
            connector: Arc::new(InMemoryConnector::new(Arc::new(Service::from_config(&cfg)))),
        }
    }

    pub fn alice_principal() -> Principal {
        Principal::new(Uuid::from_u128(0xaaaa_aaaa_aaaa_aaaa_aaaa_aaaa_aaaa_aaaa))
    }

    pub fn bob_principal() -> Principal {
        Principal::new(Uuid::from_u128(0xbbbb_bbbb_bbbb_bbbb_bbbb_bbbb_bbbb_bbbb))
    }

    pub fn alice(&self) -> Identity {
        Identity::new(Self::alice_principal())
    }

    pub fn bob(&self) -> Identity {
        Identity::new(Self::bob_principal())
    }

    pub fn connector(&self) -> Arc<dyn BackendConnector> {
        self.connector.clone()
    }

    pub fn service(&self) -> &Arc<Service> {
        self.connector.service()
    }

    pub fn calls(&self, op: &str) -> usize {
        self.service().call_count(op)
    }

    /// Cache with the default stale times.
    pub fn cache(&self) -> Arc<QueryCache> {
        Arc::new(QueryCache::new(Duration::from_secs(30), Duration::ZERO))
    }

    pub async fn handle(&self, identity: Option<&Identity>) -> Arc<dyn RestorationBackendClient> {
        self.connector.connect(identity).await.unwrap()
    }

    /// Handle for alice after she bootstrapped access control.
    pub async fn admin_handle(&self) -> Arc<dyn RestorationBackendClient> {
        let alice = self.alice();
        let handle = self.handle(Some(&alice)).await;
        handle.initialize_access_control().await.unwrap();
        handle
    }
}
