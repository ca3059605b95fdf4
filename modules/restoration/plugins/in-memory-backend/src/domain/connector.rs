//! Connector handing out caller-bound handles to the in-memory service.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use restoration_sdk::{
    BackendConnector, BackendError, Identity, Principal, RestorationBackendClient,
};

use super::client::CallerBound;
use super::service::Service;

/// Builds a fresh [`CallerBound`] handle on every `connect`.
pub struct InMemoryConnector {
    svc: Arc<Service>,
    reachable: AtomicBool,
    connects: AtomicUsize,
}

impl InMemoryConnector {
    #[must_use]
    pub fn new(svc: Arc<Service>) -> Self {
        Self {
            svc,
            reachable: AtomicBool::new(true),
            connects: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn service(&self) -> &Arc<Service> {
        &self.svc
    }

    /// Simulate the service becoming (un)reachable for new connections.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Number of successful connections made so far.
    #[must_use]
    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BackendConnector for InMemoryConnector {
    async fn connect(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Arc<dyn RestorationBackendClient>, BackendError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(BackendError::transport("restoration service unreachable"));
        }

        let caller = identity.map_or_else(Principal::anonymous, |i| i.principal);
        self.connects.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(principal = %caller, "connected to in-memory restoration service");

        Ok(Arc::new(CallerBound::new(Arc::clone(&self.svc), caller)))
    }
}
