//! Client handle lifecycle.
//!
//! A handle is bound to one identity and never mutated. A new identity, or an
//! explicit retry, swaps in a freshly connected handle.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use restoration_sdk::{BackendConnector, Identity, Principal, RestorationBackendClient};
use tokio::sync::Mutex;

use crate::error::ClientError;

struct BoundHandle {
    /// `None` for the anonymous handle.
    key: Option<Principal>,
    client: Arc<dyn RestorationBackendClient>,
}

/// Caches the handle for the current identity.
pub struct HandleProvider {
    connector: Arc<dyn BackendConnector>,
    slot: ArcSwapOption<BoundHandle>,
    connect_lock: Mutex<()>,
}

impl HandleProvider {
    #[must_use]
    pub fn new(connector: Arc<dyn BackendConnector>) -> Self {
        Self {
            connector,
            slot: ArcSwapOption::empty(),
            connect_lock: Mutex::new(()),
        }
    }

    /// The handle for `identity`, connecting only when the cached handle was
    /// built for someone else.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionUnavailable`] if connecting fails.
    pub async fn handle_for(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Arc<dyn RestorationBackendClient>, ClientError> {
        let key = identity.map(|i| i.principal);
        if let Some(client) = self.matching(key) {
            return Ok(client);
        }

        let _guard = self.connect_lock.lock().await;
        // Another caller may have connected while we waited.
        if let Some(client) = self.matching(key) {
            return Ok(client);
        }
        self.connect(identity).await
    }

    /// Drop the cached handle and connect again.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionUnavailable`] if connecting fails. The
    /// old handle is discarded either way.
    pub async fn recreate(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Arc<dyn RestorationBackendClient>, ClientError> {
        let _guard = self.connect_lock.lock().await;
        self.slot.store(None);
        self.connect(identity).await
    }

    /// The cached handle, without connecting.
    #[must_use]
    pub fn current(&self) -> Option<Arc<dyn RestorationBackendClient>> {
        self.slot.load_full().map(|bound| Arc::clone(&bound.client))
    }

    pub fn clear(&self) {
        self.slot.store(None);
    }

    fn matching(&self, key: Option<Principal>) -> Option<Arc<dyn RestorationBackendClient>> {
        self.slot
            .load_full()
            .filter(|bound| bound.key == key)
            .map(|bound| Arc::clone(&bound.client))
    }

    async fn connect(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Arc<dyn RestorationBackendClient>, ClientError> {
        let key = identity.map(|i| i.principal);
        match self.connector.connect(identity).await {
            Ok(client) => {
                self.slot.store(Some(Arc::new(BoundHandle {
                    key,
                    client: Arc::clone(&client),
                })));
                tracing::debug!(anonymous = key.is_none(), "client handle created");
                Ok(client)
            }
            Err(e) => {
                self.slot.store(None);
                tracing::warn!(operation = "connect", error = ?e, "failed to create client handle");
                Err(ClientError::ConnectionUnavailable)
            }
        }
    }
}
