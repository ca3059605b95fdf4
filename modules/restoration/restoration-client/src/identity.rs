//! Identity observation.

use async_trait::async_trait;
use parking_lot::RwLock;
use restoration_sdk::Identity;

use crate::error::ClientError;

/// External identity provider. The client observes it and never owns the
/// identity it hands out.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The current identity, or `None` when nobody is logged in.
    fn current(&self) -> Option<Identity>;

    /// Start a login flow and return the resulting identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider could not authenticate the user.
    async fn login(&self) -> Result<Identity, ClientError>;

    async fn logout(&self);
}

/// In-process provider that logs in as a fixed identity.
pub struct StaticIdentityProvider {
    configured: RwLock<Identity>,
    active: RwLock<Option<Identity>>,
}

impl StaticIdentityProvider {
    /// Provider that starts logged out.
    #[must_use]
    pub fn new(identity: Identity) -> Self {
        Self {
            configured: RwLock::new(identity),
            active: RwLock::new(None),
        }
    }

    /// Provider that starts logged in.
    #[must_use]
    pub fn logged_in(identity: Identity) -> Self {
        Self {
            active: RwLock::new(Some(identity.clone())),
            configured: RwLock::new(identity),
        }
    }

    /// Change the account used by the next login. An active session switches
    /// to it immediately.
    pub fn switch_account(&self, identity: Identity) {
        let mut active = self.active.write();
        if active.is_some() {
            *active = Some(identity.clone());
        }
        *self.configured.write() = identity;
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    fn current(&self) -> Option<Identity> {
        self.active.read().clone()
    }

    async fn login(&self) -> Result<Identity, ClientError> {
        let identity = self.configured.read().clone();
        *self.active.write() = Some(identity.clone());
        tracing::info!(principal = %identity.principal, "logged in");
        Ok(identity)
    }

    async fn logout(&self) {
        if let Some(identity) = self.active.write().take() {
            tracing::info!(principal = %identity.principal, "logged out");
        }
    }
}
