//! Admin console controller.

use std::sync::Arc;

use parking_lot::Mutex;
use restoration_sdk::{BackendConnector, Identity, Principal};
use tracing::{info, instrument};

use crate::access::{AccessResolver, AccessView};
use crate::cache::QueryCache;
use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::gate::RevealGate;
use crate::handle::HandleProvider;
use crate::identity::IdentityProvider;
use crate::service::{
    AdminsService, OrdersService, ProfileService, ServiceCtx, TicketsService, TrackingService,
};

/// Single controller for the admin area.
///
/// Owns the handle provider, query cache, and access resolver. Observes the
/// identity provider on every [`refresh`](Self::refresh), so bootstrap is driven
/// by explicit calls rather than by whoever happens to look at the state.
pub struct AdminConsole {
    identity: Arc<dyn IdentityProvider>,
    handles: Arc<HandleProvider>,
    cache: Arc<QueryCache>,
    resolver: AccessResolver,
    gate: RevealGate,
    /// Principal seen by the last refresh.
    seen: Mutex<Option<Principal>>,
    orders: OrdersService,
    tracking: TrackingService,
    tickets: TicketsService,
    admins: AdminsService,
    profile: ProfileService,
}

impl AdminConsole {
    #[must_use]
    pub fn new(
        cfg: &ClientConfig,
        identity: Arc<dyn IdentityProvider>,
        connector: Arc<dyn BackendConnector>,
    ) -> Self {
        let handles = Arc::new(HandleProvider::new(connector));
        let cache = Arc::new(QueryCache::new(cfg.admin_stale(), cfg.read_stale()));
        let ctx = ServiceCtx::new(Arc::clone(&handles), Arc::clone(&cache));

        Self {
            identity,
            resolver: AccessResolver::new(Arc::clone(&cache), cfg.recheck_settle()),
            gate: RevealGate::from_config(cfg.reveal_gate.as_ref()),
            seen: Mutex::new(None),
            orders: OrdersService::new(ctx.clone()),
            tracking: TrackingService::new(ctx.clone()),
            tickets: TicketsService::new(ctx.clone()),
            admins: AdminsService::new(ctx.clone()),
            profile: ProfileService::new(ctx),
            handles,
            cache,
        }
    }

    /// Observe the identity, make sure a handle exists for it, and advance
    /// access resolution.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> AccessView {
        let identity = self.identity.current();
        self.sync_identity(identity.as_ref());

        match self.handles.handle_for(identity.as_ref()).await {
            Ok(handle) => self.resolver.resolve(identity.as_ref(), &handle).await,
            Err(e) => self.resolver.connection_failed(identity.as_ref(), &e).await,
        }
    }

    /// # Errors
    ///
    /// Returns the identity provider's error if login fails.
    pub async fn login(&self) -> Result<AccessView, ClientError> {
        self.identity.login().await?;
        Ok(self.refresh().await)
    }

    pub async fn logout(&self) -> AccessView {
        self.identity.logout().await;
        self.refresh().await
    }

    /// User-triggered retry after a failed bootstrap.
    pub async fn retry(&self) -> AccessView {
        let identity = self.identity.current();
        self.sync_identity(identity.as_ref());
        self.resolver.retry(identity.as_ref(), &self.handles).await
    }

    #[must_use]
    pub fn view(&self) -> AccessView {
        self.resolver.view()
    }

    /// Admin content renders only for a server-confirmed admin, and only once
    /// the reveal gate is unlocked when one is configured.
    #[must_use]
    pub fn admin_content_visible(&self) -> bool {
        self.resolver.view() == AccessView::Granted && self.gate.is_unlocked()
    }

    #[must_use]
    pub fn resolver(&self) -> &AccessResolver {
        &self.resolver
    }

    #[must_use]
    pub fn gate(&self) -> &RevealGate {
        &self.gate
    }

    #[must_use]
    pub fn orders(&self) -> &OrdersService {
        &self.orders
    }

    #[must_use]
    pub fn tracking(&self) -> &TrackingService {
        &self.tracking
    }

    #[must_use]
    pub fn tickets(&self) -> &TicketsService {
        &self.tickets
    }

    #[must_use]
    pub fn admins(&self) -> &AdminsService {
        &self.admins
    }

    #[must_use]
    pub fn profile(&self) -> &ProfileService {
        &self.profile
    }

    fn sync_identity(&self, identity: Option<&Identity>) {
        let next = identity.map(|i| i.principal);
        {
            let mut seen = self.seen.lock();
            if *seen != next {
                info!(previous = ?*seen, next = ?next, "identity changed");
                // Cached reads were made with the previous caller's rights.
                self.cache.clear();
                self.gate.lock();
                *seen = next;
            }
        }
        self.resolver.on_identity_changed(identity);
    }
}
