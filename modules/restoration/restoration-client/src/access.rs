//! Admin access resolution.
//!
//! [`AccessResolver`] decides whether the current identity is an admin,
//! bootstrapping access control at most once per identity session:
//!
//! ```text
//! idle ──(not admin)──> initializing ──(ok / already initialized)──> rechecking ──> complete
//!   ^                        │ ^
//!   │                   error│ │retry
//!   │                        v │
//!   └──── logout ─────────  failed
//! ```
//!
//! An admin caller goes straight from `idle` to `complete`. The only way back
//! to `idle` is an identity change.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use restoration_sdk::api::ops;
use restoration_sdk::{BackendError, Identity, InitializationStatus, Principal, RestorationBackendClient};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::cache::{QueryCache, QueryKey};
use crate::error::{ClientError, Failure, classify, is_already_initialized};
use crate::handle::HandleProvider;

const BOOTSTRAP: Failure =
    Failure::new(ops::INITIALIZE_ACCESS_CONTROL, "initialize access control");
const IS_ADMIN: Failure = Failure::new(ops::IS_CALLER_ADMIN, "check admin status");
const DIAGNOSTICS: Failure =
    Failure::new(ops::GET_INITIALIZATION_STATUS, "read access diagnostics");

/// Resolver state machine phase.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AccessPhase {
    #[default]
    Idle,
    Initializing,
    Rechecking,
    Complete,
    /// Bootstrap failed; the raw error is kept for display.
    Failed(BackendError),
}

/// What the presentation layer should render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessView {
    LoginRequired,
    Resolving,
    Granted,
    Denied,
    /// Retriable failure with the message to show.
    Failed(String),
}

impl fmt::Display for AccessView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LoginRequired => f.write_str("login required"),
            Self::Resolving => f.write_str("resolving"),
            Self::Granted => f.write_str("granted"),
            Self::Denied => f.write_str("denied"),
            Self::Failed(message) => write!(f, "failed: {message}"),
        }
    }
}

#[derive(Default)]
struct Inner {
    phase: AccessPhase,
    session: Option<Principal>,
    /// Bumped on every reset; results computed for an older session are dropped.
    generation: u64,
    is_admin: bool,
    diagnostics: Option<InitializationStatus>,
    bootstrap_attempts: usize,
}

impl Inner {
    fn view(&self) -> AccessView {
        match &self.phase {
            AccessPhase::Idle if self.session.is_none() => AccessView::LoginRequired,
            AccessPhase::Idle | AccessPhase::Initializing | AccessPhase::Rechecking => {
                AccessView::Resolving
            }
            AccessPhase::Complete if self.is_admin => AccessView::Granted,
            AccessPhase::Complete => AccessView::Denied,
            AccessPhase::Failed(BackendError::Transport(_)) => {
                AccessView::Failed(ClientError::ConnectionUnavailable.to_string())
            }
            AccessPhase::Failed(BackendError::Rejected(message)) => {
                AccessView::Failed(message.clone())
            }
        }
    }
}

/// Drives the access state machine for one identity at a time.
///
/// Operations are serialised, so one resolver never has two bootstrap calls
/// in flight.
pub struct AccessResolver {
    cache: Arc<QueryCache>,
    settle: Duration,
    op_lock: Mutex<()>,
    state: RwLock<Inner>,
}

impl AccessResolver {
    /// `settle` is an extra pause after the post-bootstrap re-check.
    #[must_use]
    pub fn new(cache: Arc<QueryCache>, settle: Duration) -> Self {
        Self {
            cache,
            settle,
            op_lock: Mutex::new(()),
            state: RwLock::new(Inner::default()),
        }
    }

    #[must_use]
    pub fn phase(&self) -> AccessPhase {
        self.state.read().phase.clone()
    }

    #[must_use]
    pub fn view(&self) -> AccessView {
        self.state.read().view()
    }

    /// Bootstrap calls issued over the resolver's lifetime.
    #[must_use]
    pub fn bootstrap_attempts(&self) -> usize {
        self.state.read().bootstrap_attempts
    }

    /// Diagnostics read during the last re-check.
    #[must_use]
    pub fn diagnostics(&self) -> Option<InitializationStatus> {
        self.state.read().diagnostics
    }

    /// The bootstrap failure, classified for display.
    #[must_use]
    pub fn failure(&self) -> Option<ClientError> {
        match &self.state.read().phase {
            AccessPhase::Failed(e) => Some(classify(e, BOOTSTRAP.action, BOOTSTRAP.missing)),
            _ => None,
        }
    }

    /// Observe the current identity. A different principal, or logging out,
    /// resets the resolver to `Idle` and drops cached role queries.
    pub fn on_identity_changed(&self, identity: Option<&Identity>) {
        let next = identity.map(|i| i.principal);
        let mut state = self.state.write();
        if state.session != next {
            self.reset(&mut state, next);
        }
    }

    /// Advance the state machine for `identity` using `handle`.
    ///
    /// Without an identity this returns [`AccessView::LoginRequired`] and makes
    /// no remote call.
    #[instrument(skip(self, identity, handle), fields(principal = ?identity.map(|i| i.principal)))]
    pub async fn resolve(
        &self,
        identity: Option<&Identity>,
        handle: &Arc<dyn RestorationBackendClient>,
    ) -> AccessView {
        let _guard = self.op_lock.lock().await;
        self.on_identity_changed(identity);
        if identity.is_none() {
            return AccessView::LoginRequired;
        }

        let (phase, generation) = {
            let state = self.state.read();
            (state.phase.clone(), state.generation)
        };

        match phase {
            AccessPhase::Idle => {
                let is_admin = self.fetch_is_admin(handle).await;
                if is_admin {
                    self.commit(generation, |s| {
                        s.phase = AccessPhase::Complete;
                        s.is_admin = true;
                    });
                    info!("caller is an admin");
                    return self.view();
                }
                self.bootstrap(handle, generation).await
            }
            AccessPhase::Complete => {
                // Roster changes made elsewhere show up once the cached read goes stale.
                let is_admin = self.fetch_is_admin(handle).await;
                self.commit(generation, |s| s.is_admin = is_admin);
                self.view()
            }
            AccessPhase::Initializing | AccessPhase::Rechecking | AccessPhase::Failed(_) => {
                self.view()
            }
        }
    }

    /// Record that no client handle could be built for `identity`.
    ///
    /// A session that has not resolved yet moves to `Failed` with a transport
    /// error, so [`retry`](Self::retry) can recreate the handle. A completed
    /// session keeps its verdict.
    #[instrument(skip(self, identity, error), fields(principal = ?identity.map(|i| i.principal)))]
    pub async fn connection_failed(
        &self,
        identity: Option<&Identity>,
        error: &ClientError,
    ) -> AccessView {
        let _guard = self.op_lock.lock().await;
        self.on_identity_changed(identity);
        if identity.is_none() {
            return AccessView::LoginRequired;
        }

        let mut state = self.state.write();
        if matches!(state.phase, AccessPhase::Idle | AccessPhase::Failed(_)) {
            warn!(error = %error, "no client handle, access resolution failed");
            state.phase = AccessPhase::Failed(BackendError::transport(error.to_string()));
        }
        state.view()
    }

    /// Explicit user retry after a failed bootstrap.
    ///
    /// Recreates the client handle, then issues exactly one bootstrap call. Does
    /// nothing unless the resolver is in `Failed`.
    #[instrument(skip(self, identity, handles), fields(principal = ?identity.map(|i| i.principal)))]
    pub async fn retry(&self, identity: Option<&Identity>, handles: &HandleProvider) -> AccessView {
        let _guard = self.op_lock.lock().await;
        self.on_identity_changed(identity);

        let generation = {
            let state = self.state.read();
            if !matches!(state.phase, AccessPhase::Failed(_)) {
                debug!(phase = ?state.phase, "retry ignored outside of failed state");
                return state.view();
            }
            state.generation
        };

        let handle = match handles.recreate(identity).await {
            Ok(handle) => handle,
            Err(e) => {
                self.commit(generation, |s| {
                    s.phase = AccessPhase::Failed(BackendError::transport(e.to_string()));
                });
                return self.view();
            }
        };

        info!("retrying access control bootstrap");
        self.bootstrap(&handle, generation).await
    }

    fn reset(&self, state: &mut Inner, session: Option<Principal>) {
        info!(
            previous = ?state.session,
            next = ?session,
            "identity changed, access state reset"
        );
        state.phase = AccessPhase::Idle;
        state.session = session;
        state.generation += 1;
        state.is_admin = false;
        state.diagnostics = None;
        self.cache.invalidate_where(QueryKey::is_role_query);
    }

    /// Apply `f` unless the identity changed since `generation` was read.
    fn commit(&self, generation: u64, f: impl FnOnce(&mut Inner)) -> bool {
        let mut state = self.state.write();
        if state.generation != generation {
            debug!("identity changed during resolution, result dropped");
            return false;
        }
        f(&mut state);
        true
    }

    async fn bootstrap(
        &self,
        handle: &Arc<dyn RestorationBackendClient>,
        generation: u64,
    ) -> AccessView {
        if !self.commit(generation, |s| {
            s.phase = AccessPhase::Initializing;
            s.bootstrap_attempts += 1;
        }) {
            return self.view();
        }

        match handle.initialize_access_control().await {
            Ok(()) => info!("access control bootstrap accepted"),
            Err(e) if is_already_initialized(&e) => {
                debug!("access control already initialized");
            }
            Err(e) => {
                warn!(
                    operation = BOOTSTRAP.op,
                    error = ?e,
                    "access control bootstrap failed"
                );
                self.commit(generation, |s| s.phase = AccessPhase::Failed(e));
                return self.view();
            }
        }

        self.recheck(handle, generation).await
    }

    async fn recheck(
        &self,
        handle: &Arc<dyn RestorationBackendClient>,
        generation: u64,
    ) -> AccessView {
        if !self.commit(generation, |s| s.phase = AccessPhase::Rechecking) {
            return self.view();
        }

        self.cache.invalidate(&QueryKey::IsCallerAdmin);
        self.cache.invalidate(&QueryKey::AdminDiagnostics);
        let (is_admin, diagnostics) =
            tokio::join!(self.fetch_is_admin(handle), self.fetch_diagnostics(handle));

        if !self.settle.is_zero() {
            tokio::time::sleep(self.settle).await;
        }

        self.commit(generation, |s| {
            s.phase = AccessPhase::Complete;
            s.is_admin = is_admin;
            s.diagnostics = diagnostics;
        });
        info!(is_admin, "access resolution complete");
        self.view()
    }

    /// Admin check through the cache. Failures read as "not admin".
    async fn fetch_is_admin(&self, handle: &Arc<dyn RestorationBackendClient>) -> bool {
        self.cache
            .read_through(QueryKey::IsCallerAdmin, || async {
                handle
                    .is_caller_admin()
                    .await
                    .map_err(|e| IS_ADMIN.convert(&e))
            })
            .await
            .unwrap_or_else(|e| {
                debug!(error = %e, "admin check failed, treating caller as non-admin");
                false
            })
    }

    async fn fetch_diagnostics(
        &self,
        handle: &Arc<dyn RestorationBackendClient>,
    ) -> Option<InitializationStatus> {
        self.cache
            .read_through(QueryKey::AdminDiagnostics, || async {
                handle
                    .get_initialization_status()
                    .await
                    .map_err(|e| DIAGNOSTICS.convert(&e))
            })
            .await
            .ok()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::test_support::Harness;
    use tracing_test::traced_test;

    fn resolver(h: &Harness) -> AccessResolver {
        AccessResolver::new(h.cache(), Duration::ZERO)
    }

    #[tokio::test]
    async fn anonymous_caller_needs_login_without_remote_calls() {
        let h = Harness::new();
        let r = resolver(&h);
        let handle = h.handle(None).await;

        assert_eq!(r.resolve(None, &handle).await, AccessView::LoginRequired);
        assert_eq!(r.phase(), AccessPhase::Idle);
        assert_eq!(h.calls(ops::IS_CALLER_ADMIN), 0);
        assert_eq!(h.calls(ops::INITIALIZE_ACCESS_CONTROL), 0);
    }

    #[tokio::test]
    async fn first_caller_bootstraps_once_and_is_granted() {
        let h = Harness::new();
        let r = resolver(&h);
        let alice = h.alice();
        let handle = h.handle(Some(&alice)).await;

        assert_eq!(r.resolve(Some(&alice), &handle).await, AccessView::Granted);
        assert_eq!(r.phase(), AccessPhase::Complete);
        assert_eq!(r.bootstrap_attempts(), 1);
        assert_eq!(h.calls(ops::INITIALIZE_ACCESS_CONTROL), 1);

        let diagnostics = r.diagnostics().unwrap();
        assert!(diagnostics.is_initialized);
        assert!(diagnostics.caller_is_admin);

        // Later resolutions never bootstrap again.
        assert_eq!(r.resolve(Some(&alice), &handle).await, AccessView::Granted);
        assert_eq!(h.calls(ops::INITIALIZE_ACCESS_CONTROL), 1);
    }

    #[tokio::test]
    async fn existing_admin_skips_bootstrap() {
        let h = Harness::with_admins(vec![Harness::alice_principal()]);
        let r = resolver(&h);
        let alice = h.alice();
        let handle = h.handle(Some(&alice)).await;

        assert_eq!(r.resolve(Some(&alice), &handle).await, AccessView::Granted);
        assert_eq!(r.bootstrap_attempts(), 0);
        assert_eq!(h.calls(ops::INITIALIZE_ACCESS_CONTROL), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn already_initialized_counts_as_success() {
        let h = Harness::with_admins(vec![Harness::alice_principal()]);
        let r = resolver(&h);
        let bob = h.bob();
        let handle = h.handle(Some(&bob)).await;

        assert_eq!(r.resolve(Some(&bob), &handle).await, AccessView::Denied);
        assert_eq!(r.phase(), AccessPhase::Complete);
        assert_eq!(h.calls(ops::INITIALIZE_ACCESS_CONTROL), 1);
        assert!(logs_contain("access control already initialized"));
    }

    #[tokio::test]
    async fn bootstrap_failure_is_retained_and_retry_issues_one_call() {
        let h = Harness::new();
        let r = resolver(&h);
        let handles = HandleProvider::new(h.connector());
        let alice = h.alice();
        h.service()
            .fail_next(ops::INITIALIZE_ACCESS_CONTROL, "service unavailable");

        let handle = handles.handle_for(Some(&alice)).await.unwrap();
        let view = r.resolve(Some(&alice), &handle).await;
        assert_eq!(view, AccessView::Failed("service unavailable".to_owned()));
        assert_eq!(
            r.phase(),
            AccessPhase::Failed(BackendError::rejected("service unavailable"))
        );
        assert_eq!(
            r.failure(),
            Some(ClientError::Unknown("service unavailable".to_owned()))
        );

        // Failed never re-bootstraps on its own.
        assert!(matches!(r.resolve(Some(&alice), &handle).await, AccessView::Failed(_)));
        assert_eq!(h.calls(ops::INITIALIZE_ACCESS_CONTROL), 1);

        let connects = h.connector.connect_count();
        assert_eq!(r.retry(Some(&alice), &handles).await, AccessView::Granted);
        assert_eq!(h.calls(ops::INITIALIZE_ACCESS_CONTROL), 2);
        assert_eq!(h.connector.connect_count(), connects + 1);
    }

    #[tokio::test]
    async fn missing_record_rejection_uses_generic_copy() {
        let h = Harness::new();
        let r = resolver(&h);
        let alice = h.alice();
        let handle = h.handle(Some(&alice)).await;
        h.service()
            .fail_next(ops::INITIALIZE_ACCESS_CONTROL, "Roster not found");

        r.resolve(Some(&alice), &handle).await;
        assert_eq!(
            r.failure(),
            Some(ClientError::NotFound(BOOTSTRAP.missing.to_owned()))
        );
        assert_eq!(
            r.failure().unwrap().to_string(),
            "The requested record was not found."
        );
    }

    #[tokio::test]
    async fn retry_outside_failed_state_is_ignored() {
        let h = Harness::new();
        let r = resolver(&h);
        let handles = HandleProvider::new(h.connector());
        let alice = h.alice();

        let handle = handles.handle_for(Some(&alice)).await.unwrap();
        r.resolve(Some(&alice), &handle).await;
        let connects = h.connector.connect_count();

        assert_eq!(r.retry(Some(&alice), &handles).await, AccessView::Granted);
        assert_eq!(h.calls(ops::INITIALIZE_ACCESS_CONTROL), 1);
        assert_eq!(h.connector.connect_count(), connects);
    }

    #[tokio::test]
    async fn retry_without_connection_stays_failed() {
        let h = Harness::new();
        let r = resolver(&h);
        let handles = HandleProvider::new(h.connector());
        let alice = h.alice();
        h.service()
            .fail_next(ops::INITIALIZE_ACCESS_CONTROL, "service unavailable");

        let handle = handles.handle_for(Some(&alice)).await.unwrap();
        r.resolve(Some(&alice), &handle).await;

        h.connector.set_reachable(false);
        let view = r.retry(Some(&alice), &handles).await;
        assert_eq!(
            view,
            AccessView::Failed(ClientError::ConnectionUnavailable.to_string())
        );
        assert_eq!(r.failure(), Some(ClientError::ConnectionUnavailable));
        assert_eq!(h.calls(ops::INITIALIZE_ACCESS_CONTROL), 1);
    }

    #[tokio::test]
    async fn missing_handle_fails_an_unresolved_session_only() {
        let h = Harness::new();
        let r = resolver(&h);
        let handles = HandleProvider::new(h.connector());
        let alice = h.alice();

        let view = r
            .connection_failed(Some(&alice), &ClientError::ConnectionUnavailable)
            .await;
        assert_eq!(
            view,
            AccessView::Failed(ClientError::ConnectionUnavailable.to_string())
        );
        assert!(matches!(r.phase(), AccessPhase::Failed(BackendError::Transport(_))));

        assert_eq!(r.retry(Some(&alice), &handles).await, AccessView::Granted);
        assert_eq!(h.calls(ops::INITIALIZE_ACCESS_CONTROL), 1);

        // A resolved session keeps its verdict.
        let view = r
            .connection_failed(Some(&alice), &ClientError::ConnectionUnavailable)
            .await;
        assert_eq!(view, AccessView::Granted);
        assert_eq!(r.phase(), AccessPhase::Complete);
    }

    #[tokio::test]
    async fn admin_check_failure_is_fail_closed() {
        let h = Harness::with_admins(vec![Harness::alice_principal()]);
        let r = resolver(&h);
        let alice = h.alice();
        let handle = h.handle(Some(&alice)).await;
        h.service().fail_next(ops::IS_CALLER_ADMIN, "service unavailable");

        // The failed check reads as "not admin"; the bootstrap then reports
        // "already initialized" and the re-check sees the real roster.
        assert_eq!(r.resolve(Some(&alice), &handle).await, AccessView::Granted);
        assert_eq!(h.calls(ops::INITIALIZE_ACCESS_CONTROL), 1);
        assert_eq!(h.calls(ops::IS_CALLER_ADMIN), 2);
    }

    #[tokio::test]
    async fn logout_resets_to_idle() {
        let h = Harness::new();
        let r = resolver(&h);
        let alice = h.alice();
        let handle = h.handle(Some(&alice)).await;
        r.resolve(Some(&alice), &handle).await;

        r.on_identity_changed(None);
        assert_eq!(r.phase(), AccessPhase::Idle);
        assert_eq!(r.view(), AccessView::LoginRequired);
        assert!(r.diagnostics().is_none());
    }

    #[tokio::test]
    async fn new_principal_gets_its_own_session() {
        let h = Harness::new();
        let r = resolver(&h);
        let alice = h.alice();
        let bob = h.bob();

        let handle = h.handle(Some(&alice)).await;
        assert_eq!(r.resolve(Some(&alice), &handle).await, AccessView::Granted);

        r.on_identity_changed(Some(&bob));
        assert_eq!(r.view(), AccessView::Resolving);

        let handle = h.handle(Some(&bob)).await;
        assert_eq!(r.resolve(Some(&bob), &handle).await, AccessView::Denied);
        assert_eq!(r.bootstrap_attempts(), 2);
    }

    #[tokio::test]
    async fn concurrent_resolution_issues_a_single_bootstrap() {
        let h = Harness::new();
        let r = resolver(&h);
        let alice = h.alice();
        let handle = h.handle(Some(&alice)).await;

        let (a, b, c) = tokio::join!(
            r.resolve(Some(&alice), &handle),
            r.resolve(Some(&alice), &handle),
            r.resolve(Some(&alice), &handle),
        );
        assert_eq!(a, AccessView::Granted);
        assert_eq!(b, AccessView::Granted);
        assert_eq!(c, AccessView::Granted);
        assert_eq!(h.calls(ops::INITIALIZE_ACCESS_CONTROL), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_delay_runs_before_completion() {
        let h = Harness::new();
        let r = AccessResolver::new(h.cache(), Duration::from_millis(500));
        let alice = h.alice();
        let handle = h.handle(Some(&alice)).await;

        let started = tokio::time::Instant::now();
        assert_eq!(r.resolve(Some(&alice), &handle).await, AccessView::Granted);
        assert!(started.elapsed() >= Duration::from_millis(500));
    }
}
