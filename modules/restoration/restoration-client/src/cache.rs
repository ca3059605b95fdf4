//! Read-through query cache.
//!
//! Entries are keyed by operation and parameters. They are replaced by fresh
//! reads or invalidated after mutations, never patched in place. Each key
//! carries an epoch bumped by every invalidation; a read that started before
//! the bump is returned to its caller but not stored.

use std::future::Future;
use std::time::Duration;

use dashmap::DashMap;
use restoration_sdk::{
    InitializationStatus, OrderStatus, Principal, Ticket, TrackingStateView, UserRole,
};
use tokio::time::Instant;

use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKey {
    IsCallerAdmin,
    AdminDiagnostics,
    CallerRole,
    AdminIds,
    Orders,
    OrderStatus(String),
    TrackingState(String),
    Tickets,
    TicketCompleted(String),
}

impl QueryKey {
    /// Keys whose value depends on the caller's role.
    #[must_use]
    pub fn is_role_query(&self) -> bool {
        matches!(
            self,
            Self::IsCallerAdmin | Self::AdminDiagnostics | Self::CallerRole | Self::AdminIds
        )
    }
}

#[derive(Debug, Clone)]
pub enum QueryValue {
    Flag(bool),
    Diagnostics(InitializationStatus),
    Role(UserRole),
    Principals(Vec<Principal>),
    Orders(Vec<(String, OrderStatus)>),
    Status(OrderStatus),
    Tracking(Option<TrackingStateView>),
    Tickets(Vec<(String, Ticket)>),
}

/// A type that can be stored in the cache.
pub trait Cached: Clone + Sized {
    fn into_value(self) -> QueryValue;
    fn from_value(value: QueryValue) -> Option<Self>;
}

macro_rules! cached {
    ($ty:ty, $variant:ident) => {
        impl Cached for $ty {
            fn into_value(self) -> QueryValue {
                QueryValue::$variant(self)
            }

            fn from_value(value: QueryValue) -> Option<Self> {
                match value {
                    QueryValue::$variant(v) => Some(v),
                    _ => None,
                }
            }
        }
    };
}

cached!(bool, Flag);
cached!(InitializationStatus, Diagnostics);
cached!(UserRole, Role);
cached!(Vec<Principal>, Principals);
cached!(Vec<(String, OrderStatus)>, Orders);
cached!(OrderStatus, Status);
cached!(Option<TrackingStateView>, Tracking);
cached!(Vec<(String, Ticket)>, Tickets);

struct Entry {
    value: QueryValue,
    fetched_at: Instant,
}

pub struct QueryCache {
    entries: DashMap<QueryKey, Entry>,
    epochs: DashMap<QueryKey, u64>,
    role_stale: Duration,
    read_stale: Duration,
}

impl QueryCache {
    /// `role_stale` applies to role queries, `read_stale` to everything else.
    #[must_use]
    pub fn new(role_stale: Duration, read_stale: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            epochs: DashMap::new(),
            role_stale,
            read_stale,
        }
    }

    fn stale_time(&self, key: &QueryKey) -> Duration {
        if key.is_role_query() {
            self.role_stale
        } else {
            self.read_stale
        }
    }

    /// The cached value if it is younger than the key's stale time.
    #[must_use]
    pub fn get_fresh<T: Cached>(&self, key: &QueryKey) -> Option<T> {
        let entry = self.entries.get(key)?;
        if entry.fetched_at.elapsed() >= self.stale_time(key) {
            return None;
        }
        T::from_value(entry.value.clone())
    }

    pub fn insert<T: Cached>(&self, key: QueryKey, value: T) {
        self.entries.insert(
            key,
            Entry {
                value: value.into_value(),
                fetched_at: Instant::now(),
            },
        );
    }

    /// Serve a fresh cached value or run `fetch` and cache its result.
    ///
    /// # Errors
    ///
    /// Propagates the error of `fetch`; failures are not cached.
    pub async fn read_through<T, F, Fut>(&self, key: QueryKey, fetch: F) -> Result<T, ClientError>
    where
        T: Cached,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, ClientError>>,
    {
        if let Some(value) = self.get_fresh(&key) {
            tracing::trace!(?key, "query cache hit");
            return Ok(value);
        }
        let epoch = *self.epochs.entry(key.clone()).or_insert(0);
        let value = fetch().await?;

        // Holding the epoch guard orders the insert before any later bump.
        let current = self.epochs.get(&key);
        if current.as_deref() == Some(&epoch) {
            self.insert(key, value.clone());
        } else {
            tracing::debug!(?key, "query invalidated during fetch, result not cached");
        }
        Ok(value)
    }

    pub fn invalidate(&self, key: &QueryKey) {
        if let Some(mut epoch) = self.epochs.get_mut(key) {
            *epoch += 1;
        }
        self.entries.remove(key);
    }

    pub fn invalidate_where(&self, pred: impl Fn(&QueryKey) -> bool) {
        for mut epoch in self.epochs.iter_mut() {
            if pred(epoch.key()) {
                *epoch += 1;
            }
        }
        self.entries.retain(|key, _| !pred(key));
    }

    pub fn clear(&self) {
        for mut epoch in self.epochs.iter_mut() {
            *epoch += 1;
        }
        self.entries.clear();
    }

    #[must_use]
    pub fn contains(&self, key: &QueryKey) -> bool {
        self.entries.contains_key(key)
    }
}
