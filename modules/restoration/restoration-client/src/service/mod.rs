//! Client-side services over the remote restoration operations.
//!
//! Every mutator follows the same steps:
//! 1. Validate input locally; invalid input never reaches the service
//! 2. Take the current client handle, or fail with `ConnectionUnavailable`
//! 3. Make exactly one remote call; failures are classified, never retried
//! 4. On success, invalidate the cached queries the call could have changed
//!
//! Reads go through the shared [`QueryCache`].

use std::sync::{Arc, LazyLock};

use regex::Regex;
use restoration_sdk::{Principal, RestorationBackendClient};

use crate::cache::QueryCache;
use crate::error::ClientError;
use crate::handle::HandleProvider;

mod admins;
mod orders;
mod profile;
mod tickets;
mod tracking;

pub use admins::AdminsService;
pub use orders::OrdersService;
pub use profile::ProfileService;
pub use tickets::TicketsService;
pub use tracking::TrackingService;

/// Shortest accepted contact form message, in characters.
pub const MIN_MESSAGE_LEN: usize = 10;

static EMAIL: LazyLock<Result<Regex, regex::Error>> =
    LazyLock::new(|| Regex::new(r"(?i)^[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,}$"));

/// Handle and cache shared by all services.
#[derive(Clone)]
pub(crate) struct ServiceCtx {
    handles: Arc<HandleProvider>,
    cache: Arc<QueryCache>,
}

impl ServiceCtx {
    pub(crate) fn new(handles: Arc<HandleProvider>, cache: Arc<QueryCache>) -> Self {
        Self { handles, cache }
    }

    pub(crate) fn handle(&self) -> Result<Arc<dyn RestorationBackendClient>, ClientError> {
        self.handles
            .current()
            .ok_or(ClientError::ConnectionUnavailable)
    }

    pub(crate) fn cache(&self) -> &QueryCache {
        &self.cache
    }
}

/// Trimmed non-empty input.
pub(crate) fn required<'a>(field: &'static str, value: &'a str) -> Result<&'a str, ClientError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClientError::validation(field, "must not be empty"));
    }
    Ok(trimmed)
}

/// Trimmed, well-formed email address.
pub(crate) fn email(value: &str) -> Result<&str, ClientError> {
    let value = required("email", value)?;
    let pattern = EMAIL
        .as_ref()
        .map_err(|e| ClientError::Unknown(format!("email pattern unavailable: {e}")))?;
    if !pattern.is_match(value) {
        return Err(ClientError::validation(
            "email",
            "must be a valid email address",
        ));
    }
    Ok(value)
}

/// Principal id typed in by an admin.
pub(crate) fn parse_principal(value: &str) -> Result<Principal, ClientError> {
    let value = required("principal", value)?;
    Principal::from_text(value).map_err(|e| {
        ClientError::validation("principal", format!("Invalid principal format: {e}"))
    })
}
