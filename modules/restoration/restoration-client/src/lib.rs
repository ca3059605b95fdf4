//! Restoration Client
//!
//! Client-side orchestration for the restoration service:
//!
//! - [`AdminConsole`] - Controller owning the handle, cache, and access resolver
//! - [`AccessResolver`] - Admin bootstrap and role resolution state machine
//! - [`HandleProvider`] - Client handle per identity, swapped on change
//! - [`QueryCache`] - Read-through cache with per-key stale times
//! - [`OrdersService`], [`TrackingService`], [`TicketsService`], [`AdminsService`], [`ProfileService`] - Mutators and reads
//! - [`ClientError`] - Error taxonomy shown to users
//! - [`RevealGate`] - Optional passphrase prompt before admin content
//!
//! ## Usage
//!
//! ```ignore
//! use restoration_client::{AccessView, AdminConsole, ClientConfig};
//!
//! let console = AdminConsole::new(&ClientConfig::default(), identity, connector);
//!
//! if console.login().await? == AccessView::Granted {
//!     console.orders().create_order("TRACK123").await?;
//!     console.tracking().add_restoration_step("TRACK123", "Initial cleaning").await?;
//! }
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod access;
pub mod cache;
pub mod config;
pub mod console;
pub mod error;
pub mod gate;
pub mod handle;
pub mod identity;
pub mod service;

#[cfg(test)]
mod test_support;

pub use access::{AccessPhase, AccessResolver, AccessView};
pub use cache::{QueryCache, QueryKey, QueryValue};
pub use config::{ClientConfig, RevealGateConfig};
pub use console::AdminConsole;
pub use error::ClientError;
pub use gate::RevealGate;
pub use handle::HandleProvider;
pub use identity::{IdentityProvider, StaticIdentityProvider};
pub use service::{AdminsService, OrdersService, ProfileService, TicketsService, TrackingService};
