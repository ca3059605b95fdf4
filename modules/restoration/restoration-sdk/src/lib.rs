//! Restoration Service SDK
//!
//! This crate provides the contract of the remote restoration service:
//!
//! - [`RestorationBackendClient`] - Remote API trait (one method per service operation)
//! - [`BackendConnector`] - Produces client handles bound to an [`Identity`]
//! - [`OrderStatus`], [`TrackingStateView`], [`Ticket`], ... - Wire models
//! - [`Principal`] - Opaque caller identifier
//! - [`BackendError`] - Rejected or undeliverable remote calls
//!
//! ## Usage
//!
//! ```ignore
//! use restoration_sdk::{BackendConnector, RestorationBackendClient};
//!
//! let handle = connector.connect(Some(&identity)).await?;
//!
//! if !handle.is_caller_admin().await? {
//!     handle.initialize_access_control().await?;
//! }
//! let status = handle.create_order("TRACK123").await?;
//! ```
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod api;
pub mod error;
pub mod models;
pub mod principal;

// Re-export main types at crate root
pub use api::{BackendConnector, RestorationBackendClient};
pub use error::BackendError;
pub use models::{
    ContactForm, Identity, InitializationStatus, OrderStatus, RestorationStep, Ticket,
    TrackingStateView, UserProfile, UserRole,
};
pub use principal::{Principal, PrincipalParseError};
