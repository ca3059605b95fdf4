//! Wire models exchanged with the restoration service.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::principal::Principal;

/// Credential of the current caller, as handed out by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    /// The caller's principal.
    pub principal: Principal,
    /// Bearer token presented on every call made with this identity.
    pub bearer_token: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn new(principal: Principal) -> Self {
        Self {
            principal,
            bearer_token: None,
        }
    }

    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }
}

/// Role the service assigns to a caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum UserRole {
    Admin,
    User,
    Guest,
}

/// Lifecycle of a customer order, keyed by tracking number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OrderStatus {
    Processing,
    PackageReceived,
    InspectionComplete,
    CleaningComplete,
    InPress,
    FinalTouches,
    Shipped,
    Delivered,
}

impl OrderStatus {
    /// Customer-facing label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Processing => "Processing",
            Self::PackageReceived => "Package Received",
            Self::InspectionComplete => "First Inspection Complete",
            Self::CleaningComplete => "Cleaning Complete",
            Self::InPress => "Card in Press",
            Self::FinalTouches => "Final Touches Being Performed",
            Self::Shipped => "Shipped",
            Self::Delivered => "Delivered",
        }
    }
}

/// One restoration step recorded against a tracking code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestorationStep {
    pub description: String,
    pub completed: bool,
    /// Server time the step was added, refreshed when it is completed.
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// Public view of a package's restoration progress.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingStateView {
    pub tracking_code: String,
    pub restoration_level: String,
    pub arrived: bool,
    pub shipped: bool,
    pub steps: Vec<RestorationStep>,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub shipping_timestamp: Option<OffsetDateTime>,
}

impl TrackingStateView {
    /// Number of steps already marked completed.
    #[must_use]
    pub fn completed_steps(&self) -> usize {
        self.steps.iter().filter(|s| s.completed).count()
    }
}

/// Access-control diagnostics for the calling principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializationStatus {
    pub caller_role: UserRole,
    pub is_initialized: bool,
    pub caller_is_admin: bool,
}

/// Quote request submitted from the public contact form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub message: String,
}

/// Quote ticket created from a contact form submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticket {
    pub form_data: ContactForm,
    /// Triage labels; the first is assigned on submission.
    pub categories: Vec<String>,
    pub completed: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}
