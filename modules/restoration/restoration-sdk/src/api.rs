//! Remote API traits for the restoration service.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::BackendError;
use crate::models::{
    ContactForm, Identity, InitializationStatus, OrderStatus, Ticket, TrackingStateView,
    UserProfile, UserRole,
};
use crate::principal::Principal;

/// Callable surface of the restoration service, bound to one caller identity.
///
/// A handle is obtained from a [`BackendConnector`] and never changes the
/// identity it was built for. Admin-only operations reject non-admin callers
/// with a message containing `Unauthorized`.
///
/// ```ignore
/// let handle = connector.connect(Some(&identity)).await?;
/// let orders = handle.examine_tracking_numbers().await?;
/// ```
#[async_trait]
pub trait RestorationBackendClient: Send + Sync {
    // -- access control --

    /// Whether the caller is on the admin roster. `false` for anonymous callers.
    async fn is_caller_admin(&self) -> Result<bool, BackendError>;

    /// Bootstrap access control, possibly granting the caller admin rights.
    ///
    /// # Errors
    ///
    /// Rejects with a message containing `already initialized` when a
    /// bootstrap has already happened; callers treat that as success.
    async fn initialize_access_control(&self) -> Result<(), BackendError>;

    async fn get_initialization_status(&self) -> Result<InitializationStatus, BackendError>;

    async fn get_caller_user_role(&self) -> Result<UserRole, BackendError>;

    /// Admin roster read. Admin-only.
    async fn get_admin_ids(&self) -> Result<Vec<Principal>, BackendError>;

    /// Add a principal to the admin roster. Admin-only.
    async fn add_admin_id(&self, principal: Principal) -> Result<(), BackendError>;

    /// Set the role of `principal`. Admin-only.
    ///
    /// Assigning [`UserRole::Admin`] joins the roster; any other role leaves
    /// it. The last admin cannot be demoted.
    async fn assign_caller_user_role(
        &self,
        principal: Principal,
        role: UserRole,
    ) -> Result<(), BackendError>;

    // -- orders --

    /// Register a new order. Admin-only. New orders start as `Processing`.
    async fn create_order(&self, tracking_number: &str) -> Result<OrderStatus, BackendError>;

    /// Admin-only. Rejects with `not found` for unknown tracking numbers.
    async fn update_tracking_number_status(
        &self,
        tracking_number: &str,
        new_status: OrderStatus,
    ) -> Result<OrderStatus, BackendError>;

    /// All orders as `(tracking number, status)`. Admin-only.
    async fn examine_tracking_numbers(&self) -> Result<Vec<(String, OrderStatus)>, BackendError>;

    async fn check_tracking_number_status(
        &self,
        tracking_number: &str,
    ) -> Result<OrderStatus, BackendError>;

    // -- restoration tracking --

    /// Public read; `None` when the tracking code is unknown.
    async fn get_tracking_state(
        &self,
        tracking_code: &str,
    ) -> Result<Option<TrackingStateView>, BackendError>;

    async fn create_tracking_state(
        &self,
        tracking_code: &str,
        restoration_level: &str,
    ) -> Result<(), BackendError>;

    async fn mark_package_arrived(&self, tracking_code: &str) -> Result<(), BackendError>;

    async fn mark_shipped(&self, tracking_code: &str) -> Result<(), BackendError>;

    /// Append a step stamped with server time. Admin-only.
    async fn add_restoration_step(
        &self,
        tracking_code: &str,
        description: &str,
    ) -> Result<(), BackendError>;

    /// Admin-only. Rejects with `out of bounds` when `index` is past the last step.
    async fn complete_restoration_step(
        &self,
        tracking_code: &str,
        index: u64,
    ) -> Result<(), BackendError>;

    // -- quote tickets --

    async fn submit_contact_form(&self, form: ContactForm) -> Result<(), BackendError>;

    /// All tickets keyed by submitter email. Admin-only.
    async fn list_all_tickets(&self) -> Result<Vec<(String, Ticket)>, BackendError>;

    async fn is_ticket_completed(&self, email: &str) -> Result<bool, BackendError>;

    async fn update_ticket_status(&self, email: &str, completed: bool)
    -> Result<(), BackendError>;

    /// Label a ticket. Admin-only; existing labels are kept.
    async fn add_category(&self, email: &str, category: &str) -> Result<(), BackendError>;

    /// Label a ticket with several categories at once. Admin-only.
    async fn add_categories(&self, email: &str, categories: &[String])
    -> Result<(), BackendError>;

    // -- profile --

    async fn get_caller_user_profile(&self) -> Result<Option<UserProfile>, BackendError>;

    async fn save_caller_user_profile(&self, profile: UserProfile) -> Result<(), BackendError>;

    /// Another principal's profile. Allowed for that principal and for admins.
    async fn get_user_profile(
        &self,
        principal: Principal,
    ) -> Result<Option<UserProfile>, BackendError>;
}

/// Builds client handles for the restoration service.
#[async_trait]
pub trait BackendConnector: Send + Sync {
    /// Connect as `identity`, or anonymously when `None`.
    ///
    /// # Errors
    ///
    /// Returns [`BackendError::Transport`] if the service cannot be reached.
    async fn connect(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Arc<dyn RestorationBackendClient>, BackendError>;
}

/// Service operation names, as used in logs and fault injection.
pub mod ops {
    pub const IS_CALLER_ADMIN: &str = "isCallerAdmin";
    pub const INITIALIZE_ACCESS_CONTROL: &str = "initializeAccessControl";
    pub const GET_INITIALIZATION_STATUS: &str = "getInitializationStatus";
    pub const GET_CALLER_USER_ROLE: &str = "getCallerUserRole";
    pub const GET_ADMIN_IDS: &str = "getAdminIds";
    pub const ADD_ADMIN_ID: &str = "addAdminId";
    pub const ASSIGN_CALLER_USER_ROLE: &str = "assignCallerUserRole";
    pub const CREATE_ORDER: &str = "createOrder";
    pub const UPDATE_TRACKING_NUMBER_STATUS: &str = "updateTrackingNumberStatus";
    pub const EXAMINE_TRACKING_NUMBERS: &str = "examineTrackingNumbers";
    pub const CHECK_TRACKING_NUMBER_STATUS: &str = "checkTrackingNumberStatus";
    pub const GET_TRACKING_STATE: &str = "getTrackingState";
    pub const CREATE_TRACKING_STATE: &str = "createTrackingState";
    pub const MARK_PACKAGE_ARRIVED: &str = "markPackageArrived";
    pub const MARK_SHIPPED: &str = "markShipped";
    pub const ADD_RESTORATION_STEP: &str = "addRestorationStep";
    pub const COMPLETE_RESTORATION_STEP: &str = "completeRestorationStep";
    pub const SUBMIT_CONTACT_FORM: &str = "submitContactForm";
    pub const LIST_ALL_TICKETS: &str = "listAllTickets";
    pub const IS_TICKET_COMPLETED: &str = "isTicketCompleted";
    pub const UPDATE_TICKET_STATUS: &str = "updateTicketStatus";
    pub const ADD_CATEGORY: &str = "addCategory";
    pub const ADD_CATEGORIES: &str = "addCategories";
    pub const GET_CALLER_USER_PROFILE: &str = "getCallerUserProfile";
    pub const SAVE_CALLER_USER_PROFILE: &str = "saveCallerUserProfile";
    pub const GET_USER_PROFILE: &str = "getUserProfile";
}
