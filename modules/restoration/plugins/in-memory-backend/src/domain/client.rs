//! Client implementation for the in-memory restoration backend.

use std::sync::Arc;

use async_trait::async_trait;
use restoration_sdk::api::ops;
use restoration_sdk::{
    BackendError, ContactForm, InitializationStatus, OrderStatus, Principal,
    RestorationBackendClient, Ticket, TrackingStateView, UserProfile, UserRole,
};

use super::service::Service;

/// Handle to the shared [`Service`] that makes every call as one principal.
pub struct CallerBound {
    svc: Arc<Service>,
    caller: Principal,
}

impl CallerBound {
    #[must_use]
    pub fn new(svc: Arc<Service>, caller: Principal) -> Self {
        Self { svc, caller }
    }

    #[must_use]
    pub fn caller(&self) -> Principal {
        self.caller
    }
}

#[async_trait]
impl RestorationBackendClient for CallerBound {
    async fn is_caller_admin(&self) -> Result<bool, BackendError> {
        self.svc.is_caller_admin(self.caller)
    }

    async fn initialize_access_control(&self) -> Result<(), BackendError> {
        self.svc.initialize_access_control(self.caller)
    }

    async fn get_initialization_status(&self) -> Result<InitializationStatus, BackendError> {
        self.svc.get_initialization_status(self.caller)
    }

    async fn get_caller_user_role(&self) -> Result<UserRole, BackendError> {
        self.svc.get_caller_user_role(self.caller)
    }

    async fn get_admin_ids(&self) -> Result<Vec<Principal>, BackendError> {
        self.svc.get_admin_ids(self.caller)
    }

    async fn add_admin_id(&self, principal: Principal) -> Result<(), BackendError> {
        self.svc.add_admin_id(self.caller, principal)
    }

    async fn assign_caller_user_role(
        &self,
        principal: Principal,
        role: UserRole,
    ) -> Result<(), BackendError> {
        self.svc.assign_caller_user_role(self.caller, principal, role)
    }

    async fn create_order(&self, tracking_number: &str) -> Result<OrderStatus, BackendError> {
        self.svc.create_order(self.caller, tracking_number)
    }

    async fn update_tracking_number_status(
        &self,
        tracking_number: &str,
        new_status: OrderStatus,
    ) -> Result<OrderStatus, BackendError> {
        self.svc
            .update_tracking_number_status(self.caller, tracking_number, new_status)
    }

    async fn examine_tracking_numbers(&self) -> Result<Vec<(String, OrderStatus)>, BackendError> {
        self.svc.examine_tracking_numbers(self.caller)
    }

    async fn check_tracking_number_status(
        &self,
        tracking_number: &str,
    ) -> Result<OrderStatus, BackendError> {
        self.svc.check_tracking_number_status(tracking_number)
    }

    async fn get_tracking_state(
        &self,
        tracking_code: &str,
    ) -> Result<Option<TrackingStateView>, BackendError> {
        self.svc.get_tracking_state(tracking_code)
    }

    async fn create_tracking_state(
        &self,
        tracking_code: &str,
        restoration_level: &str,
    ) -> Result<(), BackendError> {
        self.svc
            .create_tracking_state(self.caller, tracking_code, restoration_level)
    }

    async fn mark_package_arrived(&self, tracking_code: &str) -> Result<(), BackendError> {
        self.svc.mark_package_arrived(self.caller, tracking_code)
    }

    async fn mark_shipped(&self, tracking_code: &str) -> Result<(), BackendError> {
        self.svc.mark_shipped(self.caller, tracking_code)
    }

    async fn add_restoration_step(
        &self,
        tracking_code: &str,
        description: &str,
    ) -> Result<(), BackendError> {
        self.svc
            .add_restoration_step(self.caller, tracking_code, description)
    }

    async fn complete_restoration_step(
        &self,
        tracking_code: &str,
        index: u64,
    ) -> Result<(), BackendError> {
        self.svc
            .complete_restoration_step(self.caller, tracking_code, index)
    }

    async fn submit_contact_form(&self, form: ContactForm) -> Result<(), BackendError> {
        self.svc.submit_contact_form(form)
    }

    async fn list_all_tickets(&self) -> Result<Vec<(String, Ticket)>, BackendError> {
        self.svc.list_all_tickets(self.caller)
    }

    async fn is_ticket_completed(&self, email: &str) -> Result<bool, BackendError> {
        self.svc.is_ticket_completed(email)
    }

    async fn update_ticket_status(
        &self,
        email: &str,
        completed: bool,
    ) -> Result<(), BackendError> {
        self.svc.update_ticket_status(self.caller, email, completed)
    }

    async fn add_category(&self, email: &str, category: &str) -> Result<(), BackendError> {
        self.svc.add_categories(self.caller, ops::ADD_CATEGORY, email, &[category])
    }

    async fn add_categories(
        &self,
        email: &str,
        categories: &[String],
    ) -> Result<(), BackendError> {
        let categories: Vec<&str> = categories.iter().map(String::as_str).collect();
        self.svc
            .add_categories(self.caller, ops::ADD_CATEGORIES, email, &categories)
    }

    async fn get_caller_user_profile(&self) -> Result<Option<UserProfile>, BackendError> {
        self.svc.get_caller_user_profile(self.caller)
    }

    async fn save_caller_user_profile(&self, profile: UserProfile) -> Result<(), BackendError> {
        self.svc.save_caller_user_profile(self.caller, profile)
    }

    async fn get_user_profile(
        &self,
        principal: Principal,
    ) -> Result<Option<UserProfile>, BackendError> {
        self.svc.get_user_profile(self.caller, principal)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::config::InMemoryBackendConfig;
    use uuid::Uuid;

    fn principal() -> Principal {
        Principal::new(Uuid::parse_str("33333333-3333-3333-3333-333333333333").unwrap())
    }

    #[tokio::test]
    async fn plugin_trait_calls_as_bound_principal() {
        let svc = Arc::new(Service::from_config(&InMemoryBackendConfig::default()));
        let handle = CallerBound::new(svc.clone(), principal());
        let client: &dyn RestorationBackendClient = &handle;

        client.initialize_access_control().await.unwrap();
        assert!(client.is_caller_admin().await.unwrap());

        let anon = CallerBound::new(svc, Principal::anonymous());
        let anon: &dyn RestorationBackendClient = &anon;
        assert!(!anon.is_caller_admin().await.unwrap());
        assert_eq!(anon.get_caller_user_role().await.unwrap(), UserRole::Guest);
    }

    #[tokio::test]
    async fn profile_round_trip_for_caller() {
        let svc = Arc::new(Service::from_config(&InMemoryBackendConfig::default()));
        let client = CallerBound::new(svc, principal());

        assert!(client.get_caller_user_profile().await.unwrap().is_none());
        let profile = UserProfile {
            name: "Misty".to_owned(),
            email: "misty@example.com".to_owned(),
        };
        client.save_caller_user_profile(profile.clone()).await.unwrap();
        assert_eq!(client.get_caller_user_profile().await.unwrap(), Some(profile));
    }
}
