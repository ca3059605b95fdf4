//! Service implementation for the in-memory restoration backend.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use parking_lot::{Mutex, RwLock};
use restoration_sdk::api::ops;
use restoration_sdk::{
    BackendError, ContactForm, InitializationStatus, OrderStatus, Principal, RestorationStep,
    Ticket, TrackingStateView, UserProfile, UserRole,
};
use time::OffsetDateTime;

use crate::config::InMemoryBackendConfig;

/// In-memory restoration service.
///
/// Access control follows a first-caller policy: the first authenticated
/// principal to call `initialize_access_control` joins the admin roster.
/// Every later bootstrap is rejected with an "already initialized" message.
pub struct Service {
    state: RwLock<State>,
    ticket_category: String,
    faults: Mutex<HashMap<&'static str, VecDeque<String>>>,
    calls: Mutex<HashMap<&'static str, usize>>,
}

#[derive(Default)]
struct State {
    initialized: bool,
    admins: BTreeSet<Principal>,
    /// Explicit non-admin roles; principals without one are `User`.
    roles: HashMap<Principal, UserRole>,
    orders: BTreeMap<String, OrderStatus>,
    tracking: HashMap<String, TrackingStateView>,
    tickets: BTreeMap<String, Ticket>,
    profiles: HashMap<Principal, UserProfile>,
}

impl State {
    fn role_of(&self, caller: Principal) -> UserRole {
        if caller.is_anonymous() {
            UserRole::Guest
        } else if self.admins.contains(&caller) {
            UserRole::Admin
        } else {
            self.roles.get(&caller).copied().unwrap_or(UserRole::User)
        }
    }

    fn require_admin(&self, caller: Principal, action: &str) -> Result<(), BackendError> {
        if self.admins.contains(&caller) {
            Ok(())
        } else {
            Err(BackendError::rejected(format!(
                "Unauthorized: Only admins can {action}"
            )))
        }
    }

    fn ticket_mut(&mut self, email: &str) -> Result<&mut Ticket, BackendError> {
        self.tickets
            .get_mut(email)
            .ok_or_else(|| BackendError::rejected("Ticket not found"))
    }

    fn tracking_mut(&mut self, code: &str) -> Result<&mut TrackingStateView, BackendError> {
        self.tracking
            .get_mut(code)
            .ok_or_else(|| BackendError::rejected("Tracking code not found"))
    }
}

impl Service {
    /// Create a service from backend configuration.
    #[must_use]
    pub fn from_config(cfg: &InMemoryBackendConfig) -> Self {
        let admins: BTreeSet<Principal> = cfg
            .seed_admins
            .iter()
            .copied()
            .filter(|p| !p.is_anonymous())
            .collect();

        let state = State {
            initialized: !admins.is_empty(),
            admins,
            ..State::default()
        };

        Self {
            state: RwLock::new(state),
            ticket_category: cfg.ticket_category.clone(),
            faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Make the next call of `op` reject with `message`.
    ///
    /// Queued faults are consumed in order, one per call.
    pub fn fail_next(&self, op: &'static str, message: impl Into<String>) {
        self.faults
            .lock()
            .entry(op)
            .or_default()
            .push_back(message.into());
    }

    /// Number of calls of `op` received so far, including rejected ones.
    #[must_use]
    pub fn call_count(&self, op: &str) -> usize {
        self.calls.lock().get(op).copied().unwrap_or(0)
    }

    /// Record the call and apply any queued fault.
    fn enter(&self, op: &'static str) -> Result<(), BackendError> {
        *self.calls.lock().entry(op).or_insert(0) += 1;
        let fault = self.faults.lock().get_mut(op).and_then(VecDeque::pop_front);
        match fault {
            Some(message) => {
                tracing::debug!(operation = op, %message, "injected fault");
                Err(BackendError::rejected(message))
            }
            None => Ok(()),
        }
    }

    // -- access control --

    pub(crate) fn is_caller_admin(&self, caller: Principal) -> Result<bool, BackendError> {
        self.enter(ops::IS_CALLER_ADMIN)?;
        Ok(self.state.read().admins.contains(&caller))
    }

    pub(crate) fn initialize_access_control(&self, caller: Principal) -> Result<(), BackendError> {
        self.enter(ops::INITIALIZE_ACCESS_CONTROL)?;
        if caller.is_anonymous() {
            return Err(BackendError::rejected(
                "Unauthorized: anonymous callers cannot initialize access control",
            ));
        }

        let mut state = self.state.write();
        if state.initialized {
            return Err(BackendError::rejected("Access control already initialized"));
        }
        state.initialized = true;
        state.admins.insert(caller);
        tracing::info!(principal = %caller, "access control initialized");
        Ok(())
    }

    pub(crate) fn get_initialization_status(
        &self,
        caller: Principal,
    ) -> Result<InitializationStatus, BackendError> {
        self.enter(ops::GET_INITIALIZATION_STATUS)?;
        let state = self.state.read();
        Ok(InitializationStatus {
            caller_role: state.role_of(caller),
            is_initialized: state.initialized,
            caller_is_admin: state.admins.contains(&caller),
        })
    }

    pub(crate) fn get_caller_user_role(&self, caller: Principal) -> Result<UserRole, BackendError> {
        self.enter(ops::GET_CALLER_USER_ROLE)?;
        Ok(self.state.read().role_of(caller))
    }

    pub(crate) fn get_admin_ids(&self, caller: Principal) -> Result<Vec<Principal>, BackendError> {
        self.enter(ops::GET_ADMIN_IDS)?;
        let state = self.state.read();
        state.require_admin(caller, "view the admin list")?;
        Ok(state.admins.iter().copied().collect())
    }

    pub(crate) fn add_admin_id(
        &self,
        caller: Principal,
        principal: Principal,
    ) -> Result<(), BackendError> {
        self.enter(ops::ADD_ADMIN_ID)?;
        let mut state = self.state.write();
        state.require_admin(caller, "add admins")?;
        if principal.is_anonymous() {
            return Err(BackendError::rejected(
                "The anonymous principal cannot be an admin",
            ));
        }
        state.admins.insert(principal);
        state.roles.remove(&principal);
        tracing::info!(added_by = %caller, %principal, "admin added");
        Ok(())
    }

    pub(crate) fn assign_caller_user_role(
        &self,
        caller: Principal,
        principal: Principal,
        role: UserRole,
    ) -> Result<(), BackendError> {
        self.enter(ops::ASSIGN_CALLER_USER_ROLE)?;
        let mut state = self.state.write();
        state.require_admin(caller, "assign roles")?;
        if principal.is_anonymous() {
            return Err(BackendError::rejected(
                "The anonymous principal cannot be assigned a role",
            ));
        }

        if role == UserRole::Admin {
            state.admins.insert(principal);
            state.roles.remove(&principal);
        } else {
            if state.admins.len() == 1 && state.admins.contains(&principal) {
                return Err(BackendError::rejected("Cannot remove the last admin"));
            }
            state.admins.remove(&principal);
            state.roles.insert(principal, role);
        }
        tracing::info!(assigned_by = %caller, %principal, ?role, "role assigned");
        Ok(())
    }

    // -- orders --

    pub(crate) fn create_order(
        &self,
        caller: Principal,
        tracking_number: &str,
    ) -> Result<OrderStatus, BackendError> {
        self.enter(ops::CREATE_ORDER)?;
        let mut state = self.state.write();
        state.require_admin(caller, "create orders")?;
        if state.orders.contains_key(tracking_number) {
            return Err(BackendError::rejected(format!(
                "Order {tracking_number} already exists"
            )));
        }
        state
            .orders
            .insert(tracking_number.to_owned(), OrderStatus::Processing);
        Ok(OrderStatus::Processing)
    }

    pub(crate) fn update_tracking_number_status(
        &self,
        caller: Principal,
        tracking_number: &str,
        new_status: OrderStatus,
    ) -> Result<OrderStatus, BackendError> {
        self.enter(ops::UPDATE_TRACKING_NUMBER_STATUS)?;
        let mut state = self.state.write();
        state.require_admin(caller, "update orders")?;
        let status = state
            .orders
            .get_mut(tracking_number)
            .ok_or_else(|| BackendError::rejected("Order not found"))?;
        *status = new_status;
        Ok(new_status)
    }

    pub(crate) fn examine_tracking_numbers(
        &self,
        caller: Principal,
    ) -> Result<Vec<(String, OrderStatus)>, BackendError> {
        self.enter(ops::EXAMINE_TRACKING_NUMBERS)?;
        let state = self.state.read();
        state.require_admin(caller, "view orders")?;
        Ok(state
            .orders
            .iter()
            .map(|(number, status)| (number.clone(), *status))
            .collect())
    }

    pub(crate) fn check_tracking_number_status(
        &self,
        tracking_number: &str,
    ) -> Result<OrderStatus, BackendError> {
        self.enter(ops::CHECK_TRACKING_NUMBER_STATUS)?;
        self.state
            .read()
            .orders
            .get(tracking_number)
            .copied()
            .ok_or_else(|| BackendError::rejected("Order not found"))
    }

    // -- restoration tracking --

    pub(crate) fn get_tracking_state(
        &self,
        tracking_code: &str,
    ) -> Result<Option<TrackingStateView>, BackendError> {
        self.enter(ops::GET_TRACKING_STATE)?;
        Ok(self.state.read().tracking.get(tracking_code).cloned())
    }

    pub(crate) fn create_tracking_state(
        &self,
        caller: Principal,
        tracking_code: &str,
        restoration_level: &str,
    ) -> Result<(), BackendError> {
        self.enter(ops::CREATE_TRACKING_STATE)?;
        let mut state = self.state.write();
        state.require_admin(caller, "create tracking states")?;
        if state.tracking.contains_key(tracking_code) {
            return Err(BackendError::rejected(format!(
                "Tracking code {tracking_code} already exists"
            )));
        }
        state.tracking.insert(
            tracking_code.to_owned(),
            TrackingStateView {
                tracking_code: tracking_code.to_owned(),
                restoration_level: restoration_level.to_owned(),
                arrived: false,
                shipped: false,
                steps: Vec::new(),
                shipping_timestamp: None,
            },
        );
        Ok(())
    }

    pub(crate) fn mark_package_arrived(
        &self,
        caller: Principal,
        tracking_code: &str,
    ) -> Result<(), BackendError> {
        self.enter(ops::MARK_PACKAGE_ARRIVED)?;
        let mut state = self.state.write();
        state.require_admin(caller, "mark packages as arrived")?;
        state.tracking_mut(tracking_code)?.arrived = true;
        Ok(())
    }

    pub(crate) fn mark_shipped(
        &self,
        caller: Principal,
        tracking_code: &str,
    ) -> Result<(), BackendError> {
        self.enter(ops::MARK_SHIPPED)?;
        let mut state = self.state.write();
        state.require_admin(caller, "mark packages as shipped")?;
        let record = state.tracking_mut(tracking_code)?;
        record.shipped = true;
        record.shipping_timestamp = Some(OffsetDateTime::now_utc());
        Ok(())
    }

    pub(crate) fn add_restoration_step(
        &self,
        caller: Principal,
        tracking_code: &str,
        description: &str,
    ) -> Result<(), BackendError> {
        self.enter(ops::ADD_RESTORATION_STEP)?;
        let mut state = self.state.write();
        state.require_admin(caller, "add restoration steps")?;
        state.tracking_mut(tracking_code)?.steps.push(RestorationStep {
            description: description.to_owned(),
            completed: false,
            timestamp: OffsetDateTime::now_utc(),
        });
        Ok(())
    }

    pub(crate) fn complete_restoration_step(
        &self,
        caller: Principal,
        tracking_code: &str,
        index: u64,
    ) -> Result<(), BackendError> {
        self.enter(ops::COMPLETE_RESTORATION_STEP)?;
        let mut state = self.state.write();
        state.require_admin(caller, "complete restoration steps")?;
        let record = state.tracking_mut(tracking_code)?;
        let step = usize::try_from(index)
            .ok()
            .and_then(|i| record.steps.get_mut(i))
            .ok_or_else(|| BackendError::rejected("Step index out of bounds"))?;
        step.completed = true;
        step.timestamp = OffsetDateTime::now_utc();
        Ok(())
    }

    // -- quote tickets --

    pub(crate) fn submit_contact_form(&self, form: ContactForm) -> Result<(), BackendError> {
        self.enter(ops::SUBMIT_CONTACT_FORM)?;
        let email = form.email.clone();
        self.state.write().tickets.insert(
            email,
            Ticket {
                form_data: form,
                categories: vec![self.ticket_category.clone()],
                completed: false,
            },
        );
        Ok(())
    }

    pub(crate) fn list_all_tickets(
        &self,
        caller: Principal,
    ) -> Result<Vec<(String, Ticket)>, BackendError> {
        self.enter(ops::LIST_ALL_TICKETS)?;
        let state = self.state.read();
        state.require_admin(caller, "view quote forms")?;
        Ok(state
            .tickets
            .iter()
            .map(|(email, ticket)| (email.clone(), ticket.clone()))
            .collect())
    }

    pub(crate) fn is_ticket_completed(&self, email: &str) -> Result<bool, BackendError> {
        self.enter(ops::IS_TICKET_COMPLETED)?;
        self.state
            .read()
            .tickets
            .get(email)
            .map(|t| t.completed)
            .ok_or_else(|| BackendError::rejected("Ticket not found"))
    }

    pub(crate) fn update_ticket_status(
        &self,
        caller: Principal,
        email: &str,
        completed: bool,
    ) -> Result<(), BackendError> {
        self.enter(ops::UPDATE_TICKET_STATUS)?;
        let mut state = self.state.write();
        state.require_admin(caller, "update tickets")?;
        state.ticket_mut(email)?.completed = completed;
        Ok(())
    }

    /// Backs both `addCategory` and `addCategories`; `op` names the call.
    pub(crate) fn add_categories(
        &self,
        caller: Principal,
        op: &'static str,
        email: &str,
        categories: &[&str],
    ) -> Result<(), BackendError> {
        self.enter(op)?;
        let mut state = self.state.write();
        state.require_admin(caller, "categorize tickets")?;
        let ticket = state.ticket_mut(email)?;
        for category in categories {
            if !ticket.categories.iter().any(|c| c == category) {
                ticket.categories.push((*category).to_owned());
            }
        }
        Ok(())
    }

    // -- profile --

    pub(crate) fn get_caller_user_profile(
        &self,
        caller: Principal,
    ) -> Result<Option<UserProfile>, BackendError> {
        self.enter(ops::GET_CALLER_USER_PROFILE)?;
        Ok(self.state.read().profiles.get(&caller).cloned())
    }

    pub(crate) fn save_caller_user_profile(
        &self,
        caller: Principal,
        profile: UserProfile,
    ) -> Result<(), BackendError> {
        self.enter(ops::SAVE_CALLER_USER_PROFILE)?;
        if caller.is_anonymous() {
            return Err(BackendError::rejected(
                "Unauthorized: anonymous callers cannot save profiles",
            ));
        }
        self.state.write().profiles.insert(caller, profile);
        Ok(())
    }

    pub(crate) fn get_user_profile(
        &self,
        caller: Principal,
        principal: Principal,
    ) -> Result<Option<UserProfile>, BackendError> {
        self.enter(ops::GET_USER_PROFILE)?;
        let state = self.state.read();
        if caller != principal && !state.admins.contains(&caller) {
            return Err(BackendError::rejected(
                "Unauthorized: Can only view your own profile",
            ));
        }
        Ok(state.profiles.get(&principal).cloned())
    }
}
