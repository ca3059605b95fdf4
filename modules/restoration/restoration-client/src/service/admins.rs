use restoration_sdk::api::ops;
use restoration_sdk::{InitializationStatus, Principal, UserRole};
use tracing::{debug, info, instrument};

use super::{ServiceCtx, parse_principal};
use crate::cache::QueryKey;
use crate::error::{ClientError, Failure};

const IS_ADMIN: Failure = Failure::new(ops::IS_CALLER_ADMIN, "check admin status");
const DIAGNOSTICS: Failure =
    Failure::new(ops::GET_INITIALIZATION_STATUS, "read access diagnostics");
const ROLE: Failure = Failure::new(ops::GET_CALLER_USER_ROLE, "read your role");
const LIST: Failure = Failure::new(ops::GET_ADMIN_IDS, "view the admin list");
const ADD: Failure = Failure::new(ops::ADD_ADMIN_ID, "add admins");
const ASSIGN: Failure = Failure::new(ops::ASSIGN_CALLER_USER_ROLE, "assign roles");

/// Admin roster and role queries.
pub struct AdminsService {
    ctx: ServiceCtx,
}

impl AdminsService {
    pub(crate) fn new(ctx: ServiceCtx) -> Self {
        Self { ctx }
    }

    /// Whether the caller is an admin. Any failure reads as `false`.
    #[instrument(skip(self))]
    pub async fn is_caller_admin(&self) -> bool {
        let Ok(handle) = self.ctx.handle() else {
            return false;
        };
        self.ctx
            .cache()
            .read_through(QueryKey::IsCallerAdmin, || async {
                handle
                    .is_caller_admin()
                    .await
                    .map_err(|e| IS_ADMIN.convert(&e))
            })
            .await
            .unwrap_or(false)
    }

    /// # Errors
    ///
    /// `ConnectionUnavailable` without a handle.
    #[instrument(skip(self))]
    pub async fn diagnostics(&self) -> Result<InitializationStatus, ClientError> {
        let handle = self.ctx.handle()?;
        self.ctx
            .cache()
            .read_through(QueryKey::AdminDiagnostics, || async {
                handle
                    .get_initialization_status()
                    .await
                    .map_err(|e| DIAGNOSTICS.convert(&e))
            })
            .await
    }

    /// # Errors
    ///
    /// `ConnectionUnavailable` without a handle.
    #[instrument(skip(self))]
    pub async fn caller_role(&self) -> Result<UserRole, ClientError> {
        let handle = self.ctx.handle()?;
        self.ctx
            .cache()
            .read_through(QueryKey::CallerRole, || async {
                handle
                    .get_caller_user_role()
                    .await
                    .map_err(|e| ROLE.convert(&e))
            })
            .await
    }

    /// # Errors
    ///
    /// `Unauthorized` for non-admins.
    #[instrument(skip(self))]
    pub async fn admin_ids(&self) -> Result<Vec<Principal>, ClientError> {
        debug!("Listing admins");
        let handle = self.ctx.handle()?;
        self.ctx
            .cache()
            .read_through(QueryKey::AdminIds, || async {
                handle.get_admin_ids().await.map_err(|e| LIST.convert(&e))
            })
            .await
    }

    /// Add a principal, given as text, to the admin roster.
    ///
    /// # Errors
    ///
    /// `Validation` for blank or malformed principal text, `Unauthorized` for
    /// non-admins.
    #[instrument(skip(self))]
    pub async fn add_admin_id(&self, principal_text: &str) -> Result<Principal, ClientError> {
        let principal = parse_principal(principal_text)?;
        info!(%principal, "Adding admin");

        let handle = self.ctx.handle()?;
        handle
            .add_admin_id(principal)
            .await
            .map_err(|e| ADD.convert(&e))?;

        self.invalidate_roster();
        Ok(principal)
    }

    /// Set the role of a principal given as text. `Admin` adds it to the
    /// roster, any other role removes it.
    ///
    /// # Errors
    ///
    /// `Validation` for blank or malformed principal text, `Unauthorized` for
    /// non-admins, `Unknown` when the last admin would be demoted.
    #[instrument(skip(self))]
    pub async fn assign_role(
        &self,
        principal_text: &str,
        role: UserRole,
    ) -> Result<Principal, ClientError> {
        let principal = parse_principal(principal_text)?;
        info!(%principal, ?role, "Assigning role");

        let handle = self.ctx.handle()?;
        handle
            .assign_caller_user_role(principal, role)
            .await
            .map_err(|e| ASSIGN.convert(&e))?;

        self.invalidate_roster();
        self.ctx.cache().invalidate(&QueryKey::CallerRole);
        Ok(principal)
    }

    fn invalidate_roster(&self) {
        let cache = self.ctx.cache();
        cache.invalidate(&QueryKey::AdminIds);
        cache.invalidate(&QueryKey::IsCallerAdmin);
        cache.invalidate(&QueryKey::AdminDiagnostics);
    }
}
