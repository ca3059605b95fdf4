use restoration_sdk::UserProfile;
use restoration_sdk::api::ops;
use tracing::{info, instrument};

use super::{ServiceCtx, email, parse_principal, required};
use crate::error::{ClientError, Failure};

const READ: Failure = Failure::new(ops::GET_CALLER_USER_PROFILE, "read your profile");
const SAVE: Failure = Failure::new(ops::SAVE_CALLER_USER_PROFILE, "save your profile");
const OTHER: Failure = Failure::new(ops::GET_USER_PROFILE, "view other users' profiles");

/// The caller's own profile. Not cached.
pub struct ProfileService {
    ctx: ServiceCtx,
}

impl ProfileService {
    pub(crate) fn new(ctx: ServiceCtx) -> Self {
        Self { ctx }
    }

    /// # Errors
    ///
    /// `ConnectionUnavailable` without a handle.
    #[instrument(skip(self))]
    pub async fn caller_profile(&self) -> Result<Option<UserProfile>, ClientError> {
        let handle = self.ctx.handle()?;
        handle
            .get_caller_user_profile()
            .await
            .map_err(|e| READ.convert(&e))
    }

    /// Profile of the principal given as text.
    ///
    /// # Errors
    ///
    /// `Validation` for malformed principal text; `Unauthorized` unless the
    /// caller is that principal or an admin.
    #[instrument(skip(self))]
    pub async fn user_profile(
        &self,
        principal_text: &str,
    ) -> Result<Option<UserProfile>, ClientError> {
        let principal = parse_principal(principal_text)?;
        let handle = self.ctx.handle()?;
        handle
            .get_user_profile(principal)
            .await
            .map_err(|e| OTHER.convert(&e))
    }

    /// # Errors
    ///
    /// `Validation` for a blank name or malformed email; `Unauthorized` when
    /// not logged in.
    #[instrument(skip(self))]
    pub async fn save_profile(&self, name: &str, email_address: &str) -> Result<(), ClientError> {
        let profile = UserProfile {
            name: required("name", name)?.to_owned(),
            email: email(email_address)?.to_owned(),
        };
        info!("Saving profile");

        let handle = self.ctx.handle()?;
        handle
            .save_caller_user_profile(profile)
            .await
            .map_err(|e| SAVE.convert(&e))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::handle::HandleProvider;
    use crate::test_support::Harness;

    #[tokio::test]
    async fn profile_round_trip() {
        let h = Harness::new();
        let handles = Arc::new(HandleProvider::new(h.connector()));
        handles.handle_for(Some(&h.alice())).await.unwrap();
        let profile = ProfileService::new(ServiceCtx::new(handles, h.cache()));

        assert_eq!(profile.caller_profile().await.unwrap(), None);
        profile.save_profile(" Misty ", "misty@example.com").await.unwrap();
        assert_eq!(
            profile.caller_profile().await.unwrap(),
            Some(UserProfile {
                name: "Misty".to_owned(),
                email: "misty@example.com".to_owned(),
            })
        );
    }

    #[tokio::test]
    async fn anonymous_caller_cannot_save() {
        let h = Harness::new();
        let handles = Arc::new(HandleProvider::new(h.connector()));
        handles.handle_for(None).await.unwrap();
        let profile = ProfileService::new(ServiceCtx::new(handles, h.cache()));

        let err = profile
            .save_profile("Misty", "misty@example.com")
            .await
            .unwrap_err();
        assert!(err.is_unauthorized());
    }

    #[tokio::test]
    async fn admin_reads_other_profiles_and_users_cannot() {
        let h = Harness::new();
        h.admin_handle().await;

        let bob_handles = Arc::new(HandleProvider::new(h.connector()));
        bob_handles.handle_for(Some(&h.bob())).await.unwrap();
        let bob = ProfileService::new(ServiceCtx::new(bob_handles, h.cache()));
        bob.save_profile("Brock", "brock@example.com").await.unwrap();

        let alice_handles = Arc::new(HandleProvider::new(h.connector()));
        alice_handles.handle_for(Some(&h.alice())).await.unwrap();
        let alice = ProfileService::new(ServiceCtx::new(alice_handles, h.cache()));

        let bob_text = Harness::bob_principal().to_string();
        let seen = alice.user_profile(&bob_text).await.unwrap().unwrap();
        assert_eq!(seen.name, "Brock");
        assert_eq!(bob.user_profile(&bob_text).await.unwrap(), Some(seen));

        let alice_text = Harness::alice_principal().to_string();
        assert!(bob.user_profile(&alice_text).await.unwrap_err().is_unauthorized());
    }
}
