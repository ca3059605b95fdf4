use restoration_sdk::TrackingStateView;
use restoration_sdk::api::ops;
use tracing::{debug, info, instrument};

use super::{ServiceCtx, required};
use crate::cache::QueryKey;
use crate::error::{ClientError, Failure};

const CODE_MISSING: &str = "Tracking code not found";

const READ: Failure = Failure::new(ops::GET_TRACKING_STATE, "view tracking states");
const CREATE: Failure = Failure::new(ops::CREATE_TRACKING_STATE, "create tracking states");
const ARRIVED: Failure = Failure::new(ops::MARK_PACKAGE_ARRIVED, "mark packages as arrived")
    .missing(CODE_MISSING);
const SHIPPED: Failure =
    Failure::new(ops::MARK_SHIPPED, "mark packages as shipped").missing(CODE_MISSING);
const ADD_STEP: Failure = Failure::new(ops::ADD_RESTORATION_STEP, "add restoration steps")
    .missing(CODE_MISSING);
const COMPLETE_STEP: Failure =
    Failure::new(ops::COMPLETE_RESTORATION_STEP, "complete restoration steps")
        .missing(CODE_MISSING);

/// Restoration progress keyed by tracking code.
///
/// Each mutation invalidates only the affected code's cached state.
pub struct TrackingService {
    ctx: ServiceCtx,
}

impl TrackingService {
    pub(crate) fn new(ctx: ServiceCtx) -> Self {
        Self { ctx }
    }

    /// Admin view of a tracking code; `None` when it does not exist.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank code, `ConnectionUnavailable` without a handle.
    #[instrument(skip(self))]
    pub async fn tracking_state(
        &self,
        tracking_code: &str,
    ) -> Result<Option<TrackingStateView>, ClientError> {
        let tracking_code = required("tracking code", tracking_code)?;
        debug!("Reading tracking state");

        let handle = self.ctx.handle()?;
        self.ctx
            .cache()
            .read_through(QueryKey::TrackingState(tracking_code.to_owned()), || async {
                handle
                    .get_tracking_state(tracking_code)
                    .await
                    .map_err(|e| READ.convert(&e))
            })
            .await
    }

    /// Public lookup used by the order tracker.
    ///
    /// # Errors
    ///
    /// `NotFound` when the code does not exist.
    pub async fn track_package(&self, tracking_code: &str) -> Result<TrackingStateView, ClientError> {
        self.tracking_state(tracking_code)
            .await?
            .ok_or_else(|| ClientError::NotFound(CODE_MISSING.to_owned()))
    }

    /// # Errors
    ///
    /// `Unauthorized` for non-admins; `Unknown` if the code already exists.
    #[instrument(skip(self))]
    pub async fn create_tracking_state(
        &self,
        tracking_code: &str,
        restoration_level: &str,
    ) -> Result<(), ClientError> {
        let tracking_code = required("tracking code", tracking_code)?;
        let restoration_level = required("restoration level", restoration_level)?;
        info!("Creating tracking state");

        let handle = self.ctx.handle()?;
        handle
            .create_tracking_state(tracking_code, restoration_level)
            .await
            .map_err(|e| CREATE.convert(&e))?;

        self.invalidate(tracking_code);
        Ok(())
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown code.
    #[instrument(skip(self))]
    pub async fn mark_package_arrived(&self, tracking_code: &str) -> Result<(), ClientError> {
        let tracking_code = required("tracking code", tracking_code)?;
        info!("Marking package arrived");

        let handle = self.ctx.handle()?;
        handle
            .mark_package_arrived(tracking_code)
            .await
            .map_err(|e| ARRIVED.convert(&e))?;

        self.invalidate(tracking_code);
        Ok(())
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown code.
    #[instrument(skip(self))]
    pub async fn mark_shipped(&self, tracking_code: &str) -> Result<(), ClientError> {
        let tracking_code = required("tracking code", tracking_code)?;
        info!("Marking package shipped");

        let handle = self.ctx.handle()?;
        handle
            .mark_shipped(tracking_code)
            .await
            .map_err(|e| SHIPPED.convert(&e))?;

        self.invalidate(tracking_code);
        Ok(())
    }

    /// Append a step; the service stamps it with its own clock.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank description, `NotFound` for an unknown code.
    #[instrument(skip(self))]
    pub async fn add_restoration_step(
        &self,
        tracking_code: &str,
        description: &str,
    ) -> Result<(), ClientError> {
        let tracking_code = required("tracking code", tracking_code)?;
        let description = required("description", description)?;
        info!("Adding restoration step");

        let handle = self.ctx.handle()?;
        handle
            .add_restoration_step(tracking_code, description)
            .await
            .map_err(|e| ADD_STEP.convert(&e))?;

        self.invalidate(tracking_code);
        Ok(())
    }

    /// Mark the step at `index` completed.
    ///
    /// Bounds are checked by the service, not here.
    ///
    /// # Errors
    ///
    /// `Validation` for a negative index; `NotFound` for an unknown code or an
    /// index past the last step.
    #[instrument(skip(self))]
    pub async fn complete_restoration_step(
        &self,
        tracking_code: &str,
        index: i64,
    ) -> Result<(), ClientError> {
        let tracking_code = required("tracking code", tracking_code)?;
        let index = u64::try_from(index)
            .map_err(|_| ClientError::validation("step index", "must not be negative"))?;
        info!("Completing restoration step");

        let handle = self.ctx.handle()?;
        handle
            .complete_restoration_step(tracking_code, index)
            .await
            .map_err(|e| COMPLETE_STEP.convert(&e))?;

        self.invalidate(tracking_code);
        Ok(())
    }

    fn invalidate(&self, tracking_code: &str) {
        self.ctx
            .cache()
            .invalidate(&QueryKey::TrackingState(tracking_code.to_owned()));
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::handle::HandleProvider;
    use crate::test_support::Harness;

    async fn admin_tracking(h: &Harness) -> TrackingService {
        h.admin_handle().await;
        let handles = Arc::new(HandleProvider::new(h.connector()));
        handles.handle_for(Some(&h.alice())).await.unwrap();
        TrackingService::new(ServiceCtx::new(handles, h.cache()))
    }

    #[tokio::test]
    async fn add_and_complete_step() {
        let h = Harness::new();
        let tracking = admin_tracking(&h).await;

        tracking
            .create_tracking_state("CODE1", "premium")
            .await
            .unwrap();
        tracking
            .add_restoration_step("CODE1", "Initial cleaning")
            .await
            .unwrap();
        tracking.complete_restoration_step("CODE1", 0).await.unwrap();

        let view = tracking.track_package("CODE1").await.unwrap();
        assert_eq!(view.steps.len(), 1);
        assert_eq!(view.completed_steps(), 1);
        assert_eq!(view.steps[0].description, "Initial cleaning");
    }

    #[tokio::test]
    async fn out_of_bounds_step_is_not_found() {
        let h = Harness::new();
        let tracking = admin_tracking(&h).await;
        tracking
            .create_tracking_state("CODE1", "standard")
            .await
            .unwrap();

        let err = tracking
            .complete_restoration_step("CODE1", 3)
            .await
            .unwrap_err();
        assert_eq!(err, ClientError::NotFound("Invalid step index.".to_owned()));
    }

    #[tokio::test]
    async fn negative_step_index_is_rejected_locally() {
        let h = Harness::new();
        let tracking = admin_tracking(&h).await;

        let err = tracking
            .complete_restoration_step("CODE1", -1)
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation { field: "step index", .. }));
        assert_eq!(h.calls(ops::COMPLETE_RESTORATION_STEP), 0);
    }

    #[tokio::test]
    async fn unknown_code() {
        let h = Harness::new();
        let tracking = admin_tracking(&h).await;

        assert_eq!(tracking.tracking_state("NOPE").await.unwrap(), None);
        assert_eq!(
            tracking.track_package("NOPE").await.unwrap_err(),
            ClientError::NotFound(CODE_MISSING.to_owned())
        );
        assert_eq!(
            tracking.mark_shipped("NOPE").await.unwrap_err(),
            ClientError::NotFound(CODE_MISSING.to_owned())
        );
    }

    #[tokio::test]
    async fn mutation_invalidates_only_its_code() {
        let h = Harness::new();
        let tracking = admin_tracking(&h).await;
        tracking.create_tracking_state("A", "standard").await.unwrap();
        tracking.create_tracking_state("B", "standard").await.unwrap();

        let cache = tracking.ctx.cache();
        cache.insert(QueryKey::TrackingState("A".to_owned()), None::<TrackingStateView>);
        cache.insert(QueryKey::TrackingState("B".to_owned()), None::<TrackingStateView>);

        tracking.mark_package_arrived("A").await.unwrap();
        assert!(!cache.contains(&QueryKey::TrackingState("A".to_owned())));
        assert!(cache.contains(&QueryKey::TrackingState("B".to_owned())));
    }

    #[tokio::test]
    async fn shipping_sets_timestamp() {
        let h = Harness::new();
        let tracking = admin_tracking(&h).await;
        tracking.create_tracking_state("CODE2", "premium").await.unwrap();
        tracking.mark_package_arrived("CODE2").await.unwrap();
        tracking.mark_shipped("CODE2").await.unwrap();

        let view = tracking.track_package("CODE2").await.unwrap();
        assert!(view.arrived);
        assert!(view.shipped);
        assert!(view.shipping_timestamp.is_some());
    }
}
