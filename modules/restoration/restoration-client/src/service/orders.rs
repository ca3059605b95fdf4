use restoration_sdk::OrderStatus;
use restoration_sdk::api::ops;
use tracing::{debug, info, instrument};

use super::{ServiceCtx, required};
use crate::cache::QueryKey;
use crate::error::{ClientError, Failure};

const ORDER_MISSING: &str = "Order not found. Please check the tracking number.";

const CREATE: Failure = Failure::new(ops::CREATE_ORDER, "create orders");
const UPDATE: Failure =
    Failure::new(ops::UPDATE_TRACKING_NUMBER_STATUS, "update orders").missing(ORDER_MISSING);
const LIST: Failure = Failure::new(ops::EXAMINE_TRACKING_NUMBERS, "view orders");
const CHECK: Failure =
    Failure::new(ops::CHECK_TRACKING_NUMBER_STATUS, "check orders").missing(ORDER_MISSING);

/// Orders keyed by tracking number.
pub struct OrdersService {
    ctx: ServiceCtx,
}

impl OrdersService {
    pub(crate) fn new(ctx: ServiceCtx) -> Self {
        Self { ctx }
    }

    /// Register a new order. Admin-only; new orders start as `Processing`.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank tracking number, `Unauthorized` for non-admins.
    #[instrument(skip(self))]
    pub async fn create_order(&self, tracking_number: &str) -> Result<OrderStatus, ClientError> {
        let tracking_number = required("tracking number", tracking_number)?;
        info!("Creating order");

        let handle = self.ctx.handle()?;
        let status = handle
            .create_order(tracking_number)
            .await
            .map_err(|e| CREATE.convert(&e))?;

        self.ctx.cache().invalidate(&QueryKey::Orders);
        Ok(status)
    }

    /// # Errors
    ///
    /// `NotFound` for an unknown tracking number.
    #[instrument(skip(self), fields(status = ?new_status))]
    pub async fn update_order_status(
        &self,
        tracking_number: &str,
        new_status: OrderStatus,
    ) -> Result<OrderStatus, ClientError> {
        let tracking_number = required("tracking number", tracking_number)?;
        info!("Updating order status");

        let handle = self.ctx.handle()?;
        let status = handle
            .update_tracking_number_status(tracking_number, new_status)
            .await
            .map_err(|e| UPDATE.convert(&e))?;

        self.ctx.cache().invalidate(&QueryKey::Orders);
        self.ctx
            .cache()
            .invalidate(&QueryKey::OrderStatus(tracking_number.to_owned()));
        Ok(status)
    }

    /// All orders as `(tracking number, status)`. Admin-only.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for non-admins.
    #[instrument(skip(self))]
    pub async fn list_orders(&self) -> Result<Vec<(String, OrderStatus)>, ClientError> {
        debug!("Listing orders");
        let handle = self.ctx.handle()?;
        self.ctx
            .cache()
            .read_through(QueryKey::Orders, || async {
                handle
                    .examine_tracking_numbers()
                    .await
                    .map_err(|e| LIST.convert(&e))
            })
            .await
    }

    /// Public status lookup.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown tracking number.
    #[instrument(skip(self))]
    pub async fn check_order_status(&self, tracking_number: &str) -> Result<OrderStatus, ClientError> {
        let tracking_number = required("tracking number", tracking_number)?;
        debug!("Checking order status");

        let handle = self.ctx.handle()?;
        self.ctx
            .cache()
            .read_through(QueryKey::OrderStatus(tracking_number.to_owned()), || async {
                handle
                    .check_tracking_number_status(tracking_number)
                    .await
                    .map_err(|e| CHECK.convert(&e))
            })
            .await
    }
}
