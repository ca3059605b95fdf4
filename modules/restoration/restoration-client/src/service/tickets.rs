use restoration_sdk::api::ops;
use restoration_sdk::{ContactForm, Ticket};
use tracing::{debug, info, instrument};

use super::{MIN_MESSAGE_LEN, ServiceCtx, email, required};
use crate::cache::QueryKey;
use crate::error::{ClientError, Failure};

const TICKET_MISSING: &str = "No quote request exists for this email.";

const SUBMIT: Failure = Failure::new(ops::SUBMIT_CONTACT_FORM, "submit quote requests");
const LIST: Failure = Failure::new(ops::LIST_ALL_TICKETS, "view quote requests");
const COMPLETED: Failure =
    Failure::new(ops::IS_TICKET_COMPLETED, "check quote requests").missing(TICKET_MISSING);
const UPDATE: Failure =
    Failure::new(ops::UPDATE_TICKET_STATUS, "update quote requests").missing(TICKET_MISSING);
const CATEGORY: Failure =
    Failure::new(ops::ADD_CATEGORY, "categorize quote requests").missing(TICKET_MISSING);
const CATEGORIES: Failure =
    Failure::new(ops::ADD_CATEGORIES, "categorize quote requests").missing(TICKET_MISSING);

/// Quote tickets created from the public contact form, keyed by email.
pub struct TicketsService {
    ctx: ServiceCtx,
}

impl TicketsService {
    pub(crate) fn new(ctx: ServiceCtx) -> Self {
        Self { ctx }
    }

    /// Submit the public contact form.
    ///
    /// # Errors
    ///
    /// `Validation` for a blank name, a malformed email, or a message shorter
    /// than [`MIN_MESSAGE_LEN`] characters.
    #[instrument(skip(self, message))]
    pub async fn submit_contact_form(
        &self,
        name: &str,
        email_address: &str,
        message: &str,
    ) -> Result<(), ClientError> {
        let name = required("name", name)?;
        let email_address = email(email_address)?;
        let message = required("message", message)?;
        if message.chars().count() < MIN_MESSAGE_LEN {
            return Err(ClientError::validation(
                "message",
                format!("must be at least {MIN_MESSAGE_LEN} characters"),
            ));
        }
        info!("Submitting contact form");

        let handle = self.ctx.handle()?;
        handle
            .submit_contact_form(ContactForm {
                name: name.to_owned(),
                email: email_address.to_owned(),
                message: message.to_owned(),
            })
            .await
            .map_err(|e| SUBMIT.convert(&e))?;

        self.ctx.cache().invalidate(&QueryKey::Tickets);
        self.ctx
            .cache()
            .invalidate(&QueryKey::TicketCompleted(email_address.to_owned()));
        Ok(())
    }

    /// All tickets keyed by email. Admin-only.
    ///
    /// # Errors
    ///
    /// `Unauthorized` for non-admins.
    #[instrument(skip(self))]
    pub async fn list_tickets(&self) -> Result<Vec<(String, Ticket)>, ClientError> {
        debug!("Listing tickets");
        let handle = self.ctx.handle()?;
        self.ctx
            .cache()
            .read_through(QueryKey::Tickets, || async {
                handle.list_all_tickets().await.map_err(|e| LIST.convert(&e))
            })
            .await
    }

    /// # Errors
    ///
    /// `NotFound` when no ticket exists for `email_address`.
    #[instrument(skip(self))]
    pub async fn is_ticket_completed(&self, email_address: &str) -> Result<bool, ClientError> {
        let email_address = required("email", email_address)?;
        let handle = self.ctx.handle()?;
        self.ctx
            .cache()
            .read_through(QueryKey::TicketCompleted(email_address.to_owned()), || async {
                handle
                    .is_ticket_completed(email_address)
                    .await
                    .map_err(|e| COMPLETED.convert(&e))
            })
            .await
    }

    /// # Errors
    ///
    /// `NotFound` when no ticket exists for `email_address`.
    #[instrument(skip(self))]
    pub async fn update_ticket_status(
        &self,
        email_address: &str,
        completed: bool,
    ) -> Result<(), ClientError> {
        let email_address = required("email", email_address)?;
        info!("Updating ticket status");

        let handle = self.ctx.handle()?;
        handle
            .update_ticket_status(email_address, completed)
            .await
            .map_err(|e| UPDATE.convert(&e))?;

        self.ctx.cache().invalidate(&QueryKey::Tickets);
        self.ctx
            .cache()
            .invalidate(&QueryKey::TicketCompleted(email_address.to_owned()));
        Ok(())
    }

    /// # Errors
    ///
    /// `Validation` for a blank category, `NotFound` when no ticket exists for
    /// `email_address`.
    #[instrument(skip(self))]
    pub async fn add_category(
        &self,
        email_address: &str,
        category: &str,
    ) -> Result<(), ClientError> {
        let email_address = required("email", email_address)?;
        let category = required("category", category)?;
        info!("Adding ticket category");

        let handle = self.ctx.handle()?;
        handle
            .add_category(email_address, category)
            .await
            .map_err(|e| CATEGORY.convert(&e))?;
        self.ctx.cache().invalidate(&QueryKey::Tickets);
        Ok(())
    }

    /// Add several categories in one call. Blank entries are rejected before
    /// anything is sent.
    ///
    /// # Errors
    ///
    /// `Validation` for an empty list or a blank category, `NotFound` when no
    /// ticket exists for `email_address`.
    #[instrument(skip(self))]
    pub async fn add_categories(
        &self,
        email_address: &str,
        categories: &[&str],
    ) -> Result<(), ClientError> {
        let email_address = required("email", email_address)?;
        if categories.is_empty() {
            return Err(ClientError::validation("category", "at least one is required"));
        }
        let categories = categories
            .iter()
            .map(|c| required("category", c).map(str::to_owned))
            .collect::<Result<Vec<_>, _>>()?;
        info!(count = categories.len(), "Adding ticket categories");

        let handle = self.ctx.handle()?;
        handle
            .add_categories(email_address, &categories)
            .await
            .map_err(|e| CATEGORIES.convert(&e))?;
        self.ctx.cache().invalidate(&QueryKey::Tickets);
        Ok(())
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::handle::HandleProvider;
    use crate::test_support::Harness;

    async fn tickets_as_admin(h: &Harness) -> TicketsService {
        h.admin_handle().await;
        let handles = Arc::new(HandleProvider::new(h.connector()));
        handles.handle_for(Some(&h.alice())).await.unwrap();
        TicketsService::new(ServiceCtx::new(handles, h.cache()))
    }

    #[tokio::test]
    async fn submitted_form_becomes_a_quote_ticket() {
        let h = Harness::new();
        let tickets = tickets_as_admin(&h).await;

        tickets
            .submit_contact_form("Ash", "ash@example.com", "Please restore my holo card")
            .await
            .unwrap();

        let listed = tickets.list_tickets().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].0, "ash@example.com");
        assert_eq!(listed[0].1.categories, vec!["quote"]);
        assert!(!tickets.is_ticket_completed("ash@example.com").await.unwrap());

        tickets
            .update_ticket_status("ash@example.com", true)
            .await
            .unwrap();
        assert!(tickets.is_ticket_completed("ash@example.com").await.unwrap());
    }

    #[tokio::test]
    async fn invalid_forms_never_reach_the_service() {
        let h = Harness::new();
        let tickets = tickets_as_admin(&h).await;

        let err = tickets
            .submit_contact_form("Ash", "ash-at-example", "Please restore my card")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation { field: "email", .. }));

        let err = tickets
            .submit_contact_form("Ash", "ash@example.com", "too short")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation { field: "message", .. }));

        let err = tickets
            .submit_contact_form(" ", "ash@example.com", "Please restore my card")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation { field: "name", .. }));

        assert_eq!(h.calls(ops::SUBMIT_CONTACT_FORM), 0);
    }

    #[tokio::test]
    async fn unknown_ticket_is_not_found() {
        let h = Harness::new();
        let tickets = tickets_as_admin(&h).await;

        assert_eq!(
            tickets
                .update_ticket_status("nobody@example.com", true)
                .await
                .unwrap_err(),
            ClientError::NotFound(TICKET_MISSING.to_owned())
        );
        assert!(
            tickets
                .is_ticket_completed("nobody@example.com")
                .await
                .unwrap_err()
                .is_not_found()
        );
    }

    #[tokio::test]
    async fn categories_show_up_in_the_ticket_list() {
        let h = Harness::new();
        let tickets = tickets_as_admin(&h).await;
        tickets
            .submit_contact_form("Ash", "ash@example.com", "Please restore my holo card")
            .await
            .unwrap();
        assert_eq!(tickets.list_tickets().await.unwrap()[0].1.categories, vec!["quote"]);

        tickets.add_category("ash@example.com", " holo ").await.unwrap();
        tickets
            .add_categories("ash@example.com", &["premium", "holo"])
            .await
            .unwrap();
        assert_eq!(
            tickets.list_tickets().await.unwrap()[0].1.categories,
            vec!["quote", "holo", "premium"]
        );

        let err = tickets
            .add_categories("ash@example.com", &["rush", " "])
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation { field: "category", .. }));
        assert_eq!(h.calls(ops::ADD_CATEGORIES), 1);

        assert_eq!(
            tickets
                .add_category("nobody@example.com", "holo")
                .await
                .unwrap_err(),
            ClientError::NotFound(TICKET_MISSING.to_owned())
        );
    }
}
