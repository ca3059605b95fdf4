//! Error taxonomy surfaced to the presentation layer.

use restoration_sdk::BackendError;

/// Outcome of a failed client operation, rendered as user-facing copy.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClientError {
    /// No client handle is available, or the service could not be reached.
    #[error("Unable to connect to the service. Please try again later.")]
    ConnectionUnavailable,

    /// The service rejected the call on its role check.
    #[error("{0}")]
    Unauthorized(String),

    /// The referenced tracking code, order, or ticket does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Input rejected before it was sent.
    #[error("Invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },

    /// Anything else; the service's message is passed through.
    #[error("{0}")]
    Unknown(String),
}

impl ClientError {
    pub(crate) fn validation(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Validation {
            field,
            reason: reason.into(),
        }
    }

    /// Whether the remote call was rejected by the service's role check.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Whether a bootstrap rejection means another caller already bootstrapped.
#[must_use]
pub fn is_already_initialized(e: &BackendError) -> bool {
    e.message().to_ascii_lowercase().contains("already initialized")
}

/// Classify a backend failure by its message text.
///
/// `action` completes "You do not have permission to ..." and `missing` is
/// the copy used for a `not found` rejection.
#[must_use]
pub fn classify(e: &BackendError, action: &str, missing: &str) -> ClientError {
    let message = e.message();
    if matches!(e, BackendError::Transport(_)) {
        ClientError::ConnectionUnavailable
    } else if message.contains("Unauthorized") || message.contains("Only admins") {
        ClientError::Unauthorized(format!(
            "You do not have permission to {action}. Please make sure you are logged in as an admin."
        ))
    } else if message.contains("out of bounds") {
        ClientError::NotFound("Invalid step index.".to_owned())
    } else if message.contains("not found") {
        ClientError::NotFound(missing.to_owned())
    } else {
        ClientError::Unknown(message.to_owned())
    }
}

/// Context for translating one remote operation's failure.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Failure {
    pub op: &'static str,
    pub action: &'static str,
    pub missing: &'static str,
}

impl Failure {
    pub(crate) const fn new(op: &'static str, action: &'static str) -> Self {
        Self {
            op,
            action,
            missing: "The requested record was not found.",
        }
    }

    pub(crate) const fn missing(self, missing: &'static str) -> Self {
        Self { missing, ..self }
    }

    pub(crate) fn convert(self, e: &BackendError) -> ClientError {
        let classified = classify(e, self.action, self.missing);
        tracing::warn!(
            operation = self.op,
            error = ?e,
            classified = %classified,
            "restoration service call failed"
        );
        classified
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn role_rejections_are_unauthorized() {
        let e = BackendError::rejected("Unauthorized: Only admins can create orders");
        let classified = classify(&e, "create orders", "Order not found.");
        assert!(classified.is_unauthorized());
        assert!(classified.to_string().contains("create orders"));

        let e = BackendError::rejected("Only admins may do this");
        assert!(classify(&e, "x", "y").is_unauthorized());
    }

    #[test]
    fn bounds_rejection_is_not_found_not_unknown() {
        let e = BackendError::rejected("Step index out of bounds");
        assert_eq!(
            classify(&e, "complete steps", "Tracking code not found."),
            ClientError::NotFound("Invalid step index.".to_owned())
        );
    }

    #[test]
    fn missing_record_uses_supplied_copy() {
        let e = BackendError::rejected("Ticket not found");
        assert_eq!(
            classify(&e, "update tickets", "No ticket exists for this email."),
            ClientError::NotFound("No ticket exists for this email.".to_owned())
        );
    }

    #[test]
    fn other_messages_pass_through() {
        let e = BackendError::rejected("Order TRACK1 already exists");
        assert_eq!(
            classify(&e, "create orders", "Order not found."),
            ClientError::Unknown("Order TRACK1 already exists".to_owned())
        );
    }

    #[test]
    fn transport_failures_mean_no_connection() {
        let e = BackendError::transport("connection reset");
        assert_eq!(
            classify(&e, "view orders", "Order not found."),
            ClientError::ConnectionUnavailable
        );
    }

    #[test]
    fn already_initialized_is_case_insensitive() {
        assert!(is_already_initialized(&BackendError::rejected(
            "Access control already initialized"
        )));
        assert!(is_already_initialized(&BackendError::rejected(
            "ALREADY INITIALIZED"
        )));
        assert!(!is_already_initialized(&BackendError::rejected(
            "service unavailable"
        )));
    }

    #[test]
    fn validation_copy_names_the_field() {
        let e = ClientError::validation("email", "must be a valid email address");
        assert_eq!(e.to_string(), "Invalid email: must be a valid email address");
    }
}
