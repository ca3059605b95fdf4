//! Errors returned by the remote restoration service.

/// A remote call that did not produce a value.
///
/// The service reports failures as free-form text; callers classify them by
/// message content, so the text is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The service received the call and rejected it.
    #[error("{0}")]
    Rejected(String),

    /// The call never reached the service.
    #[error("transport failure: {0}")]
    Transport(String),
}

impl BackendError {
    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected(message.into())
    }

    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Raw message text, without any prefix added by this crate.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Rejected(m) | Self::Transport(m) => m,
        }
    }
}
