//! Passphrase prompt in front of admin content.
//!
//! Presentation state only. Granting or denying admin operations is always
//! the service's role check; the gate can hide content but never reveal it on
//! its own.

use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;

use crate::config::RevealGateConfig;
use crate::error::ClientError;

#[derive(Debug, Default)]
struct GateState {
    prompt_open: bool,
    unlocked: bool,
}

pub struct RevealGate {
    passphrase: Option<SecretString>,
    state: Mutex<GateState>,
}

impl RevealGate {
    /// A gate that is always open.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            passphrase: None,
            state: Mutex::new(GateState::default()),
        }
    }

    #[must_use]
    pub fn from_config(cfg: Option<&RevealGateConfig>) -> Self {
        Self {
            passphrase: cfg.map(|c| SecretString::from(c.passphrase.expose_secret().to_owned())),
            state: Mutex::new(GateState::default()),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.passphrase.is_some()
    }

    /// `true` when the gate is disabled or was unlocked.
    #[must_use]
    pub fn is_unlocked(&self) -> bool {
        !self.is_enabled() || self.state.lock().unlocked
    }

    #[must_use]
    pub fn is_prompt_open(&self) -> bool {
        self.state.lock().prompt_open
    }

    pub fn open_prompt(&self) {
        self.state.lock().prompt_open = true;
    }

    pub fn close_prompt(&self) {
        self.state.lock().prompt_open = false;
    }

    /// Check `attempt` against the configured passphrase. A match unlocks the
    /// gate and closes the prompt; a miss leaves the prompt open.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Validation`] for a wrong passphrase.
    pub fn submit(&self, attempt: &str) -> Result<(), ClientError> {
        let Some(expected) = &self.passphrase else {
            return Ok(());
        };

        let matches: bool = attempt
            .as_bytes()
            .ct_eq(expected.expose_secret().as_bytes())
            .into();
        let mut state = self.state.lock();
        if matches {
            state.unlocked = true;
            state.prompt_open = false;
            tracing::debug!("reveal gate unlocked");
            Ok(())
        } else {
            Err(ClientError::validation("password", "Incorrect password"))
        }
    }

    pub fn lock(&self) {
        let mut state = self.state.lock();
        state.unlocked = false;
        state.prompt_open = false;
    }
}
