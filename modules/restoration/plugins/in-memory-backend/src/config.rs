//! Configuration for the in-memory restoration service.

use restoration_sdk::Principal;
use serde::Deserialize;

/// Backend configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InMemoryBackendConfig {
    /// Principals on the admin roster from the start.
    ///
    /// A non-empty roster counts as an already completed bootstrap.
    pub seed_admins: Vec<Principal>,

    /// Category assigned to tickets created from the contact form.
    pub ticket_category: String,
}

impl Default for InMemoryBackendConfig {
    fn default() -> Self {
        Self {
            seed_admins: Vec::new(),
            ticket_category: "quote".to_owned(),
        }
    }
}
