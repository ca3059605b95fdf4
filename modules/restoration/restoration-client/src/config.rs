//! Client configuration.

use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};

/// Restoration client configuration.
#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientConfig {
    /// How long admin-role and diagnostics reads stay fresh, in seconds.
    pub admin_stale_secs: u64,

    /// How long every other read stays fresh, in seconds. `0` always refetches.
    pub read_stale_secs: u64,

    /// Pause after the post-bootstrap re-check before reporting completion, in
    /// milliseconds. The re-check itself is always awaited.
    pub recheck_settle_ms: u64,

    /// Passphrase prompt shown before admin content. Disabled when absent.
    pub reveal_gate: Option<RevealGateConfig>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            admin_stale_secs: 30,
            read_stale_secs: 0,
            recheck_settle_ms: 0,
            reveal_gate: None,
        }
    }
}

impl ClientConfig {
    #[must_use]
    pub fn admin_stale(&self) -> Duration {
        Duration::from_secs(self.admin_stale_secs)
    }

    #[must_use]
    pub fn read_stale(&self) -> Duration {
        Duration::from_secs(self.read_stale_secs)
    }

    #[must_use]
    pub fn recheck_settle(&self) -> Duration {
        Duration::from_millis(self.recheck_settle_ms)
    }
}

/// Reveal gate settings.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RevealGateConfig {
    #[serde(deserialize_with = "secret_from_string")]
    pub passphrase: SecretString,
}

impl RevealGateConfig {
    #[must_use]
    pub fn new(passphrase: impl Into<String>) -> Self {
        Self {
            passphrase: SecretString::from(passphrase.into()),
        }
    }
}

fn secret_from_string<'de, D>(deserializer: D) -> Result<SecretString, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(SecretString::from)
}
