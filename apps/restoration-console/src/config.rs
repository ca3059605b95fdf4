use std::path::Path;

use anyhow::Context;
use figment::Figment;
use figment::providers::{Env, Format, Yaml};
use in_memory_backend::InMemoryBackendConfig;
use restoration_client::ClientConfig;
use serde::Deserialize;

/// Environment variable prefix for overrides, e.g. `RESTORATION_LOGGING__LEVEL`.
pub const ENV_PREFIX: &str = "RESTORATION_";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub client: ClientConfig,
    pub backend: InMemoryBackendConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load from an optional YAML file, then apply `RESTORATION_` overrides.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing or any value does not deserialize.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            anyhow::ensure!(path.exists(), "config file {} not found", path.display());
            figment = figment.merge(Yaml::file(path));
        }
        figment
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("invalid configuration")
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn yaml_sections_map_to_crate_configs() {
        let yaml = r#"
client:
  admin_stale_secs: 5
  reveal_gate:
    passphrase: "restore"
backend:
  ticket_category: "restoration-quote"
logging:
  level: "debug"
  json: true
"#;

        let parsed: Result<AppConfig, _> = serde_saphyr::from_str(yaml);
        let cfg = match parsed {
            Ok(cfg) => cfg,
            Err(e) => panic!("failed to parse config: {e}"),
        };

        assert_eq!(cfg.client.admin_stale_secs, 5);
        assert!(cfg.client.reveal_gate.is_some());
        assert_eq!(cfg.backend.ticket_category, "restoration-quote");
        assert_eq!(cfg.logging.level, "debug");
        assert!(cfg.logging.json);
    }

    #[test]
    fn load_reads_yaml_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "logging:\n  level: \"warn\"").unwrap();

        let cfg = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.logging.level, "warn");
        assert!(!cfg.logging.json);
        assert_eq!(cfg.client.admin_stale_secs, 30);
    }

    #[test]
    fn load_rejects_missing_file() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/restoration.yaml"))).unwrap_err();
        assert!(err.to_string().contains("not found"));
    }
}
