//! Application configuration management.

use serde::Deserialize;

use crate::types::WalletAddress;

/// Application configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Workflow engine configuration.
    #[serde(default)]
    pub workflow: WorkflowConfig,
    /// Snapshot persistence configuration.
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Workflow engine configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    /// Wallet holding implicit Admin authority (the deploying account).
    #[serde(default)]
    pub owner: Option<WalletAddress>,
    /// Maximum user name length in characters.
    #[serde(default = "default_max_name_length")]
    pub max_name_length: usize,
    /// Maximum transaction description length in characters.
    #[serde(default = "default_max_text_length")]
    pub max_description_length: usize,
    /// Maximum approval reason length in characters.
    #[serde(default = "default_max_text_length")]
    pub max_reason_length: usize,
    /// Buffered events per live subscriber before it lags.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
    /// Events retained for replay.
    #[serde(default = "default_event_history_capacity")]
    pub event_history_capacity: usize,
}

fn default_max_name_length() -> usize {
    100
}

fn default_max_text_length() -> usize {
    200
}

fn default_event_channel_capacity() -> usize {
    1024
}

fn default_event_history_capacity() -> usize {
    10_000
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            owner: None,
            max_name_length: default_max_name_length(),
            max_description_length: default_max_text_length(),
            max_reason_length: default_max_text_length(),
            event_channel_capacity: default_event_channel_capacity(),
            event_history_capacity: default_event_history_capacity(),
        }
    }
}

/// Snapshot persistence configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PersistenceConfig {
    /// Where the store snapshot is read at startup and rewritten after each commit.
    /// Persistence is disabled when unset.
    #[serde(default)]
    pub snapshot_path: Option<String>,
}

impl AppConfig {
    /// Loads configuration from environment and config files.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded.
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{run_mode}")).required(false))
            .add_source(
                config::Environment::with_prefix("FINPLAT")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_sources() {
        temp_env::with_vars_unset(
            [
                "FINPLAT__SERVER__PORT",
                "FINPLAT__WORKFLOW__OWNER",
                "FINPLAT__PERSISTENCE__SNAPSHOT_PATH",
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.server.port, 8080);
                assert_eq!(config.workflow.max_name_length, 100);
                assert_eq!(config.workflow.max_description_length, 200);
                assert!(config.workflow.owner.is_none());
                assert!(config.persistence.snapshot_path.is_none());
            },
        );
    }

    #[test]
    fn test_environment_overrides() {
        temp_env::with_vars(
            [
                ("FINPLAT__SERVER__PORT", Some("9191")),
                (
                    "FINPLAT__WORKFLOW__OWNER",
                    Some("0xF39FD6E51AAD88F6F4CE6AB8827279CFFFB92266"),
                ),
                ("FINPLAT__PERSISTENCE__SNAPSHOT_PATH", Some("/tmp/finplat.json")),
            ],
            || {
                let config = AppConfig::load().unwrap();
                assert_eq!(config.server.port, 9191);
                assert_eq!(
                    config.workflow.owner.unwrap().as_str(),
                    "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266"
                );
                assert_eq!(
                    config.persistence.snapshot_path.as_deref(),
                    Some("/tmp/finplat.json")
                );
            },
        );
    }

    #[test]
    fn test_malformed_owner_is_rejected() {
        temp_env::with_var("FINPLAT__WORKFLOW__OWNER", Some("not-an-address"), || {
            assert!(AppConfig::load().is_err());
        });
    }
}
