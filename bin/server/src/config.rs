//! Centralized server configuration.
//!
//! Loaded via the `config` crate from environment variables, with `__`
//! separating nested keys (`WORKFLOW__MAX_NODES=200`).

use serde::Deserialize;

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Tracing filter used when `RUST_LOG` is not set.
    #[serde(default = "default_log_filter")]
    pub log_filter: String,

    /// Limits applied to workflow records.
    #[serde(default)]
    pub workflow: WorkflowLimits,
}

/// Workflow-related limits.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowLimits {
    /// Largest node list accepted by the load and validate routes.
    #[serde(default = "default_max_nodes")]
    pub max_nodes: usize,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_log_filter() -> String {
    "info,tower_http=debug".to_string()
}

fn default_max_nodes() -> usize {
    500
}

impl Default for WorkflowLimits {
    fn default() -> Self {
        Self {
            max_nodes: default_max_nodes(),
        }
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is present but cannot be parsed.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_config(
            config::Config::builder()
                .add_source(
                    config::Environment::default()
                        .separator("__")
                        .try_parsing(true),
                )
                .build()?,
        )
    }

    /// Reads configuration out of an already assembled source stack.
    ///
    /// # Errors
    ///
    /// Returns an error if a value has the wrong shape.
    pub fn from_config(source: config::Config) -> Result<Self, config::ConfigError> {
        source.try_deserialize()
    }
}
