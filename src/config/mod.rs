//! Configuration loading and validation for mailsender.
//!
//! This module handles loading the YAML configuration file, validation,
//! compilation into a [`RuntimeConfig`] and environment variables for
//! connection secrets.

mod env;
mod runtime;
mod secret;
mod types;
mod validation;

pub use env::{resolve_env_vars, resolve_layout_pattern};
pub(crate) use runtime::effective_priority;
pub use runtime::{CompiledTrigger, ConnectionSettings, RuntimeConfig};
pub use secret::SecretString;
pub use types::{
    Config, ConnectionConfig, DEFAULT_CONFIG_PATH, DEFAULT_MAX_CONNECTIONS, DEFAULT_PRIORITY,
    DEFAULT_SOURCE, LayoutConfig, TriggerConfig,
};
pub use validation::validate_template_render;
