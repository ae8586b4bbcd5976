//! Core configuration types and loading.

use super::env::resolve_env_vars;
use super::secret::SecretString;
use super::validation::{validate_jinja_template, validate_namespace, validate_template_render};
use crate::error::ConfigError;
use crate::schema::{DEFAULT_SCHEMA, Dialect};
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// Default configuration file path.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/mailsender/config.yaml";

/// Source tag stored when none is configured.
pub const DEFAULT_SOURCE: &str = "UNKNOWN_SOURCE";

/// Priority stored when none is configured, or when it is configured as 0.
pub const DEFAULT_PRIORITY: i32 = 10;

/// Default size of the connection pool built from configuration.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;

/// Main configuration structure for mailsender.
#[derive(Debug, Deserialize)]
pub struct Config {
    /// Connection source settings (required).
    #[serde(default)]
    pub connection: Option<ConnectionConfig>,
    /// Sender address, written verbatim into `body.sender` (required).
    #[serde(default)]
    pub from: Option<String>,
    /// Recipient templates, evaluated in order.
    #[serde(default)]
    pub to: Vec<String>,
    /// Subject template; the abbreviated logger and message when absent.
    #[serde(default)]
    pub subject: Option<String>,
    /// Body layout (required).
    #[serde(default)]
    pub layout: Option<LayoutConfig>,
    /// Source tag for the header rows.
    #[serde(default)]
    pub source: Option<String>,
    /// Header row priority. 0 means "not configured".
    #[serde(default)]
    pub priority: i32,
    /// Which events are recorded when running as a tracing layer.
    #[serde(default)]
    pub trigger: TriggerConfig,
}

/// Database connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ConnectionConfig {
    /// Connection URL; `${VAR}` references are resolved from the environment.
    pub url: SecretString,
    /// Maximum number of pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Namespace of the `body` and `head` tables.
    ///
    /// `None` when the key is absent (see [`ConnectionConfig::namespace`]),
    /// `Some(None)` for an explicit `null`, which leaves the tables unqualified.
    #[serde(default, deserialize_with = "deserialize_present")]
    pub schema: Option<Option<String>>,
}

impl ConnectionConfig {
    /// Namespace in effect for `dialect`.
    ///
    /// An absent `schema` means `mailsender` on PostgreSQL and unqualified
    /// tables on SQLite.
    pub fn namespace(&self, dialect: Dialect) -> Option<&str> {
        match &self.schema {
            Some(schema) => schema.as_deref(),
            None => match dialect {
                Dialect::Postgres => Some(DEFAULT_SCHEMA),
                Dialect::Sqlite => None,
            },
        }
    }
}

fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

/// Distinguishes an explicit `null` from an absent key.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// Body layout: a content template wrapped by optional static fragments.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LayoutConfig {
    /// Inline content template.
    #[serde(default)]
    pub pattern: Option<String>,
    /// Content template read from a file, relative to the config file.
    #[serde(default)]
    pub pattern_file: Option<String>,
    #[serde(default)]
    pub file_header: Option<String>,
    #[serde(default)]
    pub presentation_header: Option<String>,
    #[serde(default)]
    pub presentation_footer: Option<String>,
    #[serde(default)]
    pub file_footer: Option<String>,
}

/// Event selection for the tracing layer.
#[derive(Debug, Clone, Deserialize)]
pub struct TriggerConfig {
    /// Least severe level that produces mail.
    #[serde(default = "default_trigger_level")]
    pub level: String,
    /// Target prefixes that never produce mail.
    #[serde(default = "default_exclude_targets")]
    pub exclude_targets: Vec<String>,
}

fn default_trigger_level() -> String {
    "error".to_string()
}

fn default_exclude_targets() -> Vec<String> {
    vec!["mailsender".to_string(), "sqlx".to_string()]
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            level: default_trigger_level(),
            exclude_targets: default_exclude_targets(),
        }
    }
}

impl Config {
    /// Load configuration from a file path.
    ///
    /// # Errors
    /// Returns [`ConfigError::LoadError`] if the file cannot be read.
    /// Returns [`ConfigError::ValidationError`] if the YAML is invalid.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::LoadError(format!("{}: {}", path.display(), e)))?;
        Self::from_yaml_str(&content)
    }

    /// Parse configuration from YAML text.
    ///
    /// # Errors
    /// Returns [`ConfigError::ValidationError`] if the YAML is invalid.
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(content).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Validate the whole configuration, collecting every problem.
    ///
    /// # Errors
    /// Returns a `Vec<ConfigError>` with all validation errors found.
    pub fn validate(&self) -> Result<(), Vec<ConfigError>> {
        let mut errors = Vec::new();

        match &self.connection {
            None => errors.push(ConfigError::MissingConnection),
            Some(connection) => {
                let dialect = match resolve_env_vars(connection.url.expose()) {
                    Ok(url) => {
                        let dialect = Dialect::from_url(&url);
                        if dialect.is_none() {
                            errors.push(ConfigError::ValidationError(
                                "connection.url must use a postgres:// or sqlite: scheme"
                                    .to_string(),
                            ));
                        }
                        dialect
                    }
                    Err(e) => {
                        errors.push(ConfigError::ValidationError(format!(
                            "connection.url: {}",
                            e
                        )));
                        None
                    }
                };
                if connection.max_connections == 0 {
                    errors.push(ConfigError::ValidationError(
                        "connection.max_connections must be at least 1".to_string(),
                    ));
                }
                if let Some(Some(schema)) = &connection.schema
                    && let Err(e) = validate_namespace(dialect, schema)
                {
                    errors.push(ConfigError::ValidationError(e));
                }
            }
        }

        if self.from.as_deref().is_none_or(|from| from.trim().is_empty()) {
            errors.push(ConfigError::MissingSender);
        }

        if self.to.is_empty() {
            errors.push(ConfigError::ValidationError(
                "at least one recipient template (to) is required".to_string(),
            ));
        }
        for (index, to) in self.to.iter().enumerate() {
            if to.trim().is_empty() {
                errors.push(ConfigError::BlankRecipient { index });
            } else {
                check_template(&mut errors, &format!("to[{}]", index), to);
            }
        }

        if let Some(subject) = &self.subject {
            check_template(&mut errors, "subject", subject);
        }

        match &self.layout {
            None => errors.push(ConfigError::ValidationError(
                "layout is not configured".to_string(),
            )),
            Some(layout) => match (&layout.pattern, &layout.pattern_file) {
                (None, None) => errors.push(ConfigError::ValidationError(
                    "layout requires pattern or pattern_file".to_string(),
                )),
                (Some(pattern), _) => check_template(&mut errors, "layout.pattern", pattern),
                (None, Some(_)) => {}
            },
        }

        if self.trigger.level.parse::<tracing::Level>().is_err() {
            errors.push(ConfigError::ValidationError(format!(
                "trigger.level '{}' is not a valid level",
                self.trigger.level
            )));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Syntax check first; the render test only runs on templates that parse.
fn check_template(errors: &mut Vec<ConfigError>, name: &str, source: &str) {
    let result = validate_jinja_template(source).and_then(|()| validate_template_render(source));
    if let Err(message) = result {
        errors.push(ConfigError::InvalidTemplate {
            name: name.to_string(),
            message,
        });
    }
}
