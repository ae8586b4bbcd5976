//! Runtime configuration with compiled templates and applied defaults.

use super::env::{resolve_env_vars, resolve_layout_pattern};
use super::secret::SecretString;
use super::types::{Config, DEFAULT_PRIORITY, DEFAULT_SOURCE};
use super::validation::validate_namespace;
use crate::composer::{BODY_TEMPLATE, LayoutFragments, SUBJECT_TEMPLATE, TemplateComposer};
use crate::error::ConfigError;
use crate::resolver::AddressResolver;
use crate::schema::{Dialect, TableNames};
use crate::template::{DEFAULT_SUBJECT_TEMPLATE, TemplateEngine};
use std::path::Path;
use std::sync::Arc;
use tracing::Level;

/// Runtime configuration: everything the writer and the layer need.
#[derive(Debug)]
pub struct RuntimeConfig {
    pub connection: ConnectionSettings,
    pub composer: TemplateComposer,
    pub source: String,
    pub priority: i32,
    pub trigger: CompiledTrigger,
}

/// Resolved connection source settings.
#[derive(Debug, Clone)]
pub struct ConnectionSettings {
    /// URL with environment variables substituted.
    pub url: SecretString,
    pub max_connections: u32,
    pub dialect: Dialect,
    pub tables: TableNames,
}

/// Event selection with a parsed level.
#[derive(Debug, Clone)]
pub struct CompiledTrigger {
    pub level: Level,
    pub exclude_targets: Vec<String>,
}

impl CompiledTrigger {
    /// Whether an event at `level` from `target` should produce mail.
    pub fn matches(&self, level: &Level, target: &str) -> bool {
        // Levels compare by verbosity: ERROR is the smallest.
        *level <= self.level
            && !self
                .exclude_targets
                .iter()
                .any(|prefix| target.starts_with(prefix.as_str()))
    }
}

impl Default for CompiledTrigger {
    fn default() -> Self {
        Self {
            level: Level::ERROR,
            exclude_targets: vec!["mailsender".to_string(), "sqlx".to_string()],
        }
    }
}

impl Config {
    /// Compile configuration into runtime-ready form.
    ///
    /// Applies the defaults (source `UNKNOWN_SOURCE`, priority 10, which
    /// also replaces a configured 0) and compiles every template. The table
    /// namespace is checked here as well.
    /// `config_dir` anchors a relative `layout.pattern_file`.
    ///
    /// # Errors
    /// Returns the first [`ConfigError`] found; call [`Config::validate`]
    /// first to report all problems at once.
    pub fn compile(self, config_dir: &Path) -> Result<RuntimeConfig, ConfigError> {
        let connection = self.connection.ok_or(ConfigError::MissingConnection)?;
        let from = self
            .from
            .filter(|from| !from.trim().is_empty())
            .ok_or(ConfigError::MissingSender)?;
        let layout = self
            .layout
            .ok_or_else(|| ConfigError::ValidationError("layout is not configured".to_string()))?;

        let url = resolve_env_vars(connection.url.expose())?;
        let dialect = Dialect::from_url(&url).ok_or_else(|| {
            ConfigError::ValidationError(
                "connection.url must use a postgres:// or sqlite: scheme".to_string(),
            )
        })?;
        let namespace = connection.namespace(dialect);
        if let Some(schema) = namespace {
            validate_namespace(Some(dialect), schema).map_err(ConfigError::ValidationError)?;
        }
        let tables = TableNames::new(namespace);

        let mut engine = TemplateEngine::new();
        engine.add(
            SUBJECT_TEMPLATE,
            self.subject.as_deref().unwrap_or(DEFAULT_SUBJECT_TEMPLATE),
        )?;
        engine.add(BODY_TEMPLATE, &resolve_layout_pattern(&layout, config_dir)?)?;

        if self.to.is_empty() {
            return Err(ConfigError::ValidationError(
                "at least one recipient template (to) is required".to_string(),
            ));
        }
        let mut recipient_templates = Vec::with_capacity(self.to.len());
        for (index, to) in self.to.iter().enumerate() {
            let to = to.trim();
            if to.is_empty() {
                return Err(ConfigError::BlankRecipient { index });
            }
            let name = format!("to.{}", index);
            engine.add(&name, to)?;
            recipient_templates.push(name);
        }

        let level = self.trigger.level.parse::<Level>().map_err(|_| {
            ConfigError::ValidationError(format!(
                "trigger.level '{}' is not a valid level",
                self.trigger.level
            ))
        })?;

        let engine = Arc::new(engine);
        let resolver = AddressResolver::new(engine.clone(), recipient_templates);
        let fragments = LayoutFragments {
            file_header: layout.file_header,
            presentation_header: layout.presentation_header,
            presentation_footer: layout.presentation_footer,
            file_footer: layout.file_footer,
        };

        Ok(RuntimeConfig {
            connection: ConnectionSettings {
                url: SecretString::new(url),
                max_connections: connection.max_connections,
                dialect,
                tables,
            },
            composer: TemplateComposer::new(from, engine, fragments, resolver),
            source: self.source.unwrap_or_else(|| DEFAULT_SOURCE.to_string()),
            priority: effective_priority(self.priority),
            trigger: CompiledTrigger {
                level,
                exclude_targets: self.trigger.exclude_targets,
            },
        })
    }
}

/// Priority actually stored: 0 means "not configured".
pub(crate) fn effective_priority(priority: i32) -> i32 {
    if priority == 0 {
        DEFAULT_PRIORITY
    } else {
        priority
    }
}
