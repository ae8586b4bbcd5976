//! Environment variable substitution and layout pattern resolution.

use super::types::LayoutConfig;
use crate::error::ConfigError;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

/// Maximum size for layout.pattern_file (1MB).
const MAX_PATTERN_FILE_SIZE: u64 = 1024 * 1024;

static ENV_VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("valid regex"));

/// Resolves `${VAR_NAME}` patterns in a string.
pub fn resolve_env_vars(value: &str) -> Result<String, ConfigError> {
    let mut missing = Vec::new();

    let resolved = ENV_VAR_REGEX.replace_all(value, |cap: &regex::Captures<'_>| {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(var_value) => var_value,
            Err(_) => {
                missing.push(var_name.to_string());
                String::new()
            }
        }
    });

    if missing.is_empty() {
        Ok(resolved.into_owned())
    } else {
        Err(ConfigError::ValidationError(format!(
            "undefined environment variable{}: {}",
            if missing.len() > 1 { "s" } else { "" },
            missing.join(", ")
        )))
    }
}

/// Resolves the body content template.
/// Priority: pattern_file > pattern.
pub fn resolve_layout_pattern(
    layout: &LayoutConfig,
    config_dir: &Path,
) -> Result<String, ConfigError> {
    if layout.pattern.is_some() && layout.pattern_file.is_some() {
        tracing::warn!("both layout.pattern and layout.pattern_file defined, using pattern_file");
    }

    if let Some(ref file_path) = layout.pattern_file {
        let path = if Path::new(file_path).is_absolute() {
            std::path::PathBuf::from(file_path)
        } else {
            config_dir.join(file_path)
        };

        let metadata = std::fs::metadata(&path).map_err(|e| {
            ConfigError::ValidationError(format!(
                "cannot read layout.pattern_file '{}': {}",
                path.display(),
                e
            ))
        })?;

        if metadata.len() > MAX_PATTERN_FILE_SIZE {
            return Err(ConfigError::ValidationError(format!(
                "layout.pattern_file '{}' exceeds maximum size of 1MB ({} bytes)",
                path.display(),
                metadata.len()
            )));
        }

        let content = std::fs::read_to_string(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::InvalidData {
                ConfigError::ValidationError(format!(
                    "layout.pattern_file '{}' must be valid UTF-8",
                    path.display()
                ))
            } else {
                ConfigError::ValidationError(format!(
                    "cannot read layout.pattern_file '{}': {}",
                    path.display(),
                    e
                ))
            }
        })?;

        tracing::debug!(path = %path.display(), "layout pattern source: file");
        return Ok(content);
    }

    match &layout.pattern {
        Some(pattern) => {
            tracing::debug!("layout pattern source: inline");
            Ok(pattern.clone())
        }
        None => Err(ConfigError::ValidationError(
            "layout requires pattern or pattern_file".to_string(),
        )),
    }
}
