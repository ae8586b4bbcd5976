//! Template and identifier validation utilities.

use crate::event::LogEvent;
use crate::schema::Dialect;
use crate::template::environment;
use regex::Regex;
use std::sync::LazyLock;

/// Validates Jinja template syntax.
pub(crate) fn validate_jinja_template(source: &str) -> Result<(), String> {
    let mut env = environment();
    env.add_template("_validate", source)
        .map_err(|e| e.to_string())?;
    Ok(())
}

/// Validates a Jinja template by rendering it against a sample event.
/// Detects runtime errors like unknown filters.
///
/// # Errors
/// Returns an error string if the template syntax is invalid or uses unknown filters.
pub fn validate_template_render(source: &str) -> Result<(), String> {
    let mut env = environment();
    env.add_template("_render_test", source)
        .map_err(|e| e.to_string())?;

    let sample = LogEvent::new(
        tracing::Level::ERROR,
        "mailsender::config",
        "configuration check",
    );
    let tmpl = env
        .get_template("_render_test")
        .map_err(|e| e.to_string())?;
    tmpl.render(&sample).map_err(|e| e.to_string())?;

    Ok(())
}

/// Validates a plain SQL identifier (used for the table namespace).
pub(crate) fn validate_identifier(name: &str) -> Result<(), String> {
    static IDENTIFIER_REGEX: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

    if IDENTIFIER_REGEX.is_match(name) {
        Ok(())
    } else {
        Err(format!(
            "invalid identifier '{}': use letters, digits and underscores",
            name
        ))
    }
}

/// Validates the table namespace for a connection of `dialect`.
///
/// SQLite has no schemas, only attached databases, so a namespace there
/// would point every statement at a database that does not exist.
pub(crate) fn validate_namespace(dialect: Option<Dialect>, schema: &str) -> Result<(), String> {
    validate_identifier(schema).map_err(|e| format!("connection.schema: {}", e))?;
    if dialect == Some(Dialect::Sqlite) {
        return Err(format!(
            "connection.schema '{}' is not supported with SQLite; remove it or set it to null",
            schema
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_identifier_valid() {
        assert!(validate_identifier("mailsender").is_ok());
        assert!(validate_identifier("mail_queue2").is_ok());
        assert!(validate_identifier("_private").is_ok());
    }

    #[test]
    fn validate_identifier_invalid() {
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("2fast").is_err());
        assert!(validate_identifier("mail sender").is_err());
        assert!(validate_identifier("mail;drop table body").is_err());
        assert!(validate_identifier("a.b").is_err());
    }

    #[test]
    fn validate_namespace_accepts_identifier_on_postgres() {
        assert!(validate_namespace(Some(Dialect::Postgres), "mailsender").is_ok());
        assert!(validate_namespace(None, "mailsender").is_ok());
    }

    #[test]
    fn validate_namespace_rejects_any_namespace_on_sqlite() {
        let err = validate_namespace(Some(Dialect::Sqlite), "mailsender").unwrap_err();
        assert!(err.contains("SQLite"));
    }

    #[test]
    fn validate_namespace_rejects_sql_fragments() {
        let err = validate_namespace(Some(Dialect::Postgres), "x; DROP TABLE body; --").unwrap_err();
        assert!(err.starts_with("connection.schema:"));
    }

    #[test]
    fn validate_template_render_detects_unknown_filter() {
        let result = validate_template_render("{{ message | truncate(50) }}");
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("truncate"));
    }

    #[test]
    fn validate_template_render_allows_abbreviate_filter() {
        assert!(validate_template_render("{{ logger | abbreviate(20) }} - {{ message }}").is_ok());
    }

    #[test]
    fn validate_template_render_allows_missing_variables() {
        assert!(validate_template_render("Hello {{ fields.undefined_var }}!").is_ok());
    }

    #[test]
    fn validate_jinja_template_detects_syntax_errors() {
        assert!(validate_jinja_template("{% if unclosed").is_err());
    }

    #[test]
    fn validate_jinja_template_accepts_valid_syntax() {
        assert!(validate_jinja_template("{{ message }} - {% if level %}yes{% endif %}").is_ok());
    }
}
