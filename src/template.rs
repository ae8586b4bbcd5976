//! Template renderer for subjects, recipients and bodies.
//!
//! Templates use Jinja2 syntax powered by minijinja and are rendered against
//! a [`LogEvent`]. They are compiled once, when the configuration is
//! compiled, and looked up by name afterwards.
//!
//! # Example
//!
//! ```ignore
//! use mailsender::template::TemplateEngine;
//!
//! let mut engine = TemplateEngine::new();
//! engine.add("subject", "{{ logger | abbreviate(20) }} - {{ message }}")?;
//! let subject = engine.render("subject", &event);
//! ```

use crate::error::ConfigError;
use crate::event::LogEvent;
use minijinja::{Environment, UndefinedBehavior};

/// Default subject pattern: abbreviated logger name and the message.
pub const DEFAULT_SUBJECT_TEMPLATE: &str = "{{ logger | abbreviate(20) }} - {{ message }}";

/// Target width used by `abbreviate` when called without an argument.
const DEFAULT_ABBREVIATE_WIDTH: usize = 20;

/// Build an environment with the settings and filters every template sees.
///
/// Missing fields render as empty strings instead of failing, and a trailing
/// newline in a template is kept (layouts usually end lines explicitly).
pub(crate) fn environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    env.set_undefined_behavior(UndefinedBehavior::Lenient);
    env.set_keep_trailing_newline(true);
    env.add_filter("abbreviate", |value: String, width: Option<usize>| {
        abbreviate(&value, width.unwrap_or(DEFAULT_ABBREVIATE_WIDTH))
    });
    env
}

/// Shorten a `::`-separated logger path to at most `max_len` characters.
///
/// Leading segments are reduced to their first character, left to right,
/// until the result fits. The last segment is always kept whole, so the
/// result may still exceed `max_len`.
pub fn abbreviate(logger: &str, max_len: usize) -> String {
    let mut len = logger.chars().count();
    if len <= max_len {
        return logger.to_string();
    }

    let mut segments: Vec<String> = logger.split("::").map(String::from).collect();
    let last = segments.len() - 1;
    for segment in segments.iter_mut().take(last) {
        if len <= max_len {
            break;
        }
        if let Some(first) = segment.chars().next() {
            len -= segment.chars().count() - 1;
            *segment = first.to_string();
        }
    }
    segments.join("::")
}

/// Compiled templates sharing one minijinja environment.
///
/// # Thread Safety
///
/// Rendering only needs `&self`, so one engine can be shared behind an `Arc`
/// by every task that appends.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create an engine with no templates.
    pub fn new() -> Self {
        Self { env: environment() }
    }

    /// Compile and register a template under `name`.
    ///
    /// # Errors
    /// Returns [`ConfigError::InvalidTemplate`] if the source does not parse.
    pub fn add(&mut self, name: &str, source: &str) -> Result<(), ConfigError> {
        self.env
            .add_template_owned(name.to_string(), source.to_string())
            .map_err(|e| ConfigError::InvalidTemplate {
                name: name.to_string(),
                message: e.to_string(),
            })
    }

    /// Render the template `name` against `event`.
    ///
    /// Returns `None` when the template is unknown or rendering fails; the
    /// failure is logged at warn level.
    pub fn render(&self, name: &str, event: &LogEvent) -> Option<String> {
        tracing::trace!(template = %name, "Starting template render");

        let rendered = self
            .env
            .get_template(name)
            .and_then(|template| template.render(event));

        match rendered {
            Ok(text) => Some(text),
            Err(e) => {
                tracing::warn!(template = %name, error = %e, "Template render failed");
                None
            }
        }
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TemplateEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.env.templates().map(|(name, _)| name).collect();
        f.debug_struct("TemplateEngine")
            .field("templates", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    fn event() -> LogEvent {
        LogEvent::new(Level::ERROR, "app::billing::invoices", "disk full")
            .with_field("owner", "ops@example.com")
    }

    fn engine_with(name: &str, source: &str) -> TemplateEngine {
        let mut engine = TemplateEngine::new();
        engine.add(name, source).unwrap();
        engine
    }

    #[test]
    fn render_simple_template_with_event_fields() {
        let engine = engine_with("t", "{{ level }} {{ logger }}: {{ message }} ({{ fields.owner }})");
        assert_eq!(
            engine.render("t", &event()).as_deref(),
            Some("ERROR app::billing::invoices: disk full (ops@example.com)")
        );
    }

    #[test]
    fn render_missing_field_is_empty_not_error() {
        let engine = engine_with("t", "to: {{ fields.nobody }}");
        assert_eq!(engine.render("t", &event()).as_deref(), Some("to: "));
    }

    #[test]
    fn render_unknown_template_returns_none() {
        let engine = TemplateEngine::new();
        assert!(engine.render("missing", &event()).is_none());
    }

    #[test]
    fn render_failure_returns_none() {
        let engine = engine_with("bad", "{{ message | no_such_filter }}");
        assert!(engine.render("bad", &event()).is_none());
    }

    #[test]
    fn add_rejects_invalid_syntax() {
        let mut engine = TemplateEngine::new();
        let err = engine.add("subject", "{% if unclosed").unwrap_err();
        match err {
            ConfigError::InvalidTemplate { name, .. } => assert_eq!(name, "subject"),
            other => panic!("Expected InvalidTemplate, got {:?}", other),
        }
        assert!(engine.render("subject", &event()).is_none());
    }

    #[test]
    fn default_subject_template_abbreviates_logger() {
        let engine = engine_with("subject", DEFAULT_SUBJECT_TEMPLATE);
        assert_eq!(
            engine.render("subject", &event()).as_deref(),
            Some("a::billing::invoices - disk full")
        );
    }

    #[test]
    fn abbreviate_keeps_short_names() {
        assert_eq!(abbreviate("app", 20), "app");
        assert_eq!(abbreviate("app::db", 20), "app::db");
    }

    #[test]
    fn abbreviate_shortens_leading_segments_until_it_fits() {
        // 31 chars; shortening "mailsender" gives 22, then "writer" gives 17.
        assert_eq!(
            abbreviate("mailsender::writer::transaction", 20),
            "m::w::transaction"
        );
        // Only the first segment needs shortening here.
        assert_eq!(abbreviate("mailsender::db::pool", 15), "m::db::pool");
    }

    #[test]
    fn abbreviate_never_shortens_last_segment() {
        assert_eq!(
            abbreviate("a::very_long_final_segment_name", 10),
            "a::very_long_final_segment_name"
        );
    }

    #[test]
    fn abbreviate_filter_default_width() {
        let engine = engine_with("t", "{{ logger | abbreviate }}");
        assert_eq!(engine.render("t", &event()).as_deref(), Some("a::billing::invoices"));
    }

    #[test]
    fn debug_lists_template_names() {
        let engine = engine_with("subject", "x");
        let debug = format!("{:?}", engine);
        assert!(debug.contains("TemplateEngine"));
        assert!(debug.contains("subject"));
    }
}
