//! Recipient resolution for one log event.
//!
//! Each configured recipient template is rendered in order and parsed as an
//! RFC 5322 mailbox list, so a single template may yield several addresses.
//! Parsing stops at the first template that does not parse: the addresses
//! gathered before it are returned and later templates are not evaluated.

use std::sync::Arc;

use lettre::message::{Mailbox, Mailboxes};

use crate::event::LogEvent;
use crate::template::TemplateEngine;

/// Resolves the ordered recipient templates into mailboxes.
#[derive(Debug, Clone)]
pub struct AddressResolver {
    engine: Arc<TemplateEngine>,
    /// Names of the recipient templates inside `engine`, in configured order.
    templates: Vec<String>,
}

impl AddressResolver {
    /// Create a resolver over templates already registered in `engine`.
    pub fn new(engine: Arc<TemplateEngine>, templates: Vec<String>) -> Self {
        Self { engine, templates }
    }

    /// Resolve the recipients of `event`.
    ///
    /// Templates rendering to nothing (or only whitespace) are skipped. On the
    /// first parse failure the error is logged and the addresses resolved so
    /// far are returned.
    pub fn resolve(&self, event: &LogEvent) -> Vec<Mailbox> {
        let mut addresses = Vec::new();

        for name in &self.templates {
            let rendered = match self.engine.render(name, event) {
                Some(text) if !text.trim().is_empty() => text,
                _ => continue,
            };

            match rendered.trim().parse::<Mailboxes>() {
                Ok(parsed) => addresses.extend(parsed),
                Err(e) => {
                    tracing::error!(
                        template = %name,
                        rendered = %rendered,
                        error = %e,
                        "Failed to parse recipient address"
                    );
                    metrics::counter!("mailsender_address_parse_errors_total").increment(1);
                    return addresses;
                }
            }
        }

        addresses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    fn resolver(sources: &[&str]) -> AddressResolver {
        let mut engine = TemplateEngine::new();
        let mut names = Vec::new();
        for (i, source) in sources.iter().enumerate() {
            let name = format!("to.{}", i);
            engine.add(&name, source).unwrap();
            names.push(name);
        }
        AddressResolver::new(Arc::new(engine), names)
    }

    fn event() -> LogEvent {
        LogEvent::new(Level::ERROR, "app", "disk full")
            .with_field("owner", "owner@example.com")
            .with_field("empty", "")
    }

    fn rendered(addresses: &[Mailbox]) -> Vec<String> {
        addresses.iter().map(|m| m.to_string()).collect()
    }

    #[test]
    fn resolves_single_static_address() {
        let addresses = resolver(&["ops@example.com"]).resolve(&event());
        assert_eq!(rendered(&addresses), vec!["ops@example.com"]);
    }

    #[test]
    fn comma_separated_template_yields_addresses_in_order() {
        let addresses = resolver(&["a@example.com, b@example.com"]).resolve(&event());
        assert_eq!(rendered(&addresses), vec!["a@example.com", "b@example.com"]);
    }

    #[test]
    fn preserves_template_order_across_templates() {
        let addresses =
            resolver(&["{{ fields.owner }}", "a@example.com, b@example.com"]).resolve(&event());
        assert_eq!(
            rendered(&addresses),
            vec!["owner@example.com", "a@example.com", "b@example.com"]
        );
    }

    #[test]
    fn keeps_display_name() {
        let addresses = resolver(&["Ops Team <ops@example.com>"]).resolve(&event());
        assert_eq!(addresses.len(), 1);
        assert_eq!(addresses[0].email.to_string(), "ops@example.com");
        assert_eq!(addresses[0].name.as_deref(), Some("Ops Team"));
    }

    #[test]
    fn skips_templates_rendering_empty() {
        let addresses = resolver(&[
            "{{ fields.missing }}",
            "{{ fields.empty }}",
            "   ",
            "ops@example.com",
        ])
        .resolve(&event());
        assert_eq!(rendered(&addresses), vec!["ops@example.com"]);
    }

    #[test]
    fn all_templates_empty_yields_no_addresses() {
        let addresses = resolver(&["{{ fields.missing }}", ""]).resolve(&event());
        assert!(addresses.is_empty());
    }

    // Deliberate quirk: a parse failure stops resolution, so templates after
    // the bad one are never evaluated even if they are valid.
    #[test]
    fn parse_failure_stops_at_first_bad_template() {
        let addresses = resolver(&[
            "first@example.com",
            "not-an-address",
            "never@example.com",
        ])
        .resolve(&event());
        assert_eq!(rendered(&addresses), vec!["first@example.com"]);
    }

    #[test]
    fn parse_failure_on_first_template_yields_nothing() {
        let addresses = resolver(&["not-an-address", "ops@example.com"]).resolve(&event());
        assert!(addresses.is_empty());
    }

    #[test]
    fn failed_render_is_skipped_like_empty() {
        let addresses =
            resolver(&["{{ fields.owner | no_such_filter }}", "ops@example.com"]).resolve(&event());
        assert_eq!(rendered(&addresses), vec!["ops@example.com"]);
    }
}
