//! Mail composition: sender, subject, body and recipients for one event.

use std::sync::Arc;

use lettre::message::Mailbox;

use crate::event::LogEvent;
use crate::resolver::AddressResolver;
use crate::template::TemplateEngine;

/// Stored when the subject template yields nothing.
pub const DEFAULT_SUBJECT: &str = "Тема не указана";

/// Name of the subject template inside the engine.
pub(crate) const SUBJECT_TEMPLATE: &str = "subject";

/// Name of the body content template inside the engine.
pub(crate) const BODY_TEMPLATE: &str = "layout.pattern";

/// The four operations the writer needs from a composer.
///
/// The writer only sees this trait, so it works with any event type a
/// composer understands. [`TemplateComposer`] is the implementation used for
/// [`LogEvent`]s.
pub trait MailComposer: Send + Sync + 'static {
    /// Event type the composer renders.
    type Event: Send + Sync + 'static;

    /// Sender address, stored verbatim.
    fn sender(&self) -> &str;

    /// Single-line subject.
    fn build_subject(&self, event: &Self::Event) -> String;

    /// Full body text.
    fn build_body(&self, event: &Self::Event) -> String;

    /// Recipients, in configured order.
    fn parse_address(&self, event: &Self::Event) -> Vec<Mailbox>;
}

/// Static fragments wrapped around the rendered body content.
///
/// Every fragment is optional and contributes nothing when absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutFragments {
    pub file_header: Option<String>,
    pub presentation_header: Option<String>,
    pub presentation_footer: Option<String>,
    pub file_footer: Option<String>,
}

/// Template-backed composer for [`LogEvent`]s.
#[derive(Debug, Clone)]
pub struct TemplateComposer {
    from: String,
    engine: Arc<TemplateEngine>,
    fragments: LayoutFragments,
    resolver: AddressResolver,
}

impl TemplateComposer {
    /// Build a composer.
    ///
    /// `engine` must hold the `subject` and `layout.pattern` templates plus the
    /// recipient templates named by `resolver`.
    pub fn new(
        from: String,
        engine: Arc<TemplateEngine>,
        fragments: LayoutFragments,
        resolver: AddressResolver,
    ) -> Self {
        Self {
            from,
            engine,
            fragments,
            resolver,
        }
    }
}

/// Cut `subject` at its first newline.
pub(crate) fn first_line(mut subject: String) -> String {
    if let Some(pos) = subject.find('\n') {
        subject.truncate(pos);
    }
    subject
}

impl MailComposer for TemplateComposer {
    type Event = LogEvent;

    fn sender(&self) -> &str {
        &self.from
    }

    fn build_subject(&self, event: &LogEvent) -> String {
        let subject = self
            .engine
            .render(SUBJECT_TEMPLATE, event)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SUBJECT.to_string());
        first_line(subject)
    }

    fn build_body(&self, event: &LogEvent) -> String {
        let content = self.engine.render(BODY_TEMPLATE, event).unwrap_or_default();
        let fragments = &self.fragments;

        let mut body = String::with_capacity(content.len());
        for part in [
            fragments.file_header.as_deref(),
            fragments.presentation_header.as_deref(),
            Some(content.as_str()),
            fragments.presentation_footer.as_deref(),
            fragments.file_footer.as_deref(),
        ]
        .into_iter()
        .flatten()
        {
            body.push_str(part);
        }
        body
    }

    fn parse_address(&self, event: &LogEvent) -> Vec<Mailbox> {
        self.resolver.resolve(event)
    }
}
