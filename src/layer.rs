//! `tracing-subscriber` layer that turns selected events into mail requests.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tracing_subscriber::prelude::*;
//! use mailsender::{Config, MailRecordWriter, MailsenderLayer};
//!
//! let runtime = Config::load(path)?.compile(config_dir)?;
//! let trigger = runtime.trigger.clone();
//! let writer = Arc::new(MailRecordWriter::connect(runtime)?);
//! tracing_subscriber::registry()
//!     .with(tracing_subscriber::fmt::layer())
//!     .with(MailsenderLayer::new(writer, trigger)?)
//!     .init();
//! ```

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tracing::Subscriber;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::composer::{MailComposer, TemplateComposer};
use crate::config::CompiledTrigger;
use crate::error::ConfigError;
use crate::event::LogEvent;
use crate::writer::MailRecordWriter;

/// Default bound on appends running at the same time.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 1024;

/// Layer recording every matching event through a [`MailRecordWriter`].
///
/// Appends run as tasks on the Tokio runtime that was current when the layer
/// was built; `on_event` itself never blocks on the database.
///
/// At most [`DEFAULT_MAX_IN_FLIGHT`] appends (see
/// [`MailsenderLayer::with_max_in_flight`]) run at once. While the database
/// stalls and that many are pending, further matching events are dropped and
/// counted in `mailsender_events_dropped_total`.
pub struct MailsenderLayer<C: MailComposer<Event = LogEvent> = TemplateComposer> {
    writer: Arc<MailRecordWriter<C>>,
    trigger: CompiledTrigger,
    handle: Handle,
    in_flight: Arc<Semaphore>,
}

impl<C: MailComposer<Event = LogEvent>> MailsenderLayer<C> {
    /// Build a layer on the current Tokio runtime.
    ///
    /// # Errors
    /// Returns [`ConfigError::NoRuntime`] when called outside a runtime.
    pub fn new(
        writer: Arc<MailRecordWriter<C>>,
        trigger: CompiledTrigger,
    ) -> Result<Self, ConfigError> {
        let handle = Handle::try_current().map_err(|_| ConfigError::NoRuntime)?;
        Ok(Self::with_handle(writer, trigger, handle))
    }

    /// Build a layer spawning appends on `handle`.
    pub fn with_handle(
        writer: Arc<MailRecordWriter<C>>,
        trigger: CompiledTrigger,
        handle: Handle,
    ) -> Self {
        Self {
            writer,
            trigger,
            handle,
            in_flight: Arc::new(Semaphore::new(DEFAULT_MAX_IN_FLIGHT)),
        }
    }

    /// Bound the number of appends running at the same time.
    pub fn with_max_in_flight(mut self, max: usize) -> Self {
        self.in_flight = Arc::new(Semaphore::new(max));
        self
    }
}

impl<S, C> Layer<S> for MailsenderLayer<C>
where
    S: Subscriber,
    C: MailComposer<Event = LogEvent>,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        if !self.trigger.matches(meta.level(), meta.target()) {
            return;
        }

        let Ok(permit) = Arc::clone(&self.in_flight).try_acquire_owned() else {
            metrics::counter!("mailsender_events_dropped_total").increment(1);
            return;
        };

        let event = LogEvent::from_tracing(event);
        let writer = Arc::clone(&self.writer);
        self.handle.spawn(async move {
            writer.append(&event).await;
            drop(permit);
        });
    }
}

impl<C: MailComposer<Event = LogEvent>> std::fmt::Debug for MailsenderLayer<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailsenderLayer")
            .field("writer", &self.writer)
            .field("level", &format_args!("{}", self.trigger.level))
            .field("exclude_targets", &self.trigger.exclude_targets)
            .field("available_permits", &self.in_flight.available_permits())
            .finish()
    }
}
