//! Mailsender - record log events as outgoing mail in a database queue.
//!
//! Each matching event becomes one `body` row and one `head` row per
//! recipient, written in a single transaction. A separate delivery daemon
//! reads the queue and sends the mail.

pub mod cli;
pub mod composer;
pub mod config;
pub mod error;
pub mod event;
pub mod layer;
pub mod metrics;
pub mod resolver;
pub mod schema;
pub mod template;
pub mod writer;

// Re-export commonly used types
pub use cli::LogFormat;
pub use composer::{LayoutFragments, MailComposer, TemplateComposer};
pub use config::{Config, RuntimeConfig};
pub use error::{AppendError, ConfigError};
pub use event::LogEvent;
pub use layer::MailsenderLayer;
pub use metrics::{initialize_metrics, register_metric_descriptions};
pub use resolver::AddressResolver;
pub use schema::{Dialect, TableNames, create_tables};
pub use template::TemplateEngine;
pub use writer::{MailRecord, MailRecordWriter, connect_pool};
