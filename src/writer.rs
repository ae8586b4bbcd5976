//! Transactional write of one mail request.
//!
//! # Protocol
//!
//! For every event, inside one transaction on one pooled connection:
//!
//! ```text
//! begin -> insert body RETURNING id (under the writer lock)
//!       -> resolve recipients (abort when empty)
//!       -> insert one head row per recipient
//!       -> commit
//! ```
//!
//! Any failure drops the open transaction, which rolls it back, so an event
//! either produces one body row with all of its head rows or nothing.
//!
//! # Concurrency
//!
//! The writer is shared between tasks. Each call acquires its own connection.
//! A per-writer mutex is held only while the body row is inserted and its
//! identifier read back; header inserts and the commit run without it.

use sqlx::AnyPool;
use sqlx::any::AnyPoolOptions;
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::composer::{MailComposer, TemplateComposer};
use crate::config::{ConnectionSettings, DEFAULT_SOURCE, RuntimeConfig, effective_priority};
use crate::error::AppendError;
use crate::schema::{self, TableNames};

/// Outcome of a committed append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MailRecord {
    /// Generated `body.id`.
    pub body_id: i64,
    /// Number of `head` rows written.
    pub recipients: usize,
}

/// Writes mail requests into the `body` and `head` tables.
pub struct MailRecordWriter<C: MailComposer = TemplateComposer> {
    pool: AnyPool,
    composer: C,
    tables: TableNames,
    source: String,
    priority: i32,
    id_lock: Mutex<()>,
}

impl<C: MailComposer> MailRecordWriter<C> {
    /// Create a writer over an existing pool.
    ///
    /// An empty `source` is stored as `UNKNOWN_SOURCE` and a `priority` of 0
    /// as 10, the same defaults [`Config::compile`](crate::config::Config::compile)
    /// applies.
    pub fn new(
        pool: AnyPool,
        composer: C,
        tables: TableNames,
        source: impl Into<String>,
        priority: i32,
    ) -> Self {
        let source = source.into();
        Self {
            pool,
            composer,
            tables,
            source: if source.is_empty() {
                DEFAULT_SOURCE.to_string()
            } else {
                source
            },
            priority: effective_priority(priority),
            id_lock: Mutex::new(()),
        }
    }

    /// The connection source.
    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Record `event`, reporting failures instead of returning them.
    ///
    /// Never fails: a failed event is logged and counted, then dropped.
    pub async fn append(&self, event: &C::Event) {
        match self.try_append(event).await {
            Ok(record) => {
                metrics::counter!("mailsender_mails_recorded_total").increment(1);
                metrics::counter!("mailsender_recipients_recorded_total")
                    .increment(record.recipients as u64);
            }
            Err(e) => {
                error!(error = %e, error_type = e.kind(), "Failed to record event as mail");
                metrics::counter!(
                    "mailsender_append_errors_total",
                    "error_type" => e.kind()
                )
                .increment(1);
            }
        }
    }

    /// Record `event` and return what was committed.
    ///
    /// # Errors
    /// - [`AppendError::Database`] when acquiring, inserting or committing fails.
    /// - [`AppendError::EmptyRecipients`] when no recipient resolves.
    /// - [`AppendError::MissingBodyId`] when the body insert returns no row.
    ///
    /// Nothing is persisted in any error case.
    pub async fn try_append(&self, event: &C::Event) -> Result<MailRecord, AppendError> {
        let mut tx = self.pool.begin().await?;

        let subject = self.composer.build_subject(event);
        let body = self.composer.build_body(event);

        let body_id = {
            let _guard = self.id_lock.lock().await;
            sqlx::query_scalar::<_, i64>(&self.tables.insert_body_sql())
                .bind(self.composer.sender())
                .bind(subject)
                .bind(body)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(AppendError::MissingBodyId)?
        };

        let recipients = self.composer.parse_address(event);
        if recipients.is_empty() {
            return Err(AppendError::EmptyRecipients);
        }

        let insert_head = self.tables.insert_head_sql();
        for recipient in &recipients {
            sqlx::query(&insert_head)
                .bind(body_id)
                .bind(recipient.to_string())
                .bind(self.source.as_str())
                .bind(self.priority)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        debug!(body_id, recipients = recipients.len(), "Mail recorded");
        Ok(MailRecord {
            body_id,
            recipients: recipients.len(),
        })
    }

    /// Create the `body` and `head` tables if missing.
    pub async fn create_tables(&self, dialect: schema::Dialect) -> Result<(), sqlx::Error> {
        schema::create_tables(&self.pool, dialect, &self.tables).await
    }
}

impl MailRecordWriter<TemplateComposer> {
    /// Build a writer from compiled configuration and an existing pool.
    pub fn from_runtime(runtime: RuntimeConfig, pool: AnyPool) -> Self {
        Self::new(
            pool,
            runtime.composer,
            runtime.connection.tables,
            runtime.source,
            runtime.priority,
        )
    }

    /// Build a writer from compiled configuration, creating its own pool.
    ///
    /// The pool connects lazily: no connection is opened until the first
    /// event, so an unreachable database does not prevent startup.
    ///
    /// # Errors
    /// Returns the driver error if the URL cannot be parsed.
    pub fn connect(runtime: RuntimeConfig) -> Result<Self, sqlx::Error> {
        let pool = connect_pool(&runtime.connection)?;
        Ok(Self::from_runtime(runtime, pool))
    }
}

impl<C: MailComposer> std::fmt::Debug for MailRecordWriter<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MailRecordWriter")
            .field("tables", &self.tables)
            .field("source", &self.source)
            .field("priority", &self.priority)
            .finish()
    }
}

/// Build a lazily connecting pool for `settings`.
///
/// # Errors
/// Returns the driver error if the URL cannot be parsed.
pub fn connect_pool(settings: &ConnectionSettings) -> Result<AnyPool, sqlx::Error> {
    sqlx::any::install_default_drivers();
    AnyPoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_lazy(settings.url.expose())
}
