//! Mailsender operator binary: validate configuration, create the queue tables.

use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use mailsender::cli::{Cli, LogFormat};
use mailsender::config::Config;
use mailsender::{Dialect, MailRecordWriter};

/// Initialize the tracing subscriber with the specified log format.
fn init_logging(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());

    match format {
        LogFormat::Text => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .with_env_filter(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(true)
                .with_span_list(false)
                .flatten_event(true)
                .with_env_filter(filter)
                .init();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.log_format);

    info!(config_path = %cli.config.display(), "Loading configuration");

    let config = match Config::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, path = %cli.config.display(), "Failed to load configuration");
            std::process::exit(1);
        }
    };

    info!("Validating configuration");
    if let Err(errors) = config.validate() {
        for e in &errors {
            error!(error = %e, "Configuration validation error");
        }
        error!(
            error_count = errors.len(),
            "Configuration validation failed"
        );
        std::process::exit(1);
    }

    if !cli.init_schema {
        print_summary(&cli.config, &config);
        return Ok(());
    }

    let config_dir = cli.config.parent().unwrap_or_else(|| Path::new("."));
    let runtime_config = config.compile(config_dir)?;
    let dialect = runtime_config.connection.dialect;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let writer = MailRecordWriter::connect(runtime_config)
            .context("Failed to configure connection pool")?;
        writer
            .create_tables(dialect)
            .await
            .context("Failed to create mail queue tables")?;
        writer.pool().close().await;
        Ok(())
    })
}

/// Print what a valid configuration will do.
fn print_summary(path: &Path, config: &Config) {
    println!("Configuration is valid: {}", path.display());
    if let Some(connection) = &config.connection {
        let namespace = mailsender::config::resolve_env_vars(connection.url.expose())
            .ok()
            .and_then(|url| Dialect::from_url(&url))
            .and_then(|dialect| connection.namespace(dialect));
        println!("  Schema: {}", namespace.unwrap_or("(unqualified)"));
        println!("  Max connections: {}", connection.max_connections);
    }
    println!("  Sender: {}", config.from.as_deref().unwrap_or_default());
    println!("  Recipient templates: {}", config.to.len());
    println!(
        "  Source: {}",
        config
            .source
            .as_deref()
            .unwrap_or(mailsender::config::DEFAULT_SOURCE)
    );
    println!("  Trigger level: {}", config.trigger.level);
}
