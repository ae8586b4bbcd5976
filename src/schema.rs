//! Table naming and DDL for the mail queue.
//!
//! Two tables live in a dedicated namespace:
//!
//! ```text
//! body(id PK generated, sender, subject, body)
//! head(id_body FK -> body.id, recipient, source, priority)
//! ```
//!
//! They are the whole contract with the delivery daemon, which reads `head`
//! joined to `body` and removes what it has sent.

use sqlx::AnyPool;

/// Default namespace for the two tables.
pub const DEFAULT_SCHEMA: &str = "mailsender";

/// SQL dialect of the connection source, detected from its URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    Sqlite,
}

impl Dialect {
    /// Detect the dialect from a connection URL scheme.
    pub fn from_url(url: &str) -> Option<Self> {
        let scheme = url.split_once(':').map(|(scheme, _)| scheme)?;
        match scheme {
            "postgres" | "postgresql" => Some(Dialect::Postgres),
            "sqlite" => Some(Dialect::Sqlite),
            _ => None,
        }
    }
}

/// Fully qualified names of the two tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub schema: Option<String>,
    pub body: String,
    pub head: String,
}

impl TableNames {
    /// Qualify `body` and `head` with `schema`; `None` leaves them bare.
    pub fn new(schema: Option<&str>) -> Self {
        let qualify = |table: &str| match schema {
            Some(schema) => format!("{}.{}", schema, table),
            None => table.to_string(),
        };
        Self {
            schema: schema.map(String::from),
            body: qualify("body"),
            head: qualify("head"),
        }
    }

    /// Body insert returning the generated identifier.
    pub(crate) fn insert_body_sql(&self) -> String {
        format!(
            "INSERT INTO {} (sender, subject, body) VALUES ($1, $2, $3) RETURNING id",
            self.body
        )
    }

    /// Header insert, one execution per recipient.
    pub(crate) fn insert_head_sql(&self) -> String {
        format!(
            "INSERT INTO {} (id_body, recipient, source, priority) VALUES ($1, $2, $3, $4)",
            self.head
        )
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self::new(Some(DEFAULT_SCHEMA))
    }
}

/// DDL statements creating the tables, in execution order.
pub fn create_table_statements(dialect: Dialect, names: &TableNames) -> Vec<String> {
    let mut statements = Vec::new();

    let id_column = match dialect {
        Dialect::Postgres => {
            if let Some(schema) = &names.schema {
                statements.push(format!("CREATE SCHEMA IF NOT EXISTS {}", schema));
            }
            "id BIGSERIAL PRIMARY KEY"
        }
        Dialect::Sqlite => "id INTEGER PRIMARY KEY AUTOINCREMENT",
    };

    statements.push(format!(
        "CREATE TABLE IF NOT EXISTS {} (
            {},
            sender TEXT NOT NULL,
            subject TEXT NOT NULL,
            body TEXT NOT NULL
        )",
        names.body, id_column
    ));
    statements.push(format!(
        "CREATE TABLE IF NOT EXISTS {} (
            id_body BIGINT NOT NULL REFERENCES {}(id),
            recipient TEXT NOT NULL,
            source TEXT NOT NULL,
            priority INTEGER NOT NULL
        )",
        names.head,
        // SQLite resolves a foreign key target within the table's own schema.
        match dialect {
            Dialect::Postgres => names.body.as_str(),
            Dialect::Sqlite => "body",
        }
    ));

    let index_name = match dialect {
        Dialect::Postgres => "head_priority_idx".to_string(),
        Dialect::Sqlite => match &names.schema {
            Some(schema) => format!("{}.head_priority_idx", schema),
            None => "head_priority_idx".to_string(),
        },
    };
    let index_table = match dialect {
        Dialect::Postgres => names.head.as_str(),
        Dialect::Sqlite => "head",
    };
    statements.push(format!(
        "CREATE INDEX IF NOT EXISTS {} ON {} (priority, id_body)",
        index_name, index_table
    ));

    statements
}

/// Create the tables if they do not exist yet.
pub async fn create_tables(
    pool: &AnyPool,
    dialect: Dialect,
    names: &TableNames,
) -> Result<(), sqlx::Error> {
    for statement in create_table_statements(dialect, names) {
        sqlx::query(&statement).execute(pool).await?;
    }
    tracing::info!(body = %names.body, head = %names.head, "Mail queue tables ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dialect_from_url() {
        assert_eq!(
            Dialect::from_url("postgres://user@db/app"),
            Some(Dialect::Postgres)
        );
        assert_eq!(
            Dialect::from_url("postgresql://db/app"),
            Some(Dialect::Postgres)
        );
        assert_eq!(
            Dialect::from_url("sqlite:///tmp/mail.db"),
            Some(Dialect::Sqlite)
        );
        assert_eq!(Dialect::from_url("sqlite::memory:"), Some(Dialect::Sqlite));
        assert_eq!(Dialect::from_url("mysql://db/app"), None);
        assert_eq!(Dialect::from_url("no-scheme"), None);
    }

    #[test]
    fn table_names_are_qualified_by_schema() {
        let names = TableNames::default();
        assert_eq!(names.body, "mailsender.body");
        assert_eq!(names.head, "mailsender.head");

        let names = TableNames::new(None);
        assert_eq!(names.body, "body");
        assert_eq!(names.head, "head");
    }

    #[test]
    fn insert_statements_use_qualified_names() {
        let names = TableNames::default();
        assert_eq!(
            names.insert_body_sql(),
            "INSERT INTO mailsender.body (sender, subject, body) VALUES ($1, $2, $3) RETURNING id"
        );
        assert_eq!(
            names.insert_head_sql(),
            "INSERT INTO mailsender.head (id_body, recipient, source, priority) VALUES ($1, $2, $3, $4)"
        );
    }

    #[test]
    fn postgres_ddl_creates_schema_first() {
        let statements = create_table_statements(Dialect::Postgres, &TableNames::default());
        assert_eq!(statements.len(), 4);
        assert_eq!(statements[0], "CREATE SCHEMA IF NOT EXISTS mailsender");
        assert!(statements[1].contains("mailsender.body"));
        assert!(statements[1].contains("BIGSERIAL"));
        assert!(statements[2].contains("REFERENCES mailsender.body(id)"));
        assert!(statements[3].contains("ON mailsender.head"));
    }

    #[test]
    fn sqlite_ddl_without_schema() {
        let statements = create_table_statements(Dialect::Sqlite, &TableNames::new(None));
        assert_eq!(statements.len(), 3);
        assert!(statements[0].contains("AUTOINCREMENT"));
        assert!(statements[1].contains("REFERENCES body(id)"));
        assert!(statements[2].starts_with("CREATE INDEX IF NOT EXISTS head_priority_idx ON head"));
    }
}
