//! SQLite persistence helpers shared by the county parsers: a connection
//! wrapper with a reentrant transaction scope, and a generic batch insert.

use crate::domain::model::Record;
use crate::utils::error::{ParserError, Result};
use futures::future::BoxFuture;
use serde_json::Value;
use sqlx::sqlite::{SqliteArguments, SqliteConnection};
use sqlx::{Connection, Sqlite};

/// Database handle owned by a parser. Tracks transaction nesting depth so
/// reentrant `transaction` calls in one call chain commit or roll back
/// only at the outermost scope.
pub struct Db {
    conn: SqliteConnection,
    depth: u32,
}

impl Db {
    pub async fn connect(url: &str) -> Result<Self> {
        let conn = SqliteConnection::connect(url).await.map_err(|e| {
            ParserError::database(format!("Failed to connect to database: {}", e))
        })?;
        Ok(Self { conn, depth: 0 })
    }

    /// Run a bare statement (table setup, pragmas).
    pub async fn execute(&mut self, sql: &str) -> Result<()> {
        sqlx::query(sql)
            .execute(&mut self.conn)
            .await
            .map_err(|e| ParserError::database(e.to_string()))?;
        Ok(())
    }

    /// Raw connection access for parameterized statements built by
    /// parsers.
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.conn
    }

    pub async fn close(self) -> Result<()> {
        self.conn
            .close()
            .await
            .map_err(|e| ParserError::database(e.to_string()))
    }

    /// Transaction scope with nested-call support. Only the outermost
    /// scope issues BEGIN and COMMIT/ROLLBACK; inner scopes are
    /// pass-through. On failure the outermost scope rolls back exactly
    /// once and wraps the cause as a database error.
    pub async fn transaction<T, F>(&mut self, f: F) -> Result<T>
    where
        T: Send,
        F: for<'c> FnOnce(&'c mut Db) -> BoxFuture<'c, Result<T>> + Send,
    {
        if self.depth == 0 {
            sqlx::query("BEGIN")
                .execute(&mut self.conn)
                .await
                .map_err(|e| {
                    ParserError::database(format!("Failed to begin transaction: {}", e))
                })?;
        }

        self.depth += 1;
        let result = f(self).await;
        self.depth -= 1;

        match result {
            Ok(value) => {
                if self.depth == 0 {
                    sqlx::query("COMMIT")
                        .execute(&mut self.conn)
                        .await
                        .map_err(|e| {
                            ParserError::database(format!("Failed to commit transaction: {}", e))
                        })?;
                }
                Ok(value)
            }
            Err(e) => {
                if self.depth == 0 {
                    if let Err(rollback_err) = sqlx::query("ROLLBACK").execute(&mut self.conn).await
                    {
                        tracing::error!("Rollback failed: {}", rollback_err);
                    }
                    Err(ParserError::database(format!("Transaction failed: {}", e)))
                } else {
                    // Propagate unchanged so the cause is wrapped exactly
                    // once, at the outermost scope.
                    Err(e)
                }
            }
        }
    }
}

/// Insert a batch of records into `table`, one parameterized statement per
/// row. Column names come from the first record's fields, sorted for a
/// stable statement shape; rows missing a column bind NULL.
pub async fn batch_insert(db: &mut Db, table: &str, records: &[Record]) -> Result<()> {
    let Some(first) = records.first() else {
        return Ok(());
    };

    check_identifier(table)?;
    let mut columns: Vec<&str> = first.fields.keys().map(String::as_str).collect();
    columns.sort_unstable();
    for column in &columns {
        check_identifier(column)?;
    }

    let placeholders = vec!["?"; columns.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table,
        columns.join(", "),
        placeholders
    );

    static NULL_VALUE: Value = Value::Null;
    for record in records {
        let mut query = sqlx::query(&sql);
        for column in &columns {
            query = bind_value(query, record.get(column).unwrap_or(&NULL_VALUE));
        }
        query.execute(db.conn()).await.map_err(|e| {
            tracing::error!("Batch insert into {} failed: {}", table, e);
            ParserError::database(format!("Batch insert failed: {}", e))
        })?;
    }

    Ok(())
}

/// Bind one JSON scalar to the next placeholder. Nested values are stored
/// as their JSON text.
pub fn bind_value<'q>(
    query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    value: &'q Value,
) -> sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>> {
    match value {
        Value::Null => query.bind(None::<String>),
        Value::Bool(b) => query.bind(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                query.bind(i)
            } else {
                query.bind(n.as_f64().unwrap_or(0.0))
            }
        }
        Value::String(s) => query.bind(s.as_str()),
        other => query.bind(other.to_string()),
    }
}

// Table and column names are interpolated into the statement text, so they
// are restricted to plain identifiers.
fn check_identifier(name: &str) -> Result<()> {
    let ok = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ok {
        Ok(())
    } else {
        Err(ParserError::database(format!(
            "Invalid SQL identifier: '{}'",
            name
        )))
    }
}
