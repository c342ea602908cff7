//! SQLite driver over a single sqlx connection.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

use keel_core::{Escape, Row, SqlValue, Statement};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::{Column, Connection, Row as _, TypeInfo, ValueRef};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{
    ColumnDescription, Driver, ForeignKeyDescription, IndexDescription, Metadata,
    ProcedureDescription, QueryOutcome, TableDescription,
};
use crate::error::Result;

/// Driver and metadata provider for SQLite.
///
/// All statements run on one connection, so `BEGIN`/`COMMIT` issued through
/// [`Driver::begin_transaction`] and [`Driver::commit`] span every statement
/// in between. SQLite has no stored procedures and a single database per
/// connection: procedure lookups come back empty and `select_database` only
/// records the name.
pub struct SqliteDriver {
    conn: Mutex<SqliteConnection>,
    in_transaction: AtomicBool,
}

impl std::fmt::Debug for SqliteDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDriver")
            .field("in_transaction", &self.in_transaction.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl SqliteDriver {
    /// Opens a connection, e.g. `sqlite::memory:` or `sqlite://app.db`.
    pub async fn connect(url: &str) -> Result<Self> {
        let conn = SqliteConnection::connect(url).await?;
        Ok(Self::new(conn))
    }

    /// Wraps an open connection.
    pub fn new(conn: SqliteConnection) -> Self {
        Self {
            conn: Mutex::new(conn),
            in_transaction: AtomicBool::new(false),
        }
    }

    /// Returns true while a transaction opened by this driver is active.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction.load(Ordering::SeqCst)
    }

    async fn table_columns(&self, table: &str) -> Result<Vec<(String, String, bool, Option<String>, i64)>> {
        let mut conn = self.conn.lock().await;
        let rows: Vec<(String, String, i64, Option<String>, i64)> = sqlx::query_as(
            r#"SELECT name, type, "notnull", dflt_value, pk FROM pragma_table_info(?1) ORDER BY cid"#,
        )
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, sql_type, not_null, default, pk)| (name, sql_type, not_null == 0, default, pk))
            .collect())
    }

    async fn uses_autoincrement(&self, table: &str) -> Result<bool> {
        let mut conn = self.conn.lock().await;
        let sql: Option<(Option<String>,)> =
            sqlx::query_as("SELECT sql FROM sqlite_master WHERE type = 'table' AND name = ?1")
                .bind(table)
                .fetch_optional(&mut *conn)
                .await?;

        Ok(sql
            .and_then(|(sql,)| sql)
            .is_some_and(|sql| sql.to_uppercase().contains("AUTOINCREMENT")))
    }
}

impl Escape for SqliteDriver {
    fn escape(&self, raw: &str) -> String {
        raw.replace('\'', "''")
    }
}

fn decode_row(row: &SqliteRow) -> Result<Row> {
    let mut decoded = Row::new();
    for column in row.columns() {
        let index = column.ordinal();
        let raw = row.try_get_raw(index)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            let kind = raw.type_info().name().to_string();
            match kind.as_str() {
                "INTEGER" | "BOOLEAN" => SqlValue::Int(row.try_get(index)?),
                "REAL" | "NUMERIC" => SqlValue::Float(row.try_get(index)?),
                "BLOB" => SqlValue::Blob(row.try_get(index)?),
                _ => SqlValue::Text(row.try_get(index)?),
            }
        };
        decoded.insert(column.name().to_string(), value);
    }
    Ok(decoded)
}

impl Driver for SqliteDriver {
    async fn execute(&self, statement: &Statement) -> Result<QueryOutcome> {
        debug!(sql = %statement, "executing statement");
        let mut conn = self.conn.lock().await;

        if statement.operation().returns_rows() {
            let rows = sqlx::query(statement.sql_text())
                .fetch_all(&mut *conn)
                .await?;
            let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
            return Ok(QueryOutcome::Rows(rows));
        }

        let result = sqlx::query(statement.sql_text())
            .execute(&mut *conn)
            .await?;
        let last_insert_id = Some(result.last_insert_rowid()).filter(|id| *id != 0);
        Ok(QueryOutcome::Affected {
            rows: result.rows_affected(),
            last_insert_id,
        })
    }

    async fn select_database(&self, name: &str) -> Result<()> {
        info!(database = name, "sqlite uses a single database per connection");
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<()> {
        // The flag is only read and written under the connection lock.
        let mut conn = self.conn.lock().await;
        if self.in_transaction() {
            return Ok(());
        }
        sqlx::query("BEGIN").execute(&mut *conn).await?;
        self.in_transaction.store(true, Ordering::SeqCst);
        debug!("transaction started");
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        let mut conn = self.conn.lock().await;
        if !self.in_transaction() {
            return Ok(());
        }
        sqlx::query("COMMIT").execute(&mut *conn).await?;
        self.in_transaction.store(false, Ordering::SeqCst);
        info!("transaction committed");
        Ok(())
    }
}

impl Metadata for SqliteDriver {
    async fn primary_key(&self, table: &str) -> Result<Option<String>> {
        let mut keys: Vec<(i64, String)> = self
            .table_columns(table)
            .await?
            .into_iter()
            .filter(|column| column.4 > 0)
            .map(|column| (column.4, column.0))
            .collect();

        if keys.len() == 1 {
            Ok(keys.pop().map(|(_, name)| name))
        } else {
            Ok(None)
        }
    }

    async fn describe_table(&self, table: &str) -> Result<TableDescription> {
        let raw_columns = self.table_columns(table).await?;
        let autoincrement = self.uses_autoincrement(table).await?;

        let mut primary: Vec<(i64, String)> = raw_columns
            .iter()
            .filter(|column| column.4 > 0)
            .map(|column| (column.4, column.0.clone()))
            .collect();
        primary.sort();

        let columns = raw_columns
            .into_iter()
            .map(|(name, sql_type, nullable, default, pk)| {
                let integer_key = pk > 0 && primary.len() == 1 && sql_type.eq_ignore_ascii_case("INTEGER");
                ColumnDescription {
                    name,
                    sql_type,
                    nullable,
                    default,
                    primary: pk > 0,
                    auto_increment: integer_key && autoincrement,
                }
            })
            .collect();

        let mut indexes = Vec::new();
        if !primary.is_empty() {
            indexes.push(IndexDescription {
                name: String::from("PRIMARY"),
                primary: true,
                unique: true,
                columns: primary.into_iter().map(|(_, name)| name).collect(),
            });
        }

        let mut conn = self.conn.lock().await;
        let listed: Vec<(String, i64, String)> = sqlx::query_as(
            r#"SELECT name, "unique", origin FROM pragma_index_list(?1) ORDER BY seq"#,
        )
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;

        for (name, unique, origin) in listed {
            // The primary key is already described from the column list.
            if origin == "pk" {
                continue;
            }
            let columns: Vec<(Option<String>,)> =
                sqlx::query_as("SELECT name FROM pragma_index_info(?1) ORDER BY seqno")
                    .bind(&name)
                    .fetch_all(&mut *conn)
                    .await?;
            indexes.push(IndexDescription {
                name,
                primary: false,
                unique: unique != 0,
                columns: columns.into_iter().filter_map(|(c,)| c).collect(),
            });
        }

        let references: Vec<(i64, String, String, Option<String>, String, String)> = sqlx::query_as(
            r#"SELECT id, "table", "from", "to", on_update, on_delete
               FROM pragma_foreign_key_list(?1) ORDER BY id, seq"#,
        )
        .bind(table)
        .fetch_all(&mut *conn)
        .await?;
        drop(conn);

        let mut grouped: BTreeMap<i64, ForeignKeyDescription> = BTreeMap::new();
        for (id, parent, from, to, on_update, on_delete) in references {
            let key = grouped.entry(id).or_insert_with(|| ForeignKeyDescription {
                name: format!("fk_{table}_{id}"),
                columns: Vec::new(),
                referenced_table: parent.clone(),
                referenced_columns: Vec::new(),
                on_update,
                on_delete,
            });
            key.columns.push(from);
            // A missing target column means the parent's primary key.
            let target = match to {
                Some(column) => column,
                None => self.primary_key(&parent).await?.unwrap_or_default(),
            };
            key.referenced_columns.push(target);
        }

        Ok(TableDescription {
            name: table.to_string(),
            columns,
            indexes,
            foreign_keys: grouped.into_values().collect(),
        })
    }

    async fn table_procedures(&self, _table: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn describe_procedure(&self, _name: &str) -> Result<Option<ProcedureDescription>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keel_core::Operation;

    async fn driver() -> SqliteDriver {
        let driver = SqliteDriver::connect("sqlite::memory:").await.unwrap();
        for ddl in [
            "CREATE TABLE authors (id INTEGER PRIMARY KEY AUTOINCREMENT, name TEXT NOT NULL, score REAL, avatar BLOB)",
            "CREATE UNIQUE INDEX idx_authors_name ON authors (name)",
            "CREATE TABLE posts (id INTEGER PRIMARY KEY, author_id INTEGER NOT NULL, title VARCHAR(120) DEFAULT 'untitled', \
             FOREIGN KEY (author_id) REFERENCES authors (id) ON DELETE CASCADE)",
        ] {
            driver
                .execute(&Statement::new(Operation::Insert, "", ddl))
                .await
                .unwrap();
        }
        driver
    }

    fn statement(operation: Operation, table: &str, sql: &str) -> Statement {
        Statement::new(operation, table, sql)
    }

    #[tokio::test]
    async fn test_insert_reports_generated_id() {
        let driver = driver().await;
        let outcome = driver
            .execute(&statement(
                Operation::Insert,
                "authors",
                "INSERT INTO authors (name) VALUES ('Ann')",
            ))
            .await
            .unwrap();

        assert_eq!(
            outcome,
            QueryOutcome::Affected {
                rows: 1,
                last_insert_id: Some(1)
            }
        );
    }

    #[tokio::test]
    async fn test_select_decodes_storage_classes() {
        let driver = driver().await;
        driver
            .execute(&statement(
                Operation::Insert,
                "authors",
                "INSERT INTO authors (name, score, avatar) VALUES ('O''Brien', 4.5, X'CAFE')",
            ))
            .await
            .unwrap();

        let rows = driver
            .execute(&statement(Operation::Select, "authors", "SELECT * FROM authors"))
            .await
            .unwrap()
            .into_rows();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["id"], SqlValue::Int(1));
        assert_eq!(row["name"], SqlValue::Text(String::from("O'Brien")));
        assert_eq!(row["score"], SqlValue::Float(4.5));
        assert_eq!(row["avatar"], SqlValue::Blob(vec![0xCA, 0xFE]));
    }

    #[tokio::test]
    async fn test_null_is_decoded() {
        let driver = driver().await;
        driver
            .execute(&statement(
                Operation::Insert,
                "authors",
                "INSERT INTO authors (name) VALUES ('Bo')",
            ))
            .await
            .unwrap();

        let rows = driver
            .execute(&statement(Operation::Select, "authors", "SELECT score FROM authors"))
            .await
            .unwrap()
            .into_rows();
        assert_eq!(rows[0]["score"], SqlValue::Null);
    }

    #[tokio::test]
    async fn test_update_reports_affected_rows() {
        let driver = driver().await;
        for name in ["a", "b", "c"] {
            driver
                .execute(&statement(
                    Operation::Insert,
                    "authors",
                    &format!("INSERT INTO authors (name) VALUES ('{name}')"),
                ))
                .await
                .unwrap();
        }

        let outcome = driver
            .execute(&statement(
                Operation::Update,
                "authors",
                "UPDATE authors SET score = 1 WHERE name <> 'a'",
            ))
            .await
            .unwrap();
        assert_eq!(outcome.affected(), 2);
    }

    #[tokio::test]
    async fn test_transaction_commit() {
        let driver = driver().await;
        assert!(!driver.in_transaction());

        driver.begin_transaction().await.unwrap();
        driver.begin_transaction().await.unwrap();
        assert!(driver.in_transaction());

        driver.commit().await.unwrap();
        assert!(!driver.in_transaction());
        // Committing without a transaction is a no-op.
        driver.commit().await.unwrap();
    }

    #[tokio::test]
    async fn test_concurrent_begin_and_commit_issue_one_statement_each() {
        let driver = driver().await;

        let (first, second) = tokio::join!(driver.begin_transaction(), driver.begin_transaction());
        first.unwrap();
        second.unwrap();
        assert!(driver.in_transaction());

        let (first, second) = tokio::join!(driver.commit(), driver.commit());
        first.unwrap();
        second.unwrap();
        assert!(!driver.in_transaction());
    }

    #[tokio::test]
    async fn test_primary_key() {
        let driver = driver().await;
        assert_eq!(
            driver.primary_key("authors").await.unwrap().as_deref(),
            Some("id")
        );
    }

    #[tokio::test]
    async fn test_describe_table() {
        let driver = driver().await;
        let authors = driver.describe_table("authors").await.unwrap();

        assert_eq!(authors.columns.len(), 4);
        let id = &authors.columns[0];
        assert!(id.primary);
        assert!(id.auto_increment);
        assert!(!authors.columns[1].nullable);
        assert!(authors.columns[2].nullable);

        assert_eq!(authors.indexes.len(), 2);
        assert!(authors.indexes[0].primary);
        assert_eq!(authors.indexes[0].columns, vec![String::from("id")]);
        assert_eq!(authors.indexes[1].name, "idx_authors_name");
        assert!(authors.indexes[1].unique);

        let posts = driver.describe_table("posts").await.unwrap();
        assert!(!posts.columns[0].auto_increment);
        assert_eq!(posts.columns[2].default.as_deref(), Some("'untitled'"));
        assert_eq!(posts.foreign_keys.len(), 1);
        let fk = &posts.foreign_keys[0];
        assert_eq!(fk.name, "fk_posts_0");
        assert_eq!(fk.columns, vec![String::from("author_id")]);
        assert_eq!(fk.referenced_table, "authors");
        assert_eq!(fk.referenced_columns, vec![String::from("id")]);
        assert_eq!(fk.on_delete, "CASCADE");
        assert_eq!(fk.on_update, "NO ACTION");
    }

    #[tokio::test]
    async fn test_no_procedures() {
        let driver = driver().await;
        assert!(driver.table_procedures("authors").await.unwrap().is_empty());
        assert!(driver.describe_procedure("anything").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_escape_doubles_quotes() {
        let driver = driver().await;
        assert_eq!(driver.escape("it's"), "it''s");
    }
}
