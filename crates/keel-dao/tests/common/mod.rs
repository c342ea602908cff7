#![allow(dead_code)]

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

use keel_core::{Escape, Row, Rowset, SqlValue, Statement};
use keel_dao::{
    DaoError, Driver, Metadata, ProcedureDescription, QueryOutcome, Result, TableDescription,
};
use parking_lot::Mutex;

/// In-memory driver that records every statement it receives.
#[derive(Debug, Default)]
pub struct StubDriver {
    executed: Mutex<Vec<String>>,
    rows: Mutex<Rowset>,
    procedures: Vec<String>,
    fail_next: Mutex<Option<String>>,
    next_id: AtomicI64,
    pub begins: AtomicUsize,
    pub commits: AtomicUsize,
    pub selected: Mutex<Vec<String>>,
}

impl StubDriver {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            ..Self::default()
        }
    }

    pub fn with_rows(rows: Rowset) -> Self {
        let driver = Self::new();
        *driver.rows.lock() = rows;
        driver
    }

    pub fn with_procedures(mut self, procedures: &[&str]) -> Self {
        self.procedures = procedures.iter().map(|p| (*p).to_string()).collect();
        self
    }

    /// Makes the next `execute` call fail with `message`.
    pub fn fail_next(&self, message: &str) {
        *self.fail_next.lock() = Some(message.to_string());
    }

    pub fn executed(&self) -> Vec<String> {
        self.executed.lock().clone()
    }

    pub fn calls(&self) -> usize {
        self.executed.lock().len()
    }
}

impl Escape for StubDriver {
    fn escape(&self, raw: &str) -> String {
        raw.replace('\'', "''")
    }
}

impl Driver for StubDriver {
    async fn execute(&self, statement: &Statement) -> Result<QueryOutcome> {
        if let Some(message) = self.fail_next.lock().take() {
            return Err(DaoError::Driver(message));
        }
        self.executed.lock().push(statement.sql_text().to_string());

        if statement.operation().returns_rows() {
            return Ok(QueryOutcome::Rows(self.rows.lock().clone()));
        }
        let last_insert_id = match statement.operation() {
            keel_core::Operation::Insert => Some(self.next_id.fetch_add(1, Ordering::SeqCst)),
            _ => None,
        };
        Ok(QueryOutcome::Affected {
            rows: 1,
            last_insert_id,
        })
    }

    async fn select_database(&self, name: &str) -> Result<()> {
        self.selected.lock().push(name.to_string());
        Ok(())
    }

    async fn begin_transaction(&self) -> Result<()> {
        self.begins.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn commit(&self) -> Result<()> {
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl Metadata for StubDriver {
    async fn primary_key(&self, _table: &str) -> Result<Option<String>> {
        Ok(Some(String::from("id")))
    }

    async fn describe_table(&self, table: &str) -> Result<TableDescription> {
        Ok(TableDescription {
            name: table.to_string(),
            ..TableDescription::default()
        })
    }

    async fn table_procedures(&self, _table: &str) -> Result<Vec<String>> {
        Ok(self.procedures.clone())
    }

    async fn describe_procedure(&self, _name: &str) -> Result<Option<ProcedureDescription>> {
        Ok(None)
    }
}

pub fn row(pairs: &[(&str, SqlValue)]) -> Row {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

pub fn text(value: &str) -> SqlValue {
    SqlValue::Text(value.to_string())
}
