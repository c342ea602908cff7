//! The stateful, re-entrant data accessor.
//!
//! An [`Accessor`] builds one operation at a time on top of a stack of
//! execution contexts. `start_operation` pushes a context, builder calls
//! fill it, and a terminal call renders, executes and pops it. A terminal
//! call that fails leaves the stack untouched.
//!
//! Reads go through the session's [`ResultCache`](crate::ResultCache): the
//! same rendered SELECT returns the cached rowset until the session is
//! flushed.

use std::ops::ControlFlow;
use std::sync::Arc;

use keel_core::{
    FilterChain, GenericRenderer, Operation, Operator, RenderRequest, Renderer, Row, Rowset,
    SqlValue, Statement, ToSqlValue,
};
use tracing::{debug, info, warn};

use crate::config::AccessorConfig;
use crate::context::{ContextStack, ExecutionContext};
use crate::driver::{Driver, Metadata, QueryOutcome};
use crate::error::{DaoError, Result};
use crate::loader::{FsSqlLoader, SqlLoader};
use crate::session::Session;

/// Fluent query builder and executor bound to one driver.
///
/// ```ignore
/// let mut dao = Accessor::new(Arc::new(SqliteDriver::connect("sqlite::memory:").await?));
///
/// let ann = dao
///     .start_operation("users")
///     .filter("id")?
///     .equals_to(5_i64)?
///     .first()
///     .await?;
/// ```
pub struct Accessor<D, R = GenericRenderer> {
    driver: Arc<D>,
    renderer: R,
    loader: Option<Box<dyn SqlLoader>>,
    session: Arc<Session>,
    contexts: ContextStack,
    config: AccessorConfig,
}

impl<D: Driver> Accessor<D> {
    /// Creates an accessor with its own session and the generic renderer.
    pub fn new(driver: Arc<D>) -> Self {
        Self::with_session(driver, Session::new())
    }

    /// Creates an accessor that shares `session` with other accessors.
    pub fn with_session(driver: Arc<D>, session: Arc<Session>) -> Self {
        Self {
            driver,
            renderer: GenericRenderer::new(),
            loader: None,
            session,
            contexts: ContextStack::new(),
            config: AccessorConfig::default(),
        }
    }
}

impl<D: Driver, R: Renderer> Accessor<D, R> {
    /// Replaces the statement renderer.
    pub fn with_renderer<R2: Renderer>(self, renderer: R2) -> Accessor<D, R2> {
        Accessor {
            driver: self.driver,
            renderer,
            loader: self.loader,
            session: self.session,
            contexts: self.contexts,
            config: self.config,
        }
    }

    /// Applies `config`. A configured `sql_root` installs an [`FsSqlLoader`].
    #[must_use]
    pub fn with_config(mut self, config: AccessorConfig) -> Self {
        if let Some(root) = &config.sql_root {
            self.loader = Some(Box::new(FsSqlLoader::new(root)));
        }
        self.config = config;
        self
    }

    /// Installs the loader used for [`Accessor::sql_resource`].
    #[must_use]
    pub fn with_loader(mut self, loader: impl SqlLoader + 'static) -> Self {
        self.loader = Some(Box::new(loader));
        self
    }

    /// The driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// The shared session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// The active configuration.
    pub fn config(&self) -> &AccessorConfig {
        &self.config
    }

    /// Number of execution contexts, including the initial one.
    pub fn depth(&self) -> usize {
        self.contexts.depth()
    }

    /// The live execution context.
    pub fn context(&self) -> &ExecutionContext {
        self.contexts.current()
    }

    /// Selects the configured default database and opens the first
    /// transaction window.
    pub async fn begin(&mut self) -> Result<()> {
        self.ensure_enabled()?;
        if let Some(name) = self.config.default_database.clone() {
            self.select_database(&name).await?;
        }
        self.driver.begin_transaction().await
    }

    // Context stack

    /// Starts a new operation on `table`, saving the current one.
    pub fn start_operation(&mut self, table: impl Into<String>) -> &mut Self {
        self.contexts.push(table);
        self
    }

    /// Abandons the current operation and restores the previous one.
    pub fn return_to_previous_execution(&mut self) -> Result<&mut Self> {
        self.contexts.pop()?;
        Ok(self)
    }

    // Predicates

    /// Opens a sanitized predicate on `key`.
    pub fn filter(&mut self, key: impl Into<String>) -> Result<&mut Self> {
        self.contexts.current_mut().filters.open(key, true)?;
        Ok(self)
    }

    /// Opens a predicate on `key` whose string value is quoted but not
    /// escaped. Only for trusted values.
    pub fn filter_raw(&mut self, key: impl Into<String>) -> Result<&mut Self> {
        self.contexts.current_mut().filters.open(key, false)?;
        Ok(self)
    }

    /// Opens a predicate joined with AND.
    pub fn and(&mut self, key: impl Into<String>) -> Result<&mut Self> {
        self.contexts.current_mut().filters.and(key, true)?;
        Ok(self)
    }

    /// Opens a predicate joined with OR.
    pub fn or(&mut self, key: impl Into<String>) -> Result<&mut Self> {
        self.contexts.current_mut().filters.or(key, true)?;
        Ok(self)
    }

    fn compare(&mut self, operator: Operator, value: impl ToSqlValue) -> Result<&mut Self> {
        self.contexts
            .current_mut()
            .filters
            .compare(operator, value.to_sql_value())?;
        Ok(self)
    }

    /// `key = value`, or `key IS NULL` for a null value.
    pub fn equals_to(&mut self, value: impl ToSqlValue) -> Result<&mut Self> {
        self.compare(Operator::Eq, value)
    }

    /// `key <> value`, or `key IS NOT NULL` for a null value.
    pub fn different_from(&mut self, value: impl ToSqlValue) -> Result<&mut Self> {
        self.compare(Operator::Ne, value)
    }

    /// `key > value`.
    pub fn greater_than(&mut self, value: impl ToSqlValue) -> Result<&mut Self> {
        self.compare(Operator::Gt, value)
    }

    /// `key < value`.
    pub fn less_than(&mut self, value: impl ToSqlValue) -> Result<&mut Self> {
        self.compare(Operator::Lt, value)
    }

    /// `key >= value`.
    pub fn greater_or_equals(&mut self, value: impl ToSqlValue) -> Result<&mut Self> {
        self.compare(Operator::Gte, value)
    }

    /// `key <= value`.
    pub fn less_or_equals(&mut self, value: impl ToSqlValue) -> Result<&mut Self> {
        self.compare(Operator::Lte, value)
    }

    /// `key LIKE pattern`.
    pub fn like(&mut self, pattern: impl ToSqlValue) -> Result<&mut Self> {
        self.compare(Operator::Like, pattern)
    }

    /// `key IN (values)`.
    pub fn is_in(&mut self, values: impl ToSqlValue) -> Result<&mut Self> {
        self.compare(Operator::In, values)
    }

    /// `key NOT IN (values)`.
    pub fn not_in(&mut self, values: impl ToSqlValue) -> Result<&mut Self> {
        self.compare(Operator::NotIn, values)
    }

    // Parameters and SQL sources

    /// Binds named parameters.
    ///
    /// With a `key`, the values fill `?key:name?` tokens only. Without one
    /// they accumulate under the operation's global key and fill `?name?`.
    pub fn bind_params<I, K, V>(&mut self, params: I, key: Option<&str>) -> &mut Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: ToSqlValue,
    {
        let depth = self.contexts.depth();
        let context = self.contexts.current_mut();
        let values = params
            .into_iter()
            .map(|(name, value)| (name.into(), value.to_sql_value()));

        match key {
            Some(key) => context.params.bind(key, false, values),
            None => {
                let global = context
                    .global_params_key
                    .get_or_insert_with(|| format!("global_{depth}"))
                    .clone();
                context.params.bind(&global, true, values);
            }
        }
        self
    }

    /// Uses `sql` as the SELECT text of this operation.
    pub fn sql(&mut self, sql: impl Into<String>) -> &mut Self {
        self.contexts.current_mut().inline_sql = Some(sql.into());
        self
    }

    /// Loads the SELECT text from the named resource. Falls back to the
    /// inline text, then to `SELECT * FROM table`, when the resource is
    /// missing.
    pub fn sql_resource(&mut self, path: impl Into<String>) -> &mut Self {
        self.contexts.current_mut().sql_resource = Some(path.into());
        self
    }

    // Session

    /// Commits the current transaction, starts a new one and drops every
    /// cached read.
    pub async fn flush(&mut self) -> Result<()> {
        self.ensure_enabled()?;
        self.driver.commit().await?;
        self.driver.begin_transaction().await?;
        self.session.cache().flush();
        info!("changes committed, read cache cleared");
        Ok(())
    }

    /// Alias of [`Accessor::flush`].
    pub async fn commit_changes(&mut self) -> Result<()> {
        self.flush().await
    }

    /// Drops every cached read without touching the transaction.
    pub fn clear_persistence(&mut self) {
        self.session.cache().flush();
        debug!("read cache cleared");
    }

    /// Switches the active database. Cached reads belong to the previous
    /// database and are dropped.
    pub async fn select_database(&mut self, name: &str) -> Result<()> {
        self.ensure_enabled()?;
        self.driver.select_database(name).await?;
        self.session.set_selected_database(name);
        self.session.cache().flush();
        info!(database = name, "database selected");
        Ok(())
    }

    // Terminal operations

    /// Runs the SELECT of the current operation and returns its rows.
    pub async fn find(&mut self) -> Result<Rowset> {
        let table = self.working_table()?;
        self.ensure_enabled()?;

        let statement = self.prepare(&table, Operation::Select, None)?;
        let rows = self.read(&statement).await?;
        self.contexts.pop()?;
        Ok(rows)
    }

    /// Like [`Accessor::find`], returning only the first row.
    pub async fn first(&mut self) -> Result<Option<Row>> {
        Ok(self.find().await?.into_iter().next())
    }

    /// Runs [`Accessor::find`] and hands each row to `visit` in order,
    /// stopping at the first [`ControlFlow::Break`]. Returns every row,
    /// including changes `visit` made.
    pub async fn fetch<F>(&mut self, mut visit: F) -> Result<Rowset>
    where
        F: FnMut(&mut Row) -> ControlFlow<()>,
    {
        let mut rows = self.find().await?;
        for row in &mut rows {
            if visit(row).is_break() {
                break;
            }
        }
        Ok(rows)
    }

    /// Updates the rows matched by the current predicates. Returns the
    /// affected row count.
    pub async fn update(&mut self, values: &Row) -> Result<u64> {
        let table = self.working_table()?;
        self.ensure_enabled()?;

        let statement = self.prepare(&table, Operation::Update, Some(values))?;
        let affected = self.write(&statement).await?.affected();
        self.contexts.pop()?;
        Ok(affected)
    }

    /// Deletes the rows matched by the current predicates. Returns the
    /// affected row count.
    pub async fn delete(&mut self) -> Result<u64> {
        let table = self.working_table()?;
        self.ensure_enabled()?;

        let statement = self.prepare(&table, Operation::Delete, None)?;
        let affected = self.write(&statement).await?.affected();
        self.contexts.pop()?;
        Ok(affected)
    }

    /// Renders the statement `operation` would run, without executing it or
    /// consulting the cache. Pops the context like any terminal call.
    pub fn preview(&mut self, operation: Operation, values: Option<&Row>) -> Result<Statement> {
        let table = self.working_table()?;
        let statement = self.prepare(&table, operation, values)?;
        info!(sql = %statement, "preview");
        self.contexts.pop()?;
        Ok(statement)
    }

    // Internals

    fn working_table(&self) -> Result<String> {
        self.contexts
            .current()
            .working_table
            .clone()
            .ok_or(DaoError::NoWorkingTable)
    }

    fn ensure_enabled(&self) -> Result<()> {
        if self.config.database_enabled {
            Ok(())
        } else {
            Err(DaoError::DatabaseDisabled)
        }
    }

    /// Resource text, then inline text, then none.
    fn base_sql(&self) -> Result<Option<String>> {
        let context = self.contexts.current();
        if let Some(path) = &context.sql_resource {
            match &self.loader {
                Some(loader) => {
                    if let Some(sql) = loader.load(path)? {
                        return Ok(Some(sql));
                    }
                    debug!(resource = %path, "sql resource missing, falling back");
                }
                None => warn!(resource = %path, "no sql loader configured"),
            }
        }
        Ok(context.inline_sql.clone())
    }

    /// Resolves bindings, assembles the filter list and renders.
    fn prepare(&self, table: &str, operation: Operation, values: Option<&Row>) -> Result<Statement> {
        let context = self.contexts.current();
        let base = match operation {
            Operation::Select => self.base_sql()?,
            _ => None,
        };

        let mut source = base.clone().unwrap_or_default();
        for filter in &context.filters {
            source.push('\n');
            source.push_str(&filter.key);
        }
        let resolution = context.params.resolve(&source);
        for name in &resolution.unused {
            warn!(table, binding = %name, "bound parameter matches no placeholder");
        }

        let mut filters: FilterChain = context.filters.clone();
        filters.prepend(resolution.filters);

        let request = RenderRequest {
            table,
            operation,
            filters: if operation == Operation::Insert {
                &[]
            } else {
                filters.as_slice()
            },
            base_sql: base.as_deref(),
            values,
            procedure: None,
            args: &[],
        };
        let statement = self.renderer.render(&request, self.driver.as_ref())?;
        self.log_statement(&statement);
        Ok(statement)
    }

    fn log_statement(&self, statement: &Statement) {
        if self.config.debug_sql {
            info!(sql = %statement, "rendered statement");
        } else {
            debug!(sql = %statement, "rendered statement");
        }
    }

    async fn read(&self, statement: &Statement) -> Result<Rowset> {
        let cache = self.session.cache();
        if let Some(rows) = cache.get(statement.sql_text()) {
            debug!(table = statement.table(), "read cache hit");
            return Ok(rows);
        }

        debug!(table = statement.table(), "read cache miss");
        match self.driver.execute(statement).await? {
            QueryOutcome::Rows(rows) => {
                cache.insert(statement.sql_text(), rows.clone());
                Ok(rows)
            }
            QueryOutcome::Affected { .. } => {
                Err(DaoError::UnexpectedOutcome(statement.operation().to_string()))
            }
        }
    }

    async fn write(&self, statement: &Statement) -> Result<QueryOutcome> {
        let outcome = self.driver.execute(statement).await?;
        if let QueryOutcome::Affected { rows, .. } = &outcome {
            debug!(table = statement.table(), rows, "statement applied");
        }
        Ok(outcome)
    }
}

impl<D: Driver + Metadata, R: Renderer> Accessor<D, R> {
    /// Inserts `row` into the working table.
    ///
    /// When the driver reports a generated key, it is written into `row`
    /// under the table's primary key column and returned.
    pub async fn insert(&mut self, row: &mut Row) -> Result<Option<i64>> {
        let table = self.working_table()?;
        self.ensure_enabled()?;

        let statement = self.prepare(&table, Operation::Insert, Some(&*row))?;
        let generated = match self.write(&statement).await? {
            QueryOutcome::Affected { last_insert_id, .. } => last_insert_id,
            QueryOutcome::Rows(_) => None,
        };

        if let Some(id) = generated {
            if let Some(primary_key) = self.driver.primary_key(&table).await? {
                row.insert(primary_key, SqlValue::Int(id));
            }
        }
        self.contexts.pop()?;
        Ok(generated)
    }

    /// Calls a stored procedure of the working table.
    ///
    /// `name` must be one of the table's procedures as reported by the
    /// metadata provider; the list is loaded once per operation.
    pub async fn call_procedure(&mut self, name: &str, args: &[SqlValue]) -> Result<Rowset> {
        let table = self.working_table()?;
        self.ensure_enabled()?;

        if self.contexts.current().procedures.is_none() {
            let known = self.driver.table_procedures(&table).await?;
            self.contexts.current_mut().procedures = Some(known);
        }
        let known = self
            .contexts
            .current()
            .procedures
            .as_ref()
            .is_some_and(|procedures| procedures.iter().any(|p| p == name));
        if !known {
            return Err(DaoError::UnknownProcedure {
                table,
                procedure: name.to_string(),
            });
        }

        let request = RenderRequest::call(&table, name, args);
        let statement = self.renderer.render(&request, self.driver.as_ref())?;
        self.log_statement(&statement);

        let rows = self.write(&statement).await?.into_rows();
        self.contexts.pop()?;
        Ok(rows)
    }
}
