//! Scripted connection doubles for the crate's tests.

use relmap_core::connection::{Connection, ConnectionProvider};
use relmap_core::error::{Error, QueryError, QueryErrorKind, Result};
use relmap_core::result::ResultRow;
use relmap_core::value::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError};

/// Build a scripted result row.
pub(crate) fn scripted_row(columns: &[&str], values: Vec<Value>) -> ResultRow {
    ResultRow::new(columns.iter().map(ToString::to_string).collect(), values)
}

#[derive(Default)]
struct MockState {
    scripted_rows: VecDeque<Vec<ResultRow>>,
    scripted_execs: VecDeque<Result<u64>>,
    insert_ids: VecDeque<Value>,
    queries: Vec<(String, Vec<Value>)>,
    executes: Vec<(String, Vec<Value>)>,
    begins: usize,
    commits: usize,
    rollbacks: usize,
    in_tx: bool,
}

/// A connection that replays scripted results and records every
/// statement it sees.
#[derive(Default)]
pub(crate) struct MockConnection {
    state: Mutex<MockState>,
}

impl MockConnection {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue the result set for the next query.
    pub(crate) fn push_rows(&self, rows: Vec<ResultRow>) {
        self.state().scripted_rows.push_back(rows);
    }

    /// Queue the outcome of the next execute (default is `Ok(1)`).
    pub(crate) fn push_execute(&self, result: Result<u64>) {
        self.state().scripted_execs.push_back(result);
    }

    /// Queue a constraint violation for the next execute.
    pub(crate) fn push_execute_constraint(&self, message: &str) {
        self.push_execute(Err(Error::Query(QueryError {
            kind: QueryErrorKind::Constraint,
            sql: None,
            message: message.to_string(),
        })));
    }

    /// Queue the id reported by `last_insert_id`.
    pub(crate) fn push_insert_id(&self, id: Value) {
        self.state().insert_ids.push_back(id);
    }

    pub(crate) fn query_count(&self) -> usize {
        self.state().queries.len()
    }

    pub(crate) fn execute_count(&self) -> usize {
        self.state().executes.len()
    }

    pub(crate) fn last_query(&self) -> Option<(String, Vec<Value>)> {
        self.state().queries.last().cloned()
    }

    pub(crate) fn last_execute(&self) -> Option<(String, Vec<Value>)> {
        self.state().executes.last().cloned()
    }

    pub(crate) fn executed(&self) -> Vec<(String, Vec<Value>)> {
        self.state().executes.clone()
    }

    pub(crate) fn begin_count(&self) -> usize {
        self.state().begins
    }

    pub(crate) fn commit_count(&self) -> usize {
        self.state().commits
    }

    pub(crate) fn rollback_count(&self) -> usize {
        self.state().rollbacks
    }
}

impl Connection for MockConnection {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<ResultRow>> {
        let mut state = self.state();
        state.queries.push((sql.to_string(), params.to_vec()));
        Ok(state.scripted_rows.pop_front().unwrap_or_default())
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let mut state = self.state();
        state.executes.push((sql.to_string(), params.to_vec()));
        state.scripted_execs.pop_front().unwrap_or(Ok(1))
    }

    fn last_insert_id(&self) -> Result<Option<Value>> {
        Ok(self.state().insert_ids.pop_front())
    }

    fn begin(&self) -> Result<()> {
        let mut state = self.state();
        state.begins += 1;
        state.in_tx = true;
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let mut state = self.state();
        state.commits += 1;
        state.in_tx = false;
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let mut state = self.state();
        state.rollbacks += 1;
        state.in_tx = false;
        Ok(())
    }

    fn in_transaction(&self) -> bool {
        self.state().in_tx
    }
}

/// A provider handing out one shared connection, with optional per-table
/// routing for multi-connection scenarios.
pub(crate) struct MockProvider {
    shared: Arc<MockConnection>,
    routes: Mutex<HashMap<String, Arc<MockConnection>>>,
}

impl MockProvider {
    /// A provider where every table shares one connection.
    pub(crate) fn shared() -> Arc<Self> {
        Arc::new(Self {
            shared: MockConnection::new(),
            routes: Mutex::new(HashMap::new()),
        })
    }

    /// Route one table onto its own connection.
    pub(crate) fn route(&self, table: &str, conn: Arc<MockConnection>) {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(table.to_string(), conn);
    }

    /// The shared connection.
    pub(crate) fn connection(&self) -> Arc<MockConnection> {
        Arc::clone(&self.shared)
    }

    fn conn_for(&self, table: &str) -> Arc<MockConnection> {
        self.routes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(table)
            .map_or_else(|| Arc::clone(&self.shared), Arc::clone)
    }

    // Convenience pass-throughs for the common single-connection case.
    pub(crate) fn push_rows(&self, rows: Vec<ResultRow>) {
        self.shared.push_rows(rows);
    }

    pub(crate) fn push_execute(&self, result: Result<u64>) {
        self.shared.push_execute(result);
    }

    pub(crate) fn push_execute_constraint(&self, message: &str) {
        self.shared.push_execute_constraint(message);
    }

    pub(crate) fn push_insert_id(&self, id: Value) {
        self.shared.push_insert_id(id);
    }

    pub(crate) fn query_count(&self) -> usize {
        self.shared.query_count()
    }

    pub(crate) fn execute_count(&self) -> usize {
        self.shared.execute_count()
    }

    pub(crate) fn last_query(&self) -> Option<(String, Vec<Value>)> {
        self.shared.last_query()
    }

    pub(crate) fn last_execute(&self) -> Option<(String, Vec<Value>)> {
        self.shared.last_execute()
    }
}

impl ConnectionProvider for MockProvider {
    fn read(&self, table: &str) -> Result<Arc<dyn Connection>> {
        Ok(self.conn_for(table))
    }

    fn write(&self, table: &str) -> Result<Arc<dyn Connection>> {
        Ok(self.conn_for(table))
    }
}
