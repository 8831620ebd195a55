//! End-to-end exercises of the public API over a scripted connection:
//! fetch, mutate, diff-driven update, and an atomic transaction plan.

use relmap::prelude::*;
use relmap::{ResultRow, resolve};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Default)]
struct ScriptState {
    rows: VecDeque<Vec<ResultRow>>,
    executes: Vec<(String, Vec<Value>)>,
    fail_execute_at: Option<usize>,
    insert_ids: VecDeque<Value>,
    begins: usize,
    commits: usize,
    rollbacks: usize,
    in_tx: bool,
}

/// A connection that replays scripted result sets and records writes.
#[derive(Default)]
struct ScriptedConnection {
    state: Mutex<ScriptState>,
}

impl ScriptedConnection {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn state(&self) -> std::sync::MutexGuard<'_, ScriptState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push_rows(&self, rows: Vec<ResultRow>) {
        self.state().rows.push_back(rows);
    }

    fn push_insert_id(&self, id: i64) {
        self.state().insert_ids.push_back(Value::Int(id));
    }

    /// Fail the nth execute (0-based) with a constraint violation.
    fn fail_execute_at(&self, index: usize) {
        self.state().fail_execute_at = Some(index);
    }
}

impl Connection for ScriptedConnection {
    fn query(&self, _sql: &str, _params: &[Value]) -> Result<Vec<ResultRow>> {
        Ok(self.state().rows.pop_front().unwrap_or_default())
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        let mut state = self.state();
        let index = state.executes.len();
        state.executes.push((sql.to_string(), params.to_vec()));
        if state.fail_execute_at == Some(index) {
            return Err(Error::Query(relmap::QueryError {
                kind: relmap::QueryErrorKind::Constraint,
                sql: Some(sql.to_string()),
                message: "unique constraint violated".to_string(),
            }));
        }
        Ok(1)
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

struct ScriptedProvider {
    conn: Arc<ScriptedConnection>,
}

impl ConnectionProvider for ScriptedProvider {
    fn read(&self, _table: &str) -> Result<Arc<dyn Connection>> {
        Ok(self.conn.clone())
    }

    fn write(&self, _table: &str) -> Result<Arc<dyn Connection>> {
        Ok(self.conn.clone())
    }
}

fn forum_locator(conn: &Arc<ScriptedConnection>) -> Arc<MapperLocator> {
    let provider = Arc::new(ScriptedProvider {
        conn: Arc::clone(conn),
    });
    let threads = TableInfo::new("threads")
        .key("thread_id")
        .autoincrement(true)
        .column("subject", Value::Null)
        .column("author_id", Value::Null);
    let authors = TableInfo::new("authors")
        .key("author_id")
        .autoincrement(true)
        .column("name", Value::Null);
    Arc::new(
        MapperLocator::new(provider)
            .entity(
                EntityConfig::new("thread", threads)
                    .relation(Relation::many_to_one("author", "author")),
            )
            .entity(EntityConfig::new("author", authors)),
    )
}

fn thread_result(id: i64, subject: &str, author_id: i64) -> ResultRow {
    ResultRow::new(
        vec![
            "thread_id".to_string(),
            "subject".to_string(),
            "author_id".to_string(),
        ],
        vec![
            Value::Int(id),
            Value::Text(subject.to_string()),
            Value::Int(author_id),
        ],
    )
}

#[test]
fn fetch_mutate_update_roundtrip() {
    let conn = ScriptedConnection::new();
    conn.push_rows(vec![thread_result(1, "hello", 10)]);
    let locator = forum_locator(&conn);
    let threads = locator.mapper("thread").unwrap();

    let thread = threads.fetch_record(Value::Int(1)).unwrap().unwrap();
    assert_eq!(thread.status(), RowStatus::Clean);

    // An update with no changes issues no SQL.
    assert_eq!(threads.update(&thread).unwrap(), UpdateStatus::NoChanges);
    assert!(conn.state().executes.is_empty());

    thread.set("subject", Value::Text("renamed".into())).unwrap();
    assert_eq!(thread.status(), RowStatus::Dirty);

    assert_eq!(threads.update(&thread).unwrap(), UpdateStatus::Updated);
    assert_eq!(thread.status(), RowStatus::Updated);

    // Only the changed column went over the wire.
    let (sql, params) = conn.state().executes.last().cloned().unwrap();
    assert!(sql.contains("\"subject\""));
    assert!(!sql.contains("\"author_id\" ="));
    assert_eq!(params, vec![Value::Text("renamed".into()), Value::Int(1)]);
}

#[test]
fn repeated_fetches_return_the_same_record_row() {
    let conn = ScriptedConnection::new();
    conn.push_rows(vec![thread_result(1, "hello", 10)]);
    let locator = forum_locator(&conn);
    let threads = locator.mapper("thread").unwrap();

    let by_key = threads.fetch_record(Value::Int(1)).unwrap().unwrap();
    // Criteria fetch of the same identity returns the mapped instance.
    conn.push_rows(vec![thread_result(1, "stale copy", 10)]);
    let by_criteria = threads
        .fetch_record_by(threads.select().where_eq("subject", "hello"))
        .unwrap()
        .unwrap();

    assert!(by_key.shares_row(&by_criteria));

    // A mutation through one handle is visible through the other.
    by_key.set("subject", Value::Text("edited".into())).unwrap();
    assert_eq!(
        by_criteria.get_value("subject").unwrap(),
        Value::Text("edited".into())
    );
}

#[test]
fn eager_stitch_via_public_api() {
    let conn = ScriptedConnection::new();
    conn.push_rows(vec![
        thread_result(1, "a", 10),
        thread_result(2, "b", 10),
    ]);
    conn.push_rows(vec![ResultRow::new(
        vec!["author_id".to_string(), "name".to_string()],
        vec![Value::Int(10), Value::Text("kim".to_string())],
    )]);
    let locator = forum_locator(&conn);
    let threads = locator.mapper("thread").unwrap();

    let set = threads.fetch_record_set_by(threads.select()).unwrap();
    resolve(&locator, set.records(), "author", None).unwrap();

    let slot = set.get(0).unwrap().related("author").unwrap();
    match slot {
        RelatedSlot::One(author) => {
            assert_eq!(author.get_value("name").unwrap(), Value::Text("kim".into()));
        }
        other => panic!("expected a stitched author, got {other:?}"),
    }
}

#[test]
fn transaction_plan_commits_atomically() {
    let conn = ScriptedConnection::new();
    conn.push_insert_id(1);
    conn.push_insert_id(2);
    let locator = forum_locator(&conn);
    let threads = locator.mapper("thread").unwrap();

    let mut plan = TransactionPlan::new(Arc::clone(&locator));
    plan.insert(threads.new_record(&[("subject", Value::Text("a".into()))]).unwrap())
        .unwrap();
    plan.insert(threads.new_record(&[("subject", Value::Text("b".into()))]).unwrap())
        .unwrap();

    assert!(plan.exec().unwrap());
    let state = conn.state();
    assert_eq!(state.begins, 1);
    assert_eq!(state.commits, 1);
    assert_eq!(state.rollbacks, 0);
    assert_eq!(state.executes.len(), 2);
}

#[test]
fn transaction_plan_rolls_back_on_first_failure() {
    let conn = ScriptedConnection::new();
    conn.push_insert_id(1);
    conn.fail_execute_at(1);
    let locator = forum_locator(&conn);
    let threads = locator.mapper("thread").unwrap();

    let good = threads
        .new_record(&[("subject", Value::Text("good".into()))])
        .unwrap();
    let bad = threads
        .new_record(&[("subject", Value::Text("bad".into()))])
        .unwrap();

    let mut plan = TransactionPlan::new(Arc::clone(&locator));
    plan.insert(good).unwrap();
    plan.insert(bad.clone()).unwrap();

    assert!(!plan.exec().unwrap());
    assert_eq!(plan.completed_work().len(), 1);
    assert!(plan.failure().unwrap().record().shares_row(&bad));
    assert!(plan.exception().unwrap().is_constraint_violation());

    let state = conn.state();
    assert_eq!(state.rollbacks, 1);
    assert_eq!(state.commits, 0);

    // The plan is spent.
    drop(state);
    assert!(plan.exec().is_err());
}
