//! The transaction planner: an ordered, once-executable unit of work.
//!
//! A plan accumulates single-use work items (insert/update/delete, each
//! bound to one record) and executes them strictly in insertion order
//! inside a begin/commit/rollback boundary spanning every write
//! connection the items touch. The first failure stops execution,
//! rolls back everything, and leaves the failing item and its error
//! available for inspection. Ordering is the caller's contract: the
//! planner never reorders or infers dependencies.

use crate::gateway::TableGateway;
use crate::locator::MapperLocator;
use crate::record::Record;
use relmap_core::connection::Connection;
use relmap_core::error::{Error, Result, TransactionErrorKind};
use std::fmt;
use std::sync::Arc;

/// The operation a work item performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkKind {
    /// Insert the record's row
    Insert,
    /// Update the record's row (empty diffs complete as no-ops)
    Update,
    /// Delete the record's row
    Delete,
}

impl WorkKind {
    /// Human-readable operation name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            WorkKind::Insert => "insert",
            WorkKind::Update => "update",
            WorkKind::Delete => "delete",
        }
    }
}

/// One planned mutation, bound to one record and invokable at most once.
///
/// The target entity's write connection is resolved when the item is
/// planned, not when it runs, so the plan knows every transaction
/// boundary before touching storage.
pub struct WorkItem {
    label: String,
    kind: WorkKind,
    record: Record,
    gateway: TableGateway,
    connection: Arc<dyn Connection>,
    invoked: bool,
}

impl WorkItem {
    pub(crate) fn plan(
        kind: WorkKind,
        record: Record,
        locator: &Arc<MapperLocator>,
    ) -> Result<Self> {
        let entity = Arc::clone(record.entity());
        let connection = locator.provider().write(entity.table().table())?;
        let label = format!("{} {}", kind.as_str(), entity.name());
        let gateway = TableGateway::new(entity, Arc::clone(locator));
        Ok(Self {
            label,
            kind,
            record,
            gateway,
            connection,
            invoked: false,
        })
    }

    /// A short description of this item ("insert thread").
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The planned operation.
    pub const fn kind(&self) -> WorkKind {
        self.kind
    }

    /// The record this item operates on.
    pub fn record(&self) -> &Record {
        &self.record
    }

    /// Whether this item already ran.
    pub const fn has_run(&self) -> bool {
        self.invoked
    }

    /// The write connection this item was planned against.
    pub(crate) fn connection(&self) -> &Arc<dyn Connection> {
        &self.connection
    }

    /// Run the underlying operation; a second invocation fails with
    /// `PriorWork` and does not repeat the write.
    pub(crate) fn invoke(&mut self) -> Result<()> {
        if self.invoked {
            return Err(Error::transaction(
                TransactionErrorKind::PriorWork,
                format!("work item '{}' already ran", self.label),
            ));
        }
        self.invoked = true;
        tracing::debug!(label = %self.label, "executing work item");
        match self.kind {
            WorkKind::Insert => self.gateway.insert_on(self.connection.as_ref(), self.record.row()),
            WorkKind::Update => self
                .gateway
                .update_on(self.connection.as_ref(), self.record.row())
                .map(|_| ()),
            WorkKind::Delete => self.gateway.delete_on(self.connection.as_ref(), self.record.row()),
        }
    }
}

impl fmt::Debug for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkItem")
            .field("label", &self.label)
            .field("kind", &self.kind)
            .field("invoked", &self.invoked)
            .finish()
    }
}

/// Lifecycle of a transaction plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanState {
    /// Accepting work items
    Planning,
    /// `exec()` is running
    Executing,
    /// All items succeeded and every connection committed
    Committed,
    /// A failure occurred and every connection rolled back
    RolledBack,
}

/// An ordered, once-executable batch of work items.
pub struct TransactionPlan {
    locator: Arc<MapperLocator>,
    work: Vec<WorkItem>,
    state: PlanState,
    completed: usize,
    failed: Option<usize>,
    error: Option<Error>,
}

impl TransactionPlan {
    /// Start a plan against the given session.
    pub fn new(locator: Arc<MapperLocator>) -> Self {
        Self {
            locator,
            work: Vec::new(),
            state: PlanState::Planning,
            completed: 0,
            failed: None,
            error: None,
        }
    }

    /// Plan an insert.
    pub fn insert(&mut self, record: Record) -> Result<()> {
        self.push(WorkKind::Insert, record)
    }

    /// Plan an update.
    pub fn update(&mut self, record: Record) -> Result<()> {
        self.push(WorkKind::Update, record)
    }

    /// Plan a delete.
    pub fn delete(&mut self, record: Record) -> Result<()> {
        self.push(WorkKind::Delete, record)
    }

    fn push(&mut self, kind: WorkKind, record: Record) -> Result<()> {
        if self.state != PlanState::Planning {
            return Err(self.prior_transaction());
        }
        let item = WorkItem::plan(kind, record, &self.locator)?;
        self.work.push(item);
        Ok(())
    }

    /// Execute the plan.
    ///
    /// Returns `Ok(true)` when every item succeeded and all connections
    /// committed; `Ok(false)` when an item failed and everything rolled
    /// back (inspect [`failure`](Self::failure) and
    /// [`exception`](Self::exception)). Executing a completed plan fails
    /// with `PriorTransaction`.
    #[tracing::instrument(level = "debug", skip(self), fields(items = self.work.len()))]
    pub fn exec(&mut self) -> Result<bool> {
        if self.state != PlanState::Planning {
            return Err(self.prior_transaction());
        }
        self.state = PlanState::Executing;

        // Distinct write connections, in first-touch order.
        let mut connections: Vec<Arc<dyn Connection>> = Vec::new();
        for item in &self.work {
            if !connections.iter().any(|c| Arc::ptr_eq(c, item.connection())) {
                connections.push(Arc::clone(item.connection()));
            }
        }

        let mut begun: Vec<&Arc<dyn Connection>> = Vec::new();
        for conn in &connections {
            if let Err(e) = conn.begin() {
                self.rollback_all(&begun);
                self.state = PlanState::RolledBack;
                return Err(e);
            }
            begun.push(conn);
        }

        for index in 0..self.work.len() {
            match self.work[index].invoke() {
                Ok(()) => self.completed = index + 1,
                Err(error) => {
                    tracing::warn!(
                        label = %self.work[index].label(),
                        %error,
                        "work item failed, rolling back"
                    );
                    self.rollback_all(&begun);
                    self.failed = Some(index);
                    self.error = Some(error);
                    self.state = PlanState::RolledBack;
                    return Ok(false);
                }
            }
        }

        for conn in &connections {
            if let Err(error) = conn.commit() {
                tracing::error!(%error, "commit failed, rolling back");
                self.rollback_all(&begun);
                self.error = Some(error);
                self.state = PlanState::RolledBack;
                return Ok(false);
            }
        }
        self.state = PlanState::Committed;
        Ok(true)
    }

    fn rollback_all(&self, connections: &[&Arc<dyn Connection>]) {
        for conn in connections {
            if let Err(error) = conn.rollback() {
                tracing::error!(%error, "rollback failed");
            }
        }
    }

    fn prior_transaction(&self) -> Error {
        Error::transaction(
            TransactionErrorKind::PriorTransaction,
            "transaction plan already executed",
        )
    }

    /// Current lifecycle state.
    pub const fn state(&self) -> PlanState {
        self.state
    }

    /// Number of planned items (before exec) / total items (after).
    pub fn pending_count(&self) -> usize {
        self.work.len()
    }

    /// The items that completed successfully, in execution order.
    pub fn completed_work(&self) -> &[WorkItem] {
        &self.work[..self.completed]
    }

    /// The item that broke the transaction, if any.
    pub fn failure(&self) -> Option<&WorkItem> {
        self.failed.map(|i| &self.work[i])
    }

    /// The error that broke the transaction, if any.
    pub fn exception(&self) -> Option<&Error> {
        self.error.as_ref()
    }
}
