//! The single active transaction of a connector, and the auto-commit wrapper that
//! brackets mutating operations with begin/commit or rollback.

use crate::engine::{trace, OperationState};
use crate::errors::{translate, ConnectorError, Result};
use crate::model::TransactionId;
use crate::options::TransactionMode;
use crate::request::RequestBuilder;
use crate::transport::{HttpResponse, Transport};
use lazy_static::lazy_static;
use log::{debug, info, warn};
use regex::Regex;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

const BEGIN_CONTEXT: &str = "beginning a transaction";

lazy_static! {
    // /response/tx/@txId, with tx the first child of response
    static ref TX_ID: Regex =
        Regex::new(r#"<response\b[^>]*>\s*<tx\b[^>]*?\btxId\s*=\s*["']([^"']*)["']"#).unwrap();
}

/// Continuation for callback-style operations; invoked exactly once.
pub type Done<T> = Box<dyn FnOnce(Result<T>) + Send + 'static>;

/// Work run inside [`TransactionCoordinator::run_auto_committed_async`]. Receives the
/// transaction to run under and how it is managed, and must call the continuation once.
pub type AsyncWork<T> = Box<dyn FnOnce(TransactionId, TransactionMode, Done<T>) + Send + 'static>;

/// How a transaction ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    Commit,
    Rollback,
}

impl Ending {
    fn context(self) -> &'static str {
        match self {
            Ending::Commit => "committing a transaction",
            Ending::Rollback => "rolling back a transaction",
        }
    }
}

/// Extracts the transaction id from the XML body of a begin response.
pub fn parse_transaction_id(body: &[u8]) -> Result<TransactionId> {
    let text = String::from_utf8_lossy(body);
    match TX_ID.captures(&text).and_then(|c| c.get(1)) {
        Some(id) if !id.as_str().trim().is_empty() => Ok(TransactionId::new(id.as_str().trim())),
        _ => {
            debug!("begin response without a transaction id: {}", text.trim());
            Err(ConnectorError::BeginFailed)
        }
    }
}

/// Owns the active-transaction slot of one connector. The slot is only touched under
/// its mutex, and the mutex is never held across a request.
pub struct TransactionCoordinator {
    builder: RequestBuilder,
    transport: Arc<dyn Transport>,
    active: Mutex<Option<TransactionId>>,
}

impl TransactionCoordinator {
    pub fn new(builder: RequestBuilder, transport: Arc<dyn Transport>) -> Self {
        TransactionCoordinator {
            builder,
            transport,
            active: Mutex::new(None),
        }
    }

    pub fn builder(&self) -> &RequestBuilder {
        &self.builder
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    fn slot(&self) -> MutexGuard<'_, Option<TransactionId>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Snapshot of the active transaction id.
    pub fn active(&self) -> Option<TransactionId> {
        self.slot().clone()
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.active() {
            Some(id) => Err(ConnectorError::TransactionState(format!(
                "cannot begin a transaction while transaction {id} is active"
            ))),
            None => Ok(()),
        }
    }

    fn require_active(&self, ending: Ending) -> Result<TransactionId> {
        self.active().ok_or_else(|| {
            ConnectorError::TransactionState(format!(
                "cannot end a transaction by {} when none is active",
                match ending {
                    Ending::Commit => "committing",
                    Ending::Rollback => "rolling back",
                }
            ))
        })
    }

    /// Installs `id` only if the slot is empty.
    fn install(&self, id: &TransactionId) -> bool {
        let mut slot = self.slot();
        if slot.is_some() {
            return false;
        }
        *slot = Some(id.clone());
        true
    }

    /// Clears the slot only if it still holds `id`.
    fn clear_if(&self, id: &TransactionId) -> bool {
        let mut slot = self.slot();
        if slot.as_ref() == Some(id) {
            *slot = None;
            true
        } else {
            false
        }
    }

    fn lost_race(id: &TransactionId) -> ConnectorError {
        ConnectorError::TransactionState(format!(
            "another transaction became active while transaction {id} was being created"
        ))
    }

    fn finish_begin(&self, outcome: anyhow::Result<HttpResponse>) -> Result<TransactionId> {
        let response = translate(BEGIN_CONTEXT, outcome)?;
        parse_transaction_id(&response.body)
    }

    fn finish_end(
        &self,
        id: &TransactionId,
        ending: Ending,
        outcome: anyhow::Result<HttpResponse>,
    ) -> Result<()> {
        if !self.clear_if(id) {
            debug!("transaction {id} was no longer the active one");
        }
        translate(ending.context(), outcome)?;
        info!(
            "transaction {id} {}",
            match ending {
                Ending::Commit => "committed",
                Ending::Rollback => "rolled back",
            }
        );
        Ok(())
    }

    /// Starts a transaction and makes it the active one.
    pub fn begin(&self) -> Result<TransactionId> {
        self.ensure_idle()?;
        let id = self.finish_begin(self.transport.send(self.builder.begin_transaction()))?;
        if self.install(&id) {
            info!("transaction {id} started");
            return Ok(id);
        }
        warn!("aborting transaction {id}: another transaction became active first");
        if let Err(e) = translate(
            Ending::Rollback.context(),
            self.transport.send(self.builder.rollback_transaction(&id)),
        ) {
            warn!("failed to abort transaction {id}: {e}");
        }
        Err(Self::lost_race(&id))
    }

    pub fn begin_async(self: &Arc<Self>, done: Done<TransactionId>) {
        if let Err(e) = self.ensure_idle() {
            return done(Err(e));
        }
        let this = Arc::clone(self);
        self.transport.send_async(
            self.builder.begin_transaction(),
            Box::new(move |outcome| {
                let id = match this.finish_begin(outcome) {
                    Ok(id) => id,
                    Err(e) => return done(Err(e)),
                };
                if this.install(&id) {
                    info!("transaction {id} started");
                    return done(Ok(id));
                }
                warn!("aborting transaction {id}: another transaction became active first");
                let request = this.builder.rollback_transaction(&id);
                this.transport.send_async(
                    request,
                    Box::new(move |outcome| {
                        if let Err(e) = translate(Ending::Rollback.context(), outcome) {
                            warn!("failed to abort transaction {id}: {e}");
                        }
                        done(Err(Self::lost_race(&id)))
                    }),
                );
            }),
        );
    }

    /// Ends `id`. The active slot is cleared if it still holds `id`, whatever the outcome.
    pub fn end(&self, id: &TransactionId, ending: Ending) -> Result<()> {
        let request = match ending {
            Ending::Commit => self.builder.commit_transaction(id),
            Ending::Rollback => self.builder.rollback_transaction(id),
        };
        self.finish_end(id, ending, self.transport.send(request))
    }

    pub fn end_async(self: &Arc<Self>, id: TransactionId, ending: Ending, done: Done<()>) {
        let request = match ending {
            Ending::Commit => self.builder.commit_transaction(&id),
            Ending::Rollback => self.builder.rollback_transaction(&id),
        };
        let this = Arc::clone(self);
        self.transport.send_async(
            request,
            Box::new(move |outcome| done(this.finish_end(&id, ending, outcome))),
        );
    }

    pub fn commit(&self) -> Result<()> {
        let id = self.require_active(Ending::Commit)?;
        self.end(&id, Ending::Commit)
    }

    pub fn rollback(&self) -> Result<()> {
        let id = self.require_active(Ending::Rollback)?;
        self.end(&id, Ending::Rollback)
    }

    pub fn commit_async(self: &Arc<Self>, done: Done<()>) {
        match self.require_active(Ending::Commit) {
            Ok(id) => self.end_async(id, Ending::Commit, done),
            Err(e) => done(Err(e)),
        }
    }

    pub fn rollback_async(self: &Arc<Self>, done: Done<()>) {
        match self.require_active(Ending::Rollback) {
            Ok(id) => self.end_async(id, Ending::Rollback, done),
            Err(e) => done(Err(e)),
        }
    }

    /// Runs `work` inside a transaction. An active transaction is joined and left
    /// alone. Otherwise one is started, committed when `work` succeeds and rolled
    /// back once when it fails; a failed rollback is logged and the original error
    /// is returned.
    pub fn run_auto_committed<T>(
        &self,
        operation: &str,
        work: impl FnOnce(&TransactionId, TransactionMode) -> Result<T>,
    ) -> Result<T> {
        trace(operation, OperationState::Idle);
        if let Some(id) = self.active() {
            trace(operation, OperationState::TransactionAcquired);
            return work(&id, TransactionMode::CallerManaged).inspect_err(|_| {
                trace(operation, OperationState::FailedNoCommit);
            });
        }

        let id = self.begin().inspect_err(|_| {
            trace(operation, OperationState::FailedNoCommit);
        })?;
        trace(operation, OperationState::TransactionAcquired);
        match work(&id, TransactionMode::AutoManaged) {
            Ok(value) => match self.end(&id, Ending::Commit) {
                Ok(()) => {
                    trace(operation, OperationState::Committed);
                    Ok(value)
                }
                Err(e) => {
                    trace(operation, OperationState::FailedNoCommit);
                    Err(ConnectorError::CommitFailed {
                        source: Box::new(e),
                    })
                }
            },
            Err(e) => {
                let rolled_back = self.end(&id, Ending::Rollback);
                self.report_rollback(operation, &id, rolled_back);
                Err(e)
            }
        }
    }

    /// Callback form of [`TransactionCoordinator::run_auto_committed`]. `done` runs
    /// after any commit or rollback has finished.
    pub fn run_auto_committed_async<T: Send + 'static>(
        self: &Arc<Self>,
        operation: &'static str,
        work: AsyncWork<T>,
        done: Done<T>,
    ) {
        trace(operation, OperationState::Idle);
        if let Some(id) = self.active() {
            trace(operation, OperationState::TransactionAcquired);
            return work(
                id,
                TransactionMode::CallerManaged,
                Box::new(move |result| {
                    if result.is_err() {
                        trace(operation, OperationState::FailedNoCommit);
                    }
                    done(result)
                }),
            );
        }

        let this = Arc::clone(self);
        self.begin_async(Box::new(move |begun| {
            let id = match begun {
                Ok(id) => id,
                Err(e) => {
                    trace(operation, OperationState::FailedNoCommit);
                    return done(Err(e));
                }
            };
            trace(operation, OperationState::TransactionAcquired);
            let tx = id.clone();
            work(
                id,
                TransactionMode::AutoManaged,
                Box::new(move |result| match result {
                    Ok(value) => this.end_async(
                        tx,
                        Ending::Commit,
                        Box::new(move |committed| match committed {
                            Ok(()) => {
                                trace(operation, OperationState::Committed);
                                done(Ok(value))
                            }
                            Err(e) => {
                                trace(operation, OperationState::FailedNoCommit);
                                done(Err(ConnectorError::CommitFailed {
                                    source: Box::new(e),
                                }))
                            }
                        }),
                    ),
                    Err(e) => {
                        let coordinator = Arc::clone(&this);
                        let id = tx.clone();
                        this.end_async(
                            tx,
                            Ending::Rollback,
                            Box::new(move |rolled_back| {
                                coordinator.report_rollback(operation, &id, rolled_back);
                                done(Err(e))
                            }),
                        )
                    }
                }),
            );
        }));
    }

    fn report_rollback(&self, operation: &str, id: &TransactionId, outcome: Result<()>) {
        match outcome {
            Ok(()) => trace(operation, OperationState::RolledBack),
            Err(e) => {
                warn!("{operation}: rollback of transaction {id} failed: {e}");
                trace(operation, OperationState::FailedNoCommit);
            }
        }
    }
}
