use crate::domain::ledger::{ApplyOutcome, DropReason, Ledger};
use crate::domain::ports::AuditSinkRef;
use crate::domain::transaction::TransactionRequest;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Read-only access to the ledger.
///
/// Holding the guard returned by [`LedgerReader::read`] is the permit a teller
/// takes while it assesses a request. It only covers that read: the serializer
/// can apply other requests as soon as the guard is dropped.
#[derive(Clone)]
pub struct LedgerReader {
    inner: Arc<RwLock<Ledger>>,
}

impl LedgerReader {
    pub async fn read(&self) -> RwLockReadGuard<'_, Ledger> {
        self.inner.read().await
    }

    /// An owned copy of the current state.
    pub async fn snapshot(&self) -> Ledger {
        self.inner.read().await.clone()
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SerializerReport {
    pub applied: usize,
    pub dropped: usize,
    /// Applied mutations the audit log failed to record.
    pub audit_failures: usize,
}

/// The only component allowed to mutate the ledger.
///
/// Requests are applied strictly in the order they arrive on the ingress queue.
/// Each one is re-checked against the live ledger, so a request a teller
/// accepted on a stale read is dropped rather than driving a balance negative.
pub struct Serializer {
    ledger: Arc<RwLock<Ledger>>,
    audit: AuditSinkRef,
    report: SerializerReport,
}

impl Serializer {
    pub fn new(ledger: Ledger, audit: AuditSinkRef) -> Self {
        Self {
            ledger: Arc::new(RwLock::new(ledger)),
            audit,
            report: SerializerReport::default(),
        }
    }

    pub fn reader(&self) -> LedgerReader {
        LedgerReader {
            inner: Arc::clone(&self.ledger),
        }
    }

    /// Applies one request and records the mutation, if any, in the audit log.
    ///
    /// A failed audit append does not undo the mutation; it is counted in the
    /// report instead.
    pub async fn process(&mut self, req: TransactionRequest) -> ApplyOutcome {
        let outcome = self.ledger.write().await.apply(&req);
        self.report.tally(&outcome);

        match &outcome {
            ApplyOutcome::Applied(mutation) => {
                info!(session = %req.session_id, "{mutation}");
                if let Err(e) = self.audit.record(mutation).await {
                    self.report.audit_failures += 1;
                    error!(session = %req.session_id, error = %e, "failed to append to audit log");
                }
            }
            ApplyOutcome::Dropped(DropReason::FlaggedInfeasible) => {
                info!(session = %req.session_id, "Invalid request for {}", req.account);
            }
            ApplyOutcome::Dropped(reason @ DropReason::Stale(_)) => {
                warn!(
                    session = %req.session_id,
                    account = %req.account,
                    operation = %req.operation,
                    amount = %req.amount,
                    "{reason}"
                );
            }
        }
        outcome
    }

    /// Consumes the ingress queue until it closes or `cancel` fires.
    ///
    /// On cancellation the queue is closed to new senders and whatever is
    /// already buffered is still applied before returning.
    pub async fn run(
        mut self,
        mut ingress: mpsc::Receiver<TransactionRequest>,
        cancel: CancellationToken,
    ) -> SerializerReport {
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                msg = ingress.recv() => match msg {
                    Some(req) => {
                        self.process(req).await;
                    }
                    None => break,
                },
            }
        }

        ingress.close();
        while let Some(req) = ingress.recv().await {
            self.process(req).await;
        }

        let report = self.report;
        info!(
            applied = report.applied,
            dropped = report.dropped,
            audit_failures = report.audit_failures,
            "serializer stopped"
        );
        report
    }
}

impl SerializerReport {
    fn tally(&mut self, outcome: &ApplyOutcome) {
        match outcome {
            ApplyOutcome::Applied(_) => self.applied += 1,
            ApplyOutcome::Dropped(_) => self.dropped += 1,
        }
    }
}
