use super::serializer::LedgerReader;
use super::teller::Teller;
use crate::domain::ledger::Assessment;
use crate::domain::transaction::{SessionId, TransactionRequest};
use crate::error::Result;
use crate::interfaces::session::SessionAnnouncement;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ListenerReport {
    /// Sessions whose teller ran to completion.
    pub served: usize,
    /// Sessions abandoned because of a channel failure.
    pub failed: usize,
    /// Tellers still running when shutdown aborted them.
    pub aborted: usize,
}

/// Accepts session announcements and runs one teller per session.
pub struct Listener {
    announcements: mpsc::Receiver<SessionAnnouncement>,
    ledger: LedgerReader,
    ingress: mpsc::Sender<TransactionRequest>,
}

impl Listener {
    pub fn new(
        announcements: mpsc::Receiver<SessionAnnouncement>,
        ledger: LedgerReader,
        ingress: mpsc::Sender<TransactionRequest>,
    ) -> Self {
        Self {
            announcements,
            ledger,
            ingress,
        }
    }

    /// Serves sessions until `cancel` fires or every client handle is dropped.
    ///
    /// Finished tellers are reaped as they complete. On cancellation tellers
    /// still in flight are aborted; when the announcement queue closes they are
    /// allowed to finish.
    pub async fn run(mut self, cancel: CancellationToken) -> ListenerReport {
        let mut tellers: JoinSet<(SessionId, Result<Assessment>)> = JoinSet::new();
        let mut report = ListenerReport::default();

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.aborted = tellers.len();
                    tellers.shutdown().await;
                    break;
                }
                Some(finished) = tellers.join_next(), if !tellers.is_empty() => {
                    report.reap(finished);
                }
                announcement = self.announcements.recv() => match announcement {
                    Some(SessionAnnouncement { session_id, reply }) => {
                        info!(session = %session_id, "teller is active serving the client");
                        let teller = Teller::new(session_id, reply, self.ledger.clone(), self.ingress.clone());
                        tellers.spawn(async move { (session_id, teller.serve().await) });
                    }
                    None => {
                        while let Some(finished) = tellers.join_next().await {
                            report.reap(finished);
                        }
                        break;
                    }
                },
            }
        }

        info!(
            served = report.served,
            failed = report.failed,
            aborted = report.aborted,
            "listener stopped"
        );
        report
    }
}

impl ListenerReport {
    fn reap(&mut self, finished: std::result::Result<(SessionId, Result<Assessment>), JoinError>) {
        match finished {
            Ok((session_id, Ok(_))) => {
                debug!(session = %session_id, "teller finished");
                self.served += 1;
            }
            Ok((session_id, Err(e))) => {
                error!(session = %session_id, error = %e, "session abandoned");
                self.failed += 1;
            }
            Err(e) if e.is_cancelled() => self.aborted += 1,
            Err(e) => {
                error!(error = %e, "teller panicked");
                self.failed += 1;
            }
        }
    }
}
