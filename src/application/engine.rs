use super::listener::{Listener, ListenerReport};
use super::serializer::{LedgerReader, Serializer, SerializerReport};
use crate::config::BankConfig;
use crate::domain::account::Account;
use crate::domain::ledger::Ledger;
use crate::domain::ports::{AuditSinkRef, SnapshotStoreBox};
use crate::error::Result;
use crate::infrastructure::file::{FileAuditLog, FileSnapshotStore};
use crate::interfaces::session::BankClient;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// Summary of a completed run.
#[derive(Debug, Clone, PartialEq)]
pub struct ShutdownReport {
    pub listener: ListenerReport,
    pub serializer: SerializerReport,
    /// The accounts written to the snapshot.
    pub accounts: Vec<Account>,
}

/// The running bank: one serializer, one listener, and a teller per session.
///
/// `BankEngine` owns the storage backends and the cancellation token every
/// task watches. Dropping it without calling [`BankEngine::shutdown`] leaves
/// the snapshot untouched.
pub struct BankEngine {
    client: BankClient,
    ledger: LedgerReader,
    cancel: CancellationToken,
    listener: JoinHandle<ListenerReport>,
    serializer: JoinHandle<SerializerReport>,
    snapshot: SnapshotStoreBox,
    audit: AuditSinkRef,
}

impl BankEngine {
    /// Loads the ledger, starts the audit log and spawns the long-lived tasks.
    ///
    /// Any failure here is fatal: the bank does not start half-initialised.
    pub async fn start(
        config: &BankConfig,
        snapshot: SnapshotStoreBox,
        audit: AuditSinkRef,
    ) -> Result<Self> {
        let accounts = snapshot.load().await?;
        let ledger = Ledger::from_accounts(accounts, config.capacity);
        audit.open().await?;
        info!(
            accounts = ledger.len(),
            capacity = ledger.capacity(),
            next_id = ?ledger.next_id(),
            "Adabank is active, waiting for clients"
        );

        let cancel = CancellationToken::new();
        let (announce_tx, announce_rx) = mpsc::channel(config.announce_capacity);
        let (ingress_tx, ingress_rx) = mpsc::channel(config.ingress_capacity);

        let serializer = Serializer::new(ledger, Arc::clone(&audit));
        let reader = serializer.reader();
        let serializer = tokio::spawn(serializer.run(ingress_rx, cancel.clone()));

        let listener = Listener::new(announce_rx, reader.clone(), ingress_tx);
        let listener = tokio::spawn(listener.run(cancel.clone()));

        Ok(Self {
            client: BankClient::new(announce_tx),
            ledger: reader,
            cancel,
            listener,
            serializer,
            snapshot,
            audit,
        })
    }

    /// Starts a bank backed by the snapshot and audit files named in `config`.
    pub async fn from_config(config: &BankConfig) -> Result<Self> {
        let snapshot: SnapshotStoreBox = Box::new(FileSnapshotStore::new(&config.snapshot_path));
        let audit: AuditSinkRef = Arc::new(FileAuditLog::new(&config.audit_path));
        Self::start(config, snapshot, audit).await
    }

    /// A handle clients use to open sessions.
    pub fn client(&self) -> BankClient {
        self.client.clone()
    }

    pub fn ledger(&self) -> LedgerReader {
        self.ledger.clone()
    }

    /// Stops accepting sessions, aborts in-flight tellers, lets the serializer
    /// drain what was already queued, then persists the ledger and closes the log.
    ///
    /// The ledger is written even if a task died; its join error is returned
    /// after the snapshot is safe.
    pub async fn shutdown(self) -> Result<ShutdownReport> {
        info!("shutdown requested, closing active tellers");
        self.cancel.cancel();
        drop(self.client);

        let listener = self.listener.await;
        let serializer = self.serializer.await;
        if let Err(e) = &listener {
            error!(error = %e, "listener task failed");
        }
        if let Err(e) = &serializer {
            error!(error = %e, "serializer task failed");
        }

        let accounts = self.ledger.snapshot().await.accounts().to_vec();
        self.snapshot.save(&accounts).await?;
        self.audit.close().await?;

        let (listener, serializer) = (listener?, serializer?);
        if serializer.audit_failures > 0 {
            warn!(
                missing = serializer.audit_failures,
                "audit log is missing applied mutations"
            );
        }
        info!(accounts = accounts.len(), "Adabank says \"Bye\"...");

        Ok(ShutdownReport {
            listener,
            serializer,
            accounts,
        })
    }
}
