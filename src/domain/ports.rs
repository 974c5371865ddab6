use super::account::Account;
use super::ledger::Mutation;
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Where the ledger lives between runs.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Returns every persisted account in stored order. A missing snapshot is an empty one.
    async fn load(&self) -> Result<Vec<Account>>;
    /// Replaces the whole snapshot with `accounts`.
    async fn save(&self, accounts: &[Account]) -> Result<()>;
}

/// Append-only record of applied mutations.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Starts a fresh log with a timestamped header.
    async fn open(&self) -> Result<()>;
    async fn record(&self, mutation: &Mutation) -> Result<()>;
    /// Writes the closing record.
    async fn close(&self) -> Result<()>;
}

pub type SnapshotStoreBox = Box<dyn SnapshotStore>;
/// Shared between the serializer, which records, and the engine, which opens and closes.
pub type AuditSinkRef = Arc<dyn AuditSink>;
