use crate::domain::account::Account;
use crate::domain::ledger::Mutation;
use crate::domain::ports::{AuditSink, SnapshotStore};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

/// A thread-safe in-memory snapshot.
///
/// Clones share the same underlying storage, so a test can keep one handle and
/// inspect what the engine saved through the other.
#[derive(Default, Clone)]
pub struct InMemorySnapshotStore {
    accounts: Arc<RwLock<Vec<Account>>>,
}

impl InMemorySnapshotStore {
    /// Creates a new, empty in-memory snapshot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a snapshot pre-populated with `accounts`.
    pub fn with_accounts(accounts: Vec<Account>) -> Self {
        Self {
            accounts: Arc::new(RwLock::new(accounts)),
        }
    }

    pub async fn accounts(&self) -> Vec<Account> {
        self.accounts.read().await.clone()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self) -> Result<Vec<Account>> {
        Ok(self.accounts.read().await.clone())
    }

    async fn save(&self, accounts: &[Account]) -> Result<()> {
        let mut stored = self.accounts.write().await;
        *stored = accounts.to_vec();
        Ok(())
    }
}

/// A thread-safe in-memory audit log, recording the same lines the file log would.
#[derive(Default, Clone)]
pub struct InMemoryAuditLog {
    lines: Arc<RwLock<Vec<String>>>,
    closed: Arc<RwLock<bool>>,
}

impl InMemoryAuditLog {
    /// Creates a new, empty in-memory audit log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mutation lines recorded since the last `open`.
    pub async fn lines(&self) -> Vec<String> {
        self.lines.read().await.clone()
    }

    pub async fn is_closed(&self) -> bool {
        *self.closed.read().await
    }
}

#[async_trait]
impl AuditSink for InMemoryAuditLog {
    async fn open(&self) -> Result<()> {
        self.lines.write().await.clear();
        *self.closed.write().await = false;
        Ok(())
    }

    async fn record(&self, mutation: &Mutation) -> Result<()> {
        self.lines.write().await.push(mutation.audit_line());
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        *self.closed.write().await = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::{AccountId, Amount, Balance};
    use crate::domain::ledger::Effect;

    #[tokio::test]
    async fn test_in_memory_snapshot_store() {
        let store = InMemorySnapshotStore::new();
        assert!(store.load().await.unwrap().is_empty());

        let accounts = vec![Account::new(AccountId::new("BankID_01"), Balance::new(5))];
        let handle = store.clone();
        store.save(&accounts).await.unwrap();

        assert_eq!(handle.accounts().await, accounts);
    }

    #[tokio::test]
    async fn test_in_memory_audit_log() {
        let log = InMemoryAuditLog::new();
        log.open().await.unwrap();
        log.record(&Mutation {
            account: AccountId::new("BankID_01"),
            amount: Amount::new(3).unwrap(),
            effect: Effect::Credited {
                balance: Balance::new(8),
            },
        })
        .await
        .unwrap();
        log.close().await.unwrap();

        assert_eq!(log.lines().await, vec!["BankID_01 D 3".to_string()]);
        assert!(log.is_closed().await);
    }
}
