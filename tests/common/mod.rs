#![allow(dead_code)]

use adabank::application::engine::BankEngine;
use adabank::application::serializer::LedgerReader;
use adabank::config::BankConfig;
use adabank::domain::account::{Account, AccountId, Amount, Balance};
use adabank::domain::ledger::Ledger;
use adabank::domain::transaction::{AccountRef, OperationKind};
use adabank::infrastructure::in_memory::{InMemoryAuditLog, InMemorySnapshotStore};
use adabank::interfaces::session::ClientRequest;
use rand::Rng;
use std::fs::File;
use std::io::{Error, Write};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub fn account(id: &str, balance: u64) -> Account {
    Account::new(AccountId::new(id), Balance::new(balance))
}

pub fn deposit(account: &str, amount: u64) -> ClientRequest {
    ClientRequest::new(
        account.parse::<AccountRef>().unwrap(),
        OperationKind::Deposit,
        Amount::new(amount).unwrap(),
    )
}

pub fn withdraw(account: &str, amount: u64) -> ClientRequest {
    ClientRequest::new(
        account.parse::<AccountRef>().unwrap(),
        OperationKind::Withdraw,
        Amount::new(amount).unwrap(),
    )
}

pub async fn start_bank(
    accounts: Vec<Account>,
) -> (BankEngine, InMemorySnapshotStore, InMemoryAuditLog) {
    let store = InMemorySnapshotStore::with_accounts(accounts);
    let audit = InMemoryAuditLog::new();
    let engine = BankEngine::start(
        &BankConfig::default(),
        Box::new(store.clone()),
        Arc::new(audit.clone()),
    )
    .await
    .expect("bank failed to start");
    (engine, store, audit)
}

pub fn write_lines(path: &Path, lines: &[&str]) -> Result<(), Error> {
    let mut file = File::create(path)?;
    for line in lines {
        writeln!(file, "{line}")?;
    }
    Ok(())
}

/// Writes `rows` random deposits against `account` and returns their sum.
pub fn generate_deposits(path: &Path, account: &str, rows: usize) -> Result<u64, Error> {
    let mut rng = rand::thread_rng();
    let mut file = File::create(path)?;
    let mut total = 0;
    for _ in 0..rows {
        let amount: u64 = rng.gen_range(1..=1_000);
        total += amount;
        writeln!(file, "{account} deposit {amount}")?;
    }
    Ok(total)
}

/// Tellers answer before the serializer applies, so tests that chain requests
/// wait for the ledger to catch up.
pub async fn wait_until(ledger: &LedgerReader, done: impl Fn(&Ledger) -> bool) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if done(&*ledger.read().await) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("ledger never reached the expected state");
}
