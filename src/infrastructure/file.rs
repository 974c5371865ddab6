use crate::domain::account::{Account, AccountId, Balance};
use crate::domain::ledger::Mutation;
use crate::domain::ports::{AuditSink, SnapshotStore};
use crate::error::Result;
use async_trait::async_trait;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

pub const AUDIT_TRAILER: &str = "## end of log.";

/// Plain-text snapshot, one `<accountId> <balance>` line per account.
///
/// Saving writes a temporary file next to the target and renames it over the
/// old snapshot, so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct FileSnapshotStore {
    path: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Parses snapshot text, skipping lines that are not exactly `<id> <balance>`.
///
/// Fields may be separated by any run of spaces or tabs.
pub fn parse_snapshot(data: &[u8]) -> Result<Vec<Account>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(data);

    let mut accounts = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        let fields: Vec<&str> = record.iter().flat_map(str::split_whitespace).collect();
        match fields.as_slice() {
            [id, balance] => match balance.parse::<u64>() {
                Ok(balance) => accounts.push(Account::new(AccountId::new(*id), Balance::new(balance))),
                Err(_) => warn!(line = line + 1, "skipping snapshot entry with invalid balance"),
            },
            _ => warn!(line = line + 1, "skipping malformed snapshot entry"),
        }
    }
    Ok(accounts)
}

fn write_snapshot<W: Write>(out: W, accounts: &[Account]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(b' ')
        .has_headers(false)
        .from_writer(out);
    for account in accounts {
        let balance = account.balance.to_string();
        writer.write_record([account.id.as_str(), balance.as_str()])?;
    }
    writer.flush()?;
    Ok(())
}

#[async_trait]
impl SnapshotStore for FileSnapshotStore {
    async fn load(&self) -> Result<Vec<Account>> {
        match tokio::fs::read(&self.path).await {
            Ok(data) => {
                let accounts = parse_snapshot(&data)?;
                info!(path = %self.path.display(), accounts = accounts.len(), "loaded ledger snapshot");
                Ok(accounts)
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                warn!(path = %self.path.display(), "no snapshot found, starting with an empty ledger");
                Ok(Vec::new())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, accounts: &[Account]) -> Result<()> {
        let path = self.path.clone();
        let accounts = accounts.to_vec();
        tokio::task::spawn_blocking(move || -> Result<()> {
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
            write_snapshot(tmp.as_file_mut(), &accounts)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await??;
        info!(path = %self.path.display(), "ledger snapshot written");
        Ok(())
    }
}

/// Text audit log: a timestamped header, one `<accountId> <D|W> <amount>` line
/// per applied mutation, and a trailer.
#[derive(Debug, Clone)]
pub struct FileAuditLog {
    path: PathBuf,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn append(&self, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(format!("{line}\n").as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

/// `# Adabank Log file updated @HH:MM Month DD YYYY` in local time.
pub fn audit_header() -> String {
    let now = chrono::Local::now();
    format!("# Adabank Log file updated @{}", now.format("%H:%M %B %d %Y"))
}

#[async_trait]
impl AuditSink for FileAuditLog {
    async fn open(&self) -> Result<()> {
        tokio::fs::write(&self.path, format!("{}\n", audit_header())).await?;
        Ok(())
    }

    async fn record(&self, mutation: &Mutation) -> Result<()> {
        self.append(&mutation.audit_line()).await
    }

    async fn close(&self) -> Result<()> {
        self.append(AUDIT_TRAILER).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::account::Amount;
    use crate::domain::ledger::Effect;
    use tempfile::tempdir;

    #[test]
    fn test_parse_snapshot_skips_malformed_lines() {
        let data = "BankID_01 100\nBankID_02\nBankID_03 abc\n\nBankID_04  7\nBankID_05 1 2\n";
        let accounts = parse_snapshot(data.as_bytes()).unwrap();

        let ids: Vec<&str> = accounts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, ["BankID_01", "BankID_04"]);
        assert_eq!(accounts[1].balance, Balance::new(7));
    }

    #[test]
    fn test_parse_snapshot_accepts_tabs() {
        let data = "BankID_01\t100\nBankID_02 \t 5\n";
        let accounts = parse_snapshot(data.as_bytes()).unwrap();

        assert_eq!(
            accounts,
            vec![
                Account::new(AccountId::new("BankID_01"), Balance::new(100)),
                Account::new(AccountId::new("BankID_02"), Balance::new(5)),
            ]
        );
    }

    #[tokio::test]
    async fn test_missing_snapshot_is_empty() {
        let dir = tempdir().unwrap();
        let store = FileSnapshotStore::new(dir.path().join("nope.txt"));
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_save_then_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("database.txt");
        std::fs::write(&path, "stale 1\n").unwrap();
        let store = FileSnapshotStore::new(&path);

        let accounts = vec![
            Account::new(AccountId::new("BankID_02"), Balance::new(20)),
            Account::new(AccountId::new("BankID_01"), Balance::new(10)),
        ];
        store.save(&accounts).await.unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "BankID_02 20\nBankID_01 10\n"
        );
        assert_eq!(store.load().await.unwrap(), accounts);
    }

    #[tokio::test]
    async fn test_audit_log_layout() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bank.log");
        std::fs::write(&path, "left over from a previous run\n").unwrap();
        let log = FileAuditLog::new(&path);

        log.open().await.unwrap();
        log.record(&Mutation {
            account: AccountId::new("BankID_01"),
            amount: Amount::new(100).unwrap(),
            effect: Effect::Opened,
        })
        .await
        .unwrap();
        log.record(&Mutation {
            account: AccountId::new("BankID_01"),
            amount: Amount::new(40).unwrap(),
            effect: Effect::Debited {
                balance: Balance::new(60),
            },
        })
        .await
        .unwrap();
        log.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("# Adabank Log file updated @"));
        assert_eq!(lines[1], "BankID_01 D 100");
        assert_eq!(lines[2], "BankID_01 W 40");
        assert_eq!(lines[3], AUDIT_TRAILER);
    }
}
