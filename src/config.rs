use std::path::PathBuf;

/// Default snapshot file, one `<id> <balance>` line per account.
pub const DEFAULT_SNAPSHOT_PATH: &str = "database.txt";
/// Default append-only audit log.
pub const DEFAULT_AUDIT_PATH: &str = "AdaBank.bankLog";
/// Fixed number of accounts the ledger can hold.
pub const DEFAULT_CAPACITY: usize = 100;
pub const DEFAULT_INGRESS_CAPACITY: usize = 64;
pub const DEFAULT_ANNOUNCE_CAPACITY: usize = 64;

/// Runtime settings for a [`BankEngine`](crate::application::engine::BankEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct BankConfig {
    /// Where the ledger is loaded from at startup and rewritten at shutdown.
    pub snapshot_path: PathBuf,
    /// Where applied mutations are recorded.
    pub audit_path: PathBuf,
    /// Maximum number of accounts.
    pub capacity: usize,
    /// Buffer size of the serializer ingress queue. Tellers block once it is full.
    pub ingress_capacity: usize,
    /// Buffer size of the session announcement queue.
    pub announce_capacity: usize,
}

impl Default for BankConfig {
    fn default() -> Self {
        Self {
            snapshot_path: PathBuf::from(DEFAULT_SNAPSHOT_PATH),
            audit_path: PathBuf::from(DEFAULT_AUDIT_PATH),
            capacity: DEFAULT_CAPACITY,
            ingress_capacity: DEFAULT_INGRESS_CAPACITY,
            announce_capacity: DEFAULT_ANNOUNCE_CAPACITY,
        }
    }
}

impl BankConfig {
    pub fn with_paths(snapshot_path: impl Into<PathBuf>, audit_path: impl Into<PathBuf>) -> Self {
        Self {
            snapshot_path: snapshot_path.into(),
            audit_path: audit_path.into(),
            ..Self::default()
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }
}
