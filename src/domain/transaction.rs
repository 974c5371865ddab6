use super::account::{AccountId, Amount};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// Client-side token asking the bank to open a new account.
pub const NEW_ACCOUNT_SENTINEL: &str = "N";

/// Identifies one client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The account a request targets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AccountRef {
    /// Open a new account with the deposited amount.
    New,
    Existing(AccountId),
}

impl FromStr for AccountRef {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s == NEW_ACCOUNT_SENTINEL {
            Self::New
        } else {
            Self::Existing(AccountId::new(s))
        })
    }
}

impl fmt::Display for AccountRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::New => f.write_str(NEW_ACCOUNT_SENTINEL),
            Self::Existing(id) => id.fmt(f),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Deposit,
    Withdraw,
    /// Anything the bank does not understand. Never feasible.
    Unknown(String),
}

impl FromStr for OperationKind {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "deposit" => Self::Deposit,
            "withdraw" => Self::Withdraw,
            other => Self::Unknown(other.to_string()),
        })
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deposit => f.write_str("deposit"),
            Self::Withdraw => f.write_str("withdraw"),
            Self::Unknown(op) => f.write_str(op),
        }
    }
}

/// A transaction travelling from client to teller, and from teller to serializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub session_id: SessionId,
    pub account: AccountRef,
    pub operation: OperationKind,
    pub amount: Amount,
    /// Set by the teller once it has assessed the request. Clients always send `false`.
    pub feasible: bool,
}

impl TransactionRequest {
    pub fn new(
        session_id: SessionId,
        account: AccountRef,
        operation: OperationKind,
        amount: Amount,
    ) -> Self {
        Self {
            session_id,
            account,
            operation,
            amount,
            feasible: false,
        }
    }
}

/// What a teller tells its client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionResponse {
    pub message: String,
}

impl TransactionResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for TransactionResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}
