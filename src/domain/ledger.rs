//! The authoritative table of accounts and the rules for reading and mutating it.
//!
//! [`Ledger::assess`] is the read-only feasibility check performed by tellers.
//! [`Ledger::apply`] is the mutation path and is only ever called by the serializer.
//! `apply` re-runs the assessment against the live state, so a request that was
//! feasible when a teller looked at it can still be dropped if another mutation
//! got there first. Balances therefore never go negative.

use super::account::{Account, AccountId, Amount, Balance};
use super::transaction::{AccountRef, OperationKind, TransactionRequest};
use std::collections::HashMap;
use std::fmt;
use tracing::warn;

/// What a feasible request is expected to do to the ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    Open { amount: Amount },
    Deposit { id: AccountId, balance: Balance },
    Withdraw { id: AccountId, remaining: Balance },
    /// A withdrawal that empties the account, which removes it.
    Close { id: AccountId },
}

impl fmt::Display for Projection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open { amount } => {
                write!(f, "New account request accepted with balance {amount}.")
            }
            Self::Deposit { id, balance } => {
                write!(f, "{id} Deposit successful. New balance: {balance}")
            }
            Self::Withdraw { id, remaining } => {
                write!(f, "{id} Withdrawal successful. Remaining balance: {remaining}")
            }
            Self::Close { id } => write!(f, "Withdrawal successful. Account {id} removed."),
        }
    }
}

/// Why a request cannot be applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    InsufficientBalance,
    UnknownAccount,
    InvalidOperation,
    CapacityReached,
    /// The deposit would push the balance past what an account can hold.
    BalanceOverflow,
    /// Every minted id up to the counter limit is used up.
    IdsExhausted,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InsufficientBalance => "Insufficient balance.",
            Self::UnknownAccount => "Invalid account.",
            Self::InvalidOperation => "Invalid operation.",
            Self::CapacityReached => "Bank is at full capacity.",
            Self::BalanceOverflow => "Balance limit exceeded.",
            Self::IdsExhausted => "No account ids left.",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assessment {
    Feasible(Projection),
    Infeasible(Rejection),
}

impl Assessment {
    pub fn is_feasible(&self) -> bool {
        matches!(self, Self::Feasible(_))
    }
}

impl fmt::Display for Assessment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Feasible(projection) => projection.fmt(f),
            Self::Infeasible(rejection) => rejection.fmt(f),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    Opened,
    Credited { balance: Balance },
    Debited { balance: Balance },
    Closed,
}

/// A mutation the ledger actually performed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mutation {
    pub account: AccountId,
    pub amount: Amount,
    pub effect: Effect,
}

impl Mutation {
    pub fn audit_code(&self) -> char {
        match self.effect {
            Effect::Opened | Effect::Credited { .. } => 'D',
            Effect::Debited { .. } | Effect::Closed => 'W',
        }
    }

    /// `<accountId> <D|W> <amount>`
    pub fn audit_line(&self) -> String {
        format!("{} {} {}", self.account, self.audit_code(), self.amount)
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let id = &self.account;
        match self.effect {
            Effect::Opened => write!(f, "New account {id} created with balance {}", self.amount),
            Effect::Credited { balance } => {
                write!(f, "{id} Deposit successful. New balance: {balance}")
            }
            Effect::Debited { balance } => {
                write!(f, "{id} Withdrawal successful. Remaining balance: {balance}")
            }
            Effect::Closed => write!(f, "Withdrawal successful. Account {id} removed."),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// The teller marked the request infeasible.
    FlaggedInfeasible,
    /// The teller accepted it, but the live ledger no longer allows it.
    Stale(Rejection),
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FlaggedInfeasible => f.write_str("Invalid request"),
            Self::Stale(rejection) => write!(f, "Rejected at apply time: {rejection}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied(Mutation),
    Dropped(DropReason),
}

/// Ordered account table with a direct id index.
///
/// Accounts keep their creation order, which is also the order the snapshot
/// file is written in.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    accounts: Vec<Account>,
    index: HashMap<AccountId, usize>,
    /// `None` once the counter has run past `u64::MAX`.
    next_id: Option<u64>,
    capacity: usize,
}

impl Ledger {
    pub fn new(capacity: usize) -> Self {
        Self {
            accounts: Vec::new(),
            index: HashMap::new(),
            next_id: Some(1),
            capacity,
        }
    }

    /// Builds a ledger from previously persisted accounts.
    ///
    /// Duplicate ids and entries past `capacity` are skipped. The id counter starts
    /// at `len + 1`, moved past any numeric suffix already in use. A loaded
    /// `BankID_18446744073709551615` leaves no room to mint further ids.
    pub fn from_accounts(accounts: impl IntoIterator<Item = Account>, capacity: usize) -> Self {
        let mut ledger = Self::new(capacity);
        for account in accounts {
            if ledger.is_full() {
                warn!(account = %account.id, capacity, "ledger full, dropping snapshot entry");
                continue;
            }
            if ledger.index.contains_key(&account.id) {
                warn!(account = %account.id, "duplicate account in snapshot, keeping the first");
                continue;
            }
            ledger.push(account);
        }

        let highest_suffix = ledger
            .accounts
            .iter()
            .filter_map(|a| a.id.numeric_suffix())
            .max()
            .unwrap_or(0);
        ledger.next_id = highest_suffix
            .checked_add(1)
            .map(|n| n.max(ledger.accounts.len() as u64 + 1));
        if ledger.next_id.is_none() {
            warn!(highest_suffix, "account id counter exhausted, new accounts will be refused");
        }
        ledger
    }

    pub fn get(&self, id: &AccountId) -> Option<&Account> {
        self.index.get(id).map(|&i| &self.accounts[i])
    }

    pub fn accounts(&self) -> &[Account] {
        &self.accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.accounts.len() >= self.capacity
    }

    /// The first counter value the next minted id will try.
    pub fn next_id(&self) -> Option<u64> {
        self.next_id
    }

    /// Decides whether a request can be applied to the current state.
    pub fn assess(
        &self,
        account: &AccountRef,
        operation: &OperationKind,
        amount: Amount,
    ) -> Assessment {
        match (account, operation) {
            (_, OperationKind::Unknown(_)) => Assessment::Infeasible(Rejection::InvalidOperation),
            (AccountRef::New, OperationKind::Deposit) => {
                if self.is_full() {
                    Assessment::Infeasible(Rejection::CapacityReached)
                } else if self.free_id().is_none() {
                    Assessment::Infeasible(Rejection::IdsExhausted)
                } else {
                    Assessment::Feasible(Projection::Open { amount })
                }
            }
            (AccountRef::New, OperationKind::Withdraw) => {
                Assessment::Infeasible(Rejection::UnknownAccount)
            }
            (AccountRef::Existing(id), op) => {
                let Some(existing) = self.get(id) else {
                    return Assessment::Infeasible(Rejection::UnknownAccount);
                };
                match op {
                    OperationKind::Deposit => match existing.balance.checked_add(amount) {
                        Some(balance) => Assessment::Feasible(Projection::Deposit {
                            id: id.clone(),
                            balance,
                        }),
                        None => Assessment::Infeasible(Rejection::BalanceOverflow),
                    },
                    _ => match existing.balance.checked_sub(amount) {
                        Some(remaining) if remaining.is_zero() => {
                            Assessment::Feasible(Projection::Close { id: id.clone() })
                        }
                        Some(remaining) => Assessment::Feasible(Projection::Withdraw {
                            id: id.clone(),
                            remaining,
                        }),
                        None => Assessment::Infeasible(Rejection::InsufficientBalance),
                    },
                }
            }
        }
    }

    /// Applies a request the teller flagged as feasible, re-checking it first.
    pub fn apply(&mut self, req: &TransactionRequest) -> ApplyOutcome {
        if !req.feasible {
            return ApplyOutcome::Dropped(DropReason::FlaggedInfeasible);
        }

        let projection = match self.assess(&req.account, &req.operation, req.amount) {
            Assessment::Feasible(projection) => projection,
            Assessment::Infeasible(rejection) => {
                return ApplyOutcome::Dropped(DropReason::Stale(rejection));
            }
        };

        let mutation = match projection {
            Projection::Open { amount } => {
                let Some((counter, id)) = self.free_id() else {
                    return ApplyOutcome::Dropped(DropReason::Stale(Rejection::IdsExhausted));
                };
                self.next_id = counter.checked_add(1);
                self.push(Account::new(id.clone(), amount.into()));
                Mutation {
                    account: id,
                    amount,
                    effect: Effect::Opened,
                }
            }
            Projection::Deposit { id, balance } => {
                self.account_mut(&id).balance = balance;
                Mutation {
                    account: id,
                    amount: req.amount,
                    effect: Effect::Credited { balance },
                }
            }
            Projection::Withdraw { id, remaining } => {
                self.account_mut(&id).balance = remaining;
                Mutation {
                    account: id,
                    amount: req.amount,
                    effect: Effect::Debited { balance: remaining },
                }
            }
            Projection::Close { id } => {
                self.remove(&id);
                Mutation {
                    account: id,
                    amount: req.amount,
                    effect: Effect::Closed,
                }
            }
        };
        ApplyOutcome::Applied(mutation)
    }

    /// The next free `BankID_<NN>` and its counter value, skipping ids already present.
    fn free_id(&self) -> Option<(u64, AccountId)> {
        let mut counter = self.next_id?;
        loop {
            let candidate = AccountId::minted(counter);
            if !self.index.contains_key(&candidate) {
                return Some((counter, candidate));
            }
            counter = counter.checked_add(1)?;
        }
    }

    fn push(&mut self, account: Account) {
        self.index.insert(account.id.clone(), self.accounts.len());
        self.accounts.push(account);
    }

    // Only called with ids that `assess` just found.
    fn account_mut(&mut self, id: &AccountId) -> &mut Account {
        let i = self.index[id];
        &mut self.accounts[i]
    }

    fn remove(&mut self, id: &AccountId) {
        if let Some(i) = self.index.remove(id) {
            self.accounts.remove(i);
            for (pos, account) in self.accounts.iter().enumerate().skip(i) {
                self.index.insert(account.id.clone(), pos);
            }
        }
    }
}
