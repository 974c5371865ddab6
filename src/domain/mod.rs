//! Accounts, transactions and the ledger rules, free of any I/O.

pub mod account;
pub mod ledger;
pub mod ports;
pub mod transaction;
