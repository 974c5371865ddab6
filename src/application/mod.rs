//! Application layer: the tasks that make up a running bank.
//!
//! `BankEngine` wires a single `Serializer` (the only writer of the ledger), a
//! `Listener` accepting client sessions, and one short-lived `Teller` task per
//! session. Everything talks over `tokio` channels; the ledger's read lock is
//! the only shared state.

pub mod engine;
pub mod listener;
pub mod serializer;
pub mod teller;
