//! # arena-ledger
//!
//! The engine's only path to the external asset ledger.
//!
//! - [`LedgerClient`]: async request/response surface (wallets, coin, cards,
//!   ownership, atomic swap, match log). Calls may fail or time out and are
//!   never retried here.
//! - [`TimedLedger`]: decorator enforcing per-operation deadlines from
//!   [`arena_types::LedgerTimeouts`].
//! - [`InMemoryLedger`]: self-contained backend with ed25519 wallets, used by
//!   the development node and by tests.

pub mod client;
pub mod memory;
pub mod timed;

pub use client::{LedgerClient, LedgerResult, MatchLogReceipt, MintReceipt, TxReceipt};
pub use memory::InMemoryLedger;
pub use timed::TimedLedger;
