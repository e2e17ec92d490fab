//! # arena-engine
//!
//! The match & trade orchestration core.
//!
//! ```text
//!  bus subject ──▶ Gateway ──▶ AccountService ─────┐
//!                     │──────▶ MatchCoordinator ───┤
//!                     │──────▶ BattleResolver ─────┼──▶ SessionStore (one mutex)
//!                     └──────▶ BlindTradeCoordinator┘
//!                                   │
//!                     SettlementPool (bounded) ──▶ LedgerClient
//!                                   │
//!                               Notifier ──▶ match-found / round-result / trade-result.{id}
//! ```
//!
//! The store lock is never held across a ledger call, and settlement work
//! (match logs, atomic swaps) is spawned only after the lock is released.

pub mod accounts;
pub mod battle;
pub mod blind_trade;
pub mod engine;
pub mod gateway;
pub mod inventory;
pub mod matchmaking;
pub mod notifier;
pub mod pool;
pub mod settlement_guard;
pub mod store;

pub use accounts::AccountService;
pub use battle::{BattleResolver, Resolution, Submission};
pub use blind_trade::BlindTradeCoordinator;
pub use engine::Engine;
pub use gateway::Gateway;
pub use inventory::{Pack, PackInventory};
pub use matchmaking::MatchCoordinator;
pub use notifier::Notifier;
pub use pool::SettlementPool;
pub use settlement_guard::SettlementGuard;
pub use store::{SessionStore, StoreState, StoreStats};
