//! # arena-types
//!
//! Shared types, errors, and configuration for the **Arena** match & trade
//! orchestration engine.
//!
//! This crate is the leaf dependency of the workspace; every other crate
//! depends on it. It defines:
//!
//! - **Identifiers**: [`PlayerId`], [`MatchId`], [`CardId`], [`SettlementRef`]
//! - **Player model**: [`Player`], [`Wallet`], [`CardEntry`]
//! - **Battle model**: [`Match`], [`MatchPhase`], [`PlayedCard`], [`RoundOutcome`], [`RoundVerdict`]
//! - **Trade model**: [`TradeRequest`], [`TradeSettlement`]
//! - **Wire messages**: typed request/reply records per bus subject ([`messages`])
//! - **Notifications**: [`Notification`] pushed to players out-of-band
//! - **Configuration**: [`EngineConfig`], [`LedgerTimeouts`]
//! - **Errors**: [`ArenaError`] with `AR_ERR_` prefix codes, [`LedgerError`]
//! - **Constants**: system-wide limits and defaults

pub mod battle;
pub mod config;
pub mod constants;
pub mod error;
pub mod ids;
pub mod messages;
pub mod notification;
pub mod player;
pub mod trade;

// Re-export all primary types at crate root for ergonomic imports:
//   use arena_types::{PlayerId, Match, ArenaError, ...};

pub use battle::*;
pub use config::*;
pub use error::*;
pub use ids::*;
pub use notification::*;
pub use player::*;
pub use trade::*;

// Wire messages are accessed via `arena_types::messages::Foo` and constants
// via `arena_types::constants::FOO` (not re-exported to avoid name collisions).
