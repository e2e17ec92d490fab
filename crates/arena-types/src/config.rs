//! Configuration types for the Arena engine.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ArenaError, LedgerOp, Result, constants};

/// Per-operation ledger deadlines, in milliseconds.
///
/// Reads are fast-timeout; mint and swap are slow-timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerTimeouts {
    /// Balance, ownership validation, card listing.
    pub read_ms: u64,
    /// Wallet creation, card transfer, match log.
    pub write_ms: u64,
    /// Coin charge, mint and atomic swap.
    pub slow_ms: u64,
}

impl Default for LedgerTimeouts {
    fn default() -> Self {
        Self {
            read_ms: constants::DEFAULT_READ_TIMEOUT_MS,
            write_ms: constants::DEFAULT_WRITE_TIMEOUT_MS,
            slow_ms: constants::DEFAULT_SLOW_TIMEOUT_MS,
        }
    }
}

impl LedgerTimeouts {
    /// Every operation gets the same deadline. Handy in tests.
    #[must_use]
    pub fn uniform(ms: u64) -> Self {
        Self {
            read_ms: ms,
            write_ms: ms,
            slow_ms: ms,
        }
    }

    /// Deadline for a specific ledger operation.
    #[must_use]
    pub fn for_op(&self, op: LedgerOp) -> Duration {
        let ms = match op {
            LedgerOp::Balance | LedgerOp::ValidateOwnership | LedgerOp::ListCards => self.read_ms,
            LedgerOp::CreateWallet | LedgerOp::TransferCard | LedgerOp::LogMatch => self.write_ms,
            LedgerOp::Charge | LedgerOp::MintCard | LedgerOp::AtomicSwap => self.slow_ms,
        };
        Duration::from_millis(ms)
    }
}

/// Engine configuration. Every field has a sensible default.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Distinct card power values generated into the pack inventory.
    pub pack_card_count: u64,
    /// Price of one pack in ledger coin.
    pub pack_price: u64,
    /// Wallet address receiving pack payments.
    pub shop_address: String,
    /// Seed for the inventory RNG. `None` seeds from entropy.
    pub rng_seed: Option<u64>,
    /// Cap on concurrent settlement calls (match log, atomic swap).
    pub max_inflight_settlements: usize,
    /// Ledger deadlines.
    pub ledger_timeouts: LedgerTimeouts,
    /// Heartbeat broadcast interval in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// Capacity of the notification broadcast channel.
    pub notification_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pack_card_count: constants::DEFAULT_PACK_CARD_COUNT,
            pack_price: constants::DEFAULT_PACK_PRICE,
            shop_address: constants::DEFAULT_SHOP_ADDRESS.to_string(),
            rng_seed: None,
            max_inflight_settlements: constants::DEFAULT_MAX_INFLIGHT_SETTLEMENTS,
            ledger_timeouts: LedgerTimeouts::default(),
            heartbeat_interval_ms: constants::DEFAULT_HEARTBEAT_INTERVAL_MS,
            notification_capacity: constants::DEFAULT_NOTIFICATION_CAPACITY,
        }
    }
}

impl EngineConfig {
    /// Reject configurations the engine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.pack_card_count == 0 {
            return Err(ArenaError::Configuration(
                "pack_card_count must be > 0".to_string(),
            ));
        }
        if self.max_inflight_settlements == 0 {
            return Err(ArenaError::Configuration(
                "max_inflight_settlements must be > 0".to_string(),
            ));
        }
        if self.notification_capacity == 0 {
            return Err(ArenaError::Configuration(
                "notification_capacity must be > 0".to_string(),
            ));
        }
        if self.shop_address.trim().is_empty() {
            return Err(ArenaError::Configuration(
                "shop_address must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    #[must_use]
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }
}
