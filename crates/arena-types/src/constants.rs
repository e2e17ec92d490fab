//! System-wide constants for the Arena engine.

/// Number of distinct card power values generated at startup (1..=N).
pub const DEFAULT_PACK_CARD_COUNT: u64 = 900;

/// Cards per pack.
pub const PACK_SIZE: usize = 3;

/// Coin charged to a player for one pack.
pub const DEFAULT_PACK_PRICE: u64 = 1000;

/// Coin granted to every freshly created wallet by the reference ledger.
pub const DEFAULT_STARTING_BALANCE: u64 = 20_000;

/// Timeout for cheap ledger reads (balance, ownership, card listing).
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5_000;

/// Timeout for ordinary ledger writes (wallet, transfer, match log).
pub const DEFAULT_WRITE_TIMEOUT_MS: u64 = 10_000;

/// Timeout for expensive ledger writes (charge, mint, atomic swap).
pub const DEFAULT_SLOW_TIMEOUT_MS: u64 = 20_000;

/// Maximum number of settlement calls (match log, swap) in flight at once.
pub const DEFAULT_MAX_INFLIGHT_SETTLEMENTS: usize = 8;

/// Heartbeat broadcast interval.
pub const DEFAULT_HEARTBEAT_INTERVAL_MS: u64 = 1_000;

/// Capacity of the notification broadcast channel.
pub const DEFAULT_NOTIFICATION_CAPACITY: usize = 1_024;

/// Shop wallet that receives pack payments when none is configured.
pub const DEFAULT_SHOP_ADDRESS: &str = "arena-shop";

/// Version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Engine name, reported by the status subject.
pub const ENGINE_NAME: &str = "Arena";

/// Matches remembered by the settlement guard before the oldest is evicted.
pub const SETTLEMENT_GUARD_CAPACITY: usize = 65_536;
