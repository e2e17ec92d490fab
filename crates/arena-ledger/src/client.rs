//! The ledger RPC surface consumed by the engine.

use async_trait::async_trait;

use arena_types::{CardEntry, CardId, LedgerError, SettlementRef, Wallet};

/// Result of a single ledger round trip.
pub type LedgerResult<T> = std::result::Result<T, LedgerError>;

/// Proof of a state-changing ledger transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    pub digest: String,
}

/// A freshly minted card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub card: CardEntry,
    pub digest: String,
}

/// A recorded match result. `object_id` is the settlement reference sent to
/// both players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchLogReceipt {
    pub digest: String,
    pub object_id: SettlementRef,
}

/// Asynchronous request/response access to the asset ledger.
///
/// Every method is one round trip. Implementations report failure through
/// [`LedgerError`]; callers decide what a failure means and never retry.
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &'static str;

    /// Create and fund a new wallet.
    async fn create_wallet(&self) -> LedgerResult<Wallet>;

    /// Coin balance of an address.
    async fn balance(&self, address: &str) -> LedgerResult<u64>;

    /// Move `amount` coin from `from` to `to_address`.
    async fn charge(&self, from: &Wallet, to_address: &str, amount: u64)
    -> LedgerResult<TxReceipt>;

    /// Mint a card of `power` owned by `owner_address`.
    async fn mint_card(&self, owner_address: &str, power: u64) -> LedgerResult<MintReceipt>;

    /// Move one card from `from` to `to_address`.
    async fn transfer_card(
        &self,
        from: &Wallet,
        to_address: &str,
        card_id: &CardId,
    ) -> LedgerResult<TxReceipt>;

    /// All cards currently attributed to `address`.
    async fn list_cards(&self, address: &str) -> LedgerResult<Vec<CardEntry>>;

    /// Whether `address` owns `card_id`. An unknown card is `Ok(false)`.
    async fn validate_ownership(&self, address: &str, card_id: &CardId) -> LedgerResult<bool>;

    /// Exchange `card_a` (owned by `a`) with `card_b` (owned by `b`).
    /// Either both cards move or neither does.
    async fn atomic_swap(
        &self,
        a: &Wallet,
        card_a: &CardId,
        b: &Wallet,
        card_b: &CardId,
    ) -> LedgerResult<TxReceipt>;

    /// Record a decisive match result.
    async fn log_match(
        &self,
        winner_address: &str,
        loser_address: &str,
        winner_power: u64,
        loser_power: u64,
    ) -> LedgerResult<MatchLogReceipt>;
}
