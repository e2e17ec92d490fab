//! The session store: single authoritative registry of engine state.
//!
//! Players, matches, the battle queue, the trade queue, the pack inventory
//! and the settlement guard all live behind one mutex. Compound checks
//! (e.g. "not already queued" + insert) run inside a single
//! [`SessionStore::with_state`] closure so they are atomic.
//!
//! The lock is never held across a ledger call. Callers read what they need,
//! release, call the ledger, then re-acquire and re-validate before
//! committing.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use serde::Serialize;
use tracing::{debug, error, info};

use arena_ledger::LedgerClient;
use arena_types::constants::SETTLEMENT_GUARD_CAPACITY;
use arena_types::{
    ArenaError, CardEntry, CardId, EngineConfig, Match, MatchId, MatchPhase, Player, PlayerId,
    Result, TradeRequest, Wallet,
};

use crate::inventory::PackInventory;
use crate::settlement_guard::SettlementGuard;

/// Point-in-time counters, used by the `status` subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    pub players: usize,
    pub matches: usize,
    pub open_matches: usize,
    pub battle_queue: usize,
    pub trade_queue: usize,
    pub packs_left: usize,
    /// Cards paid for in an opened pack but never minted.
    pub unminted_cards: usize,
}

/// Everything guarded by the store lock.
#[derive(Debug)]
pub struct StoreState {
    next_player: PlayerId,
    players: HashMap<PlayerId, Player>,
    /// Every match ever created, resolved ones included.
    matches: HashMap<MatchId, Match>,
    pub(crate) battle_queue: VecDeque<PlayerId>,
    pub(crate) trade_queue: VecDeque<TradeRequest>,
    pub(crate) inventory: PackInventory,
    pub(crate) settled: SettlementGuard,
    pub(crate) unminted_cards: usize,
}

impl StoreState {
    fn new(inventory: PackInventory, guard_capacity: usize) -> Self {
        Self {
            next_player: PlayerId::FIRST,
            players: HashMap::new(),
            matches: HashMap::new(),
            battle_queue: VecDeque::new(),
            trade_queue: VecDeque::new(),
            inventory,
            settled: SettlementGuard::new(guard_capacity),
            unminted_cards: 0,
        }
    }

    /// Allocate the next identity and register the player.
    pub(crate) fn insert_player(&mut self, wallet: Wallet) -> PlayerId {
        let id = self.next_player;
        self.next_player = id.next();
        self.players.insert(id, Player::new(id, wallet));
        id
    }

    pub fn player(&self, id: PlayerId) -> Result<&Player> {
        self.players.get(&id).ok_or(ArenaError::PlayerNotFound(id))
    }

    pub fn player_mut(&mut self, id: PlayerId) -> Result<&mut Player> {
        self.players
            .get_mut(&id)
            .ok_or(ArenaError::PlayerNotFound(id))
    }

    pub fn get_match(&self, id: MatchId) -> Result<&Match> {
        self.matches.get(&id).ok_or(ArenaError::MatchNotFound(id))
    }

    pub fn match_mut(&mut self, id: MatchId) -> Result<&mut Match> {
        self.matches
            .get_mut(&id)
            .ok_or(ArenaError::MatchNotFound(id))
    }

    pub(crate) fn insert_match(&mut self, m: Match) {
        self.matches.insert(m.id, m);
    }

    /// Whether the player has a request waiting in the trade queue.
    #[must_use]
    pub fn is_trade_queued(&self, player: PlayerId) -> bool {
        self.trade_queue.iter().any(|r| r.player_id == player)
    }

    fn pending_trade_card(&self, player: PlayerId) -> Option<&CardId> {
        self.trade_queue
            .iter()
            .find(|r| r.player_id == player)
            .map(|r| &r.card_id)
    }

    #[must_use]
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            players: self.players.len(),
            matches: self.matches.len(),
            open_matches: self
                .matches
                .values()
                .filter(|m| m.phase() != MatchPhase::Resolved)
                .count(),
            battle_queue: self.battle_queue.len(),
            trade_queue: self.trade_queue.len(),
            packs_left: self.inventory.remaining(),
            unminted_cards: self.unminted_cards,
        }
    }
}

/// Shared, mutex-guarded engine state. Construct once and share by `Arc`.
#[derive(Debug)]
pub struct SessionStore {
    state: Mutex<StoreState>,
}

impl SessionStore {
    #[must_use]
    pub fn new(inventory: PackInventory, guard_capacity: usize) -> Self {
        Self {
            state: Mutex::new(StoreState::new(inventory, guard_capacity)),
        }
    }

    /// Store with a freshly generated inventory as configured.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(
            PackInventory::generate(config.pack_card_count, config.rng_seed),
            SETTLEMENT_GUARD_CAPACITY,
        )
    }

    /// Run `f` with exclusive access to the state.
    ///
    /// # Errors
    /// [`ArenaError::StoreUnavailable`] if a previous holder panicked, or
    /// whatever `f` returns.
    pub fn with_state<R>(&self, f: impl FnOnce(&mut StoreState) -> Result<R>) -> Result<R> {
        let mut guard = self.state.lock().map_err(|_| {
            error!("session store lock poisoned, refusing operation");
            ArenaError::StoreUnavailable
        })?;
        f(&mut guard)
    }

    /// Obtain a wallet from the ledger, then register a new player.
    ///
    /// The wallet is created before the lock is taken; a failed wallet
    /// creation consumes no identity.
    pub async fn create_player(&self, ledger: &dyn LedgerClient) -> Result<PlayerId> {
        let wallet = ledger.create_wallet().await?;
        let address = wallet.address.clone();
        let id = self.with_state(|s| Ok(s.insert_player(wallet)))?;
        info!(player_id = %id, %address, "player created");
        Ok(id)
    }

    /// Add cards to a player's local cache.
    pub fn record_cards(&self, id: PlayerId, cards: Vec<CardEntry>) -> Result<()> {
        self.with_state(|s| {
            let player = s.player_mut(id)?;
            player.record_cards(cards);
            debug!(player_id = %id, held = player.card_count(), "cards recorded");
            Ok(())
        })
    }

    /// Overwrite a player's cache with a ledger listing. A card the player
    /// has offered in the trade queue stays out of the cache.
    pub fn replace_cards(&self, id: PlayerId, cards: Vec<CardEntry>) -> Result<()> {
        self.with_state(|s| {
            let pending = s.pending_trade_card(id).cloned();
            let player = s.player_mut(id)?;
            player.replace_cards(
                cards
                    .into_iter()
                    .filter(|c| pending.as_ref() != Some(&c.card_id)),
            );
            Ok(())
        })
    }

    /// Snapshot of a player.
    pub fn lookup_player(&self, id: PlayerId) -> Result<Player> {
        self.with_state(|s| s.player(id).cloned())
    }

    pub fn stats(&self) -> Result<StoreStats> {
        self.with_state(|s| Ok(s.stats()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arena_ledger::InMemoryLedger;
    use arena_types::LedgerOp;

    use super::*;

    fn store() -> SessionStore {
        SessionStore::new(PackInventory::generate(9, Some(1)), 16)
    }

    #[tokio::test]
    async fn identities_are_sequential() {
        let store = store();
        let ledger = InMemoryLedger::new();
        let mut last = PlayerId(0);
        for _ in 0..5 {
            let id = store.create_player(&ledger).await.unwrap();
            assert!(id.is_valid());
            assert!(id > last);
            last = id;
        }
        assert_eq!(last, PlayerId(5));
    }

    #[tokio::test]
    async fn failed_wallet_consumes_no_identity() {
        let store = store();
        let ledger = InMemoryLedger::new();
        ledger.fail_op(LedgerOp::CreateWallet, "node down");
        assert!(store.create_player(&ledger).await.is_err());
        ledger.clear_failure(LedgerOp::CreateWallet);
        assert_eq!(store.create_player(&ledger).await.unwrap(), PlayerId::FIRST);
        assert_eq!(store.stats().unwrap().players, 1);
    }

    #[tokio::test]
    async fn concurrent_creation_never_repeats() {
        let store = Arc::new(store());
        let ledger = Arc::new(InMemoryLedger::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let (store, ledger) = (store.clone(), ledger.clone());
            handles.push(tokio::spawn(async move {
                store.create_player(ledger.as_ref()).await.unwrap()
            }));
        }
        let mut ids = Vec::new();
        for h in handles {
            ids.push(h.await.unwrap().0);
        }
        ids.sort_unstable();
        assert_eq!(ids, (1..=32).collect::<Vec<_>>());
    }

    #[test]
    fn unknown_player_not_found() {
        let store = store();
        let err = store.lookup_player(PlayerId(9)).unwrap_err();
        assert!(matches!(err, ArenaError::PlayerNotFound(PlayerId(9))));
        assert!(store.record_cards(PlayerId(9), Vec::new()).is_err());
    }

    #[tokio::test]
    async fn replace_keeps_traded_card_out() {
        let store = store();
        let ledger = InMemoryLedger::new();
        let id = store.create_player(&ledger).await.unwrap();
        let wallet = store.lookup_player(id).unwrap().wallet;
        store
            .with_state(|s| {
                s.trade_queue
                    .push_back(TradeRequest::new(id, CardId::new("offered"), wallet));
                Ok(())
            })
            .unwrap();

        store
            .replace_cards(
                id,
                vec![
                    CardEntry::new(CardId::new("offered"), 4),
                    CardEntry::new(CardId::new("kept"), 5),
                ],
            )
            .unwrap();
        let player = store.lookup_player(id).unwrap();
        assert!(!player.holds(&CardId::new("offered")));
        assert!(player.holds(&CardId::new("kept")));
    }
}
