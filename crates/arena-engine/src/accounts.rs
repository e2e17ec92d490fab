//! Accounts, packs and wallet reads.
//!
//! Opening a pack reserves one from the inventory under the lock, charges
//! the player with the lock released, and puts the pack back if the charge
//! fails. After a successful charge each card is minted individually; a
//! mint that fails is skipped, and the request fails only if no card at
//! all could be minted.
//!
//! The charge is never refunded: the engine holds only the shop's address,
//! not its signing key. Every unminted power is logged at error level with
//! the coin it represents and counted in `unminted_cards` for operators to
//! reconcile.

use std::sync::Arc;

use chrono::Utc;
use tracing::{error, info, warn};

use arena_ledger::LedgerClient;
use arena_types::constants::{ENGINE_NAME, VERSION};
use arena_types::messages::{PingReply, PingRequest, StatusReply};
use arena_types::{ArenaError, CardEntry, EngineConfig, PlayerId, Result, Wallet};

use crate::store::SessionStore;

pub struct AccountService {
    store: Arc<SessionStore>,
    ledger: Arc<dyn LedgerClient>,
    pack_price: u64,
    shop_address: String,
}

impl AccountService {
    #[must_use]
    pub fn new(store: Arc<SessionStore>, ledger: Arc<dyn LedgerClient>, config: &EngineConfig) -> Self {
        Self {
            store,
            ledger,
            pack_price: config.pack_price,
            shop_address: config.shop_address.clone(),
        }
    }

    /// `create-account`
    pub async fn create_account(&self) -> Result<PlayerId> {
        self.store.create_player(self.ledger.as_ref()).await
    }

    /// `login`: succeeds iff the identity exists.
    pub fn login(&self, player: PlayerId) -> Result<()> {
        self.store.lookup_player(player).map(|_| ())
    }

    /// `open-pack`
    ///
    /// # Errors
    /// - `PlayerNotFound`
    /// - `PacksExhausted` once the inventory is empty
    /// - `Ledger` if the charge fails or no card could be minted
    pub async fn open_pack(&self, player: PlayerId) -> Result<Vec<CardEntry>> {
        let (wallet, pack) = self.store.with_state(|s| {
            let wallet = s.player(player)?.wallet.clone();
            let pack = s.inventory.draw().ok_or(ArenaError::PacksExhausted)?;
            Ok((wallet, pack))
        })?;

        if let Err(e) = self
            .ledger
            .charge(&wallet, &self.shop_address, self.pack_price)
            .await
        {
            warn!(player_id = %player, error = %e, "pack charge failed, pack returned");
            self.store.with_state(|s| {
                s.inventory.restore(pack);
                Ok(())
            })?;
            return Err(e.into());
        }

        let mut minted = Vec::with_capacity(pack.powers().len());
        let mut unminted = Vec::new();
        let mut first_failure = None;
        for &power in pack.powers() {
            match self.ledger.mint_card(&wallet.address, power).await {
                Ok(receipt) => minted.push(receipt.card),
                Err(e) => {
                    warn!(player_id = %player, power, error = %e, "card mint failed");
                    unminted.push(power);
                    first_failure.get_or_insert(e);
                }
            }
        }
        if !unminted.is_empty() {
            let owed = self.pack_price.saturating_mul(unminted.len() as u64)
                / pack.powers().len() as u64;
            error!(
                player_id = %player,
                address = %wallet.address,
                powers = ?unminted,
                owed,
                "pack charged but cards not minted"
            );
            self.store.with_state(|s| {
                s.unminted_cards += unminted.len();
                Ok(())
            })?;
        }
        if minted.is_empty() {
            if let Some(e) = first_failure {
                return Err(e.into());
            }
        }

        self.store.record_cards(player, minted.clone())?;
        info!(
            player_id = %player,
            powers = ?minted.iter().map(|c| c.power).collect::<Vec<_>>(),
            "pack opened"
        );
        Ok(minted)
    }

    /// `see-cards`: refresh the local cache from the ledger and return it.
    pub async fn see_cards(&self, player: PlayerId) -> Result<Vec<CardEntry>> {
        let address = self.store.lookup_player(player)?.wallet.address;
        let cards = self.ledger.list_cards(&address).await?;
        self.store.replace_cards(player, cards)?;
        Ok(self.store.lookup_player(player)?.card_entries())
    }

    /// `get-credentials`
    pub fn credentials(&self, player: PlayerId) -> Result<Wallet> {
        Ok(self.store.lookup_player(player)?.wallet)
    }

    /// `get-balance`
    pub async fn balance(&self, player: PlayerId) -> Result<u64> {
        let address = self.store.lookup_player(player)?.wallet.address;
        Ok(self.ledger.balance(&address).await?)
    }

    /// `status`
    pub fn status(&self) -> Result<StatusReply> {
        let stats = self.store.stats()?;
        Ok(StatusReply {
            node: ENGINE_NAME.to_string(),
            version: VERSION.to_string(),
            players: stats.players,
            matches: stats.matches,
            open_matches: stats.open_matches,
            battle_queue: stats.battle_queue,
            trade_queue: stats.trade_queue,
            packs_left: stats.packs_left,
            unminted_cards: stats.unminted_cards,
        })
    }

    /// `ping`: echo the request with the server clock in milliseconds.
    #[must_use]
    pub fn ping(request: PingRequest) -> PingReply {
        PingReply {
            fields: request.fields,
            server_ping: Utc::now().timestamp_millis(),
        }
    }
}
