//! Player model: identity, ledger wallet, and the local card cache.
//!
//! The card cache is a *projection* of ledger truth, never authoritative.
//! It is filled when packs are opened, overwritten by a ledger refresh, and
//! shrinks when a card is pulled into the blind-trade queue.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CardId, PlayerId};

/// Ledger identity of a player. Passed through to the ledger untouched.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub address: String,
    pub secret: String,
}

impl Wallet {
    #[must_use]
    pub fn new(address: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            secret: secret.into(),
        }
    }
}

// The secret never reaches logs.
impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("secret", &"<redacted>")
            .finish()
    }
}

/// A card as seen by a player: ledger object id plus power value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardEntry {
    pub card_id: CardId,
    pub power: u64,
}

impl CardEntry {
    #[must_use]
    pub fn new(card_id: CardId, power: u64) -> Self {
        Self { card_id, power }
    }
}

/// A registered player.
#[derive(Debug, Clone)]
pub struct Player {
    pub id: PlayerId,
    pub wallet: Wallet,
    /// Local projection of the cards the ledger attributes to this player.
    cards: BTreeMap<CardId, u64>,
    pub created_at: DateTime<Utc>,
}

impl Player {
    #[must_use]
    pub fn new(id: PlayerId, wallet: Wallet) -> Self {
        Self {
            id,
            wallet,
            cards: BTreeMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Add cards to the cache (pack opening).
    pub fn record_cards(&mut self, cards: impl IntoIterator<Item = CardEntry>) {
        for card in cards {
            self.cards.insert(card.card_id, card.power);
        }
    }

    /// Overwrite the cache with a fresh ledger listing.
    pub fn replace_cards(&mut self, cards: impl IntoIterator<Item = CardEntry>) {
        self.cards = cards.into_iter().map(|c| (c.card_id, c.power)).collect();
    }

    /// Find a cached card with exactly this power value.
    ///
    /// When several match, the lowest card id wins so the choice is stable.
    #[must_use]
    pub fn card_with_power(&self, power: u64) -> Option<CardEntry> {
        self.cards
            .iter()
            .find(|(_, p)| **p == power)
            .map(|(id, p)| CardEntry::new(id.clone(), *p))
    }

    #[must_use]
    pub fn holds(&self, card_id: &CardId) -> bool {
        self.cards.contains_key(card_id)
    }

    /// Remove a card from the cache, returning its power if it was present.
    pub fn take_card(&mut self, card_id: &CardId) -> Option<u64> {
        self.cards.remove(card_id)
    }

    /// Snapshot of the cache in card-id order.
    #[must_use]
    pub fn card_entries(&self) -> Vec<CardEntry> {
        self.cards
            .iter()
            .map(|(id, p)| CardEntry::new(id.clone(), *p))
            .collect()
    }

    #[must_use]
    pub fn card_count(&self) -> usize {
        self.cards.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Player {
        Player::new(PlayerId(1), Wallet::new("0xabc", "s3cret"))
    }

    #[test]
    fn wallet_debug_redacts_secret() {
        let dbg = format!("{:?}", Wallet::new("0xabc", "s3cret"));
        assert!(dbg.contains("0xabc"));
        assert!(!dbg.contains("s3cret"));
    }

    #[test]
    fn record_and_find_by_power() {
        let mut p = player();
        p.record_cards([
            CardEntry::new(CardId::new("c1"), 12),
            CardEntry::new(CardId::new("c2"), 47),
        ]);
        assert_eq!(p.card_count(), 2);
        assert_eq!(p.card_with_power(47).unwrap().card_id, CardId::new("c2"));
        assert!(p.card_with_power(5).is_none());
    }

    #[test]
    fn take_card_blocks_reuse() {
        let mut p = player();
        p.record_cards([CardEntry::new(CardId::new("c1"), 12)]);
        assert_eq!(p.take_card(&CardId::new("c1")), Some(12));
        assert!(!p.holds(&CardId::new("c1")));
        assert_eq!(p.take_card(&CardId::new("c1")), None);
    }

    #[test]
    fn replace_overwrites_cache() {
        let mut p = player();
        p.record_cards([CardEntry::new(CardId::new("old"), 1)]);
        p.replace_cards([CardEntry::new(CardId::new("new"), 2)]);
        assert_eq!(p.card_entries(), vec![CardEntry::new(CardId::new("new"), 2)]);
    }
}
