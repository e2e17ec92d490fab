//! Blind-trade model.
//!
//! A [`TradeRequest`] is created when a player joins the trade queue and
//! consumed when it is paired. Pairing produces a [`TradeSettlement`] that
//! is reported to both sides.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CardId, PlayerId, Wallet};

/// A queued offer of one card for a random counterpart.
#[derive(Debug, Clone)]
pub struct TradeRequest {
    pub player_id: PlayerId,
    pub card_id: CardId,
    pub wallet: Wallet,
    pub queued_at: DateTime<Utc>,
}

impl TradeRequest {
    #[must_use]
    pub fn new(player_id: PlayerId, card_id: CardId, wallet: Wallet) -> Self {
        Self {
            player_id,
            card_id,
            wallet,
            queued_at: Utc::now(),
        }
    }
}

/// Result of an atomic swap between two paired requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSettlement {
    /// Both cards changed hands on the ledger.
    Swapped {
        a: PlayerId,
        b: PlayerId,
        /// Card `a` now holds (formerly `b`'s).
        a_received: CardId,
        /// Card `b` now holds (formerly `a`'s).
        b_received: CardId,
    },
    /// The ledger refused or timed out. Neither card is restored locally.
    Failed {
        a: PlayerId,
        b: PlayerId,
        reason: String,
    },
}

impl TradeSettlement {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Swapped { .. })
    }

    #[must_use]
    pub fn participants(&self) -> (PlayerId, PlayerId) {
        match self {
            Self::Swapped { a, b, .. } | Self::Failed { a, b, .. } => (*a, *b),
        }
    }
}
