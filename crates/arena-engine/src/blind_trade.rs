//! Blind trades: offer a card, receive a random counterpart's card.
//!
//! Joining validates ownership on the ledger before the request is queued.
//! That call happens with the store lock released, so the "not already
//! queued" rule is checked before the call and again, atomically with the
//! insert, after it returns.
//!
//! Pairing is FIFO. Each pair is settled by one atomic swap on the
//! settlement pool. The local card caches are not touched by the outcome:
//! on success players learn the received card id from the notification,
//! and on failure the offered cards come back with the next `see-cards`
//! refresh.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use arena_ledger::LedgerClient;
use arena_types::notification::{TradeOutcome, TradeResult};
use arena_types::{ArenaError, CardId, Notification, PlayerId, Result, TradeRequest, TradeSettlement};

use crate::notifier::Notifier;
use crate::pool::SettlementPool;
use crate::store::SessionStore;

pub struct BlindTradeCoordinator {
    store: Arc<SessionStore>,
    ledger: Arc<dyn LedgerClient>,
    notifier: Notifier,
    pool: SettlementPool,
}

impl BlindTradeCoordinator {
    #[must_use]
    pub fn new(
        store: Arc<SessionStore>,
        ledger: Arc<dyn LedgerClient>,
        notifier: Notifier,
        pool: SettlementPool,
    ) -> Self {
        Self {
            store,
            ledger,
            notifier,
            pool,
        }
    }

    /// Offer `card_id` for a blind trade. Returns the trade queue length.
    ///
    /// # Errors
    /// - `PlayerNotFound` for an unknown player
    /// - `AlreadyQueued` if the player already has a pending request
    /// - `NotOwner` if the ledger does not attribute the card to the player
    /// - `Ledger` if the ownership check failed or timed out
    pub async fn join_queue(&self, player: PlayerId, card_id: CardId) -> Result<usize> {
        let wallet = self.store.with_state(|s| {
            let wallet = s.player(player)?.wallet.clone();
            if s.is_trade_queued(player) {
                return Err(ArenaError::AlreadyQueued(player));
            }
            Ok(wallet)
        })?;

        let owned = self
            .ledger
            .validate_ownership(&wallet.address, &card_id)
            .await?;
        if !owned {
            warn!(player_id = %player, card = %card_id.short(), "trade refused, not owner");
            return Err(ArenaError::NotOwner {
                player,
                card: card_id,
            });
        }

        let len = self.store.with_state(|s| {
            if s.is_trade_queued(player) {
                return Err(ArenaError::AlreadyQueued(player));
            }
            s.player_mut(player)?.take_card(&card_id);
            s.trade_queue
                .push_back(TradeRequest::new(player, card_id.clone(), wallet));
            Ok(s.trade_queue.len())
        })?;
        info!(player_id = %player, card = %card_id.short(), queue_len = len, "joined blind trade");
        Ok(len)
    }

    /// Pair the oldest requests two at a time and start a swap for each pair.
    /// An odd request stays queued.
    ///
    /// A second head request from the same player is dropped rather than
    /// paired; its card comes back with the next `see-cards` refresh.
    pub fn process_queue(&self) -> Result<Vec<JoinHandle<()>>> {
        let pairs = self.store.with_state(|s| {
            let mut pairs = Vec::new();
            loop {
                let (Some(first), Some(second)) = (s.trade_queue.front(), s.trade_queue.get(1))
                else {
                    break;
                };
                if first.player_id == second.player_id {
                    if let Some(dup) = s.trade_queue.remove(1) {
                        warn!(
                            player_id = %dup.player_id,
                            card = %dup.card_id.short(),
                            "duplicate trade request dropped"
                        );
                    }
                    continue;
                }
                let (Some(a), Some(b)) = (s.trade_queue.pop_front(), s.trade_queue.pop_front())
                else {
                    break;
                };
                pairs.push((a, b));
            }
            Ok(pairs)
        })?;

        Ok(pairs
            .into_iter()
            .map(|(a, b)| {
                debug!(a = %a.player_id, b = %b.player_id, "trade pair formed");
                self.spawn_swap(a, b)
            })
            .collect())
    }

    /// `join-blind-trade`: join, then settle any pair that became possible.
    pub async fn join_and_process(&self, player: PlayerId, card_id: CardId) -> Result<usize> {
        let len = self.join_queue(player, card_id).await?;
        self.process_queue()?;
        Ok(len)
    }

    fn spawn_swap(&self, a: TradeRequest, b: TradeRequest) -> JoinHandle<()> {
        let ledger = Arc::clone(&self.ledger);
        let notifier = self.notifier.clone();
        self.pool.spawn("atomic-swap", async move {
            let settlement = match ledger
                .atomic_swap(&a.wallet, &a.card_id, &b.wallet, &b.card_id)
                .await
            {
                Ok(receipt) => {
                    info!(a = %a.player_id, b = %b.player_id, digest = %receipt.digest, "blind trade settled");
                    TradeSettlement::Swapped {
                        a: a.player_id,
                        b: b.player_id,
                        a_received: b.card_id,
                        b_received: a.card_id,
                    }
                }
                Err(e) => {
                    warn!(a = %a.player_id, b = %b.player_id, error = %e, "blind trade failed");
                    TradeSettlement::Failed {
                        a: a.player_id,
                        b: b.player_id,
                        reason: e.to_string(),
                    }
                }
            };
            notify_trade(&notifier, settlement);
        })
    }
}

fn notify_trade(notifier: &Notifier, settlement: TradeSettlement) {
    let (a, b) = settlement.participants();
    debug!(a = %a, b = %b, success = settlement.is_success(), "publishing trade results");
    let results = match settlement {
        TradeSettlement::Swapped {
            a,
            b,
            a_received,
            b_received,
        } => [
            (a, TradeOutcome::Success { received_card: a_received }),
            (b, TradeOutcome::Success { received_card: b_received }),
        ],
        TradeSettlement::Failed { a, b, reason } => [
            (a, TradeOutcome::Error { msg: reason.clone() }),
            (b, TradeOutcome::Error { msg: reason }),
        ],
    };
    for (client_id, outcome) in results {
        notifier.publish(Notification::TradeResult(TradeResult { client_id, outcome }));
    }
}
