//! Battle queue and pairing.
//!
//! Pairing is strict FIFO: the two longest-waiting entries are always taken
//! together. No ranking and no priority. A lone entry waits for the next
//! arrival.

use std::sync::Arc;

use tracing::{debug, info, warn};

use arena_types::notification::{MatchFound, MatchSummary};
use arena_types::{ArenaError, Match, Notification, PlayerId, Result};

use crate::notifier::Notifier;
use crate::store::SessionStore;

pub struct MatchCoordinator {
    store: Arc<SessionStore>,
    notifier: Notifier,
}

impl MatchCoordinator {
    #[must_use]
    pub fn new(store: Arc<SessionStore>, notifier: Notifier) -> Self {
        Self { store, notifier }
    }

    /// Append `player` to the battle queue and return the new queue length.
    ///
    /// Duplicate entries are not removed here. Callers must not enqueue a
    /// player twice before they are paired; [`Self::try_pair`] refuses to
    /// pair a player with themself.
    pub fn enqueue_for_battle(&self, player: PlayerId) -> Result<usize> {
        let len = self.store.with_state(|s| {
            s.player(player)?;
            s.battle_queue.push_back(player);
            Ok(s.battle_queue.len())
        })?;
        debug!(player_id = %player, queue_len = len, "queued for battle");
        Ok(len)
    }

    /// Pair the two oldest queue entries into a new match.
    ///
    /// # Errors
    /// [`ArenaError::InsufficientPlayers`] if fewer than two distinct
    /// players are waiting.
    pub fn try_pair(&self) -> Result<Match> {
        let created = self.store.with_state(|s| {
            loop {
                let (Some(&p1), Some(&p2)) = (s.battle_queue.front(), s.battle_queue.get(1))
                else {
                    return Err(ArenaError::InsufficientPlayers {
                        queued: s.battle_queue.len(),
                    });
                };
                if p1 == p2 {
                    s.battle_queue.remove(1);
                    warn!(player_id = %p1, "duplicate battle queue entry dropped");
                    continue;
                }
                let m = Match::new(p1, p2)?;
                s.battle_queue.pop_front();
                s.battle_queue.pop_front();
                s.insert_match(m.clone());
                return Ok(m);
            }
        })?;

        info!(match_id = %created.id, p1 = %created.p1, p2 = %created.p2, "match created");
        let summary = MatchSummary {
            id: created.id,
            p1: created.p1,
            p2: created.p2,
        };
        for client_id in [created.p1, created.p2] {
            self.notifier.publish(Notification::MatchFound(MatchFound {
                client_id,
                summary: summary.clone(),
            }));
        }
        Ok(created)
    }

    /// Pair until fewer than two players remain.
    pub fn pair_all(&self) -> Result<Vec<Match>> {
        let mut created = Vec::new();
        loop {
            match self.try_pair() {
                Ok(m) => created.push(m),
                Err(ArenaError::InsufficientPlayers { .. }) => return Ok(created),
                Err(e) => return Err(e),
            }
        }
    }

    /// `find-match`: queue the player and pair whoever can be paired.
    pub fn find_match(&self, player: PlayerId) -> Result<Vec<Match>> {
        self.enqueue_for_battle(player)?;
        self.pair_all()
    }
}
