//! Settlement idempotency guard: a match is settled at most once.
//!
//! Marking happens in the same critical section that resolves the match,
//! so a second resolution trigger (a late duplicate submission, a direct
//! `resolve` call) finds the mark and backs off before any ledger call or
//! notification is issued.
//!
//! The guard is bounded; once full, the oldest match id is evicted. The
//! match record itself still refuses a second resolution after eviction.

use std::collections::{HashSet, VecDeque};

use arena_types::{ArenaError, MatchId, Result};

/// Bounded set of match ids whose settlement has been dispatched.
#[derive(Debug)]
pub struct SettlementGuard {
    settled: HashSet<MatchId>,
    /// Insertion order for eviction (front = oldest).
    order: VecDeque<MatchId>,
    max_size: usize,
}

impl SettlementGuard {
    /// A zero capacity is treated as one.
    #[must_use]
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            settled: HashSet::new(),
            order: VecDeque::new(),
            max_size,
        }
    }

    /// Record that `match_id` is being settled.
    ///
    /// # Errors
    /// Returns [`ArenaError::MatchAlreadyResolved`] if it was already marked.
    pub fn mark_settled(&mut self, match_id: MatchId) -> Result<()> {
        if !self.settled.insert(match_id) {
            return Err(ArenaError::MatchAlreadyResolved(match_id));
        }
        self.order.push_back(match_id);

        while self.order.len() > self.max_size {
            let Some(evicted) = self.order.pop_front() else {
                break;
            };
            self.settled.remove(&evicted);
        }
        Ok(())
    }

    #[must_use]
    pub fn is_settled(&self, match_id: &MatchId) -> bool {
        self.settled.contains(match_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.settled.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.settled.is_empty()
    }
}
