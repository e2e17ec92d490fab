//! Battle model: a match between two players and its resolution.
//!
//! Each match moves through three phases, never backwards:
//! **OPEN → AWAITING_SECOND → RESOLVED**
//!
//! Outcome depends only on the two final card values, never on arrival
//! order. Strictly greater wins; equal values are a draw.

use std::cmp::Ordering;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ArenaError, CardId, MatchId, PlayerId, Result};

/// Lifecycle phase of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchPhase {
    /// Paired, nobody has played yet.
    Open,
    /// One side has played.
    AwaitingSecond,
    /// Both sides played and the outcome was decided. Terminal.
    Resolved,
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open => write!(f, "OPEN"),
            Self::AwaitingSecond => write!(f, "AWAITING_SECOND"),
            Self::Resolved => write!(f, "RESOLVED"),
        }
    }
}

/// A card committed to a match slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayedCard {
    pub card_id: CardId,
    pub power: u64,
}

/// Per-player verdict carried in a round-result notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoundVerdict {
    Win,
    Lose,
    Draw,
    Error,
}

impl fmt::Display for RoundVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Win => write!(f, "win"),
            Self::Lose => write!(f, "lose"),
            Self::Draw => write!(f, "draw"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// The decided result of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoundOutcome {
    /// One card was strictly greater.
    Decisive {
        winner: PlayerId,
        loser: PlayerId,
        winning_card: PlayedCard,
        losing_card: PlayedCard,
    },
    /// Equal values. No settlement is logged for a draw.
    Draw {
        first: (PlayerId, PlayedCard),
        second: (PlayerId, PlayedCard),
    },
}

impl RoundOutcome {
    /// Compare two played cards. Pure; independent of submission order.
    #[must_use]
    pub fn decide(a: (PlayerId, PlayedCard), b: (PlayerId, PlayedCard)) -> Self {
        match a.1.power.cmp(&b.1.power) {
            Ordering::Greater => Self::Decisive {
                winner: a.0,
                loser: b.0,
                winning_card: a.1,
                losing_card: b.1,
            },
            Ordering::Less => Self::Decisive {
                winner: b.0,
                loser: a.0,
                winning_card: b.1,
                losing_card: a.1,
            },
            Ordering::Equal => Self::Draw {
                first: a,
                second: b,
            },
        }
    }

    #[must_use]
    pub fn is_draw(&self) -> bool {
        matches!(self, Self::Draw { .. })
    }

    #[must_use]
    pub fn winner(&self) -> Option<PlayerId> {
        match self {
            Self::Decisive { winner, .. } => Some(*winner),
            Self::Draw { .. } => None,
        }
    }

    /// `(player, verdict, own card, opponent card)` for both participants.
    #[must_use]
    pub fn per_player(&self) -> [(PlayerId, RoundVerdict, PlayedCard, PlayedCard); 2] {
        match self {
            Self::Decisive {
                winner,
                loser,
                winning_card,
                losing_card,
            } => [
                (
                    *winner,
                    RoundVerdict::Win,
                    winning_card.clone(),
                    losing_card.clone(),
                ),
                (
                    *loser,
                    RoundVerdict::Lose,
                    losing_card.clone(),
                    winning_card.clone(),
                ),
            ],
            Self::Draw { first, second } => [
                (first.0, RoundVerdict::Draw, first.1.clone(), second.1.clone()),
                (second.0, RoundVerdict::Draw, second.1.clone(), first.1.clone()),
            ],
        }
    }
}

/// A battle between two distinct players.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub p1: PlayerId,
    pub p2: PlayerId,
    card1: Option<PlayedCard>,
    card2: Option<PlayedCard>,
    outcome: Option<RoundOutcome>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Create an open match.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if both slots name the same player.
    pub fn new(p1: PlayerId, p2: PlayerId) -> Result<Self> {
        if p1 == p2 {
            return Err(ArenaError::InvariantViolation {
                reason: format!("match participants must be distinct, got {p1} twice"),
            });
        }
        Ok(Self {
            id: MatchId::new(),
            p1,
            p2,
            card1: None,
            card2: None,
            outcome: None,
            created_at: Utc::now(),
            resolved_at: None,
        })
    }

    #[must_use]
    pub fn phase(&self) -> MatchPhase {
        if self.outcome.is_some() {
            MatchPhase::Resolved
        } else if self.card1.is_some() || self.card2.is_some() {
            MatchPhase::AwaitingSecond
        } else {
            MatchPhase::Open
        }
    }

    #[must_use]
    pub fn involves(&self, player: PlayerId) -> bool {
        self.p1 == player || self.p2 == player
    }

    /// Commit a card to the player's slot.
    ///
    /// A player may play once per match; the first submission stands.
    ///
    /// # Errors
    /// - `MatchAlreadyResolved` once the match is resolved
    /// - `PlayerNotInMatch` if `player` occupies neither slot
    /// - `AlreadySubmitted` if the player's slot is already filled
    pub fn submit(&mut self, player: PlayerId, card: PlayedCard) -> Result<MatchPhase> {
        if self.phase() == MatchPhase::Resolved {
            return Err(ArenaError::MatchAlreadyResolved(self.id));
        }
        let slot = if player == self.p1 {
            &mut self.card1
        } else if player == self.p2 {
            &mut self.card2
        } else {
            return Err(ArenaError::PlayerNotInMatch {
                player,
                match_id: self.id,
            });
        };
        if slot.is_some() {
            return Err(ArenaError::AlreadySubmitted {
                player,
                match_id: self.id,
            });
        }
        *slot = Some(card);
        Ok(self.phase())
    }

    /// Both slots filled and not yet resolved.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.outcome.is_none() && self.card1.is_some() && self.card2.is_some()
    }

    /// Decide the outcome and move to RESOLVED. Runs at most once.
    ///
    /// # Errors
    /// - `MatchAlreadyResolved` on any second call
    /// - `InvariantViolation` if a slot is still empty
    pub fn resolve(&mut self) -> Result<RoundOutcome> {
        if self.outcome.is_some() {
            return Err(ArenaError::MatchAlreadyResolved(self.id));
        }
        let (Some(c1), Some(c2)) = (self.card1.clone(), self.card2.clone()) else {
            return Err(ArenaError::InvariantViolation {
                reason: format!("match {} resolved before both players played", self.id),
            });
        };
        let outcome = RoundOutcome::decide((self.p1, c1), (self.p2, c2));
        self.outcome = Some(outcome.clone());
        self.resolved_at = Some(Utc::now());
        Ok(outcome)
    }

    #[must_use]
    pub fn outcome(&self) -> Option<&RoundOutcome> {
        self.outcome.as_ref()
    }
}
