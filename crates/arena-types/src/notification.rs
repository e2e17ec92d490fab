//! Out-of-band events pushed to players.
//!
//! Notifications are never replies: they are published on a broadcast topic
//! after the triggering request has already been answered (or, for
//! `play-card`, without any reply at all).

use serde::{Deserialize, Serialize};

use crate::messages::{self, encode};
use crate::{CardEntry, CardId, MatchId, PlayerId, Result, RoundVerdict, SettlementRef};

/// `{id, p1, p2}` as carried by `match-found`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub id: MatchId,
    pub p1: PlayerId,
    pub p2: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchFound {
    pub client_id: PlayerId,
    #[serde(rename = "match")]
    pub summary: MatchSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundResult {
    pub client_id: PlayerId,
    pub match_id: MatchId,
    pub result: RoundVerdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub own_card: Option<CardEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub opponent_card: Option<CardEntry>,
    /// Ledger object id of the match log, when the log call succeeded.
    pub settlement_ref: Option<SettlementRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub msg: Option<String>,
}

impl RoundResult {
    /// A `result: error` for a rejected fire-and-forget submission.
    #[must_use]
    pub fn error(client_id: PlayerId, match_id: MatchId, msg: impl Into<String>) -> Self {
        Self {
            client_id,
            match_id,
            result: RoundVerdict::Error,
            own_card: None,
            opponent_card: None,
            settlement_ref: None,
            msg: Some(msg.into()),
        }
    }
}

/// Body of a `trade-result.{id}` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TradeOutcome {
    Success { received_card: CardId },
    Error { msg: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradeResult {
    pub client_id: PlayerId,
    pub outcome: TradeOutcome,
}

/// Everything the engine broadcasts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    MatchFound(MatchFound),
    RoundResult(RoundResult),
    TradeResult(TradeResult),
    Heartbeat { server_ping: i64 },
}

impl Notification {
    /// Topic this event is published on. Trade results use a per-player topic.
    #[must_use]
    pub fn topic(&self) -> String {
        match self {
            Self::MatchFound(_) => messages::MATCH_FOUND.to_string(),
            Self::RoundResult(_) => messages::ROUND_RESULT.to_string(),
            Self::TradeResult(t) => format!("{}.{}", messages::TRADE_RESULT, t.client_id),
            Self::Heartbeat { .. } => messages::HEARTBEAT.to_string(),
        }
    }

    /// The player this event is addressed to. Heartbeats go to everyone.
    #[must_use]
    pub fn recipient(&self) -> Option<PlayerId> {
        match self {
            Self::MatchFound(m) => Some(m.client_id),
            Self::RoundResult(r) => Some(r.client_id),
            Self::TradeResult(t) => Some(t.client_id),
            Self::Heartbeat { .. } => None,
        }
    }

    /// JSON body as published on the bus.
    ///
    /// # Errors
    /// `Serialization` if encoding fails.
    pub fn body(&self) -> Result<Vec<u8>> {
        match self {
            Self::MatchFound(m) => encode(m),
            Self::RoundResult(r) => encode(r),
            Self::TradeResult(t) => encode(&t.outcome),
            Self::Heartbeat { server_ping } => {
                encode(&serde_json::json!({ "server_ping": server_ping }))
            }
        }
    }
}
