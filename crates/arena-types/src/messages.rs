//! Typed request and reply records for every bus subject.
//!
//! Each subject has an explicit record decoded with serde. A payload that
//! fails to decode becomes [`ArenaError::MalformedPayload`], which the
//! gateway turns into an [`ErrorReply`].

use std::fmt;
use std::str::FromStr;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::{ArenaError, CardEntry, CardId, MatchId, PlayerId, Result};

// ---------------------------------------------------------------------------
// Subjects
// ---------------------------------------------------------------------------

pub const CREATE_ACCOUNT: &str = "create-account";
pub const LOGIN: &str = "login";
pub const OPEN_PACK: &str = "open-pack";
pub const SEE_CARDS: &str = "see-cards";
pub const FIND_MATCH: &str = "find-match";
pub const PLAY_CARD: &str = "play-card";
pub const JOIN_BLIND_TRADE: &str = "join-blind-trade";
pub const GET_CREDENTIALS: &str = "get-credentials";
pub const GET_BALANCE: &str = "get-balance";
pub const STATUS: &str = "status";
pub const PING: &str = "ping";

// Broadcast topics.
pub const MATCH_FOUND: &str = "match-found";
pub const ROUND_RESULT: &str = "round-result";
pub const TRADE_RESULT: &str = "trade-result";
pub const HEARTBEAT: &str = "heartbeat";

/// Inbound subjects the gateway dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Subject {
    CreateAccount,
    Login,
    OpenPack,
    SeeCards,
    FindMatch,
    PlayCard,
    JoinBlindTrade,
    GetCredentials,
    GetBalance,
    Status,
    Ping,
}

impl Subject {
    pub const ALL: [Self; 11] = [
        Self::CreateAccount,
        Self::Login,
        Self::OpenPack,
        Self::SeeCards,
        Self::FindMatch,
        Self::PlayCard,
        Self::JoinBlindTrade,
        Self::GetCredentials,
        Self::GetBalance,
        Self::Status,
        Self::Ping,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CreateAccount => CREATE_ACCOUNT,
            Self::Login => LOGIN,
            Self::OpenPack => OPEN_PACK,
            Self::SeeCards => SEE_CARDS,
            Self::FindMatch => FIND_MATCH,
            Self::PlayCard => PLAY_CARD,
            Self::JoinBlindTrade => JOIN_BLIND_TRADE,
            Self::GetCredentials => GET_CREDENTIALS,
            Self::GetBalance => GET_BALANCE,
            Self::Status => STATUS,
            Self::Ping => PING,
        }
    }

    /// Fire-and-forget subjects get no reply.
    #[must_use]
    pub fn expects_reply(self) -> bool {
        !matches!(self, Self::PlayCard)
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Subject {
    type Err = ArenaError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|subject| subject.as_str() == s)
            .ok_or_else(|| ArenaError::UnknownSubject(s.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

/// Body-less request (`create-account`, `status`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmptyRequest {}

/// Request that only names the calling player.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRequest {
    pub client_id: PlayerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayCardRequest {
    pub client_id: PlayerId,
    pub card_value: u64,
    pub match_id: MatchId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinBlindTradeRequest {
    pub client_id: PlayerId,
    pub card_id: CardId,
}

/// Ping carries arbitrary client timestamps; they are echoed back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PingRequest {
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Replies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateAccountReply {
    pub player_id: PlayerId,
}

/// `{"result": true}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AckReply {
    pub result: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardsReply {
    pub result: Vec<CardEntry>,
}

/// `{"status": "queued"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedReply {
    pub status: String,
}

impl QueuedReply {
    #[must_use]
    pub fn queued() -> Self {
        Self {
            status: "queued".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialsReply {
    pub address: String,
    pub secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceReply {
    pub balance: u64,
}

/// Debug snapshot of the session store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReply {
    pub node: String,
    pub version: String,
    pub players: usize,
    pub matches: usize,
    pub open_matches: usize,
    pub battle_queue: usize,
    pub trade_queue: usize,
    pub packs_left: usize,
    #[serde(default)]
    pub unminted_cards: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PingReply {
    #[serde(flatten)]
    pub fields: serde_json::Map<String, serde_json::Value>,
    pub server_ping: i64,
}

/// Every failed request/reply subject answers with this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub err: String,
    pub code: String,
}

impl From<&ArenaError> for ErrorReply {
    fn from(e: &ArenaError) -> Self {
        Self {
            err: e.to_string(),
            code: e.code().to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Codec helpers
// ---------------------------------------------------------------------------

/// Decode a request payload. An empty payload is read as `{}`.
///
/// # Errors
/// `MalformedPayload` naming the subject and the serde failure.
pub fn decode<T: DeserializeOwned>(subject: Subject, payload: &[u8]) -> Result<T> {
    let bytes: &[u8] = if payload.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        payload
    };
    serde_json::from_slice(bytes).map_err(|e| ArenaError::MalformedPayload {
        subject: subject.to_string(),
        reason: e.to_string(),
    })
}

/// Encode a reply or notification body.
///
/// # Errors
/// `Serialization` if the value cannot be represented as JSON.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| ArenaError::Serialization(e.to_string()))
}
