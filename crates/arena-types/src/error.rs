//! Error types for the Arena orchestration engine.
//!
//! All errors use the `AR_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Player errors
//! - 2xx: Battle errors
//! - 3xx: Blind trade errors
//! - 4xx: Pack / economy errors
//! - 5xx: Ledger errors
//! - 6xx: Protocol errors
//! - 9xx: General / internal errors

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CardId, MatchId, PlayerId};

/// Coarse error taxonomy used for reply encoding and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Unknown player or match.
    NotFound,
    /// Request conflicts with current state (already queued, already played…).
    Conflict,
    /// The ledger timed out or explicitly rejected the operation.
    LedgerFailure,
    /// Malformed or missing fields in an inbound message.
    ProtocolError,
    /// Request is well-formed but violates a game rule.
    BusinessRuleViolation,
    /// Engine-side fault (poisoned lock, broken invariant, bad config).
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "NOT_FOUND"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::LedgerFailure => write!(f, "LEDGER_FAILURE"),
            Self::ProtocolError => write!(f, "PROTOCOL_ERROR"),
            Self::BusinessRuleViolation => write!(f, "BUSINESS_RULE_VIOLATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The ledger operation an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LedgerOp {
    CreateWallet,
    Balance,
    Charge,
    MintCard,
    TransferCard,
    ListCards,
    ValidateOwnership,
    AtomicSwap,
    LogMatch,
}

impl fmt::Display for LedgerOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateWallet => write!(f, "CREATE_WALLET"),
            Self::Balance => write!(f, "BALANCE"),
            Self::Charge => write!(f, "CHARGE"),
            Self::MintCard => write!(f, "MINT_CARD"),
            Self::TransferCard => write!(f, "TRANSFER_CARD"),
            Self::ListCards => write!(f, "LIST_CARDS"),
            Self::ValidateOwnership => write!(f, "VALIDATE_OWNERSHIP"),
            Self::AtomicSwap => write!(f, "ATOMIC_SWAP"),
            Self::LogMatch => write!(f, "LOG_MATCH"),
        }
    }
}

/// Failure of a single ledger round trip. Never retried by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// No reply arrived within the operation's deadline.
    #[error("{op} timed out after {after_ms}ms")]
    Timeout { op: LedgerOp, after_ms: u64 },

    /// The ledger answered with an explicit failure (insufficient funds,
    /// unknown object, swap rejected…).
    #[error("{op} rejected: {reason}")]
    Rejected { op: LedgerOp, reason: String },

    /// The ledger could not be reached at all.
    #[error("{op} unavailable: {reason}")]
    Unavailable { op: LedgerOp, reason: String },
}

impl LedgerError {
    /// The operation that failed.
    #[must_use]
    pub fn op(&self) -> LedgerOp {
        match self {
            Self::Timeout { op, .. } | Self::Rejected { op, .. } | Self::Unavailable { op, .. } => {
                *op
            }
        }
    }

    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

/// Central error enum for all Arena operations.
#[derive(Debug, Error)]
pub enum ArenaError {
    // =================================================================
    // Player Errors (1xx)
    // =================================================================
    /// No player with this identity exists.
    #[error("AR_ERR_100: Player not found: {0}")]
    PlayerNotFound(PlayerId),

    // =================================================================
    // Battle Errors (2xx)
    // =================================================================
    /// The requested match was never created.
    #[error("AR_ERR_200: Match not found: {0}")]
    MatchNotFound(MatchId),

    /// The submitting player occupies neither slot of the match.
    #[error("AR_ERR_201: Player {player} is not in match {match_id}")]
    PlayerNotInMatch { player: PlayerId, match_id: MatchId },

    /// The player's card cache holds no card with this power value.
    #[error("AR_ERR_202: Player {player} owns no card of value {value}")]
    CardNotOwned { player: PlayerId, value: u64 },

    /// The player already submitted a card in this match.
    #[error("AR_ERR_203: Player {player} already played in match {match_id}")]
    AlreadySubmitted { player: PlayerId, match_id: MatchId },

    /// The match has been resolved; no further submissions or resolutions.
    #[error("AR_ERR_204: Match already resolved: {0}")]
    MatchAlreadyResolved(MatchId),

    /// Fewer than two players are waiting in the battle queue.
    #[error("AR_ERR_205: Not enough players to pair: {queued} queued")]
    InsufficientPlayers { queued: usize },

    // =================================================================
    // Blind Trade Errors (3xx)
    // =================================================================
    /// The ledger does not attribute the offered card to the player.
    #[error("AR_ERR_300: Player {player} does not own card {card}")]
    NotOwner { player: PlayerId, card: CardId },

    /// The player already has a pending trade request.
    #[error("AR_ERR_301: Player {0} already has a pending trade")]
    AlreadyQueued(PlayerId),

    // =================================================================
    // Pack / Economy Errors (4xx)
    // =================================================================
    /// The finite pack inventory has been fully drawn.
    #[error("AR_ERR_400: No packs available")]
    PacksExhausted,

    // =================================================================
    // Ledger Errors (5xx)
    // =================================================================
    /// A ledger round trip failed or timed out.
    #[error("AR_ERR_500: Ledger failure: {0}")]
    Ledger(#[from] LedgerError),

    // =================================================================
    // Protocol Errors (6xx)
    // =================================================================
    /// No handler is registered for this subject.
    #[error("AR_ERR_600: Unknown subject: {0}")]
    UnknownSubject(String),

    /// The payload could not be decoded into the subject's request record.
    #[error("AR_ERR_601: Malformed payload on {subject}: {reason}")]
    MalformedPayload { subject: String, reason: String },

    // =================================================================
    // General / Internal (9xx)
    // =================================================================
    /// The session store lock is poisoned; the operation was refused.
    #[error("AR_ERR_900: Session store unavailable")]
    StoreUnavailable,

    /// A core invariant check failed; the operation was refused.
    #[error("AR_ERR_901: Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    /// Configuration error (invalid config file, bad env override…).
    #[error("AR_ERR_902: Configuration error: {0}")]
    Configuration(String),

    /// Serialization of an outbound record failed.
    #[error("AR_ERR_903: Serialization error: {0}")]
    Serialization(String),

    /// I/O error.
    #[error("AR_ERR_904: I/O error: {0}")]
    Io(String),
}

impl ArenaError {
    /// Which bucket of the error taxonomy this error belongs to.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PlayerNotFound(_) | Self::MatchNotFound(_) => ErrorKind::NotFound,
            Self::PlayerNotInMatch { .. }
            | Self::AlreadySubmitted { .. }
            | Self::MatchAlreadyResolved(_)
            | Self::InsufficientPlayers { .. }
            | Self::AlreadyQueued(_) => ErrorKind::Conflict,
            Self::CardNotOwned { .. } | Self::NotOwner { .. } | Self::PacksExhausted => {
                ErrorKind::BusinessRuleViolation
            }
            Self::Ledger(_) => ErrorKind::LedgerFailure,
            Self::UnknownSubject(_) | Self::MalformedPayload { .. } => ErrorKind::ProtocolError,
            Self::StoreUnavailable
            | Self::InvariantViolation { .. }
            | Self::Configuration(_)
            | Self::Serialization(_)
            | Self::Io(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code carried in error replies.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::PlayerNotFound(_) => "PLAYER_NOT_FOUND",
            Self::MatchNotFound(_) => "MATCH_NOT_FOUND",
            Self::PlayerNotInMatch { .. } => "PLAYER_NOT_IN_MATCH",
            Self::CardNotOwned { .. } => "CARD_NOT_OWNED",
            Self::AlreadySubmitted { .. } => "ALREADY_SUBMITTED",
            Self::MatchAlreadyResolved(_) => "MATCH_ALREADY_RESOLVED",
            Self::InsufficientPlayers { .. } => "INSUFFICIENT_PLAYERS",
            Self::NotOwner { .. } => "NOT_OWNER",
            Self::AlreadyQueued(_) => "ALREADY_QUEUED",
            Self::PacksExhausted => "PACKS_EXHAUSTED",
            Self::Ledger(LedgerError::Timeout { .. }) => "LEDGER_TIMEOUT",
            Self::Ledger(_) => "LEDGER_FAILURE",
            Self::UnknownSubject(_) => "UNKNOWN_SUBJECT",
            Self::MalformedPayload { .. } => "MALFORMED_PAYLOAD",
            Self::StoreUnavailable => "STORE_UNAVAILABLE",
            Self::InvariantViolation { .. } => "INVARIANT_VIOLATION",
            Self::Configuration(_) => "CONFIGURATION",
            Self::Serialization(_) => "SERIALIZATION",
            Self::Io(_) => "IO",
        }
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, ArenaError>;

impl From<std::io::Error> for ArenaError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_contains_prefix() {
        let err = ArenaError::PlayerNotFound(PlayerId(9));
        let msg = format!("{err}");
        assert!(msg.starts_with("AR_ERR_100"), "Got: {msg}");
        assert!(msg.contains('9'));
    }

    #[test]
    fn ledger_error_wraps_with_op() {
        let err: ArenaError = LedgerError::Timeout {
            op: LedgerOp::AtomicSwap,
            after_ms: 20_000,
        }
        .into();
        let msg = format!("{err}");
        assert!(msg.contains("AR_ERR_500"));
        assert!(msg.contains("ATOMIC_SWAP"));
        assert!(msg.contains("20000"));
        assert_eq!(err.code(), "LEDGER_TIMEOUT");
        assert_eq!(err.kind(), ErrorKind::LedgerFailure);
    }

    #[test]
    fn taxonomy_buckets() {
        assert_eq!(
            ArenaError::MatchNotFound(MatchId::new()).kind(),
            ErrorKind::NotFound
        );
        assert_eq!(
            ArenaError::AlreadyQueued(PlayerId(1)).kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            ArenaError::CardNotOwned {
                player: PlayerId(1),
                value: 3
            }
            .kind(),
            ErrorKind::BusinessRuleViolation
        );
        assert_eq!(
            ArenaError::MalformedPayload {
                subject: "play-card".into(),
                reason: "missing field".into()
            }
            .kind(),
            ErrorKind::ProtocolError
        );
        assert_eq!(ArenaError::StoreUnavailable.kind(), ErrorKind::Internal);
    }

    #[test]
    fn rejected_ledger_code() {
        let err = ArenaError::from(LedgerError::Rejected {
            op: LedgerOp::Charge,
            reason: "insufficient funds".into(),
        });
        assert_eq!(err.code(), "LEDGER_FAILURE");
        assert!(format!("{err}").contains("insufficient funds"));
    }

    #[test]
    fn all_errors_have_ar_err_prefix() {
        let errors: Vec<Box<dyn std::error::Error>> = vec![
            Box::new(ArenaError::PacksExhausted),
            Box::new(ArenaError::StoreUnavailable),
            Box::new(ArenaError::InsufficientPlayers { queued: 1 }),
            Box::new(ArenaError::UnknownSubject("nope".into())),
            Box::new(ArenaError::InvariantViolation {
                reason: "test".into(),
            }),
        ];
        for err in errors {
            let msg = format!("{err}");
            assert!(
                msg.starts_with("AR_ERR_"),
                "Error missing AR_ERR_ prefix: {msg}"
            );
        }
    }
}
