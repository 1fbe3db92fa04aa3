use crate::AckType;
use fairdraw_types::{DrawStatus, UserId};
use thiserror::Error;

/// Local failures of the draw aggregate.
///
/// These are precondition violations raised to the immediate caller. Peer
/// misbehaviour is recorded in the draw's error ledger instead.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DrawError {
    #[error("FORBIDDEN_DRAW_STATUS: expected {expected}, draw is {actual}")]
    WrongPhase {
        expected: DrawStatus,
        actual: DrawStatus,
    },

    #[error("ERR_REMOVE_STKHOLDER: stakeholder {0} not found")]
    NotFound(UserId),

    #[error("draw has no candidates")]
    NoCandidates,

    #[error("INVALID_REVEAL_MASK: not every reveal matches its commit")]
    InvalidReveals,

    #[error("INVALID_REVEAL_DATA: reveal from {0} is not an integer")]
    InvalidRevealData(UserId),

    #[error("WINNER_INDEX_OUT_OF_RANGE: no candidate owns index {0}")]
    WinnerIndexOutOfRange(usize),

    #[error("WINNER_NOT_FOUND: draw has no winner")]
    WinnerNotFound,

    #[error("ACK_MISMATCH: {ack_type} ack from {user} contradicts local state")]
    AckMismatch { ack_type: AckType, user: UserId },
}
