use thiserror::Error;

/// Process-wide error type, grouped by concern: authN/authZ, resource,
/// input, financial, anti-cheat, transient.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    // --- Authentication / Authorization ---
    #[error("unauthenticated")]
    Unauthenticated,

    #[error("forbidden")]
    Forbidden,

    #[error("user is banned")]
    UserBanned,

    // --- Resource ---
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("room is full")]
    RoomFull,

    #[error("room is locked")]
    RoomLocked,

    #[error("invite code space exhausted")]
    CodeExhausted,

    // --- Input ---
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    #[error("invalid invite code")]
    InvalidInviteCode,

    #[error("bet tier not allowed")]
    BetTierNotAllowed,

    // --- Financial ---
    #[error("insufficient funds")]
    InsufficientFunds,

    #[error("idempotency key conflict")]
    KeyConflict,

    // --- Anti-cheat ---
    #[error("player kicked for repeated anti-cheat violations")]
    Kicked,

    // --- Transient ---
    #[error("service unavailable")]
    Unavailable,

    #[error("timed out")]
    Timeout,

    #[error("repository error: {0}")]
    RepositoryError(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<rusqlite::Error> for Error {
    fn from(e: rusqlite::Error) -> Self {
        Error::RepositoryError(e.to_string())
    }
}

impl Error {
    /// Stable wire code sent to clients alongside the error message.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Unauthenticated => "UNAUTHENTICATED",
            Error::Forbidden => "FORBIDDEN",
            Error::UserBanned => "USER_BANNED",
            Error::NotFound(_) => "NOT_FOUND",
            Error::Conflict(_) => "CONFLICT",
            Error::RoomFull => "ROOM_FULL",
            Error::RoomLocked => "ROOM_LOCKED",
            Error::CodeExhausted => "CODE_EXHAUSTED",
            Error::InvalidMessage(_) => "INVALID_MESSAGE",
            Error::InvalidInviteCode => "INVALID_INVITE_CODE",
            Error::BetTierNotAllowed => "BET_TIER_NOT_ALLOWED",
            Error::InsufficientFunds => "INSUFFICIENT_FUNDS",
            Error::KeyConflict => "KEY_CONFLICT",
            Error::Kicked => "KICKED",
            Error::Unavailable => "UNAVAILABLE",
            Error::Timeout => "TIMEOUT",
            Error::RepositoryError(_) => "REPOSITORY_ERROR",
        }
    }
}
