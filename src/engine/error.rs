use thiserror::Error;

/// Failure of a duel operation. The message is what the caller sees in
/// `{"error": ...}`; [`DuelError::status`] picks the HTTP-style status.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DuelError {
    // Validation (400)
    #[error("{0}")]
    Invalid(String),

    // Not found (404)
    #[error("Unknown playerId")]
    UnknownPlayer,
    #[error("Unknown code")]
    UnknownCode,
    #[error("Round not found")]
    RoundNotFound,

    // Authorization (403)
    #[error("Only host can start")]
    NotHost,
    #[error("Player not in duel")]
    NotMember,

    // State conflicts (400)
    #[error("Duel not joinable")]
    NotJoinable,
    #[error("Lobby full")]
    LobbyFull,
    #[error("Duel already started")]
    AlreadyStarted,
    #[error("Need 2 players to start")]
    NeedTwoPlayers,
    #[error("Duel already initialized")]
    AlreadyInitialized,
    #[error("Duel not active")]
    NotActive,
    #[error("Already answered this round")]
    AlreadyAnswered,

    // Stale client view (409) - client should re-sync through state
    #[error("Stale round: submitted {submitted}, current is {current}")]
    StaleRound { submitted: u32, current: u32 },

    // Server side (500)
    #[error("Could not generate code")]
    CodeExhausted,
    #[error("Not enough riders in DB")]
    NotEnoughRiders,
    #[error("Could not enroll host")]
    HostEnrollFailed,
}

impl DuelError {
    /// Shorthand for a validation failure
    pub fn invalid(msg: impl Into<String>) -> Self {
        DuelError::Invalid(msg.into())
    }

    pub fn status(&self) -> u16 {
        match self {
            DuelError::Invalid(_)
            | DuelError::NotJoinable
            | DuelError::LobbyFull
            | DuelError::AlreadyStarted
            | DuelError::NeedTwoPlayers
            | DuelError::AlreadyInitialized
            | DuelError::NotActive
            | DuelError::AlreadyAnswered => 400,
            DuelError::NotHost | DuelError::NotMember => 403,
            DuelError::UnknownPlayer | DuelError::UnknownCode | DuelError::RoundNotFound => 404,
            DuelError::StaleRound { .. } => 409,
            DuelError::CodeExhausted | DuelError::NotEnoughRiders | DuelError::HostEnrollFailed => 500,
        }
    }
}

/// Store-level failure. The only one the engine reacts to is a unique
/// constraint violation: it is how "already answered", "code taken" and
/// "already initialized" are detected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("unique constraint violated on {key}")]
    UniqueViolation { key: String },
}
