//! Reducer arguments. Every field is optional on the wire; `validate` turns a
//! request into the checked input an operation runs on, or a 400.

use spacetimedb::SpacetimeType;

use super::{clock, non_blank, normalize_code, DuelError, TIMEOUT_SENTINEL};

/// Rounds per duel when the creator does not say
pub const DEFAULT_TOTAL_ROUNDS: u32 = 30;

pub const MIN_TOTAL_ROUNDS: u32 = 5;
pub const MAX_TOTAL_ROUNDS: u32 = 50;

/// POST /duel/create
#[derive(SpacetimeType, Debug, Clone, Default)]
pub struct CreateDuelRequest {
    pub player_id: Option<String>,
    pub total: Option<u32>,
    pub round_seconds: Option<u32>,
}

/// POST /duel/join and POST /duel/start
#[derive(SpacetimeType, Debug, Clone, Default)]
pub struct LobbyRequest {
    pub player_id: Option<String>,
    pub code: Option<String>,
}

/// POST /duel/{code}/answer
#[derive(SpacetimeType, Debug, Clone, Default)]
pub struct AnswerRequest {
    pub player_id: Option<String>,
    /// Picked team, or `__TIMEOUT__` to abstain
    pub team_id: Option<String>,
    /// Round the client believes is current
    pub round_no: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDuel {
    pub host_id: String,
    pub total: u32,
    pub round_duration_ms: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyAction {
    pub player_id: String,
    pub code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerSubmission {
    pub code: String,
    pub player_id: String,
    pub team_id: String,
    pub expected_round: Option<u32>,
}

impl AnswerSubmission {
    pub fn abstains(&self) -> bool {
        self.team_id == TIMEOUT_SENTINEL
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelQuery {
    pub code: String,
    pub player_id: String,
}

impl CreateDuelRequest {
    pub fn validate(self) -> Result<NewDuel, DuelError> {
        let host_id = non_blank(self.player_id).ok_or_else(|| DuelError::invalid("Missing playerId"))?;

        let total = self.total.unwrap_or(DEFAULT_TOTAL_ROUNDS);
        if !(MIN_TOTAL_ROUNDS..=MAX_TOTAL_ROUNDS).contains(&total) {
            return Err(DuelError::invalid(format!(
                "Invalid total ({}..{})",
                MIN_TOTAL_ROUNDS, MAX_TOTAL_ROUNDS
            )));
        }

        Ok(NewDuel {
            host_id,
            total,
            round_duration_ms: clock::round_duration_ms(self.round_seconds),
        })
    }
}

impl LobbyRequest {
    pub fn validate(self) -> Result<LobbyAction, DuelError> {
        let player_id = non_blank(self.player_id);
        let code = self.code.as_deref().and_then(normalize_code);
        match (player_id, code) {
            (Some(player_id), Some(code)) => Ok(LobbyAction { player_id, code }),
            _ => Err(DuelError::invalid("Missing playerId or code")),
        }
    }
}

impl AnswerRequest {
    pub fn validate(self, code: &str) -> Result<AnswerSubmission, DuelError> {
        let code = normalize_code(code);
        let player_id = non_blank(self.player_id);
        let team_id = non_blank(self.team_id);
        match (code, player_id, team_id) {
            (Some(code), Some(player_id), Some(team_id)) => Ok(AnswerSubmission {
                code,
                player_id,
                team_id,
                expected_round: self.round_no,
            }),
            _ => Err(DuelError::invalid("Missing code/playerId/teamId")),
        }
    }
}

/// GET /duel/{code}/state and /question both take the code from the path and
/// the player from the query string
pub fn validate_query(code: &str, player_id: Option<String>) -> Result<DuelQuery, DuelError> {
    match (normalize_code(code), non_blank(player_id)) {
        (Some(code), Some(player_id)) => Ok(DuelQuery { code, player_id }),
        _ => Err(DuelError::invalid("Missing code or playerId")),
    }
}
