//! Response bodies, and the two read operations that build the bigger ones.
//!
//! Every body is serialized camelCase into the caller's reply row.

use serde::Serialize;

use crate::DuelStatus;
use super::request::validate_query;
use super::result::{self, ResultView};
use super::store::DuelStore;
use super::{tick, DuelError};

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreatedDuel {
    pub duel_id: u64,
    pub code: String,
    pub status: &'static str,
    pub total: u32,
    pub round_duration_ms: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct JoinedDuel {
    pub ok: bool,
    pub code: String,
    pub status: &'static str,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StartedDuel {
    pub ok: bool,
    pub status: &'static str,
    pub round_ends_at: i64,
    pub round_duration_ms: u32,
    pub server_time: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOutcome {
    pub ok: bool,
    pub correct: bool,
    pub correct_team_name: Option<String>,
    /// Recorded as a timeout (abstained or too late)
    pub timeout: bool,
    /// Arrived after the round deadline
    pub expired: bool,
    pub finished: bool,
    pub round_no: u32,
    pub server_time: i64,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DuelSummary {
    pub code: String,
    pub status: &'static str,
    pub total: u32,
    pub current_round: u32,
    pub round_started_at: Option<i64>,
    pub round_ends_at: Option<i64>,
    pub round_duration_ms: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntry {
    pub player_id: String,
    pub name: Option<String>,
    pub side: u8,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ScoreEntry {
    pub player_id: String,
    pub score: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MeEntry {
    pub player_id: String,
    pub answered_this_round: bool,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoundProgress {
    pub answered_count: u32,
}

/// Polled by both clients
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StateView {
    pub server_time: i64,
    pub duel: DuelSummary,
    pub players: Vec<PlayerEntry>,
    pub scores: Vec<ScoreEntry>,
    pub me: MeEntry,
    pub round: RoundProgress,
    pub result: Option<ResultView>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoundQuestion {
    pub round_no: u32,
    pub rider_id: String,
    pub rider_name: String,
    pub nation: Option<String>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(untagged)]
pub enum QuestionView {
    Waiting { waiting: bool, status: &'static str },
    Finished { finished: bool, status: &'static str },
    #[serde(rename_all = "camelCase")]
    Round {
        server_time: i64,
        round_ends_at: Option<i64>,
        round_duration_ms: u32,
        round: RoundQuestion,
    },
}

/// Full duel snapshot for `player_id`. Membership is not required to watch.
pub fn state<S: DuelStore + ?Sized>(
    store: &mut S,
    code: &str,
    player_id: Option<String>,
    now: i64,
) -> Result<StateView, DuelError> {
    let query = validate_query(code, player_id)?;
    let found = store.duel_by_code(&query.code).ok_or(DuelError::UnknownCode)?;

    tick::advance(store, found.id, now);
    let duel = store.duel_by_id(found.id).ok_or(DuelError::UnknownCode)?;

    let scores = result::side_scores(store, duel.id);
    let round_answers = store.round_answers(duel.id, duel.current_round);
    let answered_this_round = round_answers.iter().any(|a| a.player_id == query.player_id);
    let result = result::materialize(store, &duel, now);

    Ok(StateView {
        server_time: now,
        duel: DuelSummary {
            code: duel.code.clone(),
            status: duel.status.as_str(),
            total: duel.total,
            current_round: duel.current_round,
            round_started_at: duel.round_started_at_ms,
            round_ends_at: duel.round_ends_at_ms,
            round_duration_ms: duel.round_duration_ms,
        },
        players: scores
            .iter()
            .map(|s| PlayerEntry { player_id: s.player_id.clone(), name: s.name.clone(), side: s.side })
            .collect(),
        scores: scores
            .iter()
            .map(|s| ScoreEntry { player_id: s.player_id.clone(), score: s.score })
            .collect(),
        me: MeEntry { player_id: query.player_id, answered_this_round },
        round: RoundProgress { answered_count: round_answers.len() as u32 },
        result,
    })
}

/// The rider to identify in the current round
pub fn question<S: DuelStore + ?Sized>(
    store: &mut S,
    code: &str,
    player_id: Option<String>,
    now: i64,
) -> Result<QuestionView, DuelError> {
    let query = validate_query(code, player_id)?;
    let found = store.duel_by_code(&query.code).ok_or(DuelError::UnknownCode)?;

    tick::advance(store, found.id, now);
    let duel = store.duel_by_id(found.id).ok_or(DuelError::UnknownCode)?;

    match duel.status {
        DuelStatus::Lobby => Ok(QuestionView::Waiting { waiting: true, status: duel.status.as_str() }),
        DuelStatus::Finished => Ok(QuestionView::Finished { finished: true, status: duel.status.as_str() }),
        DuelStatus::Active => {
            let round = store.round(duel.id, duel.current_round).ok_or(DuelError::RoundNotFound)?;
            let rider = store.rider(&round.rider_id).ok_or(DuelError::RoundNotFound)?;
            Ok(QuestionView::Round {
                server_time: now,
                round_ends_at: duel.round_ends_at_ms,
                round_duration_ms: duel.round_duration_ms,
                round: RoundQuestion {
                    round_no: round.round_no,
                    rider_id: rider.id,
                    rider_name: rider.full_name,
                    nation: rider.nation,
                },
            })
        }
    }
}
