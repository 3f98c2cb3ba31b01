use crate::{Duel, DuelAnswer, DuelPlayer, DuelResult, DuelRound, Rider};
use super::StoreError;

/// A rider that can be drawn into a round, with its current team
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiderPick {
    pub rider_id: String,
    pub team_id: String,
}

/// The duel record store.
///
/// Each method is one statement: atomic on its own, with no isolation across
/// calls. Conditional updates return `false` when their guard did not match
/// (someone else got there first). Inserts fail with
/// [`StoreError::UniqueViolation`] when their unique key already exists.
pub trait DuelStore {
    // -------------------- Players / catalogue --------------------

    /// Display name of a player, `None` if the player does not exist
    fn player_name(&self, player_id: &str) -> Option<String>;

    /// Every rider that currently has a team
    fn rider_pool(&self) -> Vec<RiderPick>;

    fn rider(&self, rider_id: &str) -> Option<Rider>;

    fn team_name(&self, team_id: &str) -> Option<String>;

    // -------------------- Duels --------------------

    fn duel_by_code(&self, code: &str) -> Option<Duel>;

    fn duel_by_id(&self, duel_id: u64) -> Option<Duel>;

    /// Insert a new duel; `id` is assigned by the store. Fails on a taken code.
    fn insert_duel(&mut self, duel: Duel) -> Result<Duel, StoreError>;

    /// Remove a duel row (a lobby whose host could not be enrolled)
    fn delete_duel(&mut self, duel_id: u64);

    /// Lobby -> Active with round 1 open. Guard: status is Lobby.
    fn activate_duel(&mut self, duel_id: u64, started_at: i64, ends_at: i64) -> bool;

    /// Set the window of the current round. Guard: Active, on `round_no`, no deadline yet.
    fn open_round_clock(&mut self, duel_id: u64, round_no: u32, started_at: i64, ends_at: i64) -> bool;

    /// Move to `from_round + 1` with a fresh window. Guard: Active, on `from_round`.
    fn advance_round(&mut self, duel_id: u64, from_round: u32, started_at: i64, ends_at: i64) -> bool;

    /// Active -> Finished. Guard: Active, on `at_round`.
    fn finish_duel(&mut self, duel_id: u64, at_round: u32, finished_at: i64) -> bool;

    // -------------------- Membership --------------------

    /// Members ordered by side
    fn members(&self, duel_id: u64) -> Vec<DuelPlayer>;

    /// Fails when the player is already a member
    fn insert_member(&mut self, member: DuelPlayer) -> Result<(), StoreError>;

    // -------------------- Rounds --------------------

    fn has_rounds(&self, duel_id: u64) -> bool;

    /// Fails when the round number already has an assignment
    fn insert_round(&mut self, round: DuelRound) -> Result<(), StoreError>;

    fn round(&self, duel_id: u64, round_no: u32) -> Option<DuelRound>;

    // -------------------- Answers --------------------

    fn answers(&self, duel_id: u64) -> Vec<DuelAnswer>;

    /// Fails when the player already answered this round
    fn insert_answer(&mut self, answer: DuelAnswer) -> Result<(), StoreError>;

    fn round_answers(&self, duel_id: u64, round_no: u32) -> Vec<DuelAnswer> {
        self.answers(duel_id)
            .into_iter()
            .filter(|a| a.round_no == round_no)
            .collect()
    }

    /// Record a timeout for each listed player that has no answer yet.
    /// Conflicts mean a real answer won the race and are skipped.
    /// Returns how many timeouts were written.
    fn insert_timeouts(&mut self, duel_id: u64, round_no: u32, player_ids: &[String], at: i64) -> u32 {
        let mut written = 0;
        for player_id in player_ids {
            let timeout = DuelAnswer {
                id: 0,
                answer_key: answer_key(duel_id, round_no, player_id),
                duel_id,
                round_no,
                player_id: player_id.clone(),
                team_id: None,
                is_correct: false,
                answered_at_ms: at,
            };
            if self.insert_answer(timeout).is_ok() {
                written += 1;
            }
        }
        written
    }

    // -------------------- Results --------------------

    fn result(&self, duel_id: u64) -> Option<DuelResult>;

    /// Insert or overwrite. `created_at_ms` of an existing row is kept.
    fn upsert_result(&mut self, result: DuelResult);
}

// -------------------- Unique keys --------------------
// SpacetimeDB only has single-column unique constraints, so composite
// uniqueness is carried by a formatted key column.

pub fn member_key(duel_id: u64, player_id: &str) -> String {
    format!("{}:{}", duel_id, player_id)
}

pub fn round_key(duel_id: u64, round_no: u32) -> String {
    format!("{}:{}", duel_id, round_no)
}

pub fn answer_key(duel_id: u64, round_no: u32, player_id: &str) -> String {
    format!("{}:{}:{}", duel_id, round_no, player_id)
}
