//! In-memory `DuelStore` for tests. Same uniqueness and conditional-update
//! semantics as the table store. `SharedStore` locks once per statement, so
//! threads interleave between statements exactly like concurrent requests do.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use crate::{Duel, DuelAnswer, DuelPlayer, DuelResult, DuelRound, DuelStatus, Rider};
use super::store::{DuelStore, RiderPick};
use super::StoreError;

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    players: BTreeMap<String, String>,
    teams: BTreeMap<String, String>,
    riders: BTreeMap<String, Rider>,
    duels: BTreeMap<u64, Duel>,
    members: Vec<DuelPlayer>,
    rounds: Vec<DuelRound>,
    answers: Vec<DuelAnswer>,
    results: BTreeMap<u64, DuelResult>,
    next_id: u64,
    /// Codes that `insert_duel` reports as taken, to exercise code retries
    pub taken_codes: Vec<String>,
    /// Member keys that `insert_member` reports as taken
    pub taken_member_keys: Vec<String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store with `riders` riders spread over 4 teams and players "p1", "p2", "p3"
    pub fn with_catalog(riders: usize) -> Self {
        let mut store = Self::new();
        for t in 0..4 {
            store.add_team(&format!("t{}", t), &format!("Team {}", t));
        }
        for r in 0..riders {
            store.add_rider(&format!("r{}", r), Some(&format!("t{}", r % 4)));
        }
        store.add_player("p1", "Alice");
        store.add_player("p2", "Bruno");
        store.add_player("p3", "Chloe");
        store
    }

    pub fn add_player(&mut self, id: &str, name: &str) {
        self.players.insert(id.to_string(), name.to_string());
    }

    pub fn add_team(&mut self, id: &str, name: &str) {
        self.teams.insert(id.to_string(), name.to_string());
    }

    pub fn add_rider(&mut self, id: &str, team_id: Option<&str>) {
        self.riders.insert(id.to_string(), Rider {
            id: id.to_string(),
            full_name: format!("Rider {}", id),
            nation: Some("FRA".to_string()),
            team_id: team_id.map(str::to_string),
        });
    }

    pub fn all_answers(&self) -> &[DuelAnswer] {
        &self.answers
    }

    /// Overwrite a duel row directly (tests that need a hand-built state)
    pub fn put_duel(&mut self, duel: Duel) {
        self.duels.insert(duel.id, duel);
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn update_duel_if(&mut self, duel_id: u64, guard: impl Fn(&Duel) -> bool, change: impl FnOnce(&mut Duel)) -> bool {
        match self.duels.get_mut(&duel_id) {
            Some(duel) if guard(duel) => {
                change(duel);
                true
            }
            _ => false,
        }
    }
}

impl DuelStore for MemoryStore {
    fn player_name(&self, player_id: &str) -> Option<String> {
        self.players.get(player_id).cloned()
    }

    fn rider_pool(&self) -> Vec<RiderPick> {
        self.riders
            .values()
            .filter_map(|r| {
                r.team_id.clone().map(|team_id| RiderPick { rider_id: r.id.clone(), team_id })
            })
            .collect()
    }

    fn rider(&self, rider_id: &str) -> Option<Rider> {
        self.riders.get(rider_id).cloned()
    }

    fn team_name(&self, team_id: &str) -> Option<String> {
        self.teams.get(team_id).cloned()
    }

    fn duel_by_code(&self, code: &str) -> Option<Duel> {
        self.duels.values().find(|d| d.code == code).cloned()
    }

    fn duel_by_id(&self, duel_id: u64) -> Option<Duel> {
        self.duels.get(&duel_id).cloned()
    }

    fn insert_duel(&mut self, mut duel: Duel) -> Result<Duel, StoreError> {
        if self.taken_codes.contains(&duel.code) || self.duel_by_code(&duel.code).is_some() {
            return Err(StoreError::UniqueViolation { key: duel.code });
        }
        duel.id = self.next_id();
        self.duels.insert(duel.id, duel.clone());
        Ok(duel)
    }

    fn delete_duel(&mut self, duel_id: u64) {
        self.duels.remove(&duel_id);
    }

    fn activate_duel(&mut self, duel_id: u64, started_at: i64, ends_at: i64) -> bool {
        self.update_duel_if(
            duel_id,
            |d| d.status == DuelStatus::Lobby,
            |d| {
                d.status = DuelStatus::Active;
                d.current_round = 1;
                d.started_at_ms = Some(started_at);
                d.round_started_at_ms = Some(started_at);
                d.round_ends_at_ms = Some(ends_at);
            },
        )
    }

    fn open_round_clock(&mut self, duel_id: u64, round_no: u32, started_at: i64, ends_at: i64) -> bool {
        self.update_duel_if(
            duel_id,
            |d| d.status == DuelStatus::Active && d.current_round == round_no && d.round_ends_at_ms.is_none(),
            |d| {
                d.round_started_at_ms = Some(started_at);
                d.round_ends_at_ms = Some(ends_at);
            },
        )
    }

    fn advance_round(&mut self, duel_id: u64, from_round: u32, started_at: i64, ends_at: i64) -> bool {
        self.update_duel_if(
            duel_id,
            |d| d.status == DuelStatus::Active && d.current_round == from_round && from_round < d.total,
            |d| {
                d.current_round = from_round + 1;
                d.round_started_at_ms = Some(started_at);
                d.round_ends_at_ms = Some(ends_at);
            },
        )
    }

    fn finish_duel(&mut self, duel_id: u64, at_round: u32, finished_at: i64) -> bool {
        self.update_duel_if(
            duel_id,
            |d| d.status == DuelStatus::Active && d.current_round == at_round,
            |d| {
                d.status = DuelStatus::Finished;
                d.finished_at_ms = Some(finished_at);
            },
        )
    }

    fn members(&self, duel_id: u64) -> Vec<DuelPlayer> {
        let mut members: Vec<_> = self.members.iter().filter(|m| m.duel_id == duel_id).cloned().collect();
        members.sort_by_key(|m| m.side);
        members
    }

    fn insert_member(&mut self, mut member: DuelPlayer) -> Result<(), StoreError> {
        if self.taken_member_keys.contains(&member.member_key)
            || self.members.iter().any(|m| m.member_key == member.member_key)
        {
            return Err(StoreError::UniqueViolation { key: member.member_key });
        }
        member.id = self.next_id();
        self.members.push(member);
        Ok(())
    }

    fn has_rounds(&self, duel_id: u64) -> bool {
        self.rounds.iter().any(|r| r.duel_id == duel_id)
    }

    fn insert_round(&mut self, mut round: DuelRound) -> Result<(), StoreError> {
        if self.rounds.iter().any(|r| r.round_key == round.round_key) {
            return Err(StoreError::UniqueViolation { key: round.round_key });
        }
        round.id = self.next_id();
        self.rounds.push(round);
        Ok(())
    }

    fn round(&self, duel_id: u64, round_no: u32) -> Option<DuelRound> {
        self.rounds.iter().find(|r| r.duel_id == duel_id && r.round_no == round_no).cloned()
    }

    fn answers(&self, duel_id: u64) -> Vec<DuelAnswer> {
        self.answers.iter().filter(|a| a.duel_id == duel_id).cloned().collect()
    }

    fn insert_answer(&mut self, mut answer: DuelAnswer) -> Result<(), StoreError> {
        if self.answers.iter().any(|a| a.answer_key == answer.answer_key) {
            return Err(StoreError::UniqueViolation { key: answer.answer_key });
        }
        answer.id = self.next_id();
        self.answers.push(answer);
        Ok(())
    }

    fn result(&self, duel_id: u64) -> Option<DuelResult> {
        self.results.get(&duel_id).cloned()
    }

    fn upsert_result(&mut self, mut result: DuelResult) {
        if let Some(existing) = self.results.get(&result.duel_id) {
            result.created_at_ms = existing.created_at_ms;
        }
        self.results.insert(result.duel_id, result);
    }
}

/// Clonable handle: every clone sees the same store, one lock per statement
#[derive(Clone, Default)]
pub struct SharedStore(pub Arc<Mutex<MemoryStore>>);

impl SharedStore {
    pub fn new(store: MemoryStore) -> Self {
        SharedStore(Arc::new(Mutex::new(store)))
    }

    pub fn snapshot(&self) -> MemoryStore {
        self.0.lock().unwrap().clone()
    }
}

impl DuelStore for SharedStore {
    fn player_name(&self, player_id: &str) -> Option<String> {
        self.0.lock().unwrap().player_name(player_id)
    }

    fn rider_pool(&self) -> Vec<RiderPick> {
        self.0.lock().unwrap().rider_pool()
    }

    fn rider(&self, rider_id: &str) -> Option<Rider> {
        self.0.lock().unwrap().rider(rider_id)
    }

    fn team_name(&self, team_id: &str) -> Option<String> {
        self.0.lock().unwrap().team_name(team_id)
    }

    fn duel_by_code(&self, code: &str) -> Option<Duel> {
        self.0.lock().unwrap().duel_by_code(code)
    }

    fn duel_by_id(&self, duel_id: u64) -> Option<Duel> {
        self.0.lock().unwrap().duel_by_id(duel_id)
    }

    fn insert_duel(&mut self, duel: Duel) -> Result<Duel, StoreError> {
        self.0.lock().unwrap().insert_duel(duel)
    }

    fn delete_duel(&mut self, duel_id: u64) {
        self.0.lock().unwrap().delete_duel(duel_id)
    }

    fn activate_duel(&mut self, duel_id: u64, started_at: i64, ends_at: i64) -> bool {
        self.0.lock().unwrap().activate_duel(duel_id, started_at, ends_at)
    }

    fn open_round_clock(&mut self, duel_id: u64, round_no: u32, started_at: i64, ends_at: i64) -> bool {
        self.0.lock().unwrap().open_round_clock(duel_id, round_no, started_at, ends_at)
    }

    fn advance_round(&mut self, duel_id: u64, from_round: u32, started_at: i64, ends_at: i64) -> bool {
        self.0.lock().unwrap().advance_round(duel_id, from_round, started_at, ends_at)
    }

    fn finish_duel(&mut self, duel_id: u64, at_round: u32, finished_at: i64) -> bool {
        self.0.lock().unwrap().finish_duel(duel_id, at_round, finished_at)
    }

    fn members(&self, duel_id: u64) -> Vec<DuelPlayer> {
        self.0.lock().unwrap().members(duel_id)
    }

    fn insert_member(&mut self, member: DuelPlayer) -> Result<(), StoreError> {
        self.0.lock().unwrap().insert_member(member)
    }

    fn has_rounds(&self, duel_id: u64) -> bool {
        self.0.lock().unwrap().has_rounds(duel_id)
    }

    fn insert_round(&mut self, round: DuelRound) -> Result<(), StoreError> {
        self.0.lock().unwrap().insert_round(round)
    }

    fn round(&self, duel_id: u64, round_no: u32) -> Option<DuelRound> {
        self.0.lock().unwrap().round(duel_id, round_no)
    }

    fn answers(&self, duel_id: u64) -> Vec<DuelAnswer> {
        self.0.lock().unwrap().answers(duel_id)
    }

    fn insert_answer(&mut self, answer: DuelAnswer) -> Result<(), StoreError> {
        self.0.lock().unwrap().insert_answer(answer)
    }

    fn result(&self, duel_id: u64) -> Option<DuelResult> {
        self.0.lock().unwrap().result(duel_id)
    }

    fn upsert_result(&mut self, result: DuelResult) {
        self.0.lock().unwrap().upsert_result(result)
    }
}

/// Bare lobby duel row for unit tests that only need the shape
pub fn duel_fixture() -> Duel {
    Duel {
        id: 1,
        code: "ABCDEF".to_string(),
        status: DuelStatus::Lobby,
        total: 5,
        current_round: 1,
        round_started_at_ms: None,
        round_ends_at_ms: None,
        round_duration_ms: 15_000,
        created_at_ms: 0,
        started_at_ms: None,
        finished_at_ms: None,
    }
}
