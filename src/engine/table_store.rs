// DuelStore over the module tables

use spacetimedb::{ReducerContext, Table};

use crate::{Duel, DuelAnswer, DuelPlayer, DuelResult, DuelRound, DuelStatus, Rider};
use crate::{duel, duel_answer, duel_player, duel_result, duel_round, player, rider, team};
use super::store::{DuelStore, RiderPick};
use super::StoreError;

/// Store backed by the SpacetimeDB tables of the current reducer call
pub struct TableStore<'a> {
    ctx: &'a ReducerContext,
}

impl<'a> TableStore<'a> {
    pub fn new(ctx: &'a ReducerContext) -> Self {
        Self { ctx }
    }

    /// Apply `change` to the duel if `guard` holds for the stored row
    fn update_duel_if(&self, duel_id: u64, guard: impl Fn(&Duel) -> bool, change: impl FnOnce(&mut Duel)) -> bool {
        match self.ctx.db.duel().id().find(&duel_id) {
            Some(mut duel) if guard(&duel) => {
                change(&mut duel);
                self.ctx.db.duel().id().update(duel);
                true
            }
            _ => false,
        }
    }
}

impl DuelStore for TableStore<'_> {
    fn player_name(&self, player_id: &str) -> Option<String> {
        self.ctx.db.player().id().find(&player_id.to_string()).map(|p| p.name)
    }

    fn rider_pool(&self) -> Vec<RiderPick> {
        self.ctx.db.rider()
            .iter()
            .filter_map(|r| r.team_id.map(|team_id| RiderPick { rider_id: r.id, team_id }))
            .collect()
    }

    fn rider(&self, rider_id: &str) -> Option<Rider> {
        self.ctx.db.rider().id().find(&rider_id.to_string())
    }

    fn team_name(&self, team_id: &str) -> Option<String> {
        self.ctx.db.team().id().find(&team_id.to_string()).map(|t| t.name)
    }

    fn duel_by_code(&self, code: &str) -> Option<Duel> {
        self.ctx.db.duel().code().find(&code.to_string())
    }

    fn duel_by_id(&self, duel_id: u64) -> Option<Duel> {
        self.ctx.db.duel().id().find(&duel_id)
    }

    fn insert_duel(&mut self, duel: Duel) -> Result<Duel, StoreError> {
        let key = duel.code.clone();
        self.ctx.db.duel()
            .try_insert(duel)
            .map_err(|_| StoreError::UniqueViolation { key })
    }

    fn delete_duel(&mut self, duel_id: u64) {
        self.ctx.db.duel().id().delete(&duel_id);
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
        let mut members: Vec<_> = self.ctx.db.duel_player()
            .duel_id()
            .filter(&duel_id)
            .collect();
        members.sort_by_key(|m| m.side);
        members
    }

    fn insert_member(&mut self, member: DuelPlayer) -> Result<(), StoreError> {
        let key = member.member_key.clone();
        self.ctx.db.duel_player()
            .try_insert(member)
            .map(|_| ())
            .map_err(|_| StoreError::UniqueViolation { key })
    }

    fn has_rounds(&self, duel_id: u64) -> bool {
        self.ctx.db.duel_round().duel_id().filter(&duel_id).next().is_some()
    }

    fn insert_round(&mut self, round: DuelRound) -> Result<(), StoreError> {
        let key = round.round_key.clone();
        self.ctx.db.duel_round()
            .try_insert(round)
            .map(|_| ())
            .map_err(|_| StoreError::UniqueViolation { key })
    }

    fn round(&self, duel_id: u64, round_no: u32) -> Option<DuelRound> {
        self.ctx.db.duel_round()
            .round_key()
            .find(&super::store::round_key(duel_id, round_no))
    }

    fn answers(&self, duel_id: u64) -> Vec<DuelAnswer> {
        self.ctx.db.duel_answer()
            .duel_id()
            .filter(&duel_id)
            .collect()
    }

    fn insert_answer(&mut self, answer: DuelAnswer) -> Result<(), StoreError> {
        let key = answer.answer_key.clone();
        self.ctx.db.duel_answer()
            .try_insert(answer)
            .map(|_| ())
            .map_err(|_| StoreError::UniqueViolation { key })
    }

    fn result(&self, duel_id: u64) -> Option<DuelResult> {
        self.ctx.db.duel_result().duel_id().find(&duel_id)
    }

    fn upsert_result(&mut self, mut result: DuelResult) {
        match self.ctx.db.duel_result().duel_id().find(&result.duel_id) {
            Some(existing) => {
                result.created_at_ms = existing.created_at_ms;
                self.ctx.db.duel_result().duel_id().update(result);
            }
            None => {
                self.ctx.db.duel_result().insert(result);
            }
        }
    }
}
