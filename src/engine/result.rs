use std::collections::HashMap;

use serde::Serialize;

use crate::{Duel, DuelResult, DuelStatus};
use super::store::DuelStore;
use super::{GUEST_SIDE, HOST_SIDE};

/// One member's standing
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SideScore {
    pub side: u8,
    pub player_id: String,
    pub name: Option<String>,
    pub score: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SideSummary {
    pub player_id: Option<String>,
    pub name: Option<String>,
    pub score: u32,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResultView {
    pub p1: SideSummary,
    pub p2: SideSummary,
    /// None on a tie
    pub winner_player_id: Option<String>,
    pub total: u32,
}

/// Correct-answer count per member, in side order. Members with no answers score 0.
pub fn side_scores<S: DuelStore + ?Sized>(store: &S, duel_id: u64) -> Vec<SideScore> {
    let mut correct: HashMap<String, u32> = HashMap::new();
    for answer in store.answers(duel_id).into_iter().filter(|a| a.is_correct) {
        *correct.entry(answer.player_id).or_insert(0) += 1;
    }

    store
        .members(duel_id)
        .into_iter()
        .map(|m| SideScore {
            side: m.side,
            name: store.player_name(&m.player_id),
            score: correct.get(&m.player_id).copied().unwrap_or(0),
            player_id: m.player_id,
        })
        .collect()
}

fn summary(scores: &[SideScore], side: u8) -> SideSummary {
    match scores.iter().find(|s| s.side == side) {
        Some(s) => SideSummary {
            player_id: Some(s.player_id.clone()),
            name: s.name.clone(),
            score: s.score,
        },
        None => SideSummary { player_id: None, name: None, score: 0 },
    }
}

/// Strictly higher score wins, equal scores tie
pub fn winner(p1: &SideSummary, p2: &SideSummary) -> Option<String> {
    if p1.score > p2.score {
        p1.player_id.clone()
    } else if p2.score > p1.score {
        p2.player_id.clone()
    } else {
        None
    }
}

/// Compute and persist the summary of a finished duel. Safe to call on every
/// read: the row is recomputed from answers and upserted under the duel id.
/// Returns None while the duel is not finished.
pub fn materialize<S: DuelStore + ?Sized>(store: &mut S, duel: &Duel, now: i64) -> Option<ResultView> {
    if duel.status != DuelStatus::Finished {
        return None;
    }

    let scores = side_scores(store, duel.id);
    let p1 = summary(&scores, HOST_SIDE);
    let p2 = summary(&scores, GUEST_SIDE);
    let winner_player_id = winner(&p1, &p2);

    let first_time = store.result(duel.id).is_none();
    store.upsert_result(DuelResult {
        duel_id: duel.id,
        winner_player_id: winner_player_id.clone(),
        p1_score: p1.score,
        p2_score: p2.score,
        total: duel.total,
        created_at_ms: now,
    });
    if first_time {
        log::info!(
            "[RESULT] code:{} p1:{} p2:{} winner:{}",
            duel.code,
            p1.score,
            p2.score,
            winner_player_id.as_deref().unwrap_or("tie")
        );
    }

    Some(ResultView {
        p1,
        p2,
        winner_player_id,
        total: duel.total,
    })
}
