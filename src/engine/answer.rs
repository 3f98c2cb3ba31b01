//! Answer recorder. One answer per (duel, round, player), enforced by the
//! answer key; the first write wins and every later one is rejected.

use crate::{Duel, DuelAnswer, DuelStatus};
use super::request::AnswerRequest;
use super::store::{answer_key, DuelStore};
use super::view::AnswerOutcome;
use super::{clock, tick, DuelError};

pub fn submit<S: DuelStore + ?Sized>(
    store: &mut S,
    code: &str,
    request: AnswerRequest,
    now: i64,
) -> Result<AnswerOutcome, DuelError> {
    let submission = request.validate(code)?;
    let found = store.duel_by_code(&submission.code).ok_or(DuelError::UnknownCode)?;

    // Round the player was looking at, if its deadline has passed. The tick
    // below times it out and moves on; the submission still belongs to it.
    let late_round = (found.status == DuelStatus::Active && clock::is_expired(&found, now))
        .then_some(found.current_round);

    tick::advance(store, found.id, now);
    let duel = store.duel_by_id(found.id).ok_or(DuelError::UnknownCode)?;

    if let Some(late_round) = late_round {
        if submission.expected_round.map_or(true, |r| r == late_round) {
            return late_answer(store, &duel, late_round, &submission.player_id, now);
        }
    }

    if duel.status != DuelStatus::Active {
        return Err(DuelError::NotActive);
    }
    if !store.members(duel.id).iter().any(|m| m.player_id == submission.player_id) {
        return Err(DuelError::NotMember);
    }
    if let Some(submitted) = submission.expected_round {
        if submitted != duel.current_round {
            return Err(DuelError::StaleRound { submitted, current: duel.current_round });
        }
    }

    let round = store.round(duel.id, duel.current_round).ok_or(DuelError::RoundNotFound)?;

    let expired = clock::is_expired(&duel, now);
    let timeout = expired || submission.abstains();
    let correct = !timeout && submission.team_id == round.correct_team_id;

    store
        .insert_answer(DuelAnswer {
            id: 0,
            answer_key: answer_key(duel.id, round.round_no, &submission.player_id),
            duel_id: duel.id,
            round_no: round.round_no,
            player_id: submission.player_id.clone(),
            team_id: if timeout { None } else { Some(submission.team_id.clone()) },
            is_correct: correct,
            answered_at_ms: now,
        })
        .map_err(|_| DuelError::AlreadyAnswered)?;

    log::info!(
        "[ANSWER] code:{} round:{} player:{} correct:{} timeout:{} remaining_ms:{}",
        duel.code,
        round.round_no,
        submission.player_id,
        correct,
        timeout,
        clock::remaining_ms(&duel, now)
    );

    // Both sides may be in now
    let report = tick::advance(store, duel.id, now);
    let finished = report.finished
        || store
            .duel_by_id(duel.id)
            .map(|d| d.status == DuelStatus::Finished)
            .unwrap_or(false);

    Ok(AnswerOutcome {
        ok: true,
        correct,
        correct_team_name: store.team_name(&round.correct_team_id),
        timeout,
        expired,
        finished,
        round_no: round.round_no,
        server_time: now,
    })
}

/// A submission for a round that expired before it arrived. The round's
/// timeout row is already written; nothing is recorded for the new round.
fn late_answer<S: DuelStore + ?Sized>(
    store: &S,
    duel: &Duel,
    round_no: u32,
    player_id: &str,
    now: i64,
) -> Result<AnswerOutcome, DuelError> {
    if !store.members(duel.id).iter().any(|m| m.player_id == player_id) {
        return Err(DuelError::NotMember);
    }
    let round = store.round(duel.id, round_no).ok_or(DuelError::RoundNotFound)?;

    log::info!("[ANSWER] late code:{} round:{} player:{} now_round:{}", duel.code, round_no, player_id, duel.current_round);

    Ok(AnswerOutcome {
        ok: true,
        correct: false,
        correct_team_name: store.team_name(&round.correct_team_id),
        timeout: true,
        expired: true,
        finished: duel.status == DuelStatus::Finished,
        round_no,
        server_time: now,
    })
}
