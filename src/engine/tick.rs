//! Advancement engine.
//!
//! There is no timer anywhere: a duel only moves forward when some request
//! looks at it. Every duel operation calls [`advance`] first, which
//! reconciles the persisted round pointer with `now`:
//!
//! - a round is *resolved* once it has expired or every member has answered it
//! - on expiry, members without an answer get a timeout answer (incorrect,
//!   no team), each insert guarded by the answer key so it can never shadow a
//!   real answer that raced in
//! - a resolved last round finishes the duel, any other opens the next round
//!   with a fresh window starting at `now`
//!
//! Pointer moves are conditional updates on the round they were computed
//! from, so two requests observing the same expiry move it once.
//! Calling `advance` twice with the same `now` changes nothing the second time.

use std::collections::HashSet;

use crate::{Duel, DuelStatus};
use super::clock;
use super::store::DuelStore;

/// Upper bound on rounds resolved by one call, so a long-abandoned duel
/// cannot make a single request do unbounded work
pub const MAX_CATCH_UP_ITERATIONS: u32 = 10;

/// What one call changed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub timeouts_recorded: u32,
    pub rounds_advanced: u32,
    pub clock_opened: bool,
    pub finished: bool,
}

impl TickReport {
    pub fn changed(&self) -> bool {
        self.timeouts_recorded > 0 || self.rounds_advanced > 0 || self.clock_opened || self.finished
    }
}

/// Catch the duel up to `now`. No-op unless the duel is Active.
pub fn advance<S: DuelStore + ?Sized>(store: &mut S, duel_id: u64, now: i64) -> TickReport {
    let mut report = TickReport::default();

    for _ in 0..MAX_CATCH_UP_ITERATIONS {
        let duel = match store.duel_by_id(duel_id) {
            Some(d) if d.status == DuelStatus::Active => d,
            _ => break,
        };

        // Active without a deadline (start interrupted half-way): open the
        // window and let the next observation judge expiry
        if duel.round_ends_at_ms.is_none() {
            let (started, ends) = clock::round_window(now, duel.round_duration_ms);
            report.clock_opened = store.open_round_clock(duel.id, duel.current_round, started, ends);
            break;
        }

        let expired = clock::is_expired(&duel, now);
        let (member_count, missing) = unanswered_members(store, &duel);
        let all_answered = member_count > 0 && missing.is_empty();
        if !expired && !all_answered {
            break; // round still live
        }

        if expired && !missing.is_empty() {
            let written = store.insert_timeouts(duel.id, duel.current_round, &missing, now);
            if written > 0 {
                log::info!("[TICK] timeouts duel:{} round:{} count:{}", duel.code, duel.current_round, written);
            }
            report.timeouts_recorded += written;
        }

        if duel.current_round >= duel.total {
            if store.finish_duel(duel.id, duel.current_round, now) {
                report.finished = true;
                log::info!("[DUEL] finished code:{} rounds:{} at:{}", duel.code, duel.total, clock::fmt_ms(now));
            }
            break;
        }

        let (started, ends) = clock::round_window(now, duel.round_duration_ms);
        if !store.advance_round(duel.id, duel.current_round, started, ends) {
            break; // a concurrent request moved it first
        }
        report.rounds_advanced += 1;
        log::info!(
            "[TICK] advanced duel:{} round:{}->{} reason:{} ends:{}",
            duel.code,
            duel.current_round,
            duel.current_round + 1,
            if expired { "expired" } else { "all_answered" },
            clock::fmt_ms(ends)
        );
    }

    report
}

/// (member count, members with no answer for the current round in side order)
fn unanswered_members<S: DuelStore + ?Sized>(store: &S, duel: &Duel) -> (usize, Vec<String>) {
    let answered: HashSet<String> = store
        .round_answers(duel.id, duel.current_round)
        .into_iter()
        .map(|a| a.player_id)
        .collect();

    let members = store.members(duel.id);
    let missing = members
        .iter()
        .map(|m| m.player_id.clone())
        .filter(|p| !answered.contains(p))
        .collect();
    (members.len(), missing)
}
