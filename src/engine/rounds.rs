use rand::seq::SliceRandom;
use rand::Rng;

use crate::DuelRound;
use super::store::{round_key, DuelStore, RiderPick};
use super::DuelError;

/// Draw `total` distinct riders, uniformly, from the riders that have a team
pub fn draw_riders<R: Rng + ?Sized>(pool: &[RiderPick], total: u32, rng: &mut R) -> Result<Vec<RiderPick>, DuelError> {
    if pool.len() < total as usize {
        return Err(DuelError::NotEnoughRiders);
    }
    Ok(pool.choose_multiple(rng, total as usize).cloned().collect())
}

/// Persist rounds 1..=total for a duel. Assignments are immutable: a key
/// conflict means another start already wrote them.
pub fn generate<S, R>(store: &mut S, duel_id: u64, total: u32, rng: &mut R) -> Result<Vec<DuelRound>, DuelError>
where
    S: DuelStore + ?Sized,
    R: Rng + ?Sized,
{
    let picks = draw_riders(&store.rider_pool(), total, rng)?;

    let mut rounds = Vec::with_capacity(picks.len());
    for (i, pick) in picks.into_iter().enumerate() {
        let round_no = i as u32 + 1;
        let round = DuelRound {
            id: 0, // Auto-increment
            round_key: round_key(duel_id, round_no),
            duel_id,
            round_no,
            rider_id: pick.rider_id,
            correct_team_id: pick.team_id,
        };
        store
            .insert_round(round.clone())
            .map_err(|_| DuelError::AlreadyInitialized)?;
        rounds.push(round);
    }

    Ok(rounds)
}
