//! Lobby manager: create a duel, enroll the guest, start it.
//!
//! The read-then-decide checks here (member count before join, existing
//! rounds before start) are not isolated from concurrent requests. The unique
//! keys and the Lobby-guarded activation keep the outcome sane: a racing
//! double start fails on the round keys, a racing third joiner is the only
//! thing that can slip through.

use rand::Rng;

use crate::{Duel, DuelPlayer, DuelStatus};
use super::request::{CreateDuelRequest, LobbyRequest};
use super::store::{member_key, DuelStore};
use super::view::{CreatedDuel, JoinedDuel, StartedDuel};
use super::{clock, rounds, DuelError, GUEST_SIDE, HOST_SIDE, MAX_MEMBERS};

/// Avoid confusing characters (no I, O, 0, 1)
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const CODE_LEN: usize = 6;

/// Code collisions tolerated before giving up
pub const MAX_CODE_ATTEMPTS: u32 = 10;

/// Generate a 6-char shareable code
pub fn generate_code<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..CODE_LEN)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Create a lobby hosted by the caller (side 1)
pub fn create<S, R>(store: &mut S, rng: &mut R, request: CreateDuelRequest, now: i64) -> Result<CreatedDuel, DuelError>
where
    S: DuelStore + ?Sized,
    R: Rng + ?Sized,
{
    let new_duel = request.validate()?;
    let host_name = store.player_name(&new_duel.host_id).ok_or(DuelError::UnknownPlayer)?;

    // The code column is unique: a collision is a failed insert, retry with a new code
    let mut inserted = None;
    for _ in 0..MAX_CODE_ATTEMPTS {
        let candidate = Duel {
            id: 0, // Auto-increment
            code: generate_code(rng),
            status: DuelStatus::Lobby,
            total: new_duel.total,
            current_round: 1,
            round_started_at_ms: None,
            round_ends_at_ms: None,
            round_duration_ms: new_duel.round_duration_ms,
            created_at_ms: now,
            started_at_ms: None,
            finished_at_ms: None,
        };
        match store.insert_duel(candidate) {
            Ok(duel) => {
                inserted = Some(duel);
                break;
            }
            Err(e) => log::debug!("duel code collision: {}", e),
        }
    }
    let duel = inserted.ok_or(DuelError::CodeExhausted)?;

    let enrolled = store.insert_member(DuelPlayer {
        id: 0,
        member_key: member_key(duel.id, &new_duel.host_id),
        duel_id: duel.id,
        player_id: new_duel.host_id.clone(),
        side: HOST_SIDE,
        joined_at_ms: now,
    });
    if let Err(e) = enrolled {
        // A lobby nobody hosts can never start
        store.delete_duel(duel.id);
        log::error!("duel_create: host enrollment failed code:{} {}", duel.code, e);
        return Err(DuelError::HostEnrollFailed);
    }

    log::info!(
        "[DUEL] created code:{} host:{} total:{} round_ms:{}",
        duel.code, host_name, duel.total, duel.round_duration_ms
    );

    Ok(CreatedDuel {
        duel_id: duel.id,
        code: duel.code,
        status: duel.status.as_str(),
        total: duel.total,
        round_duration_ms: duel.round_duration_ms,
    })
}

/// Take the guest side of a lobby. Joining a lobby you are already in is a no-op.
pub fn join<S: DuelStore + ?Sized>(store: &mut S, request: LobbyRequest, now: i64) -> Result<JoinedDuel, DuelError> {
    let action = request.validate()?;
    let player_name = store.player_name(&action.player_id).ok_or(DuelError::UnknownPlayer)?;
    let duel = store.duel_by_code(&action.code).ok_or(DuelError::UnknownCode)?;

    if duel.status != DuelStatus::Lobby {
        return Err(DuelError::NotJoinable);
    }

    let members = store.members(duel.id);
    if !members.iter().any(|m| m.player_id == action.player_id) {
        if members.len() >= MAX_MEMBERS {
            return Err(DuelError::LobbyFull);
        }

        match store.insert_member(DuelPlayer {
            id: 0,
            member_key: member_key(duel.id, &action.player_id),
            duel_id: duel.id,
            player_id: action.player_id.clone(),
            side: GUEST_SIDE,
            joined_at_ms: now,
        }) {
            Ok(()) => log::info!("[DUEL] joined code:{} player:{}", duel.code, player_name),
            // Same player joining twice at once: the first insert already enrolled them
            Err(e) => log::debug!("duel_join: {}", e),
        }
    }

    Ok(JoinedDuel {
        ok: true,
        code: duel.code,
        status: DuelStatus::Lobby.as_str(),
    })
}

/// Host starts a full lobby: draw the rounds, then open round 1
pub fn start<S, R>(store: &mut S, rng: &mut R, request: LobbyRequest, now: i64) -> Result<StartedDuel, DuelError>
where
    S: DuelStore + ?Sized,
    R: Rng + ?Sized,
{
    let action = request.validate()?;
    store.player_name(&action.player_id).ok_or(DuelError::UnknownPlayer)?;
    let duel = store.duel_by_code(&action.code).ok_or(DuelError::UnknownCode)?;

    if duel.status != DuelStatus::Lobby {
        return Err(DuelError::AlreadyStarted);
    }

    let members = store.members(duel.id);
    let is_host = members
        .iter()
        .any(|m| m.player_id == action.player_id && m.side == HOST_SIDE);
    if !is_host {
        return Err(DuelError::NotHost);
    }
    if members.len() != MAX_MEMBERS {
        return Err(DuelError::NeedTwoPlayers);
    }

    // Rounds are generated once, ever
    if store.has_rounds(duel.id) {
        return Err(DuelError::AlreadyInitialized);
    }
    rounds::generate(store, duel.id, duel.total, rng)?;

    let (started, ends) = clock::round_window(now, duel.round_duration_ms);
    if !store.activate_duel(duel.id, started, ends) {
        return Err(DuelError::AlreadyStarted);
    }

    let names: Vec<String> = members
        .iter()
        .map(|m| store.player_name(&m.player_id).unwrap_or_else(|| m.player_id.clone()))
        .collect();
    log::info!(
        "[DUEL] started code:{} players={:?} total:{} ends:{}",
        duel.code, names, duel.total, clock::fmt_ms(ends)
    );

    Ok(StartedDuel {
        ok: true,
        status: DuelStatus::Active.as_str(),
        round_ends_at: ends,
        round_duration_ms: duel.round_duration_ms,
        server_time: now,
    })
}
