// Catalogue seeding reducers
// Accept JSON arrays produced by the CSV import tooling (camelCase keys)

use spacetimedb::{reducer, ReducerContext, log, Table};
use crate::{Rider, Team, authorized_worker};
use crate::{rider, team};
use serde_json::Value;

/// Required string field of record `i`
fn required_str(val: &Value, key: &str, kind: &str, i: usize) -> Result<String, String> {
    val.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or(format!("{} {}: missing {}", kind, i, key))
}

/// Optional string field; blank counts as missing
fn optional_str(val: &Value, key: &str) -> Option<String> {
    val.get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn parse_array<'a>(data: &'a Value, what: &str) -> Result<&'a Vec<Value>, String> {
    data.as_array().ok_or(format!("Expected JSON array of {}", what))
}

/// Parse teams: [{"id", "name", "categoryCode"?}]
pub fn parse_teams(json_data: &str) -> Result<Vec<Team>, String> {
    let data: Value = serde_json::from_str(json_data)
        .map_err(|e| format!("Invalid JSON: {}", e))?;

    parse_array(&data, "teams")?
        .iter()
        .enumerate()
        .map(|(i, t)| {
            Ok(Team {
                id: required_str(t, "id", "Team", i)?,
                name: required_str(t, "name", "Team", i)?,
                category_code: optional_str(t, "categoryCode"),
            })
        })
        .collect()
}

/// Parse riders: [{"id", "fullName", "nation"?, "teamId"?}]
pub fn parse_riders(json_data: &str) -> Result<Vec<Rider>, String> {
    let data: Value = serde_json::from_str(json_data)
        .map_err(|e| format!("Invalid JSON: {}", e))?;

    parse_array(&data, "riders")?
        .iter()
        .enumerate()
        .map(|(i, r)| {
            Ok(Rider {
                id: required_str(r, "id", "Rider", i)?,
                full_name: required_str(r, "fullName", "Rider", i)?,
                nation: optional_str(r, "nation"),
                team_id: optional_str(r, "teamId"),
            })
        })
        .collect()
}

/// Upsert the team table from a JSON array
/// Protected by authorization check - only authorized workers can call this
#[reducer]
pub fn seed_teams(ctx: &ReducerContext, json_data: String) -> Result<(), String> {
    if ctx.db.authorized_worker().identity().find(&ctx.sender).is_none() {
        log::warn!("Unauthorized seed_teams attempt by {}", ctx.sender);
        return Err("Unauthorized".to_string());
    }

    let teams = parse_teams(&json_data)?;
    let count = teams.len();
    for team in teams {
        if ctx.db.team().id().find(&team.id).is_some() {
            ctx.db.team().id().update(team);
        } else {
            ctx.db.team().insert(team);
        }
    }

    log::info!("✅ Seeded {} team records", count);
    Ok(())
}

/// Upsert the rider table from a JSON array
/// Riders without a teamId are stored but never drawn into a duel
/// Protected by authorization check - only authorized workers can call this
#[reducer]
pub fn seed_riders(ctx: &ReducerContext, json_data: String) -> Result<(), String> {
    if ctx.db.authorized_worker().identity().find(&ctx.sender).is_none() {
        log::warn!("Unauthorized seed_riders attempt by {}", ctx.sender);
        return Err("Unauthorized".to_string());
    }

    let riders = parse_riders(&json_data)?;
    let count = riders.len();
    let mut without_team = 0;
    for rider in riders {
        if rider.team_id.is_none() {
            without_team += 1;
        }
        if ctx.db.rider().id().find(&rider.id).is_some() {
            ctx.db.rider().id().update(rider);
        } else {
            ctx.db.rider().insert(rider);
        }
    }

    log::info!("✅ Seeded {} rider records ({} without team)", count, without_team);
    Ok(())
}
