use spacetimedb::{
    ReducerContext, Identity, Table, Timestamp,
    table, reducer, SpacetimeType, rand::Rng,
    client_visibility_filter, Filter,
};
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use serde_json::json;

// Duel engine (storage-agnostic, tested against an in-memory store)
pub mod engine;
use engine::{
    AnswerRequest, CreateDuelRequest, DuelError, LobbyRequest, TableStore,
};

// Catalogue seeding reducers (teams + riders)
mod catalog;

// ==================== CONSTANTS ====================

/// Player display names are trimmed then must be at least this long
const MIN_PLAYER_NAME_LEN: usize = 2;

/// Longer names are truncated (characters, not bytes)
const MAX_PLAYER_NAME_LEN: usize = 24;

// ==================== HELPER FUNCTIONS ====================

/// Wall-clock of the current reducer call in Unix epoch milliseconds.
/// Every duel timestamp is stored in this unit.
pub fn now_ms(ctx: &ReducerContext) -> i64 {
    ctx.timestamp.to_micros_since_unix_epoch() / 1_000
}

/// First 8 characters of an id, for log lines. Client ids may be any UTF-8.
fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

/// Engine RNG seeded from the host's deterministic per-call rng
fn seeded_rng(ctx: &ReducerContext) -> StdRng {
    let mut rng = ctx.rng();
    StdRng::seed_from_u64(rng.gen::<u64>())
}

/// Store the caller's reply. Clients read it back from `duel_reply` after the call
/// (row-level security limits each identity to its own row).
fn write_reply<T: Serialize>(ctx: &ReducerContext, operation: &str, outcome: Result<T, DuelError>) {
    let (status, body) = match outcome {
        Ok(view) => match serde_json::to_string(&view) {
            Ok(body) => (200u16, body),
            Err(e) => {
                log::error!("{}: reply serialization failed: {}", operation, e);
                (500u16, json!({ "error": e.to_string() }).to_string())
            }
        },
        Err(e) => (e.status(), json!({ "error": e.to_string() }).to_string()),
    };

    let reply = DuelReply {
        caller: ctx.sender,
        operation: operation.to_string(),
        status,
        body,
        server_time_ms: now_ms(ctx),
    };

    if ctx.db.duel_reply().caller().find(&ctx.sender).is_some() {
        ctx.db.duel_reply().caller().update(reply);
    } else {
        ctx.db.duel_reply().insert(reply);
    }
}

// ==================== TABLES ====================

/// Player profile (minimal - profiles are owned by the main quiz flow)
#[table(name = player)]
#[derive(Clone)]
pub struct Player {
    #[primary_key]
    pub id: String,

    /// Display name, 2-24 chars
    pub name: String,

    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Team a rider can ride for - the answer space of every round
#[table(name = team, public)]
#[derive(Clone, Debug, PartialEq)]
pub struct Team {
    #[primary_key]
    pub id: String,

    pub name: String,

    /// Category code (e.g. "WT", "PRT") for dropdown grouping
    pub category_code: Option<String>,
}

/// Rider - the quiz item shown in a round
#[table(name = rider, public)]
#[derive(Clone, Debug, PartialEq)]
pub struct Rider {
    #[primary_key]
    pub id: String,

    pub full_name: String,

    /// Nationality as shown to players (may be missing in the catalogue)
    pub nation: Option<String>,

    /// Current team. Riders without one are never drawn into a duel.
    pub team_id: Option<String>,
}

/// Head-to-head duel
#[table(name = duel, public)]
#[derive(Clone, Debug)]
pub struct Duel {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    /// Shareable 6-char code, never reused
    #[unique]
    pub code: String,

    pub status: DuelStatus,

    /// Number of rounds (5-50)
    pub total: u32,

    /// 1-based round pointer. Only meaningful while Active; frozen once Finished.
    pub current_round: u32,

    /// Window of the current round (epoch ms)
    pub round_started_at_ms: Option<i64>,
    pub round_ends_at_ms: Option<i64>,

    /// Length of every round window, fixed at creation (5000-60000)
    pub round_duration_ms: u32,

    pub created_at_ms: i64,
    pub started_at_ms: Option<i64>,
    pub finished_at_ms: Option<i64>,
}

#[derive(SpacetimeType, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DuelStatus {
    Lobby,     // Waiting for guest / host start
    Active,    // Rounds running
    Finished,  // Terminal
}

impl DuelStatus {
    /// Wire name used in JSON replies
    pub fn as_str(&self) -> &'static str {
        match self {
            DuelStatus::Lobby => "lobby",
            DuelStatus::Active => "active",
            DuelStatus::Finished => "finished",
        }
    }
}

/// Duel membership. Side 1 = host, side 2 = guest.
/// SpacetimeDB has no multi-column unique constraint, so (duel, player)
/// uniqueness is carried by `member_key`.
#[table(name = duel_player, public)]
#[derive(Clone, Debug)]
pub struct DuelPlayer {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    /// "{duel_id}:{player_id}"
    #[unique]
    pub member_key: String,

    #[index(btree)]
    pub duel_id: u64,

    pub player_id: String,

    pub side: u8,

    pub joined_at_ms: i64,
}

/// Round assignment generated at start. Immutable.
/// PRIVATE: holds the correct answer.
#[table(name = duel_round)]
#[derive(Clone, Debug)]
pub struct DuelRound {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    /// "{duel_id}:{round_no}"
    #[unique]
    pub round_key: String,

    #[index(btree)]
    pub duel_id: u64,

    pub round_no: u32,

    pub rider_id: String,

    /// Rider's team when the duel started
    pub correct_team_id: String,
}

/// One answer per (duel, round, player)
/// PRIVATE: exposing it would leak the opponent's pick mid-round
#[table(name = duel_answer)]
#[derive(Clone, Debug)]
pub struct DuelAnswer {
    #[primary_key]
    #[auto_inc]
    pub id: u64,

    /// "{duel_id}:{round_no}:{player_id}" - the at-most-once guard for scoring
    #[unique]
    pub answer_key: String,

    #[index(btree)]
    pub duel_id: u64,

    pub round_no: u32,

    pub player_id: String,

    /// Submitted team, None = timeout (synthesized or explicit abstention)
    pub team_id: Option<String>,

    /// Always false for timeouts
    pub is_correct: bool,

    pub answered_at_ms: i64,
}

/// Final summary of a finished duel, rewritten idempotently on every state read
#[table(name = duel_result, public)]
#[derive(Clone, Debug, PartialEq)]
pub struct DuelResult {
    #[primary_key]
    pub duel_id: u64,

    /// None = tie
    pub winner_player_id: Option<String>,

    pub p1_score: u32,
    pub p2_score: u32,

    pub total: u32,

    pub created_at_ms: i64,
}

/// Latest reply per caller. This is how a pull-only client gets the response
/// body of a reducer call: call, then read its own row.
#[table(name = duel_reply, public)]
pub struct DuelReply {
    #[primary_key]
    pub caller: Identity,

    /// "create", "join", "start", "state", "question", "answer", "player"
    pub operation: String,

    /// HTTP-style status (200, 400, 403, 404, 409, 500)
    pub status: u16,

    /// JSON body - the view on success, {"error": "..."} otherwise
    pub body: String,

    pub server_time_ms: i64,
}

/// Identities allowed to seed the catalogue
#[table(name = authorized_worker)]
pub struct AuthorizedWorker {
    #[primary_key]
    pub identity: Identity,
}

// ==================== ROW LEVEL SECURITY ====================

/// RLS Filter: each identity only sees its own reply row
#[client_visibility_filter]
const DUEL_REPLY_VISIBILITY: Filter = Filter::Sql(
    "SELECT * FROM duel_reply WHERE caller = :sender"
);

// ==================== REDUCERS ====================

/// Create or rename a player
/// Minimal profile surface so duels have someone to enroll
#[reducer]
pub fn register_player(ctx: &ReducerContext, player_id: Option<String>, name: String) {
    let outcome = upsert_player(ctx, player_id, name);
    if let Err(e) = &outcome {
        log::warn!("register_player: {}", e);
    }
    write_reply(ctx, "player", outcome);
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisteredPlayer {
    player_id: String,
    name: String,
}

fn upsert_player(ctx: &ReducerContext, player_id: Option<String>, name: String) -> Result<RegisteredPlayer, DuelError> {
    let name: String = name.trim().chars().take(MAX_PLAYER_NAME_LEN).collect();
    if name.chars().count() < MIN_PLAYER_NAME_LEN {
        return Err(DuelError::Invalid("Name too short".to_string()));
    }

    let player_id = match player_id.map(|id| id.trim().to_string()) {
        Some(id) if !id.is_empty() => id,
        _ => {
            let mut rng = ctx.rng();
            format!("{:016x}{:016x}", rng.gen::<u64>(), rng.gen::<u64>())
        }
    };

    match ctx.db.player().id().find(&player_id) {
        Some(mut existing) => {
            existing.name = name.clone();
            existing.updated_at = ctx.timestamp;
            ctx.db.player().id().update(existing);
        }
        None => {
            ctx.db.player().insert(Player {
                id: player_id.clone(),
                name: name.clone(),
                created_at: ctx.timestamp,
                updated_at: ctx.timestamp,
            });
            log::info!("[PLAYER] registered player:{} name:{}", short_id(&player_id), name);
        }
    }

    Ok(RegisteredPlayer { player_id, name })
}

/// Create a duel lobby with a shareable code
#[reducer]
pub fn duel_create(ctx: &ReducerContext, request: CreateDuelRequest) {
    let now = now_ms(ctx);
    let mut store = TableStore::new(ctx);
    let mut rng = seeded_rng(ctx);

    let outcome = engine::lobby::create(&mut store, &mut rng, request, now);
    if let Err(e) = &outcome {
        log::warn!("duel_create: {}", e);
    }
    write_reply(ctx, "create", outcome);
}

/// Join a lobby by code (does not start the duel)
#[reducer]
pub fn duel_join(ctx: &ReducerContext, request: LobbyRequest) {
    let now = now_ms(ctx);
    let mut store = TableStore::new(ctx);

    let outcome = engine::lobby::join(&mut store, request, now);
    if let Err(e) = &outcome {
        log::warn!("duel_join: {}", e);
    }
    write_reply(ctx, "join", outcome);
}

/// Host starts the duel: rounds are drawn and the first round clock starts
#[reducer]
pub fn duel_start(ctx: &ReducerContext, request: LobbyRequest) {
    let now = now_ms(ctx);
    let mut store = TableStore::new(ctx);
    let mut rng = seeded_rng(ctx);

    let outcome = engine::lobby::start(&mut store, &mut rng, request, now);
    if let Err(e) = &outcome {
        log::warn!("duel_start: {}", e);
    }
    write_reply(ctx, "start", outcome);
}

/// Poll the duel. Catches the round pointer up to wall-clock first and
/// materializes the result once finished.
#[reducer]
pub fn duel_state(ctx: &ReducerContext, code: String, player_id: Option<String>) {
    let now = now_ms(ctx);
    let mut store = TableStore::new(ctx);

    let outcome = engine::view::state(&mut store, &code, player_id, now);
    if let Err(e) = &outcome {
        log::warn!("duel_state: {}", e);
    }
    write_reply(ctx, "state", outcome);
}

/// Current round's rider (never the answer)
#[reducer]
pub fn duel_question(ctx: &ReducerContext, code: String, player_id: Option<String>) {
    let now = now_ms(ctx);
    let mut store = TableStore::new(ctx);

    let outcome = engine::view::question(&mut store, &code, player_id, now);
    if let Err(e) = &outcome {
        log::warn!("duel_question: {}", e);
    }
    write_reply(ctx, "question", outcome);
}

/// Submit an answer for the current round
#[reducer]
pub fn duel_submit_answer(ctx: &ReducerContext, code: String, request: AnswerRequest) {
    let now = now_ms(ctx);
    let mut store = TableStore::new(ctx);

    let outcome = engine::answer::submit(&mut store, &code, request, now);
    if let Err(e) = &outcome {
        log::warn!("duel_submit_answer: {}", e);
    }
    write_reply(ctx, "answer", outcome);
}

/// Drop the caller's reply row when the connection goes away
#[reducer(client_disconnected)]
pub fn on_disconnect(ctx: &ReducerContext) {
    ctx.db.duel_reply().caller().delete(&ctx.sender);
}

/// Initialize module
#[reducer(init)]
pub fn init(ctx: &ReducerContext) {
    // In init, ctx.sender is the module owner identity
    if ctx.db.authorized_worker().identity().find(&ctx.sender).is_none() {
        ctx.db.authorized_worker().insert(AuthorizedWorker {
            identity: ctx.sender,
        });
    }

    // No scheduled tables: duel rounds advance lazily on every duel reducer call
    log::info!("Rider Duel module initialized successfully");
}
