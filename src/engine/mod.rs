//! Head-to-head duel engine.
//!
//! Everything here talks to a [`DuelStore`] instead of the module tables
//! directly, so the reducers in `lib.rs` run it over SpacetimeDB
//! ([`TableStore`]) and the tests run it over an in-memory store that only
//! promises per-statement atomicity.
//!
//! Every operation reconciles the duel against the clock ([`tick::advance`])
//! before it reads or writes anything.

pub mod answer;
pub mod clock;
pub mod error;
pub mod lobby;
pub mod request;
pub mod result;
pub mod rounds;
pub mod store;
pub mod table_store;
pub mod tick;
pub mod view;

#[cfg(test)]
pub(crate) mod memory;


pub use error::{DuelError, StoreError};
pub use request::{AnswerRequest, CreateDuelRequest, LobbyRequest};
pub use store::DuelStore;
pub use table_store::TableStore;

/// Sentinel team id a client sends to abstain from a round explicitly
pub const TIMEOUT_SENTINEL: &str = "__TIMEOUT__";

/// Host side
pub const HOST_SIDE: u8 = 1;

/// Guest side
pub const GUEST_SIDE: u8 = 2;

/// A duel always has exactly two sides
pub const MAX_MEMBERS: usize = 2;

/// Trim and upper-case a duel code; `None` when nothing is left
pub fn normalize_code(raw: &str) -> Option<String> {
    let code = raw.trim().to_uppercase();
    if code.is_empty() {
        None
    } else {
        Some(code)
    }
}

/// Trim an optional id; blank counts as missing
pub(crate) fn non_blank(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
