//! Boundary validation: loose store documents in, strict league models out.
//!
//! Documents written by older clients may miss fields, hold numeric strings
//! where numbers are expected, or carry stored `score`/`winner`/`isFlexA`/
//! `isFlexB` fields. Everything derivable is dropped here and recomputed by
//! the core; everything missing gets a tolerant default. Only a document
//! without a usable id is rejected.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::league::model::{
    GameRecord, HistoryEntry, MatchFact, MatchId, Player, PlayerId, Team, TeamId,
};
use crate::store::{StoreError, StoreResult};

/// Raw match document as it may sit in the store. Every field is optional;
/// stored derivable fields are simply never read.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawMatchDoc {
    id: Option<Value>,
    team_a: Option<TeamId>,
    team_b: Option<TeamId>,

    p_a1: Option<PlayerId>,
    p_a2: Option<PlayerId>,
    p_b1: Option<PlayerId>,
    p_b2: Option<PlayerId>,

    original_p_a1: Option<PlayerId>,
    original_p_a2: Option<PlayerId>,
    original_p_b1: Option<PlayerId>,
    original_p_b2: Option<PlayerId>,

    scheduled_date: Option<Value>,
    games: Option<Vec<GameRecord>>,

    reported_date: Option<Value>,
    reported_by: Option<String>,
    reported_by_id: Option<String>,

    history: Option<Vec<Value>>,
}

fn parse_id(raw: Option<Value>) -> Option<MatchId> {
    match raw? {
        Value::Number(n) => n.as_u64().map(|n| MatchId(n as u32)),
        Value::String(s) => s.trim().parse::<u32>().ok().map(MatchId),
        _ => None,
    }
}

fn parse_date(raw: Option<Value>) -> Option<DateTime<Utc>> {
    match raw? {
        Value::String(s) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc)),
        _ => None,
    }
}

fn or_blank_player(field: Option<PlayerId>, id: MatchId, slot: &str) -> PlayerId {
    field.unwrap_or_else(|| {
        warn!(match_id = %id, slot, "match document is missing a player slot");
        PlayerId(String::new())
    })
}

/// Strict [`MatchFact`] from a raw store document.
///
/// Missing `originalP*` fields fall back to the current slot values (the
/// match then reads as unflexed, which is what a pre-substitution document
/// means). Malformed history entries are dropped with a warning rather than
/// poisoning the whole match.
pub fn parse_match(doc: Value) -> StoreResult<MatchFact> {
    let raw: RawMatchDoc =
        serde_json::from_value(doc).map_err(|e| StoreError::MalformedDocument {
            id: "<unknown>".to_string(),
            reason: e.to_string(),
        })?;

    let id = parse_id(raw.id).ok_or_else(|| StoreError::MalformedDocument {
        id: "<unknown>".to_string(),
        reason: "match document has no usable id".to_string(),
    })?;

    let p_a1 = or_blank_player(raw.p_a1, id, "pA1");
    let p_a2 = or_blank_player(raw.p_a2, id, "pA2");
    let p_b1 = or_blank_player(raw.p_b1, id, "pB1");
    let p_b2 = or_blank_player(raw.p_b2, id, "pB2");

    let history = raw
        .history
        .unwrap_or_default()
        .into_iter()
        .filter_map(|entry| match serde_json::from_value::<HistoryEntry>(entry) {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(match_id = %id, error = %e, "dropping malformed history entry");
                None
            }
        })
        .collect();

    Ok(MatchFact {
        id,
        team_a: raw.team_a.unwrap_or_else(|| TeamId(String::new())),
        team_b: raw.team_b.unwrap_or_else(|| TeamId(String::new())),
        original_p_a1: raw.original_p_a1.unwrap_or_else(|| p_a1.clone()),
        original_p_a2: raw.original_p_a2.unwrap_or_else(|| p_a2.clone()),
        original_p_b1: raw.original_p_b1.unwrap_or_else(|| p_b1.clone()),
        original_p_b2: raw.original_p_b2.unwrap_or_else(|| p_b2.clone()),
        p_a1,
        p_a2,
        p_b1,
        p_b2,
        scheduled_date: parse_date(raw.scheduled_date),
        games: raw.games.unwrap_or_default(),
        reported_date: parse_date(raw.reported_date),
        reported_by: raw.reported_by,
        reported_by_id: raw.reported_by_id,
        history,
    })
}

pub fn parse_team(doc: Value) -> StoreResult<Team> {
    serde_json::from_value(doc).map_err(|e| StoreError::MalformedDocument {
        id: "<team>".to_string(),
        reason: e.to_string(),
    })
}

pub fn parse_player(doc: Value) -> StoreResult<Player> {
    serde_json::from_value(doc).map_err(|e| StoreError::MalformedDocument {
        id: "<player>".to_string(),
        reason: e.to_string(),
    })
}

/// Normalizes a whole snapshot, dropping (and logging) documents that do not
/// parse instead of failing the snapshot. Output is ordered by match id.
pub fn parse_match_snapshot(docs: Vec<Value>) -> Vec<MatchFact> {
    let mut matches: Vec<MatchFact> = docs
        .into_iter()
        .filter_map(|doc| match parse_match(doc) {
            Ok(m) => Some(m),
            Err(e) => {
                warn!(error = %e, "dropping unparseable match document");
                None
            }
        })
        .collect();

    matches.sort_by_key(|m| m.id);
    matches
}
