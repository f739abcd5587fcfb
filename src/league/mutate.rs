//! Report / edit / clear mutation protocol.
//!
//! The planners here are pure: given the stored match, the requested new
//! state, and the reporter identity, they produce the merge-write patch (or
//! nothing, when the request changes nothing). The service performs the
//! single store write; a failed write leaves no local state behind.
//!
//! History is strictly append-only: a plan always carries the stored history
//! plus at most one new entry, never a rewritten or truncated log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::league::derive::{compute_score, compute_winner, is_team_a_flexed, is_team_b_flexed};
use crate::league::flex::ProposedLineup;
use crate::league::model::{
    Delta, GameRecord, HistoryChanges, HistoryEntry, MatchFact, MatchPatch, ResultSnapshot,
};

/// Identity of whoever is saving, as handed over by the outer auth layer.
/// Resolution never fails: with nothing usable the entry is attributed to
/// "Anonymous" / "unknown".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reporter {
    /// Name of the league player the reporter identified themselves as.
    #[serde(default)]
    pub player_name: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub auth_id: Option<String>,
}

impl Reporter {
    /// Display name priority: identified player, auth display name, the
    /// local part of the email, "Anonymous".
    pub fn resolved_name(&self) -> String {
        if let Some(name) = non_blank(&self.player_name) {
            return name.to_string();
        }
        if let Some(name) = non_blank(&self.display_name) {
            return name.to_string();
        }
        if let Some(email) = non_blank(&self.email) {
            return email.split('@').next().unwrap_or(email).to_string();
        }
        "Anonymous".to_string()
    }

    pub fn resolved_id(&self) -> String {
        non_blank(&self.auth_id)
            .unwrap_or("unknown")
            .to_string()
    }
}

fn non_blank(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Full requested state of a save: the complete lineup, schedule, and game
/// list the reporter ended up with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveRequest {
    #[serde(flatten)]
    pub lineup: ProposedLineup,
    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub games: Vec<GameRecord>,
}

impl SaveRequest {
    /// A request that restates the stored match exactly (useful as an edit
    /// baseline).
    pub fn current(m: &MatchFact) -> Self {
        Self {
            lineup: ProposedLineup::current(m),
            scheduled_date: m.scheduled_date,
            games: m.games.clone(),
        }
    }
}

fn result_snapshot(m: &MatchFact) -> ResultSnapshot {
    ResultSnapshot {
        games: m.games.clone(),
        score: compute_score(m),
        winner: compute_winner(m),
    }
}

/// Applies a save request to a copy of the stored match, giving the record
/// the derivations run against.
fn apply_request(m: &MatchFact, req: &SaveRequest) -> MatchFact {
    let mut next = m.clone();
    next.p_a1 = req.lineup.p_a1.clone();
    next.p_a2 = req.lineup.p_a2.clone();
    next.p_b1 = req.lineup.p_b1.clone();
    next.p_b2 = req.lineup.p_b2.clone();
    next.scheduled_date = req.scheduled_date;
    next.games = req.games.clone();
    next
}

/// Plans a save. `None` when the request changes nothing — no write happens
/// and no history entry is emitted. Otherwise the patch carries the full new
/// lineup/schedule state, the legacy display fields, report metadata when
/// the new games produce a winner, and the appended history.
pub fn plan_save(
    m: &MatchFact,
    req: &SaveRequest,
    reporter: &Reporter,
    now: DateTime<Utc>,
) -> Option<MatchPatch> {
    let next = apply_request(m, req);
    let mut changes = HistoryChanges::default();

    if m.scheduled_date != next.scheduled_date {
        changes.scheduled_date = Some(Delta {
            before: m.scheduled_date,
            after: next.scheduled_date,
        });
    }

    if m.current_pair_a() != next.current_pair_a() {
        changes.team_a_players = Some(Delta {
            before: m.current_pair_a(),
            after: next.current_pair_a(),
        });
    }

    if m.current_pair_b() != next.current_pair_b() {
        changes.team_b_players = Some(Delta {
            before: m.current_pair_b(),
            after: next.current_pair_b(),
        });
    }

    if m.games != next.games {
        changes.result = Some(Delta {
            before: result_snapshot(m),
            after: result_snapshot(&next),
        });
    }

    if changes.is_empty() {
        return None;
    }

    let winner = compute_winner(&next);

    let mut history = m.history.clone();
    history.push(HistoryEntry {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp: now,
        user_name: reporter.resolved_name(),
        user_id: reporter.resolved_id(),
        changes,
    });

    let mut patch = MatchPatch {
        p_a1: Some(next.p_a1.clone()),
        p_a2: Some(next.p_a2.clone()),
        p_b1: Some(next.p_b1.clone()),
        p_b2: Some(next.p_b2.clone()),
        is_flex_a: Some(is_team_a_flexed(&next)),
        is_flex_b: Some(is_team_b_flexed(&next)),
        scheduled_date: Some(next.scheduled_date),
        games: Some(next.games.clone()),
        score: Some(compute_score(&next)),
        winner: Some(winner.clone()),
        history: Some(history),
        ..Default::default()
    };

    // report metadata is stamped only when the games actually decide the
    // match; editing a report down to a tie leaves the old stamp alone
    if winner.is_some() {
        patch.reported_date = Some(Some(now));
        patch.reported_by = Some(Some(reporter.resolved_name()));
        patch.reported_by_id = Some(Some(reporter.resolved_id()));
    }

    Some(patch)
}

/// Marker written into the history log when a result is wiped.
pub const CLEARED: &str = "Cleared";

/// Plans a clear. `None` when the match holds no score (nothing to clear).
/// Games and report metadata are wiped; player assignments and the schedule
/// stay as they are.
pub fn plan_clear(m: &MatchFact, reporter: &Reporter, now: DateTime<Utc>) -> Option<MatchPatch> {
    if compute_score(m).is_empty() {
        return None;
    }

    let changes = HistoryChanges {
        result: Some(Delta {
            before: result_snapshot(m),
            after: ResultSnapshot {
                games: Vec::new(),
                score: CLEARED.to_string(),
                winner: None,
            },
        }),
        ..Default::default()
    };

    let mut history = m.history.clone();
    history.push(HistoryEntry {
        id: uuid::Uuid::new_v4().to_string(),
        timestamp: now,
        user_name: reporter.resolved_name(),
        user_id: reporter.resolved_id(),
        changes,
    });

    Some(MatchPatch {
        games: Some(Vec::new()),
        score: Some(String::new()),
        winner: Some(None),
        reported_date: Some(None),
        reported_by: Some(None),
        reported_by_id: Some(None),
        history: Some(history),
        ..Default::default()
    })
}

/// Applies a patch to an owned match record. The store does the same merge
/// on the document side; this mirror exists so tests and the in-memory path
/// can observe post-write state without re-reading.
pub fn apply_patch(m: &mut MatchFact, patch: &MatchPatch) {
    if let Some(v) = &patch.p_a1 {
        m.p_a1 = v.clone();
    }
    if let Some(v) = &patch.p_a2 {
        m.p_a2 = v.clone();
    }
    if let Some(v) = &patch.p_b1 {
        m.p_b1 = v.clone();
    }
    if let Some(v) = &patch.p_b2 {
        m.p_b2 = v.clone();
    }
    if let Some(v) = patch.scheduled_date {
        m.scheduled_date = v;
    }
    if let Some(v) = &patch.games {
        m.games = v.clone();
    }
    if let Some(v) = patch.reported_date {
        m.reported_date = v;
    }
    if let Some(v) = &patch.reported_by {
        m.reported_by = v.clone();
    }
    if let Some(v) = &patch.reported_by_id {
        m.reported_by_id = v.clone();
    }
    if let Some(v) = &patch.history {
        m.history = v.clone();
    }
}
