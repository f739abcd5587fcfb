use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Stable player identity. Renames keep the id; historical references store ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub String);

/// Schedule-assigned match id, 1..N, fixed at season seed time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub u32);

impl core::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl core::fmt::Display for TeamId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl core::fmt::Display for MatchId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&str> for TeamId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    pub captain_id: PlayerId,
    pub player_ids: Vec<PlayerId>,
    #[serde(default)]
    pub color_tag: Option<String>,
    #[serde(default)]
    pub logo_ref: Option<String>,
}

/// One side's score entry inside a game record.
///
/// The store holds these as a number, a numeric string, an empty string, or
/// null, so the wire shape is untagged. A blank or unparseable entry simply
/// means "no score yet" and never an error.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ScoreValue {
    Num(i64),
    Text(String),
    #[default]
    Empty,
}

impl ScoreValue {
    /// The parsed point count, or `None` when blank/malformed.
    pub fn points(&self) -> Option<i64> {
        match self {
            ScoreValue::Num(n) => Some(*n),
            ScoreValue::Text(s) => s.trim().parse::<i64>().ok(),
            ScoreValue::Empty => None,
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            ScoreValue::Empty => true,
            ScoreValue::Text(s) => s.trim().is_empty(),
            ScoreValue::Num(_) => false,
        }
    }
}

impl From<i64> for ScoreValue {
    fn from(value: i64) -> Self {
        ScoreValue::Num(value)
    }
}

impl From<&str> for ScoreValue {
    fn from(value: &str) -> Self {
        if value.trim().is_empty() {
            ScoreValue::Empty
        } else {
            ScoreValue::Text(value.to_string())
        }
    }
}

/// One game of a best-of-3 match. Counts toward the match result only when
/// both sides parse to a point count.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameRecord {
    #[serde(default)]
    pub score_a: ScoreValue,
    #[serde(default)]
    pub score_b: ScoreValue,
}

impl GameRecord {
    pub fn new(score_a: impl Into<ScoreValue>, score_b: impl Into<ScoreValue>) -> Self {
        Self {
            score_a: score_a.into(),
            score_b: score_b.into(),
        }
    }

    /// Both point counts when this is a valid (countable) game.
    pub fn valid_points(&self) -> Option<(i64, i64)> {
        Some((self.score_a.points()?, self.score_b.points()?))
    }
}

/// The canonical record of one scheduled match.
///
/// `original_p_*` are the substitution baseline: written once at season seed
/// time and never mutated afterward. The result (score/winner) is always
/// recomputed from `games`; `reported_*` are metadata about when/who saved
/// the report, never the result itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFact {
    pub id: MatchId,
    pub team_a: TeamId,
    pub team_b: TeamId,

    pub p_a1: PlayerId,
    pub p_a2: PlayerId,
    pub p_b1: PlayerId,
    pub p_b2: PlayerId,

    pub original_p_a1: PlayerId,
    pub original_p_a2: PlayerId,
    pub original_p_b1: PlayerId,
    pub original_p_b2: PlayerId,

    #[serde(default)]
    pub scheduled_date: Option<DateTime<Utc>>,

    #[serde(default)]
    pub games: Vec<GameRecord>,

    #[serde(default)]
    pub reported_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reported_by: Option<String>,
    #[serde(default)]
    pub reported_by_id: Option<String>,

    #[serde(default)]
    pub history: Vec<HistoryEntry>,
}

impl MatchFact {
    pub fn current_pair_a(&self) -> [PlayerId; 2] {
        [self.p_a1.clone(), self.p_a2.clone()]
    }

    pub fn current_pair_b(&self) -> [PlayerId; 2] {
        [self.p_b1.clone(), self.p_b2.clone()]
    }

    pub fn original_pair_a(&self) -> [PlayerId; 2] {
        [self.original_p_a1.clone(), self.original_p_a2.clone()]
    }

    pub fn original_pair_b(&self) -> [PlayerId; 2] {
        [self.original_p_b1.clone(), self.original_p_b2.clone()]
    }

    /// All four currently assigned players, team A first.
    pub fn participants(&self) -> [(&PlayerId, &TeamId); 4] {
        [
            (&self.p_a1, &self.team_a),
            (&self.p_a2, &self.team_a),
            (&self.p_b1, &self.team_b),
            (&self.p_b2, &self.team_b),
        ]
    }
}

/// Before/after pair for one changed field group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delta<T> {
    pub before: T,
    pub after: T,
}

/// Snapshot of a match result as logged in history: the raw games plus the
/// score/winner derived from them at the time of the change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultSnapshot {
    pub games: Vec<GameRecord>,
    pub score: String,
    pub winner: Option<TeamId>,
}

/// The field groups a single save/clear can touch. Only the groups that
/// actually changed carry a delta.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryChanges {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<Delta<Option<DateTime<Utc>>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_a_players: Option<Delta<[PlayerId; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_b_players: Option<Delta<[PlayerId; 2]>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Delta<ResultSnapshot>>,
}

impl HistoryChanges {
    pub fn is_empty(&self) -> bool {
        self.scheduled_date.is_none()
            && self.team_a_players.is_none()
            && self.team_b_players.is_none()
            && self.result.is_none()
    }
}

/// Append-only change-log entry. Entries are never edited, removed, or
/// reordered once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_name: String,
    pub user_id: String,
    pub changes: HistoryChanges,
}

/// Merge-write payload for one match document. Absent fields are left
/// untouched by the store; `Some(None)` writes an explicit null.
///
/// `is_flex_a`/`is_flex_b`/`score`/`winner` are legacy display fields: they
/// are written so older readers keep rendering, but no conforming reader may
/// treat them as authoritative — the result is always recomputed from
/// `games` and the `originalP*` baseline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_a1: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_a2: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_b1: Option<PlayerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub p_b2: Option<PlayerId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_flex_a: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_flex_b: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheduled_date: Option<Option<DateTime<Utc>>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub games: Option<Vec<GameRecord>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub winner: Option<Option<TeamId>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_date: Option<Option<DateTime<Utc>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_by: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reported_by_id: Option<Option<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<HistoryEntry>>,
}

/// Derived lifecycle state; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MatchState {
    Unscheduled,
    Scheduled,
    Reported,
}

/// One row of the team table. Derived fresh from the match set on every
/// snapshot; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamStanding {
    pub team_id: TeamId,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub played: u32,
    pub flex_used: u32,
}

/// One row of the player table, with the derived rate fields filled in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStanding {
    pub player_id: PlayerId,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub played: u32,
    pub flex_games: u32,
    pub point_differential: i64,
    pub win_rate: f64,
    pub avg_point_differential: f64,
}
