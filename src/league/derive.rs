//! Pure derivations over a single [`MatchFact`].
//!
//! The stored document may carry legacy `score`/`winner`/`isFlex*` fields;
//! nothing here reads them. Score, winner, flex status, and lifecycle state
//! are always recomputed from `games` and the `originalP*` baseline.

use crate::league::model::{MatchFact, MatchState, TeamId};

/// Game-win counts for the valid games of a match, team A first.
///
/// A game is valid when both sides parse to a point count; a tied game
/// counts for neither side.
pub fn game_wins(m: &MatchFact) -> (u32, u32) {
    let mut a = 0;
    let mut b = 0;

    for game in &m.games {
        if let Some((pa, pb)) = game.valid_points() {
            if pa > pb {
                a += 1;
            } else if pb > pa {
                b += 1;
            }
        }
    }

    (a, b)
}

/// `"<aWins>-<bWins>"`, or an empty string when no valid game exists.
pub fn compute_score(m: &MatchFact) -> String {
    let valid = m.games.iter().filter(|g| g.valid_points().is_some()).count();
    if valid == 0 {
        return String::new();
    }

    let (a, b) = game_wins(m);
    format!("{}-{}", a, b)
}

/// The winning team id, or `None` when no valid game exists or the game-win
/// counts are tied. A match is completed iff this is `Some`.
pub fn compute_winner(m: &MatchFact) -> Option<TeamId> {
    let valid = m.games.iter().filter(|g| g.valid_points().is_some()).count();
    if valid == 0 {
        return None;
    }

    let (a, b) = game_wins(m);
    if a > b {
        Some(m.team_a.clone())
    } else if b > a {
        Some(m.team_b.clone())
    } else {
        None
    }
}

/// Whether team A currently fields a lineup that differs from its original
/// pairing. The comparison is positional: the same two players with their
/// slots swapped still count as flexed.
pub fn is_team_a_flexed(m: &MatchFact) -> bool {
    m.p_a1 != m.original_p_a1 || m.p_a2 != m.original_p_a2
}

pub fn is_team_b_flexed(m: &MatchFact) -> bool {
    m.p_b1 != m.original_p_b1 || m.p_b2 != m.original_p_b2
}

/// Total point differential from team A's perspective over the valid games.
/// Team B's differential is the negation.
pub fn point_differential_a(m: &MatchFact) -> i64 {
    m.games
        .iter()
        .filter_map(|g| g.valid_points())
        .map(|(pa, pb)| pa - pb)
        .sum()
}

/// Derived lifecycle state of a match.
pub fn match_state(m: &MatchFact) -> MatchState {
    if compute_winner(m).is_some() {
        MatchState::Reported
    } else if m.scheduled_date.is_some() {
        MatchState::Scheduled
    } else {
        MatchState::Unscheduled
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::model::GameRecord;
    use crate::league::model::tests::fixture;

    #[test]
    fn test_empty_match_has_no_score_or_winner() {
        let m = fixture();
        assert_eq!(compute_score(&m), "");
        assert_eq!(compute_winner(&m), None);
        assert_eq!(match_state(&m), MatchState::Unscheduled);
    }

    #[test]
    fn test_best_of_three_split() {
        let mut m = fixture();
        m.games = vec![
            GameRecord::new(11, 5),
            GameRecord::new(9, 11),
            GameRecord::new(11, 7),
        ];

        assert_eq!(compute_score(&m), "2-1");
        assert_eq!(compute_winner(&m), Some(m.team_a.clone()));
        assert_eq!(match_state(&m), MatchState::Reported);
    }

    #[test]
    fn test_tie_yields_score_but_no_winner() {
        let mut m = fixture();
        m.games = vec![GameRecord::new(1, 0), GameRecord::new(0, 1)];

        assert_eq!(compute_score(&m), "1-1");
        assert_eq!(compute_winner(&m), None);
        // a tied match is not completed, so it falls back to schedule state
        assert_eq!(match_state(&m), MatchState::Unscheduled);
    }

    #[test]
    fn test_malformed_and_partial_games_are_excluded() {
        let mut m = fixture();
        m.games = vec![
            GameRecord::new("11", "banana"),
            GameRecord::new("", 7),
            GameRecord::new("11", "9"),
        ];

        assert_eq!(compute_score(&m), "1-0");
        assert_eq!(compute_winner(&m), Some(m.team_a.clone()));
    }

    #[test]
    fn test_tied_game_counts_for_neither_side() {
        let mut m = fixture();
        m.games = vec![GameRecord::new(10, 10), GameRecord::new(11, 8)];

        assert_eq!(compute_score(&m), "1-0");
        assert_eq!(compute_winner(&m), Some(m.team_a.clone()));
    }

    #[test]
    fn test_all_invalid_games_mean_unplayed() {
        let mut m = fixture();
        m.games = vec![GameRecord::new("", ""), GameRecord::new("x", "y")];

        assert_eq!(compute_score(&m), "");
        assert_eq!(compute_winner(&m), None);
    }

    #[test]
    fn test_numeric_string_scores_count() {
        let mut m = fixture();
        m.games = vec![GameRecord::new("7", 11)];

        assert_eq!(compute_score(&m), "0-1");
        assert_eq!(compute_winner(&m), Some(m.team_b.clone()));
    }

    #[test]
    fn test_flex_positional_comparison() {
        let mut m = fixture();
        assert!(!is_team_a_flexed(&m));
        assert!(!is_team_b_flexed(&m));

        m.p_a1 = "p9".into();
        assert!(is_team_a_flexed(&m));
        assert!(!is_team_b_flexed(&m));

        // same two players, slots swapped: still flexed
        let mut swapped = fixture();
        swapped.p_a1 = "p2".into();
        swapped.p_a2 = "p1".into();
        assert!(is_team_a_flexed(&swapped));
    }

    #[test]
    fn test_point_differential_over_valid_games() {
        let mut m = fixture();
        m.games = vec![
            GameRecord::new(11, 5),
            GameRecord::new(9, 11),
            GameRecord::new(11, 7),
        ];

        assert_eq!(point_differential_a(&m), 8);
    }

    #[test]
    fn test_winner_derivation_ignores_stored_winner_field() {
        // a raw doc claiming a winner but holding no games parses to a
        // match with no derived winner
        let doc = serde_json::json!({
            "id": 3,
            "teamA": "team-a",
            "teamB": "team-b",
            "pA1": "p1", "pA2": "p2", "pB1": "p3", "pB2": "p4",
            "originalPA1": "p1", "originalPA2": "p2",
            "originalPB1": "p3", "originalPB2": "p4",
            "winner": "team-b",
            "score": "2-0"
        });

        let m: MatchFact = serde_json::from_value(doc).unwrap();
        assert_eq!(compute_winner(&m), None);
        assert_eq!(compute_score(&m), "");
    }
}
