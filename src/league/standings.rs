//! Standings aggregation.
//!
//! Both tables are recomputed from scratch over the full match snapshot on
//! every change; nothing is incrementally maintained. Only completed matches
//! (a derived winner exists) count toward any tally.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::league::derive::{
    compute_winner, is_team_a_flexed, is_team_b_flexed, point_differential_a,
};
use crate::league::model::{
    MatchFact, Player, PlayerId, PlayerStanding, Team, TeamId, TeamStanding,
};

/// Float comparisons in the tiebreak cascade treat differences below this as
/// equal, so rate math noise cannot reorder genuinely tied players.
const TIEBREAK_EPSILON: f64 = 0.01;

/// Team table: wins/losses/played/flex-used per team, ordered by wins
/// descending. Ties keep encounter order; the team table deliberately has no
/// tiebreak cascade, unlike the player table.
pub fn compute_team_standings(matches: &[MatchFact], teams: &[Team]) -> Vec<TeamStanding> {
    let mut rows: Vec<TeamStanding> = Vec::with_capacity(teams.len());
    let mut index: HashMap<TeamId, usize> = HashMap::new();

    for team in teams {
        index.insert(team.id.clone(), rows.len());
        rows.push(TeamStanding {
            team_id: team.id.clone(),
            name: team.name.clone(),
            wins: 0,
            losses: 0,
            played: 0,
            flex_used: 0,
        });
    }

    // dangling team ids fall back to a raw-id row rather than erroring
    let mut row_for = |rows: &mut Vec<TeamStanding>, id: &TeamId| -> usize {
        if let Some(&i) = index.get(id) {
            return i;
        }
        tracing::warn!(team_id = %id, "match references a team missing from the team list");
        index.insert(id.clone(), rows.len());
        rows.push(TeamStanding {
            team_id: id.clone(),
            name: id.0.clone(),
            wins: 0,
            losses: 0,
            played: 0,
            flex_used: 0,
        });
        rows.len() - 1
    };

    for m in matches {
        let Some(winner) = compute_winner(m) else {
            continue;
        };

        let a = row_for(&mut rows, &m.team_a);
        rows[a].played += 1;
        if is_team_a_flexed(m) {
            rows[a].flex_used += 1;
        }

        let b = row_for(&mut rows, &m.team_b);
        rows[b].played += 1;
        if is_team_b_flexed(m) {
            rows[b].flex_used += 1;
        }

        if winner == m.team_a {
            rows[a].wins += 1;
            rows[b].losses += 1;
        } else {
            rows[b].wins += 1;
            rows[a].losses += 1;
        }
    }

    // stable: equal win counts retain encounter order
    rows.sort_by(|x, y| y.wins.cmp(&x.wins));
    rows
}

#[derive(Default)]
struct PlayerTally {
    wins: u32,
    losses: u32,
    played: u32,
    flex_games: u32,
    point_differential: i64,
}

/// Player table over the CURRENT match assignments, i.e. the players who
/// actually took the court, not the original schedule.
pub fn compute_player_standings(
    matches: &[MatchFact],
    teams: &[Team],
    players: &[Player],
) -> Vec<PlayerStanding> {
    let mut order: Vec<PlayerId> = Vec::new();
    let mut tallies: HashMap<PlayerId, PlayerTally> = HashMap::new();

    let names: HashMap<&PlayerId, &str> = players
        .iter()
        .map(|p| (&p.id, p.name.as_str()))
        .collect();

    for team in teams {
        for pid in &team.player_ids {
            if !tallies.contains_key(pid) {
                order.push(pid.clone());
                tallies.insert(pid.clone(), PlayerTally::default());
            }
        }
    }

    for m in matches {
        let Some(winner) = compute_winner(m) else {
            continue;
        };

        let diff_a = point_differential_a(m);
        let flexed_a = is_team_a_flexed(m);
        let flexed_b = is_team_b_flexed(m);
        let original_a = m.original_pair_a();
        let original_b = m.original_pair_b();

        for (pid, side) in m.participants() {
            let tally = tallies.entry(pid.clone()).or_insert_with(|| {
                // a substitute from outside every roster still gets a row
                order.push(pid.clone());
                PlayerTally::default()
            });

            tally.played += 1;
            if *side == winner {
                tally.wins += 1;
            } else {
                tally.losses += 1;
            }

            let on_side_a = *side == m.team_a;
            tally.point_differential += if on_side_a { diff_a } else { -diff_a };

            // flex credit goes to the incoming substitute only, never to the
            // original partner who stayed
            let (flexed, originals) = if on_side_a {
                (flexed_a, &original_a)
            } else {
                (flexed_b, &original_b)
            };
            if flexed && !originals.contains(pid) {
                tally.flex_games += 1;
            }
        }
    }

    // dangling player ids degrade to displaying the raw id
    let name_for = |pid: &PlayerId| -> String {
        names
            .get(pid)
            .map(|name| name.to_string())
            .unwrap_or_else(|| pid.0.clone())
    };

    let mut rows: Vec<PlayerStanding> = order
        .iter()
        .map(|pid| {
            let tally = &tallies[pid];
            let played = tally.played;
            let win_rate = if played == 0 {
                0.0
            } else {
                tally.wins as f64 / played as f64 * 100.0
            };
            let avg_point_differential = if played == 0 {
                0.0
            } else {
                tally.point_differential as f64 / played as f64
            };

            PlayerStanding {
                player_id: pid.clone(),
                name: name_for(pid),
                wins: tally.wins,
                losses: tally.losses,
                played,
                flex_games: tally.flex_games,
                point_differential: tally.point_differential,
                win_rate,
                avg_point_differential,
            }
        })
        .collect();

    rows.sort_by(compare_player_rows);
    rows
}

/// Player ordering cascade: unplayed rows sink below every played row (and
/// keep roster order among themselves), then win rate, average differential,
/// total differential, and raw wins, each descending.
fn compare_player_rows(x: &PlayerStanding, y: &PlayerStanding) -> Ordering {
    match (x.played == 0, y.played == 0) {
        (true, true) => return Ordering::Equal,
        (true, false) => return Ordering::Greater,
        (false, true) => return Ordering::Less,
        (false, false) => {}
    }

    cmp_desc_with_epsilon(x.win_rate, y.win_rate)
        .then_with(|| cmp_desc_with_epsilon(x.avg_point_differential, y.avg_point_differential))
        .then_with(|| y.point_differential.cmp(&x.point_differential))
        .then_with(|| y.wins.cmp(&x.wins))
}

fn cmp_desc_with_epsilon(x: f64, y: f64) -> Ordering {
    if (x - y).abs() < TIEBREAK_EPSILON {
        Ordering::Equal
    } else if x > y {
        Ordering::Less
    } else {
        Ordering::Greater
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::model::tests::fixture;
    use crate::league::model::{GameRecord, MatchId};

    fn teams() -> Vec<Team> {
        vec![
            Team {
                id: "team-a".into(),
                name: "Alley Cats".to_string(),
                captain_id: "p1".into(),
                player_ids: (1..=8).map(|n| PlayerId(format!("p{}", n))).collect(),
                color_tag: None,
                logo_ref: None,
            },
            Team {
                id: "team-b".into(),
                name: "Basement Dwellers".to_string(),
                captain_id: "p9".into(),
                player_ids: (9..=16).map(|n| PlayerId(format!("p{}", n))).collect(),
                color_tag: None,
                logo_ref: None,
            },
        ]
    }

    fn players() -> Vec<Player> {
        (1..=16)
            .map(|n| Player {
                id: PlayerId(format!("p{}", n)),
                name: format!("Player {}", n),
            })
            .collect()
    }

    fn completed_match() -> MatchFact {
        let mut m = fixture();
        m.team_b = "team-b".into();
        m.p_b1 = "p9".into();
        m.p_b2 = "p10".into();
        m.original_p_b1 = "p9".into();
        m.original_p_b2 = "p10".into();
        m.games = vec![
            GameRecord::new(11, 5),
            GameRecord::new(9, 11),
            GameRecord::new(11, 7),
        ];
        m
    }

    #[test]
    fn test_single_match_team_tallies() {
        let standings = compute_team_standings(&[completed_match()], &teams());

        assert_eq!(standings[0].team_id, TeamId::from("team-a"));
        assert_eq!(standings[0].wins, 1);
        assert_eq!(standings[0].losses, 0);
        assert_eq!(standings[0].played, 1);
        assert_eq!(standings[0].flex_used, 0);

        assert_eq!(standings[1].wins, 0);
        assert_eq!(standings[1].losses, 1);
        assert_eq!(standings[1].played, 1);
    }

    #[test]
    fn test_incomplete_matches_count_nowhere() {
        let mut tied = completed_match();
        tied.id = MatchId(2);
        tied.games = vec![GameRecord::new(1, 0), GameRecord::new(0, 1)];

        let mut unplayed = completed_match();
        unplayed.id = MatchId(3);
        unplayed.games.clear();

        let standings = compute_team_standings(&[tied, unplayed], &teams());
        assert!(standings.iter().all(|row| row.played == 0));
    }

    #[test]
    fn test_team_ties_keep_encounter_order() {
        let standings = compute_team_standings(&[], &teams());
        assert_eq!(standings[0].name, "Alley Cats");
        assert_eq!(standings[1].name, "Basement Dwellers");
    }

    #[test]
    fn test_flex_used_counts_per_side() {
        let mut m = completed_match();
        m.p_a2 = "p5".into(); // side A substituted
        let standings = compute_team_standings(&[m], &teams());

        let a = standings.iter().find(|r| r.team_id == TeamId::from("team-a")).unwrap();
        let b = standings.iter().find(|r| r.team_id == TeamId::from("team-b")).unwrap();
        assert_eq!(a.flex_used, 1);
        assert_eq!(b.flex_used, 0);
    }

    #[test]
    fn test_player_single_match_line() {
        let standings = compute_player_standings(&[completed_match()], &teams(), &players());

        let p1 = standings.iter().find(|r| r.player_id == PlayerId::from("p1")).unwrap();
        assert_eq!(p1.wins, 1);
        assert_eq!(p1.played, 1);
        assert_eq!(p1.win_rate, 100.0);
        assert_eq!(p1.point_differential, 8);
        assert_eq!(p1.avg_point_differential, 8.0);
        assert_eq!(p1.flex_games, 0);

        let p9 = standings.iter().find(|r| r.player_id == PlayerId::from("p9")).unwrap();
        assert_eq!(p9.losses, 1);
        assert_eq!(p9.point_differential, -8);
    }

    #[test]
    fn test_flex_game_credit_goes_to_substitute_only() {
        let mut m = completed_match();
        m.p_a2 = "p3".into(); // p3 comes in for p2

        let standings = compute_player_standings(&[m], &teams(), &players());
        let by_id = |id: &str| {
            standings
                .iter()
                .find(|r| r.player_id == PlayerId::from(id))
                .unwrap()
        };

        assert_eq!(by_id("p3").flex_games, 1);
        assert_eq!(by_id("p1").flex_games, 0); // original partner who stayed
        assert_eq!(by_id("p2").played, 0); // replaced player did not play
    }

    #[test]
    fn test_unplayed_players_sort_last_in_roster_order() {
        let standings = compute_player_standings(&[completed_match()], &teams(), &players());

        let first_unplayed = standings.iter().position(|r| r.played == 0).unwrap();
        assert!(standings[..first_unplayed].iter().all(|r| r.played > 0));
        assert!(standings[first_unplayed..].iter().all(|r| r.played == 0));

        // roster order preserved among the unplayed
        let unplayed: Vec<&str> = standings[first_unplayed..]
            .iter()
            .map(|r| r.player_id.0.as_str())
            .collect();
        let mut expected = unplayed.clone();
        expected.sort_by_key(|id| {
            teams()
                .iter()
                .flat_map(|t| t.player_ids.clone())
                .position(|p| p.0 == *id)
                .unwrap()
        });
        assert_eq!(unplayed, expected);
    }

    #[test]
    fn test_tiebreak_cascade_uses_point_differential() {
        // two completed matches; all winners end on 100% win rate, so the
        // differential decides the order
        let m1 = completed_match();

        let mut m2 = completed_match();
        m2.id = MatchId(2);
        m2.p_a1 = "p3".into();
        m2.p_a2 = "p4".into();
        m2.original_p_a1 = "p3".into();
        m2.original_p_a2 = "p4".into();
        m2.p_b1 = "p11".into();
        m2.p_b2 = "p12".into();
        m2.original_p_b1 = "p11".into();
        m2.original_p_b2 = "p12".into();
        m2.games = vec![GameRecord::new(11, 0), GameRecord::new(11, 0)];

        let standings = compute_player_standings(&[m1, m2], &teams(), &players());
        let played: Vec<&str> = standings
            .iter()
            .filter(|r| r.played > 0)
            .map(|r| r.player_id.0.as_str())
            .collect();

        // p3/p4 (+22) ahead of p1/p2's lineup (+8)
        assert_eq!(&played[..2], &["p3", "p4"]);
        assert!(played[2..4].contains(&"p1"));
    }

    #[test]
    fn test_epsilon_treats_near_equal_rates_as_tied() {
        assert_eq!(cmp_desc_with_epsilon(50.0, 50.009), Ordering::Equal);
        assert_eq!(cmp_desc_with_epsilon(50.0, 49.0), Ordering::Less);
        assert_eq!(cmp_desc_with_epsilon(49.0, 50.0), Ordering::Greater);
    }

    #[test]
    fn test_recompute_is_deterministic() {
        let matches = vec![completed_match()];
        let t = teams();
        let p = players();

        assert_eq!(
            compute_team_standings(&matches, &t),
            compute_team_standings(&matches, &t)
        );
        assert_eq!(
            compute_player_standings(&matches, &t, &p),
            compute_player_standings(&matches, &t, &p)
        );
    }

    #[test]
    fn test_dangling_team_id_degrades_to_raw_id_row() {
        let mut m = completed_match();
        m.team_b = "ghost-team".into();

        let standings = compute_team_standings(&[m], &teams());
        let ghost = standings
            .iter()
            .find(|r| r.team_id == TeamId::from("ghost-team"))
            .unwrap();
        assert_eq!(ghost.name, "ghost-team");
        assert_eq!(ghost.played, 1);
    }
}
