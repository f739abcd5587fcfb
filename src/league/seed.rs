//! Season seeding.
//!
//! A season is created exactly once: teams, players, and the full
//! round-robin match schedule with the original player pairings baked in.
//! Those `originalP*` pairings are the substitution baseline for the whole
//! season and are never written again after this point.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tracing::instrument;

use crate::league::model::{MatchFact, MatchId, Player, PlayerId, Team, TeamId};
use crate::store::port::{Collection, DocumentStore};
use crate::store::StoreResult;

#[derive(Debug, Clone)]
pub struct Season {
    pub players: Vec<Player>,
    pub teams: Vec<Team>,
    pub matches: Vec<MatchFact>,
}

/// Full round-robin schedule: every pair of teams meets `rounds` times, and
/// each team's lineup rotates through its roster two players at a time, so
/// the original pairings are a pure function of the team list.
pub fn season_schedule(teams: &[Team], rounds: u32) -> Vec<MatchFact> {
    let mut matches = Vec::new();
    let mut next_id = 1u32;
    let mut appearance = vec![0usize; teams.len()];

    let mut pair_for = |team_idx: usize| -> [PlayerId; 2] {
        let roster = &teams[team_idx].player_ids;
        let n = appearance[team_idx];
        appearance[team_idx] += 1;

        let first = roster[(2 * n) % roster.len()].clone();
        let second = roster[(2 * n + 1) % roster.len()].clone();
        [first, second]
    };

    for _ in 0..rounds {
        for a in 0..teams.len() {
            for b in (a + 1)..teams.len() {
                let [p_a1, p_a2] = pair_for(a);
                let [p_b1, p_b2] = pair_for(b);

                matches.push(MatchFact {
                    id: MatchId(next_id),
                    team_a: teams[a].id.clone(),
                    team_b: teams[b].id.clone(),
                    original_p_a1: p_a1.clone(),
                    original_p_a2: p_a2.clone(),
                    original_p_b1: p_b1.clone(),
                    original_p_b2: p_b2.clone(),
                    p_a1,
                    p_a2,
                    p_b1,
                    p_b2,
                    scheduled_date: None,
                    games: Vec::new(),
                    reported_date: None,
                    reported_by: None,
                    reported_by_id: None,
                    history: Vec::new(),
                });
                next_id += 1;
            }
        }
    }

    matches
}

/// The built-in first-run season: four teams of eight, double round-robin.
pub fn demo_season() -> Season {
    let team_names = ["Dink Dynasty", "Net Force", "Kitchen Cartel", "Rally Caps"];

    let mut players = Vec::new();
    let mut teams = Vec::new();

    for (t, name) in team_names.iter().enumerate() {
        let roster: Vec<PlayerId> = (1..=8)
            .map(|n| PlayerId(format!("player-{}-{}", t + 1, n)))
            .collect();

        for (i, pid) in roster.iter().enumerate() {
            players.push(Player {
                id: pid.clone(),
                name: format!("{} Player {}", name, i + 1),
            });
        }

        teams.push(Team {
            id: TeamId(format!("team-{}", t + 1)),
            name: name.to_string(),
            captain_id: roster[0].clone(),
            player_ids: roster,
            color_tag: None,
            logo_ref: None,
        });
    }

    let matches = season_schedule(&teams, 2);

    Season {
        players,
        teams,
        matches,
    }
}

fn to_docs<T: serde::Serialize>(items: &[T]) -> StoreResult<Vec<Value>> {
    items
        .iter()
        .map(|item| serde_json::to_value(item).map_err(Into::into))
        .collect()
}

/// Bulk-writes a season into the store, one collection at a time.
#[instrument(skip(store, season), fields(matches = season.matches.len()))]
pub async fn write_season(store: &dyn DocumentStore, season: &Season) -> StoreResult<()> {
    store
        .seed(Collection::Players, to_docs(&season.players)?)
        .await?;
    store.seed(Collection::Teams, to_docs(&season.teams)?).await?;
    store
        .seed(Collection::Matches, to_docs(&season.matches)?)
        .await?;

    tracing::info!(
        teams = season.teams.len(),
        players = season.players.len(),
        matches = season.matches.len(),
        "season seeded"
    );

    Ok(())
}

/// First-subscription bootstrap: seeds the season iff the match collection
/// is empty, at most once per process. A process-local flag is enough here —
/// seeding happens once per season, and a rare double-seed between two fresh
/// processes writes identical documents.
pub struct SeasonBootstrap {
    seeded: AtomicBool,
}

impl SeasonBootstrap {
    pub fn new() -> Self {
        Self {
            seeded: AtomicBool::new(false),
        }
    }

    /// Returns true when this call performed the seed.
    #[instrument(skip(self, store, season))]
    pub async fn ensure_seeded(
        &self,
        store: &dyn DocumentStore,
        season: &Season,
    ) -> StoreResult<bool> {
        let existing = store.snapshot(Collection::Matches).await?;
        if !existing.is_empty() {
            return Ok(false);
        }

        if self.seeded.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }

        write_season(store, season).await?;
        Ok(true)
    }
}

impl Default for SeasonBootstrap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[test]
    fn test_schedule_covers_every_pairing() {
        let season = demo_season();

        // 4 teams, double round-robin: C(4,2) * 2
        assert_eq!(season.matches.len(), 12);

        let ids: Vec<u32> = season.matches.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, (1..=12).collect::<Vec<_>>());

        for m in &season.matches {
            assert_ne!(m.team_a, m.team_b);
            assert_eq!(m.p_a1, m.original_p_a1);
            assert_eq!(m.p_a2, m.original_p_a2);
            assert!(m.games.is_empty());
            assert!(m.history.is_empty());
        }
    }

    #[test]
    fn test_roster_rotation_varies_the_pairings() {
        let season = demo_season();
        let team_1 = &season.teams[0].id;

        let lineups: Vec<[PlayerId; 2]> = season
            .matches
            .iter()
            .filter(|m| &m.team_a == team_1)
            .map(|m| m.original_pair_a())
            .collect();

        // 8-player roster over two at a time: four distinct pairs per cycle
        assert!(lineups.len() >= 4);
        assert_ne!(lineups[0], lineups[1]);
    }

    #[tokio::test]
    async fn test_bootstrap_seeds_only_an_empty_store() {
        let store = MemoryStore::new();
        let bootstrap = SeasonBootstrap::new();
        let season = demo_season();

        assert!(bootstrap.ensure_seeded(&store, &season).await.unwrap());
        assert!(!bootstrap.ensure_seeded(&store, &season).await.unwrap());

        let docs = store.snapshot(Collection::Matches).await.unwrap();
        assert_eq!(docs.len(), season.matches.len());

        // a second bootstrap instance also backs off: the store is populated
        let second = SeasonBootstrap::new();
        assert!(!second.ensure_seeded(&store, &season).await.unwrap());
    }
}
