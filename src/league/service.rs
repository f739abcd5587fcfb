//! League service: the explicit owner of the live collections.
//!
//! Holds the latest normalized snapshot of matches/teams/players, recomputes
//! standings from scratch whenever the store pushes a change, and routes
//! mutations through the planners in [`mutate`]. All state is passed in —
//! there is no ambient store or context lookup anywhere below this layer.
//!
//! [`mutate`]: crate::league::mutate

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{RwLock, broadcast};
use tokio::task::JoinHandle;
use tracing::instrument;

use crate::league::flex::{self, FlexViolation, ProposedLineup};
use crate::league::model::{
    MatchFact, MatchId, Player, PlayerId, PlayerStanding, Team, TeamStanding,
};
use crate::league::mutate::{Reporter, SaveRequest, plan_clear, plan_save};
use crate::league::standings::{compute_player_standings, compute_team_standings};
use crate::store::normalize::{parse_match_snapshot, parse_player, parse_team};
use crate::store::port::{Collection, DocumentStore};
use crate::store::StoreError;

pub type LeagueResult<T> = core::result::Result<T, LeagueError>;

#[derive(Debug, Error)]
pub enum LeagueError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("match {0} is not part of the season schedule")]
    UnknownMatch(MatchId),

    #[error(transparent)]
    Flex(#[from] FlexViolation),
}

/// What a mutation request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SaveOutcome {
    /// A merge-write went out (and a history entry with it).
    Written,
    /// The request restated current state; nothing was written.
    NoChange,
}

#[derive(Debug, Default)]
struct LeagueSnapshot {
    matches: Vec<MatchFact>,
    teams: Vec<Team>,
    players: Vec<Player>,
}

pub struct LeagueService {
    store: Arc<dyn DocumentStore>,
    state: RwLock<LeagueSnapshot>,
    changed: broadcast::Sender<()>,
}

impl LeagueService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Arc<Self> {
        let (changed, _) = broadcast::channel(16);
        Arc::new(Self {
            store,
            state: RwLock::new(LeagueSnapshot::default()),
            changed,
        })
    }

    /// Fires after every applied snapshot; receivers re-read the accessors.
    pub fn subscribe_changes(&self) -> broadcast::Receiver<()> {
        self.changed.subscribe()
    }

    /// One initial load of all three collections.
    #[instrument(skip(self))]
    pub async fn refresh_all(&self) -> LeagueResult<()> {
        for collection in Collection::ALL {
            let docs = self.store.snapshot(collection).await?;
            self.apply(collection, docs).await;
        }
        let _ = self.changed.send(());
        Ok(())
    }

    /// Spawns one snapshot-follower task per collection. Standings are
    /// recomputed by readers on demand, so "applying" a snapshot is just
    /// normalize-and-swap.
    pub async fn run(self: Arc<Self>) -> LeagueResult<Vec<JoinHandle<()>>> {
        let mut handles = Vec::new();

        for collection in Collection::ALL {
            let mut rx = self.store.subscribe(collection).await?;
            let service = Arc::clone(&self);

            handles.push(tokio::spawn(async move {
                loop {
                    let docs = rx.borrow_and_update().clone();
                    service.apply(collection, docs).await;
                    let _ = service.changed.send(());

                    if rx.changed().await.is_err() {
                        tracing::warn!(collection = %collection, "snapshot channel closed");
                        break;
                    }
                }
            }));
        }

        Ok(handles)
    }

    async fn apply(&self, collection: Collection, docs: Vec<serde_json::Value>) {
        let mut state = self.state.write().await;
        match collection {
            Collection::Matches => {
                state.matches = parse_match_snapshot(docs);
                tracing::debug!(count = state.matches.len(), "applied match snapshot");
            }
            Collection::Teams => {
                state.teams = docs
                    .into_iter()
                    .filter_map(|doc| match parse_team(doc) {
                        Ok(team) => Some(team),
                        Err(e) => {
                            tracing::warn!(error = %e, "dropping unparseable team document");
                            None
                        }
                    })
                    .collect();
            }
            Collection::Players => {
                state.players = docs
                    .into_iter()
                    .filter_map(|doc| match parse_player(doc) {
                        Ok(player) => Some(player),
                        Err(e) => {
                            tracing::warn!(error = %e, "dropping unparseable player document");
                            None
                        }
                    })
                    .collect();
            }
        }
    }

    pub async fn matches(&self) -> Vec<MatchFact> {
        self.state.read().await.matches.clone()
    }

    pub async fn match_by_id(&self, id: MatchId) -> LeagueResult<MatchFact> {
        self.state
            .read()
            .await
            .matches
            .iter()
            .find(|m| m.id == id)
            .cloned()
            .ok_or(LeagueError::UnknownMatch(id))
    }

    pub async fn team_standings(&self) -> Vec<TeamStanding> {
        let state = self.state.read().await;
        compute_team_standings(&state.matches, &state.teams)
    }

    pub async fn player_standings(&self) -> Vec<PlayerStanding> {
        let state = self.state.read().await;
        compute_player_standings(&state.matches, &state.teams, &state.players)
    }

    /// Edit-session flex check against the stored match. Save itself stays
    /// always-permitted; callers that want the one-substitution rule (the
    /// report dialog, bulk imports) ask here first.
    pub async fn validate_lineup(
        &self,
        id: MatchId,
        lineup: &ProposedLineup,
    ) -> LeagueResult<()> {
        let m = self.match_by_id(id).await?;
        flex::validate_substitution(&m, lineup)?;
        Ok(())
    }

    /// Saves a report/edit. A failed store write propagates out with no
    /// local state applied; the snapshot only moves when the store pushes
    /// the post-write collection back.
    #[instrument(skip(self, request, reporter), fields(match_id = %id))]
    pub async fn save_report(
        &self,
        id: MatchId,
        request: &SaveRequest,
        reporter: &Reporter,
    ) -> LeagueResult<SaveOutcome> {
        let current = self.match_by_id(id).await?;

        let Some(patch) = plan_save(&current, request, reporter, Utc::now()) else {
            tracing::debug!("save changed nothing; skipping write");
            return Ok(SaveOutcome::NoChange);
        };

        let patch = serde_json::to_value(&patch).map_err(StoreError::from)?;
        self.store
            .merge_write(Collection::Matches, &id.to_string(), patch)
            .await?;

        Ok(SaveOutcome::Written)
    }

    /// Clears a reported result back to unplayed.
    #[instrument(skip(self, reporter), fields(match_id = %id))]
    pub async fn clear_report(
        &self,
        id: MatchId,
        reporter: &Reporter,
    ) -> LeagueResult<SaveOutcome> {
        let current = self.match_by_id(id).await?;

        let Some(patch) = plan_clear(&current, reporter, Utc::now()) else {
            tracing::debug!("match holds no score; nothing to clear");
            return Ok(SaveOutcome::NoChange);
        };

        let patch = serde_json::to_value(&patch).map_err(StoreError::from)?;
        self.store
            .merge_write(Collection::Matches, &id.to_string(), patch)
            .await?;

        Ok(SaveOutcome::Written)
    }

    /// Renames a player. Identity is the id, so history entries and rosters
    /// keep pointing at the same person.
    #[instrument(skip(self))]
    pub async fn rename_player(&self, id: &PlayerId, name: &str) -> LeagueResult<()> {
        self.store
            .merge_write(
                Collection::Players,
                &id.0,
                serde_json::json!({ "name": name }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::league::derive::compute_winner;
    use crate::league::model::GameRecord;
    use crate::league::seed;
    use crate::store::memory::MemoryStore;

    async fn seeded_service() -> Arc<LeagueService> {
        let store = Arc::new(MemoryStore::new());
        let season = seed::demo_season();
        seed::write_season(store.as_ref(), &season).await.unwrap();

        let service = LeagueService::new(store);
        service.refresh_all().await.unwrap();
        service
    }

    fn reporter() -> Reporter {
        Reporter {
            player_name: Some("Robin".to_string()),
            auth_id: Some("auth-9".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_report_flows_back_through_the_snapshot() {
        let service = seeded_service().await;
        let first = service.matches().await.into_iter().next().unwrap();

        let mut request = SaveRequest::current(&first);
        request.games = vec![GameRecord::new(11, 5), GameRecord::new(11, 9)];

        let outcome = service
            .save_report(first.id, &request, &reporter())
            .await
            .unwrap();
        assert_eq!(outcome, SaveOutcome::Written);

        // the service reads through the store snapshot, not a local cache
        service.refresh_all().await.unwrap();
        let reported = service.match_by_id(first.id).await.unwrap();
        assert_eq!(compute_winner(&reported), Some(reported.team_a.clone()));
        assert_eq!(reported.reported_by.as_deref(), Some("Robin"));
        assert_eq!(reported.history.len(), 1);

        let standings = service.team_standings().await;
        let winner_row = standings
            .iter()
            .find(|row| row.team_id == reported.team_a)
            .unwrap();
        assert_eq!(winner_row.wins, 1);
    }

    #[tokio::test]
    async fn test_noop_save_writes_nothing() {
        let service = seeded_service().await;
        let first = service.matches().await.into_iter().next().unwrap();

        let request = SaveRequest::current(&first);
        let outcome = service
            .save_report(first.id, &request, &reporter())
            .await
            .unwrap();

        assert_eq!(outcome, SaveOutcome::NoChange);
        service.refresh_all().await.unwrap();
        assert!(service.match_by_id(first.id).await.unwrap().history.is_empty());
    }

    #[tokio::test]
    async fn test_clear_round_trip() {
        let service = seeded_service().await;
        let first = service.matches().await.into_iter().next().unwrap();

        let mut request = SaveRequest::current(&first);
        request.games = vec![GameRecord::new(11, 5), GameRecord::new(11, 9)];
        service
            .save_report(first.id, &request, &reporter())
            .await
            .unwrap();
        service.refresh_all().await.unwrap();

        let outcome = service.clear_report(first.id, &reporter()).await.unwrap();
        assert_eq!(outcome, SaveOutcome::Written);

        service.refresh_all().await.unwrap();
        let cleared = service.match_by_id(first.id).await.unwrap();
        assert_eq!(compute_winner(&cleared), None);
        assert_eq!(cleared.reported_by, None);
        assert_eq!(cleared.reported_date, None);
        assert!(cleared.games.is_empty());
        assert_eq!(cleared.history.len(), 2);

        // clearing an already-clear match is a no-op
        let again = service.clear_report(first.id, &reporter()).await.unwrap();
        assert_eq!(again, SaveOutcome::NoChange);
    }

    #[tokio::test]
    async fn test_unknown_match_is_a_typed_error() {
        let service = seeded_service().await;
        match service.match_by_id(MatchId(9999)).await {
            Err(LeagueError::UnknownMatch(MatchId(9999))) => {}
            other => panic!("expected unknown match error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_rename_player_keeps_identity() {
        let service = seeded_service().await;
        let players = { service.state.read().await.players.clone() };
        let target = players.first().unwrap().clone();

        service.rename_player(&target.id, "New Name").await.unwrap();
        service.refresh_all().await.unwrap();

        let players = { service.state.read().await.players.clone() };
        let renamed = players.iter().find(|p| p.id == target.id).unwrap();
        assert_eq!(renamed.name, "New Name");

        let standings = service.player_standings().await;
        let row = standings.iter().find(|r| r.player_id == target.id).unwrap();
        assert_eq!(row.name, "New Name");
    }

    #[tokio::test]
    async fn test_validate_lineup_surfaces_flex_violation() {
        let service = seeded_service().await;
        let first = service.matches().await.into_iter().next().unwrap();

        let mut lineup = ProposedLineup::current(&first);
        lineup.p_a1 = "sub-1".into();
        lineup.p_a2 = "sub-2".into();

        match service.validate_lineup(first.id, &lineup).await {
            Err(LeagueError::Flex(FlexViolation::SecondSubstitution(_))) => {}
            other => panic!("expected flex violation, got {:?}", other),
        }
    }
}
