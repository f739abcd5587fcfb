pub mod derive;
pub mod flex;
pub mod model;
pub mod mutate;
pub mod seed;
pub mod service;
pub mod standings;

pub mod prelude {
    pub use crate::league::derive::{
        compute_score, compute_winner, is_team_a_flexed, is_team_b_flexed, match_state,
    };
    pub use crate::league::flex::{
        FlexViolation, ProposedLineup, Side, Slot, validate_substitution,
    };
    pub use crate::league::model::{
        GameRecord, HistoryEntry, MatchFact, MatchId, MatchPatch, Player, PlayerId,
        PlayerStanding, Team, TeamId, TeamStanding,
    };
    pub use crate::league::mutate::{Reporter, SaveRequest};
    pub use crate::league::service::{LeagueError, LeagueResult, LeagueService, SaveOutcome};
    pub use crate::league::standings::{compute_player_standings, compute_team_standings};
}
