use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::api::server::{AppState, JsonResult, RouteError};
use crate::league::flex::ProposedLineup;
use crate::league::prelude::{
    MatchFact, MatchId, PlayerId, PlayerStanding, Reporter, SaveOutcome, SaveRequest,
    TeamStanding,
};

fn parse_match_id(raw: &str) -> Result<MatchId, RouteError> {
    raw.trim()
        .parse::<u32>()
        .map(MatchId)
        .map_err(|_| RouteError::InvalidMatchId(raw.to_string()))
}

#[instrument(skip(state))]
pub async fn team_standings(State(state): State<Arc<AppState>>) -> JsonResult<Vec<TeamStanding>> {
    Ok(Json(state.service.team_standings().await))
}

#[instrument(skip(state))]
pub async fn player_standings(
    State(state): State<Arc<AppState>>,
) -> JsonResult<Vec<PlayerStanding>> {
    Ok(Json(state.service.player_standings().await))
}

#[instrument(skip(state))]
pub async fn all_matches(State(state): State<Arc<AppState>>) -> JsonResult<Vec<MatchFact>> {
    Ok(Json(state.service.matches().await))
}

#[instrument(skip(state))]
pub async fn match_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> JsonResult<MatchFact> {
    let id = parse_match_id(&id)?;
    Ok(Json(state.service.match_by_id(id).await?))
}

/// Body of a report/edit: the requested end state plus who is saving.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportBody {
    #[serde(flatten)]
    pub request: SaveRequest,
    #[serde(default)]
    pub reporter: Reporter,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    pub outcome: SaveOutcome,
}

#[instrument(skip(state, body))]
pub async fn report_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ReportBody>,
) -> JsonResult<MutationResponse> {
    let id = parse_match_id(&id)?;
    let outcome = state
        .service
        .save_report(id, &body.request, &body.reporter)
        .await?;

    Ok(Json(MutationResponse { outcome }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearBody {
    #[serde(default)]
    pub reporter: Reporter,
}

#[instrument(skip(state, body))]
pub async fn clear_match(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ClearBody>,
) -> JsonResult<MutationResponse> {
    let id = parse_match_id(&id)?;
    let outcome = state.service.clear_report(id, &body.reporter).await?;

    Ok(Json(MutationResponse { outcome }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupVerdict {
    pub ok: bool,
}

/// Pre-flight substitution check for edit sessions and bulk importers.
#[instrument(skip(state, lineup))]
pub async fn validate_lineup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(lineup): Json<ProposedLineup>,
) -> JsonResult<LineupVerdict> {
    let id = parse_match_id(&id)?;
    state.service.validate_lineup(id, &lineup).await?;

    Ok(Json(LineupVerdict { ok: true }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameBody {
    pub name: String,
}

#[instrument(skip(state, body))]
pub async fn rename_player(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RenameBody>,
) -> JsonResult<MutationResponse> {
    let name = body.name.trim();
    if name.is_empty() {
        return Err(RouteError::EmptyPlayerName);
    }

    state
        .service
        .rename_player(&PlayerId(id), name)
        .await?;

    Ok(Json(MutationResponse {
        outcome: SaveOutcome::Written,
    }))
}
