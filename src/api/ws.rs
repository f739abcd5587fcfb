//! Live standings push.
//!
//! Every connected client receives a full standings+schedule snapshot
//! immediately on connect and again after every store change. Clients never
//! write over this socket; all mutations go through the REST routes.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::Response;
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::instrument;

use crate::api::server::AppState;
use crate::league::prelude::{MatchFact, PlayerStanding, TeamStanding};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct LivePayload {
    team_standings: Vec<TeamStanding>,
    player_standings: Vec<PlayerStanding>,
    matches: Vec<MatchFact>,
}

#[instrument(skip(state, ws))]
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| push_snapshots(socket, state))
}

async fn push_snapshots(mut socket: WebSocket, state: Arc<AppState>) {
    let mut changes = state.service.subscribe_changes();

    if send_snapshot(&mut socket, &state).await.is_err() {
        return;
    }

    loop {
        match changes.recv().await {
            Ok(()) => {
                if send_snapshot(&mut socket, &state).await.is_err() {
                    break;
                }
            }
            // missed ticks are fine: the next send carries full state anyway
            Err(RecvError::Lagged(skipped)) => {
                tracing::debug!(skipped, "ws client lagged behind change feed");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

async fn send_snapshot(
    socket: &mut WebSocket,
    state: &Arc<AppState>,
) -> core::result::Result<(), axum::Error> {
    let payload = LivePayload {
        team_standings: state.service.team_standings().await,
        player_standings: state.service.player_standings().await,
        matches: state.service.matches().await,
    };

    let text = match serde_json::to_string(&payload) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "could not serialize live payload");
            return Ok(());
        }
    };

    socket.send(Message::Text(text.into())).await
}
