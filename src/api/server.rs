use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::{MatchedPath, Request};
use axum::middleware::{Next, from_fn};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use http::StatusCode;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::instrument;

use crate::api::handler::*;
use crate::api::ws::ws_handler;
use crate::league::flex::FlexViolation;
use crate::league::prelude::{LeagueError, LeagueService};
use crate::store::StoreError;

pub type JsonResult<T> = core::result::Result<Json<T>, RouteError>;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<LeagueService>,
}

#[instrument(skip(service, tx))]
pub async fn router(service: Arc<LeagueService>, port: u16, tx: UnboundedSender<SocketAddr>) {
    let state = Arc::new(AppState { service });

    let app = Router::new()
        //
        // standings (always derived fresh from the live snapshot)
        .route("/standings/teams", get(team_standings))
        .route("/standings/players", get(player_standings))
        //
        // match schedule and mutations
        .route("/matches", get(all_matches))
        .route("/matches/{id}", get(match_by_id))
        .route("/matches/{id}/report", post(report_match))
        .route("/matches/{id}/clear", post(clear_match))
        .route("/matches/{id}/validate-lineup", post(validate_lineup))
        //
        // player admin
        .route("/players/{id}/rename", post(rename_player))
        //
        // live push
        .route("/ws", get(ws_handler))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &axum::http::Request<_>| {
                let method = req.method();
                let uri = req.uri();

                let matched_path = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|matched| matched.as_str());

                tracing::debug_span!("api_request", ?method, ?uri, ?matched_path)
            }),
        )
        .layer(from_fn(log_route_errors))
        .with_state(state);

    let socket_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)), port);
    let listener = tokio::net::TcpListener::bind(socket_addr).await.unwrap();

    tx.send(socket_addr).unwrap();
    axum::serve(listener, app).await.unwrap()
}

/// Route-level error trace hook: handlers attach their error to the response
/// extensions, this layer logs it once.
#[instrument(skip(request, next), fields(uri = request.uri().to_string()))]
async fn log_route_errors(request: Request, next: Next) -> Response {
    let res = next.run(request).await;
    if let Some(err) = res.extensions().get::<Arc<RouteError>>() {
        tracing::error!(error = ?err, "error occurred inside route handler");
    }

    res
}

#[instrument(skip(service))]
pub async fn start_server(
    service: Arc<LeagueService>,
    port: u16,
) -> Result<Vec<JoinHandle<()>>, RouteError> {
    tracing::info!("starting api server");

    let (tx_ready, mut rx_ready) = tokio::sync::mpsc::unbounded_channel::<SocketAddr>();

    let server_handle = tokio::task::spawn(async move {
        router(service, port, tx_ready).await;
    });

    let logging_handle = tokio::task::spawn(async move {
        if let Some(addr) = rx_ready.recv().await {
            tracing::info!(
                server_url = &format!("http://127.0.0.1:{}", addr.port()),
                "server ready"
            );
        }
    });

    Ok(vec![server_handle, logging_handle])
}

#[derive(Debug, Error)]
pub enum RouteError {
    #[error(transparent)]
    League(#[from] LeagueError),

    #[error("invalid match id '{0}'")]
    InvalidMatchId(String),

    #[error("player name must not be empty")]
    EmptyPlayerName,
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            message: String,
        }

        let (status, message, err) = match &self {
            RouteError::League(LeagueError::UnknownMatch(id)) => (
                StatusCode::NOT_FOUND,
                format!("match {id} is not part of the season schedule"),
                None,
            ),

            // a tripped substitution rule is a client-state problem, not a
            // server fault
            RouteError::League(LeagueError::Flex(FlexViolation::SecondSubstitution(side))) => (
                StatusCode::CONFLICT,
                format!("{side} has already substituted a player for this match"),
                None,
            ),

            RouteError::League(LeagueError::Store(StoreError::NotFound(id))) => {
                (StatusCode::NOT_FOUND, format!("document '{id}' not found"), None)
            }

            RouteError::League(LeagueError::Store(err)) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                err.to_string(),
                Some(self),
            ),

            RouteError::InvalidMatchId(raw) => (
                StatusCode::BAD_REQUEST,
                format!("invalid match id '{raw}'"),
                None,
            ),

            RouteError::EmptyPlayerName => (
                StatusCode::BAD_REQUEST,
                String::from("player name must not be empty"),
                None,
            ),
        };

        let mut response = (status, Json(ErrorResponse { message })).into_response();
        if let Some(err) = err {
            response.extensions_mut().insert(Arc::new(err));
        }

        response
    }
}
