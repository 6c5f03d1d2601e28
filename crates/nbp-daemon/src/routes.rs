//! Axum router and all HTTP handlers for nbp-daemon.
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! middleware layers.  Tests compose the bare router directly.

use std::{convert::Infallible, sync::Arc};

use axum::{
    extract::{Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use futures_util::{Stream, StreamExt};
use nbp_db::ExecutionUpdate;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::{error, info, warn};

use crate::{
    api_types::{
        ErrorResponse, HealthResponse, MissionQuery, MissionResponse, PlanQuery,
        TradingDayWithMission, UpdateDayRequest,
    },
    state::{AppState, BusMsg},
};

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the complete application router wired to the given shared state.
///
/// Middleware layers (CORS, tracing) are **not** applied here; `main.rs`
/// attaches them after this call so tests can use the bare router.
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/v1/health", get(health))
        .route("/v1/trading-plan", get(trading_plan))
        .route("/v1/trading-plan/missions", get(trading_plan_missions))
        .route("/v1/trading-plan/update", post(trading_plan_update))
        .route("/v1/mission", get(mission))
        .route("/v1/stream", get(stream))
        .with_state(state)
}

fn error_response(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(ErrorResponse { error: msg.into() })).into_response()
}

/// Store failures surface as a generic 500; the cause goes to the log only.
fn store_unavailable(op: &str, err: anyhow::Error) -> Response {
    error!(op, error = %format!("{err:#}"), "plan store failure");
    error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        "DB_UNAVAILABLE: failed to reach the plan store",
    )
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

pub(crate) async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            ok: true,
            service: st.build.service.to_string(),
            version: st.build.version.to_string(),
        }),
    )
}

// ---------------------------------------------------------------------------
// GET /v1/trading-plan
// ---------------------------------------------------------------------------

/// Stored rows, ordered by linha.
pub(crate) async fn trading_plan(
    State(st): State<Arc<AppState>>,
    Query(q): Query<PlanQuery>,
) -> Response {
    let trader_id = st.trader_or_default(q.trader_id.as_deref());
    match st.store.fetch_plan(&trader_id).await {
        Ok(rows) => (StatusCode::OK, Json(rows)).into_response(),
        Err(e) => store_unavailable("fetch_plan", e),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/trading-plan/missions
// ---------------------------------------------------------------------------

/// Stored rows annotated with the mission recomputed from each row's capital.
pub(crate) async fn trading_plan_missions(
    State(st): State<Arc<AppState>>,
    Query(q): Query<PlanQuery>,
) -> Response {
    let trader_id = st.trader_or_default(q.trader_id.as_deref());
    let rows = match st.store.fetch_plan(&trader_id).await {
        Ok(rows) => rows,
        Err(e) => return store_unavailable("fetch_plan", e),
    };

    let mut out = Vec::with_capacity(rows.len());
    for day in rows {
        match nbp_engine::annotate(&st.rules, day.capital, day.lucro_liq) {
            Ok(plan) => out.push(TradingDayWithMission { day, plan }),
            Err(e) => {
                error!(id = day.id, linha = day.linha, error = %e, "stored row has no mission");
                return error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string());
            }
        }
    }

    (StatusCode::OK, Json(out)).into_response()
}

// ---------------------------------------------------------------------------
// POST /v1/trading-plan/update
// ---------------------------------------------------------------------------

/// Record execution of one day. Financial columns are never written here.
pub(crate) async fn trading_plan_update(
    State(st): State<Arc<AppState>>,
    Json(req): Json<UpdateDayRequest>,
) -> Response {
    let upd = ExecutionUpdate {
        completado: req.completado,
        sentimento: req.sentimento,
        notas: req.notas,
    };

    let updated = match st.store.update_execution(req.id, &upd, Utc::now()).await {
        Ok(Some(row)) => row,
        Ok(None) => {
            warn!(id = req.id, "trading-plan/update: unknown id");
            return error_response(
                StatusCode::NOT_FOUND,
                format!("NOT_FOUND: no trading day with id {}", req.id),
            );
        }
        Err(e) => return store_unavailable("update_execution", e),
    };

    info!(
        id = updated.id,
        linha = updated.linha,
        completado = updated.completado,
        "trading-plan/update"
    );
    let _ = st.bus.send(BusMsg::DayUpdated {
        id: updated.id,
        trader_id: updated.trader_id.clone(),
        linha: updated.linha,
        completado: updated.completado,
    });

    (StatusCode::OK, Json(updated)).into_response()
}

// ---------------------------------------------------------------------------
// GET /v1/mission
// ---------------------------------------------------------------------------

/// Mission for an arbitrary capital under the daemon's rules.
pub(crate) async fn mission(
    State(st): State<Arc<AppState>>,
    Query(q): Query<MissionQuery>,
) -> Response {
    match nbp_engine::calculate_mission(&st.rules, q.capital) {
        Ok(m) => {
            let realized_profit = m.realized_profit(&st.rules);
            (
                StatusCode::OK,
                Json(MissionResponse {
                    capital: q.capital,
                    mission: m,
                    realized_profit,
                }),
            )
                .into_response()
        }
        Err(e) => error_response(StatusCode::BAD_REQUEST, e.to_string()),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/stream  (SSE)
// ---------------------------------------------------------------------------

pub(crate) async fn stream(State(st): State<Arc<AppState>>) -> Response {
    let mut headers = HeaderMap::new();
    headers.insert("Cache-Control", HeaderValue::from_static("no-cache"));
    headers.insert("Connection", HeaderValue::from_static("keep-alive"));

    let rx = st.bus.subscribe();
    let events = broadcast_to_sse(rx);

    (headers, Sse::new(events).keep_alive(KeepAlive::new())).into_response()
}

fn broadcast_to_sse(
    rx: broadcast::Receiver<BusMsg>,
) -> impl Stream<Item = Result<Event, Infallible>> {
    BroadcastStream::new(rx).filter_map(|msg| async move {
        match msg {
            Ok(m) => {
                let data = serde_json::to_string(&m).ok()?;
                Some(Ok(Event::default().event(m.event_name()).data(data)))
            }
            Err(_) => None, // lagged / closed
        }
    })
}
