//! In-process scenario tests for nbp-daemon HTTP endpoints.
//!
//! These tests spin up the Axum router **without** binding a TCP socket,
//! backed by `MemoryPlanStore`, and drive it via
//! `tower::ServiceExt::oneshot`. No network or database required.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use nbp_config::PlanConfig;
use nbp_daemon::{routes, state};
use nbp_db::{MemoryPlanStore, PlanStore};
use nbp_engine::{generate_plan, CompoundingMode, RuleSet};
use tower::ServiceExt; // oneshot

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Fresh state over a memory store seeded with `rows` days for "default".
async fn seeded_state(rows: u32) -> (Arc<state::AppState>, Arc<MemoryPlanStore>) {
    let store = Arc::new(MemoryPlanStore::new());
    if rows > 0 {
        let plan = generate_plan(&RuleSet::nobel(), CompoundingMode::Realized, rows).unwrap();
        store.upsert_plan("default", &plan).await.unwrap();
    }
    let st = Arc::new(state::AppState::new(
        store.clone() as Arc<dyn PlanStore>,
        &PlanConfig::default(),
    ));
    (st, store)
}

async fn call(router: axum::Router, req: Request<axum::body::Body>) -> (StatusCode, bytes::Bytes) {
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp
        .into_body()
        .collect()
        .await
        .expect("body collect failed")
        .to_bytes();
    (status, body)
}

fn parse_json(b: bytes::Bytes) -> serde_json::Value {
    serde_json::from_slice(&b).expect("body is not valid JSON")
}

fn get(uri: &str) -> Request<axum::body::Body> {
    Request::builder()
        .method("GET")
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<axum::body::Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(axum::body::Body::from(body.to_string()))
        .unwrap()
}

// ---------------------------------------------------------------------------
// GET /v1/health
// ---------------------------------------------------------------------------

#[tokio::test]
async fn health_returns_200_ok_true() {
    let (st, _) = seeded_state(0).await;
    let (status, body) = call(routes::build_router(st), get("/v1/health")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["ok"], true);
    assert_eq!(json["service"], "nbp-daemon");
}

// ---------------------------------------------------------------------------
// GET /v1/trading-plan
// ---------------------------------------------------------------------------

#[tokio::test]
async fn trading_plan_returns_rows_ordered_by_linha() {
    let (st, _) = seeded_state(100).await;
    let (status, body) = call(routes::build_router(st), get("/v1/trading-plan")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    let rows = json.as_array().expect("array body");
    assert_eq!(rows.len(), 100);
    for (i, r) in rows.iter().enumerate() {
        assert_eq!(r["linha"], i as i64 + 1);
    }
    assert_eq!(rows[0]["capital"], 500.0);
    assert_eq!(rows[0]["contratos"], 2);
    assert_eq!(rows[0]["completado"], false);
    assert!(rows[0]["dataExecucao"].is_null());
    assert!(rows[0]["totalAcum"].as_f64().unwrap() > 550.0);
}

#[tokio::test]
async fn trading_plan_for_unknown_trader_is_empty() {
    let (st, _) = seeded_state(5).await;
    let (status, body) =
        call(routes::build_router(st), get("/v1/trading-plan?trader_id=nobody")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(parse_json(body), serde_json::json!([]));
}

#[tokio::test]
async fn trading_plan_store_failure_is_500() {
    let (st, store) = seeded_state(5).await;
    store.set_unavailable(true);

    let (status, body) = call(routes::build_router(st), get("/v1/trading-plan")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    let json = parse_json(body);
    assert!(json["error"].as_str().unwrap().starts_with("DB_UNAVAILABLE"));
}

// ---------------------------------------------------------------------------
// GET /v1/trading-plan/missions
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missions_annotate_each_row_with_recomputed_plan() {
    let (st, _) = seeded_state(40).await;
    let (status, body) =
        call(routes::build_router(st), get("/v1/trading-plan/missions")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    let rows = json.as_array().unwrap();
    assert_eq!(rows.len(), 40);

    let first = &rows[0];
    assert_eq!(first["planoContratos"], 2);
    assert_eq!(first["planoTotalPts"], 132);
    assert_eq!(first["planoPtsPerOp"], 27);
    assert_eq!(first["planoIsSafe"], true);
    assert_eq!(first["gainPercent"], "10.06");

    // Recomputed plan agrees with what the seeder stored.
    for r in rows {
        assert_eq!(r["planoContratos"], r["contratos"]);
        assert_eq!(r["planoTotalPts"], r["totalPts"]);
        assert_eq!(r["planoPtsPerOp"], r["ptsPorOp"]);
        assert_eq!(r["planoMeta"], r["metaLiq"]);
    }
}

// ---------------------------------------------------------------------------
// POST /v1/trading-plan/update
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_marks_day_completed_and_stamps_time() {
    let (st, store) = seeded_state(3).await;
    let id = store.fetch_plan("default").await.unwrap()[1].id;

    let (status, body) = call(
        routes::build_router(Arc::clone(&st)),
        post_json(
            "/v1/trading-plan/update",
            serde_json::json!({
                "id": id,
                "completado": true,
                "sentimento": "confiante",
                "notas": "meta batida na terceira entrada"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["id"], id);
    assert_eq!(json["completado"], true);
    assert_eq!(json["sentimento"], "confiante");
    assert!(json["dataExecucao"].is_string());

    let stored = &store.fetch_plan("default").await.unwrap()[1];
    assert!(stored.completado);
    assert!(stored.data_execucao.is_some());
}

#[tokio::test]
async fn update_uncomplete_clears_time_and_keeps_financials() {
    let (st, store) = seeded_state(3).await;
    let before = store.fetch_plan("default").await.unwrap()[0].clone();

    for completado in [true, false] {
        let (status, _) = call(
            routes::build_router(Arc::clone(&st)),
            post_json(
                "/v1/trading-plan/update",
                serde_json::json!({ "id": before.id.to_string(), "completado": completado }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let after = store.fetch_plan("default").await.unwrap()[0].clone();
    assert!(!after.completado);
    assert!(after.data_execucao.is_none());
    assert_eq!(after.capital, before.capital);
    assert_eq!(after.lucro_liq, before.lucro_liq);
    assert_eq!(after.total_acum, before.total_acum);
}

#[tokio::test]
async fn update_null_notes_clear_and_absent_notes_keep() {
    let (st, store) = seeded_state(2).await;
    let id = store.fetch_plan("default").await.unwrap()[0].id;

    let steps = [
        serde_json::json!({ "id": id, "completado": true, "sentimento": "ansioso", "notas": "stop curto" }),
        serde_json::json!({ "id": id, "completado": true }),
        serde_json::json!({ "id": id, "completado": true, "sentimento": null, "notas": null }),
    ];
    let mut seen = Vec::new();
    for body in steps {
        let (status, resp) = call(
            routes::build_router(Arc::clone(&st)),
            post_json("/v1/trading-plan/update", body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        seen.push(parse_json(resp));
    }

    assert_eq!(seen[0]["notas"], "stop curto");
    assert_eq!(seen[1]["notas"], "stop curto");
    assert_eq!(seen[1]["sentimento"], "ansioso");
    assert!(seen[2]["notas"].is_null());
    assert!(seen[2]["sentimento"].is_null());

    let stored = &store.fetch_plan("default").await.unwrap()[0];
    assert_eq!(stored.notas, None);
    assert_eq!(stored.sentimento, None);
}

#[tokio::test]
async fn update_unknown_id_is_404() {
    let (st, _) = seeded_state(3).await;
    let (status, body) = call(
        routes::build_router(st),
        post_json(
            "/v1/trading-plan/update",
            serde_json::json!({ "id": 4242, "completado": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(parse_json(body)["error"]
        .as_str()
        .unwrap()
        .starts_with("NOT_FOUND"));
}

#[tokio::test]
async fn update_rejects_malformed_body() {
    let (st, _) = seeded_state(1).await;
    let (status, _) = call(
        routes::build_router(st),
        post_json(
            "/v1/trading-plan/update",
            serde_json::json!({ "id": "abc", "completado": true }),
        ),
    )
    .await;
    assert!(status.is_client_error(), "got {status}");
}

#[tokio::test]
async fn update_store_failure_is_500() {
    let (st, store) = seeded_state(1).await;
    store.set_unavailable(true);
    let (status, _) = call(
        routes::build_router(st),
        post_json(
            "/v1/trading-plan/update",
            serde_json::json!({ "id": 1, "completado": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn update_broadcasts_day_updated_on_bus() {
    let (st, store) = seeded_state(2).await;
    let id = store.fetch_plan("default").await.unwrap()[0].id;
    let mut rx = st.bus.subscribe();

    let (status, _) = call(
        routes::build_router(Arc::clone(&st)),
        post_json(
            "/v1/trading-plan/update",
            serde_json::json!({ "id": id, "completado": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    match rx.try_recv().expect("bus message") {
        state::BusMsg::DayUpdated {
            id: got,
            linha,
            completado,
            ..
        } => {
            assert_eq!(got, id);
            assert_eq!(linha, 1);
            assert!(completado);
        }
        other => panic!("unexpected bus message: {other:?}"),
    }
}

// ---------------------------------------------------------------------------
// GET /v1/mission
// ---------------------------------------------------------------------------

#[tokio::test]
async fn mission_for_capital_matches_engine() {
    let (st, _) = seeded_state(0).await;
    let (status, body) = call(routes::build_router(st), get("/v1/mission?capital=10000")).await;
    assert_eq!(status, StatusCode::OK);

    let json = parse_json(body);
    assert_eq!(json["suggestedContracts"], 20);
    assert_eq!(json["totalPointsNeeded"], 257);
    assert_eq!(json["pointsPerOp"], 52);
    assert_eq!(json["isSafe"], false);
    assert!(json["realizedProfit"].as_f64().unwrap() >= 1000.0);
}

#[tokio::test]
async fn mission_rejects_non_positive_capital() {
    let (st, _) = seeded_state(0).await;
    let (status, body) = call(routes::build_router(st), get("/v1/mission?capital=0")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(parse_json(body)["error"]
        .as_str()
        .unwrap()
        .starts_with("INVALID_CAPITAL"));
}
