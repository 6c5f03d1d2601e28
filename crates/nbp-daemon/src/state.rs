//! Shared runtime state for nbp-daemon.
//!
//! Handlers receive `State<Arc<AppState>>` from Axum; this module owns
//! nothing async itself apart from the heartbeat task.

use std::sync::Arc;
use std::time::Duration;

use nbp_config::PlanConfig;
use nbp_db::PlanStore;
use nbp_engine::RuleSet;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// BusMsg: SSE event bus payload
// ---------------------------------------------------------------------------

/// Messages broadcast over the internal event bus and surfaced as SSE events.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BusMsg {
    Heartbeat {
        ts_millis: i64,
    },
    DayUpdated {
        id: i64,
        trader_id: String,
        linha: i32,
        completado: bool,
    },
}

impl BusMsg {
    pub fn event_name(&self) -> &'static str {
        match self {
            BusMsg::Heartbeat { .. } => "heartbeat",
            BusMsg::DayUpdated { .. } => "day_updated",
        }
    }
}

// ---------------------------------------------------------------------------
// BuildInfo
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Serialize)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// Cloneable (Arc) handle shared across all Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Broadcast bus for SSE.
    pub bus: broadcast::Sender<BusMsg>,
    pub build: BuildInfo,
    /// Persistence for trading days.
    pub store: Arc<dyn PlanStore>,
    /// Rules used to recompute missions on read.
    pub rules: RuleSet,
    /// Trader served when a request names none.
    pub default_trader_id: String,
}

impl AppState {
    pub fn new(store: Arc<dyn PlanStore>, cfg: &PlanConfig) -> Self {
        let (bus, _rx) = broadcast::channel::<BusMsg>(1024);

        Self {
            bus,
            build: BuildInfo {
                service: "nbp-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            store,
            rules: cfg.rules.clone(),
            default_trader_id: cfg.trader_id.clone(),
        }
    }

    /// Resolve an optional `trader_id` query value against the default.
    pub fn trader_or_default(&self, requested: Option<&str>) -> String {
        requested
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(&self.default_trader_id)
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Spawn a background task that emits a heartbeat SSE every `interval`.
pub fn spawn_heartbeat(bus: broadcast::Sender<BusMsg>, interval: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            let ts = chrono::Utc::now().timestamp_millis();
            let _ = bus.send(BusMsg::Heartbeat { ts_millis: ts });
        }
    });
}
