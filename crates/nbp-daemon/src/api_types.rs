//! Request and response types for all nbp-daemon HTTP endpoints.
//!
//! These types are `Serialize + Deserialize` so they can be JSON-encoded
//! by Axum and decoded by tests.  No business logic lives here.

use nbp_db::TradingDayRow;
use nbp_engine::{Mission, MissionView};
use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// /v1/health
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub service: String,
    pub version: String,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Body of every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

// ---------------------------------------------------------------------------
// /v1/trading-plan
// ---------------------------------------------------------------------------

/// `?trader_id=` on the plan read endpoints. Absent = the configured trader.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanQuery {
    pub trader_id: Option<String>,
}

/// A stored day plus the mission recomputed from its capital.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingDayWithMission {
    #[serde(flatten)]
    pub day: TradingDayRow,
    #[serde(flatten)]
    pub plan: MissionView,
}

// ---------------------------------------------------------------------------
// /v1/trading-plan/update
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateDayRequest {
    /// Row id. Accepts a JSON number or a numeric string.
    #[serde(deserialize_with = "id_from_number_or_string")]
    pub id: i64,
    pub completado: bool,
    /// Absent = keep, `null` = clear.
    #[serde(default, deserialize_with = "present")]
    pub sentimento: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub notas: Option<Option<String>>,
}

/// Only called when the key is present, so `null` becomes `Some(None)`.
fn present<'de, D>(d: D) -> Result<Option<Option<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(d).map(Some)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IdRepr {
    Num(i64),
    Str(String),
}

fn id_from_number_or_string<'de, D>(d: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match IdRepr::deserialize(d)? {
        IdRepr::Num(n) => Ok(n),
        IdRepr::Str(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|_| serde::de::Error::custom(format!("invalid id: {s:?}"))),
    }
}

// ---------------------------------------------------------------------------
// /v1/mission
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MissionQuery {
    pub capital: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionResponse {
    pub capital: f64,
    #[serde(flatten)]
    pub mission: Mission,
    pub realized_profit: f64,
}
