//! Typed view of the effective config.
//!
//! Every key is optional; missing keys fall back to the Nobel rule set and
//! the 100-row realized plan. Present keys must have the right type.

use anyhow::{anyhow, bail, Context, Result};
use nbp_engine::{CompoundingMode, RuleSet};
use serde_json::Value;

pub const DEFAULT_ROWS: u32 = 100;
pub const DEFAULT_TRADER_ID: &str = "default";
pub const DEFAULT_DB_URL_ENV: &str = "NBP_DATABASE_URL";

#[derive(Debug, Clone, PartialEq)]
pub struct PlanConfig {
    pub rules: RuleSet,
    pub rows: u32,
    pub compounding: CompoundingMode,
    pub trader_id: String,
    /// NAME of the env var holding the database URL (never the URL itself).
    pub database_url_env: String,
    pub daemon_bind_addr: Option<String>,
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            rules: RuleSet::nobel(),
            rows: DEFAULT_ROWS,
            compounding: CompoundingMode::Realized,
            trader_id: DEFAULT_TRADER_ID.to_string(),
            database_url_env: DEFAULT_DB_URL_ENV.to_string(),
            daemon_bind_addr: None,
        }
    }
}

impl PlanConfig {
    pub fn from_config_json(v: &Value) -> Result<Self> {
        let d = RuleSet::nobel();
        let rules = RuleSet {
            profit_target_percent: f64_at(v, "/rules/profit_target_percent")?
                .unwrap_or(d.profit_target_percent),
            max_daily_profit: f64_at(v, "/rules/max_daily_profit")?.unwrap_or(d.max_daily_profit),
            capital_per_contract: f64_at(v, "/rules/capital_per_contract")?
                .unwrap_or(d.capital_per_contract),
            max_contracts: u32_at(v, "/rules/max_contracts")?.unwrap_or(d.max_contracts),
            min_contracts: u32_at(v, "/rules/min_contracts")?.unwrap_or(d.min_contracts),
            ops_per_day: u32_at(v, "/rules/ops_per_day")?.unwrap_or(d.ops_per_day),
            point_value: f64_at(v, "/rules/point_value")?.unwrap_or(d.point_value),
            cost_per_contract_op: f64_at(v, "/rules/cost_per_contract_op")?
                .unwrap_or(d.cost_per_contract_op),
            initial_capital: f64_at(v, "/rules/initial_capital")?.unwrap_or(d.initial_capital),
            safe_points_per_op: u32_at(v, "/rules/safe_points_per_op")?
                .unwrap_or(d.safe_points_per_op),
        };
        rules.validate().context("config /rules rejected")?;

        let rows = u32_at(v, "/plan/rows")?.unwrap_or(DEFAULT_ROWS);
        if rows == 0 {
            bail!("config /plan/rows must be >= 1");
        }

        let compounding = match str_at(v, "/plan/compounding")? {
            Some(s) => CompoundingMode::parse(s).context("config /plan/compounding rejected")?,
            None => CompoundingMode::default(),
        };

        let trader_id = str_at(v, "/plan/trader_id")?
            .unwrap_or(DEFAULT_TRADER_ID)
            .trim()
            .to_string();
        if trader_id.is_empty() {
            bail!("config /plan/trader_id must not be empty");
        }

        let database_url_env = str_at(v, "/database/url_env")?
            .unwrap_or(DEFAULT_DB_URL_ENV)
            .to_string();

        let daemon_bind_addr = str_at(v, "/daemon/bind_addr")?.map(str::to_string);

        Ok(Self {
            rules,
            rows,
            compounding,
            trader_id,
            database_url_env,
            daemon_bind_addr,
        })
    }
}

fn f64_at(v: &Value, ptr: &str) -> Result<Option<f64>> {
    match v.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(x) => x
            .as_f64()
            .map(Some)
            .ok_or_else(|| anyhow!("config {ptr} must be a number (got {x})")),
    }
}

fn u32_at(v: &Value, ptr: &str) -> Result<Option<u32>> {
    match v.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(x) => x
            .as_u64()
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| anyhow!("config {ptr} must be a non-negative integer (got {x})")),
    }
}

fn str_at<'a>(v: &'a Value, ptr: &str) -> Result<Option<&'a str>> {
    match v.pointer(ptr) {
        None | Some(Value::Null) => Ok(None),
        Some(x) => x
            .as_str()
            .map(Some)
            .ok_or_else(|| anyhow!("config {ptr} must be a string (got {x})")),
    }
}
