use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Trading rules the plan is computed under.
///
/// Immutable once built; every calculation takes it by reference so tests can
/// run alternate rule sets side by side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleSet {
    /// Daily net profit target as a fraction of capital (0.10 = 10%).
    pub profit_target_percent: f64,
    /// Ceiling on the daily net profit target, in currency.
    pub max_daily_profit: f64,
    /// Capital backing one contract.
    pub capital_per_contract: f64,
    pub max_contracts: u32,
    pub min_contracts: u32,
    /// Operations (entries) per trading day.
    pub ops_per_day: u32,
    /// Currency per point per contract.
    pub point_value: f64,
    /// Cost per contract per operation.
    pub cost_per_contract_op: f64,
    /// Capital the plan starts from (row 1).
    pub initial_capital: f64,
    /// Missions needing more points per operation than this are flagged unsafe.
    pub safe_points_per_op: u32,
}

impl RuleSet {
    /// The Nobel rule set: 10%/day capped at 1000, one contract per 500,
    /// 2..=21 contracts, 5 operations, 0.20 per point, 0.25 cost.
    pub fn nobel() -> Self {
        Self {
            profit_target_percent: 0.10,
            max_daily_profit: 1000.0,
            capital_per_contract: 500.0,
            max_contracts: 21,
            min_contracts: 2,
            ops_per_day: 5,
            point_value: 0.20,
            cost_per_contract_op: 0.25,
            initial_capital: 500.0,
            safe_points_per_op: 50,
        }
    }

    pub fn validate(&self) -> Result<(), MissionError> {
        let positive = [
            ("max_daily_profit", self.max_daily_profit),
            ("capital_per_contract", self.capital_per_contract),
            ("point_value", self.point_value),
            ("initial_capital", self.initial_capital),
        ];
        for (name, v) in positive {
            if !v.is_finite() || v <= 0.0 {
                return Err(MissionError::InvalidRules(format!(
                    "{name} must be finite and > 0 (got {v})"
                )));
            }
        }

        let non_negative = [
            ("profit_target_percent", self.profit_target_percent),
            ("cost_per_contract_op", self.cost_per_contract_op),
        ];
        for (name, v) in non_negative {
            if !v.is_finite() || v < 0.0 {
                return Err(MissionError::InvalidRules(format!(
                    "{name} must be finite and >= 0 (got {v})"
                )));
            }
        }

        if self.ops_per_day == 0 {
            return Err(MissionError::InvalidRules(
                "ops_per_day must be >= 1".to_string(),
            ));
        }
        if self.min_contracts == 0 {
            return Err(MissionError::InvalidRules(
                "min_contracts must be >= 1".to_string(),
            ));
        }
        if self.min_contracts > self.max_contracts {
            return Err(MissionError::InvalidRules(format!(
                "min_contracts ({}) > max_contracts ({})",
                self.min_contracts, self.max_contracts
            )));
        }
        Ok(())
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::nobel()
    }
}

/// Recommended trading mission for one day at a given capital.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub target_profit: f64,
    pub suggested_contracts: u32,
    pub points_per_op: u32,
    pub total_points_needed: u32,
    pub daily_costs: f64,
    pub is_safe: bool,
}

impl Mission {
    /// Net profit implied by hitting `total_points_needed` exactly.
    ///
    /// Never below `target_profit`: the point target is rounded up.
    pub fn realized_profit(&self, rules: &RuleSet) -> f64 {
        (self.suggested_contracts as f64 * self.total_points_needed as f64) * rules.point_value
            - self.daily_costs
    }
}

/// How the plan advances capital from one row to the next.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompoundingMode {
    /// Advance by the profit implied by the rounded-up point target.
    #[default]
    Realized,
    /// Advance by the nominal (capped) target profit. Compounds slower.
    Nominal,
}

impl CompoundingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompoundingMode::Realized => "realized",
            CompoundingMode::Nominal => "nominal",
        }
    }

    pub fn parse(s: &str) -> Result<Self, MissionError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "realized" => Ok(CompoundingMode::Realized),
            "nominal" => Ok(CompoundingMode::Nominal),
            other => Err(MissionError::InvalidRules(format!(
                "invalid compounding mode '{other}'. expected one of: realized | nominal"
            ))),
        }
    }
}

/// Computed numbers for one day (linha) of the plan.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanRow {
    /// 1-based day index.
    pub linha: u32,
    /// Capital entering the day.
    pub capital: f64,
    /// Net profit target.
    pub meta_liq: f64,
    pub contratos: u32,
    pub pts_por_op: u32,
    pub ops_por_dia: u32,
    pub total_pts: u32,
    /// Net profit credited to the day (depends on the compounding mode).
    pub lucro_liq: f64,
    /// Day gain, percent of capital.
    pub gain_diario: f64,
    /// Cumulative gain since the initial capital, percent.
    pub inc_total: f64,
    /// Capital after the day.
    pub total_acum: f64,
}

/// Plan targets recomputed from a stored row's capital.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissionView {
    pub plano_contratos: u32,
    pub plano_meta: f64,
    pub plano_pts_per_op: u32,
    pub plano_total_pts: u32,
    pub plano_is_safe: bool,
    /// `lucro_liq / capital * 100`, two decimals.
    pub gain_percent: String,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum MissionError {
    #[error("INVALID_CAPITAL: capital must be finite and > 0 (got {0})")]
    InvalidCapital(f64),

    #[error("INVALID_RULES: {0}")]
    InvalidRules(String),

    #[error("EMPTY_PLAN: row count must be >= 1")]
    EmptyPlan,
}
