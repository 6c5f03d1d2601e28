use crate::{CompoundingMode, Mission, MissionError, MissionView, PlanRow, RuleSet};

// ---------------------------------------------------------------------------
// Input guards
// ---------------------------------------------------------------------------

/// Guard: capital must be finite and strictly positive.
///
/// Zero, negative, NaN or infinite capital has no mission; the caller gets
/// `InvalidCapital` instead of a silently clamped answer.
fn validate_capital(capital: f64) -> Result<(), MissionError> {
    if !capital.is_finite() || capital <= 0.0 {
        return Err(MissionError::InvalidCapital(capital));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Mission
// ---------------------------------------------------------------------------

/// Compute the mission for one day at `current_capital`.
///
/// Step order is fixed; every step works on f64 in the same sequence so the
/// seeded plan reproduces bit-for-bit.
pub fn calculate_mission(rules: &RuleSet, current_capital: f64) -> Result<Mission, MissionError> {
    rules.validate()?;
    validate_capital(current_capital)?;

    // 1) Net target: percent of capital, capped.
    let target_profit =
        (current_capital * rules.profit_target_percent).min(rules.max_daily_profit);

    // 2) Contracts: ceil first, then clamp.
    let raw_contracts = (current_capital / rules.capital_per_contract).ceil();
    let suggested_contracts = raw_contracts
        .max(rules.min_contracts as f64)
        .min(rules.max_contracts as f64) as u32;

    // 3) Costs for the full day of operations.
    let daily_costs =
        (suggested_contracts as f64 * rules.ops_per_day as f64) * rules.cost_per_contract_op;

    // 4) Points to cover target + costs, rounded up so the target is never undershot.
    let raw_points =
        ((target_profit + daily_costs) / (suggested_contracts as f64 * rules.point_value)).ceil();
    if !raw_points.is_finite() || raw_points > u32::MAX as f64 {
        return Err(MissionError::InvalidRules(format!(
            "point target {raw_points} at capital {current_capital} exceeds {}; point_value too small",
            u32::MAX
        )));
    }
    let total_points_needed = raw_points as u32;

    // 5) Spread evenly over the day's operations.
    let points_per_op = total_points_needed.div_ceil(rules.ops_per_day);

    Ok(Mission {
        target_profit,
        suggested_contracts,
        points_per_op,
        total_points_needed,
        daily_costs,
        is_safe: points_per_op <= rules.safe_points_per_op,
    })
}

// ---------------------------------------------------------------------------
// Plan
// ---------------------------------------------------------------------------

/// Generate `rows` plan rows starting from `rules.initial_capital`.
///
/// Row `i + 1` starts from row `i`'s `total_acum`, so rows are produced
/// strictly in order.
pub fn generate_plan(
    rules: &RuleSet,
    mode: CompoundingMode,
    rows: u32,
) -> Result<Vec<PlanRow>, MissionError> {
    if rows == 0 {
        return Err(MissionError::EmptyPlan);
    }
    rules.validate()?;

    let initial = rules.initial_capital;
    let mut current_total = initial;
    let mut out = Vec::with_capacity(rows as usize);

    for linha in 1..=rows {
        let mission = calculate_mission(rules, current_total)?;

        let lucro_liq = match mode {
            CompoundingMode::Realized => mission.realized_profit(rules),
            CompoundingMode::Nominal => mission.target_profit,
        };
        let total_acum = current_total + lucro_liq;

        out.push(PlanRow {
            linha,
            capital: current_total,
            meta_liq: mission.target_profit,
            contratos: mission.suggested_contracts,
            pts_por_op: mission.points_per_op,
            ops_por_dia: rules.ops_per_day,
            total_pts: mission.total_points_needed,
            lucro_liq,
            gain_diario: (lucro_liq / current_total) * 100.0,
            inc_total: ((total_acum - initial) / initial) * 100.0,
            total_acum,
        });

        current_total = total_acum;
    }

    Ok(out)
}

// ---------------------------------------------------------------------------
// Read-path view
// ---------------------------------------------------------------------------

/// Recompute the mission for a stored row's capital and pair it with the
/// row's gain percentage.
pub fn annotate(rules: &RuleSet, capital: f64, lucro_liq: f64) -> Result<MissionView, MissionError> {
    let mission = calculate_mission(rules, capital)?;
    Ok(MissionView {
        plano_contratos: mission.suggested_contracts,
        plano_meta: mission.target_profit,
        plano_pts_per_op: mission.points_per_op,
        plano_total_pts: mission.total_points_needed,
        plano_is_safe: mission.is_safe,
        gain_percent: format!("{:.2}", (lucro_liq / capital) * 100.0),
    })
}
