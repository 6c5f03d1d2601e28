//! Plan command handlers: `nbp plan seed`, `nbp plan show`, `nbp mission`.

use anyhow::{Context, Result};
use nbp_config::PlanConfig;
use nbp_engine::{calculate_mission, generate_plan, PlanRow};
use tracing::info;

/// Execute `nbp plan seed`: generate `cfg.rows` rows and upsert them.
///
/// With `dry_run` the rows are printed and the database is never opened.
pub async fn plan_seed(cfg: &PlanConfig, dry_run: bool) -> Result<()> {
    let rows = generate_plan(&cfg.rules, cfg.compounding, cfg.rows)
        .context("plan generation failed")?;

    if dry_run {
        print_header();
        for r in &rows {
            print_plan_row(r);
        }
    } else {
        let pool = nbp_db::connect_from_env_var(&cfg.database_url_env).await?;
        nbp_db::migrate(&pool).await?;
        let written = nbp_db::upsert_plan(&pool, &cfg.trader_id, &rows).await?;
        info!(trader_id = %cfg.trader_id, written, "plan seeded");
        println!("rows_written={}", written);
    }

    let last = rows.last().context("plan generation returned no rows")?;
    println!("seed_ok=true dry_run={}", dry_run);
    println!("trader_id={}", cfg.trader_id);
    println!("compounding={}", cfg.compounding.as_str());
    println!("rows={}", rows.len());
    println!("final_total_acum={:.2}", last.total_acum);
    println!("final_inc_total={:.2}", last.inc_total);
    Ok(())
}

/// Execute `nbp plan show`: print the stored plan for `cfg.trader_id`.
pub async fn plan_show(cfg: &PlanConfig) -> Result<()> {
    let pool = nbp_db::connect_from_env_var(&cfg.database_url_env).await?;
    let days = nbp_db::fetch_plan(&pool, &cfg.trader_id).await?;

    println!("linha\tcapital\tmeta_liq\tcontratos\tpts_por_op\ttotal_pts\tlucro_liq\ttotal_acum\tcompletado");
    for d in &days {
        println!(
            "{}\t{:.2}\t{:.2}\t{}\t{}\t{}\t{:.2}\t{:.2}\t{}",
            d.linha,
            d.capital,
            d.meta_liq,
            d.contratos,
            d.pts_por_op,
            d.total_pts,
            d.lucro_liq,
            d.total_acum,
            d.completado
        );
    }
    let done = days.iter().filter(|d| d.completado).count();
    println!("trader_id={} rows={} completed={}", cfg.trader_id, days.len(), done);
    Ok(())
}

/// Execute `nbp mission`: print the mission for `capital` as key=value lines.
pub fn mission(cfg: &PlanConfig, capital: f64) -> Result<()> {
    let m = calculate_mission(&cfg.rules, capital)?;
    println!("capital={}", capital);
    println!("target_profit={:.2}", m.target_profit);
    println!("suggested_contracts={}", m.suggested_contracts);
    println!("daily_costs={:.2}", m.daily_costs);
    println!("total_points_needed={}", m.total_points_needed);
    println!("points_per_op={}", m.points_per_op);
    println!("realized_profit={:.2}", m.realized_profit(&cfg.rules));
    println!("is_safe={}", m.is_safe);
    Ok(())
}

fn print_header() {
    println!("linha\tcapital\tmeta_liq\tcontratos\tpts_por_op\ttotal_pts\tlucro_liq\tgain_diario\tinc_total\ttotal_acum");
}

fn print_plan_row(r: &PlanRow) {
    println!(
        "{}\t{:.2}\t{:.2}\t{}\t{}\t{}\t{:.2}\t{:.2}\t{:.2}\t{:.2}",
        r.linha,
        r.capital,
        r.meta_liq,
        r.contratos,
        r.pts_por_op,
        r.total_pts,
        r.lucro_liq,
        r.gain_diario,
        r.inc_total,
        r.total_acum
    );
}
