//! `nbp db status` and `nbp db migrate`.

use anyhow::Result;
use nbp_config::PlanConfig;

pub async fn db_status(cfg: &PlanConfig) -> Result<()> {
    let pool = nbp_db::connect_from_env_var(&cfg.database_url_env).await?;
    let s = nbp_db::status(&pool).await?;
    println!(
        "db_ok={} has_trading_days_table={}",
        s.ok, s.has_trading_days_table
    );
    Ok(())
}

pub async fn db_migrate(cfg: &PlanConfig) -> Result<()> {
    let pool = nbp_db::connect_from_env_var(&cfg.database_url_env).await?;
    nbp_db::migrate(&pool).await?;
    println!("migrations_applied=true");
    Ok(())
}
