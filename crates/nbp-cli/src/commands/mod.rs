//! Command handler modules for nbp-cli.
//!
//! Shared config helpers live here; command-specific logic lives in the
//! submodules.

pub mod db;
pub mod plan;

use anyhow::{bail, Result};
use nbp_config::{PlanConfig, UnusedKeyPolicy};
use nbp_engine::CompoundingMode;
use tracing::{info, warn};

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

/// Load layered config, or the built-in Nobel defaults when no path is given.
pub fn load_plan_config(paths: &[String]) -> Result<PlanConfig> {
    if paths.is_empty() {
        return Ok(PlanConfig::default());
    }

    let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
    let loaded = nbp_config::load_layered_yaml(&path_refs)?;
    let report = nbp_config::report_unused_keys(&loaded.config_json, UnusedKeyPolicy::Warn)?;
    for ptr in &report.unused_leaf_pointers {
        warn!(pointer = %ptr, "unused config key");
    }
    info!(config_hash = %loaded.config_hash, "config loaded");

    PlanConfig::from_config_json(&loaded.config_json)
}

/// Apply command-line overrides on top of the loaded config.
pub fn apply_overrides(
    mut cfg: PlanConfig,
    trader_id: Option<String>,
    rows: Option<u32>,
    compounding: Option<String>,
) -> Result<PlanConfig> {
    if let Some(t) = trader_id {
        let t = t.trim();
        if t.is_empty() {
            bail!("--trader-id must not be empty");
        }
        cfg.trader_id = t.to_string();
    }
    if let Some(n) = rows {
        if n == 0 {
            bail!("--rows must be >= 1");
        }
        cfg.rows = n;
    }
    if let Some(c) = compounding {
        cfg.compounding = CompoundingMode::parse(&c)?;
    }
    Ok(cfg)
}
