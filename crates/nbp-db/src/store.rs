//! Storage seam between the HTTP/CLI surfaces and Postgres.
//!
//! Handlers depend on `dyn PlanStore` so router tests can run against the
//! in-memory implementation (feature `testkit`) without a database.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nbp_engine::PlanRow;
use sqlx::PgPool;

use crate::{ExecutionUpdate, TradingDayRow};

#[async_trait]
pub trait PlanStore: Send + Sync {
    /// All rows for `trader_id`, ordered by linha ascending.
    async fn fetch_plan(&self, trader_id: &str) -> Result<Vec<TradingDayRow>>;

    /// Apply an execution update. `Ok(None)` when `id` is unknown.
    async fn update_execution(
        &self,
        id: i64,
        upd: &ExecutionUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<TradingDayRow>>;

    /// Upsert generated rows keyed by (trader_id, linha). Returns rows written.
    async fn upsert_plan(&self, trader_id: &str, rows: &[PlanRow]) -> Result<usize>;
}

/// Postgres-backed store.
#[derive(Clone)]
pub struct PgPlanStore {
    pool: PgPool,
}

impl PgPlanStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PlanStore for PgPlanStore {
    async fn fetch_plan(&self, trader_id: &str) -> Result<Vec<TradingDayRow>> {
        crate::fetch_plan(&self.pool, trader_id).await
    }

    async fn update_execution(
        &self,
        id: i64,
        upd: &ExecutionUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<TradingDayRow>> {
        crate::update_execution(&self.pool, id, upd, now).await
    }

    async fn upsert_plan(&self, trader_id: &str, rows: &[PlanRow]) -> Result<usize> {
        crate::upsert_plan(&self.pool, trader_id, rows).await
    }
}
