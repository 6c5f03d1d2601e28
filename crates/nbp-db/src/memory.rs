//! In-memory `PlanStore` for tests. Same ordering, upsert and update rules
//! as the Postgres store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use nbp_engine::PlanRow;

use crate::{ExecutionUpdate, PlanStore, TradingDayRow};

#[derive(Default)]
struct Inner {
    next_id: i64,
    /// (trader_id, linha) -> row
    rows: BTreeMap<(String, i32), TradingDayRow>,
}

#[derive(Default)]
pub struct MemoryPlanStore {
    inner: Mutex<Inner>,
    unavailable: AtomicBool,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail, as a lost database connection would.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            bail!("memory store unavailable");
        }
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| anyhow!("memory store lock poisoned"))
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn fetch_plan(&self, trader_id: &str) -> Result<Vec<TradingDayRow>> {
        self.check_available()?;
        let inner = self.lock()?;
        // BTreeMap order is (trader_id, linha) ascending.
        Ok(inner
            .rows
            .values()
            .filter(|r| r.trader_id == trader_id)
            .cloned()
            .collect())
    }

    async fn update_execution(
        &self,
        id: i64,
        upd: &ExecutionUpdate,
        now: DateTime<Utc>,
    ) -> Result<Option<TradingDayRow>> {
        self.check_available()?;
        let mut inner = self.lock()?;
        let Some(row) = inner.rows.values_mut().find(|r| r.id == id) else {
            return Ok(None);
        };

        row.completado = upd.completado;
        if let Some(s) = &upd.sentimento {
            row.sentimento = s.clone();
        }
        if let Some(n) = &upd.notas {
            row.notas = n.clone();
        }
        row.data_execucao = upd.data_execucao(now);
        row.updated_at_utc = now;
        Ok(Some(row.clone()))
    }

    async fn upsert_plan(&self, trader_id: &str, rows: &[PlanRow]) -> Result<usize> {
        self.check_available()?;
        let mut inner = self.lock()?;
        let now = Utc::now();

        let mut ordered: Vec<&PlanRow> = rows.iter().collect();
        ordered.sort_by_key(|r| r.linha);

        for r in &ordered {
            let linha = i32::try_from(r.linha)?;
            let key = (trader_id.to_string(), linha);
            let existing = inner.rows.get(&key).cloned();
            let id = match &existing {
                Some(e) => e.id,
                None => {
                    inner.next_id += 1;
                    inner.next_id
                }
            };
            // Execution columns survive a re-seed.
            let (completado, sentimento, notas, data_execucao, created_at_utc) = match existing {
                Some(e) => (
                    e.completado,
                    e.sentimento,
                    e.notas,
                    e.data_execucao,
                    e.created_at_utc,
                ),
                None => (false, None, None, None, now),
            };

            inner.rows.insert(
                key,
                TradingDayRow {
                    id,
                    trader_id: trader_id.to_string(),
                    linha,
                    capital: r.capital,
                    meta_liq: r.meta_liq,
                    contratos: i32::try_from(r.contratos)?,
                    pts_por_op: i32::try_from(r.pts_por_op)?,
                    ops_por_dia: i32::try_from(r.ops_por_dia)?,
                    total_pts: i32::try_from(r.total_pts)?,
                    lucro_liq: r.lucro_liq,
                    gain_diario: r.gain_diario,
                    inc_total: r.inc_total,
                    total_acum: r.total_acum,
                    completado,
                    sentimento,
                    notas,
                    data_execucao,
                    created_at_utc,
                    updated_at_utc: now,
                },
            );
        }

        Ok(ordered.len())
    }
}
