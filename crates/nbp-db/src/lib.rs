use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use nbp_engine::PlanRow;
use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Row};

mod store;

#[cfg(feature = "testkit")]
mod memory;

pub use store::{PgPlanStore, PlanStore};

#[cfg(feature = "testkit")]
pub use memory::MemoryPlanStore;

pub const ENV_DB_URL: &str = "NBP_DATABASE_URL";

/// Connect to Postgres using the URL held in env var `name`.
pub async fn connect_from_env_var(name: &str) -> Result<PgPool> {
    let url = std::env::var(name).with_context(|| format!("missing env var {name}"))?;

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&url)
        .await
        .context("failed to connect to Postgres")?;

    Ok(pool)
}

/// Run embedded SQLx migrations.
pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("db migrate failed")?;
    Ok(())
}

/// Simple status query (connectivity + schema presence).
pub async fn status(pool: &PgPool) -> Result<DbStatus> {
    let (one,): (i32,) = sqlx::query_as::<_, (i32,)>("select 1")
        .fetch_one(pool)
        .await
        .context("status connectivity query failed")?;

    let (exists,): (bool,) = sqlx::query_as::<_, (bool,)>(
        r#"
        select exists (
            select 1
            from information_schema.tables
            where table_schema='public' and table_name='trading_days'
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .context("status table-exists query failed")?;

    Ok(DbStatus {
        ok: one == 1,
        has_trading_days_table: exists,
    })
}

#[derive(Debug, Clone)]
pub struct DbStatus {
    pub ok: bool,
    pub has_trading_days_table: bool,
}

/// One persisted day of a trader's plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingDayRow {
    pub id: i64,
    pub trader_id: String,
    pub linha: i32,
    pub capital: f64,
    pub meta_liq: f64,
    pub contratos: i32,
    pub pts_por_op: i32,
    pub ops_por_dia: i32,
    pub total_pts: i32,
    pub lucro_liq: f64,
    pub gain_diario: f64,
    pub inc_total: f64,
    pub total_acum: f64,
    pub completado: bool,
    pub sentimento: Option<String>,
    pub notas: Option<String>,
    pub data_execucao: Option<DateTime<Utc>>,
    pub created_at_utc: DateTime<Utc>,
    pub updated_at_utc: DateTime<Utc>,
}

/// Execution annotation for one day. Financial columns are not reachable
/// through this type.
///
/// For `sentimento` and `notas`: `None` leaves the stored value unchanged,
/// `Some(None)` clears it, `Some(Some(v))` writes `v`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecutionUpdate {
    pub completado: bool,
    pub sentimento: Option<Option<String>>,
    pub notas: Option<Option<String>>,
}

impl ExecutionUpdate {
    /// `data_execucao` for this update: `now` when completed, cleared otherwise.
    pub fn data_execucao(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.completado.then_some(now)
    }
}

const SELECT_COLUMNS: &str = r#"
    id, trader_id, linha,
    capital, meta_liq, contratos, pts_por_op, ops_por_dia, total_pts,
    lucro_liq, gain_diario, inc_total, total_acum,
    completado, sentimento, notas, data_execucao,
    created_at_utc, updated_at_utc
"#;

fn row_to_trading_day(row: &PgRow) -> Result<TradingDayRow> {
    Ok(TradingDayRow {
        id: row.try_get("id")?,
        trader_id: row.try_get("trader_id")?,
        linha: row.try_get("linha")?,
        capital: row.try_get("capital")?,
        meta_liq: row.try_get("meta_liq")?,
        contratos: row.try_get("contratos")?,
        pts_por_op: row.try_get("pts_por_op")?,
        ops_por_dia: row.try_get("ops_por_dia")?,
        total_pts: row.try_get("total_pts")?,
        lucro_liq: row.try_get("lucro_liq")?,
        gain_diario: row.try_get("gain_diario")?,
        inc_total: row.try_get("inc_total")?,
        total_acum: row.try_get("total_acum")?,
        completado: row.try_get("completado")?,
        sentimento: row.try_get("sentimento")?,
        notas: row.try_get("notas")?,
        data_execucao: row.try_get("data_execucao")?,
        created_at_utc: row.try_get("created_at_utc")?,
        updated_at_utc: row.try_get("updated_at_utc")?,
    })
}

fn to_i32(v: u32, field: &str) -> Result<i32> {
    i32::try_from(v).with_context(|| format!("{field}={v} does not fit an integer column"))
}

/// Upsert generated rows for `trader_id` keyed by (trader_id, linha).
///
/// Runs in one transaction, in increasing linha order. Only the financial
/// columns are written on conflict, so re-seeding keeps completado/notes.
/// Returns the number of rows written.
pub async fn upsert_plan(pool: &PgPool, trader_id: &str, rows: &[PlanRow]) -> Result<usize> {
    let mut ordered: Vec<&PlanRow> = rows.iter().collect();
    ordered.sort_by_key(|r| r.linha);

    let mut tx = pool.begin().await.context("upsert_plan begin failed")?;

    for r in &ordered {
        sqlx::query(
            r#"
            insert into trading_days (
              trader_id, linha, capital, meta_liq, contratos, pts_por_op, ops_por_dia,
              total_pts, lucro_liq, gain_diario, inc_total, total_acum
            ) values (
              $1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12
            )
            on conflict (trader_id, linha) do update set
              capital = excluded.capital,
              meta_liq = excluded.meta_liq,
              contratos = excluded.contratos,
              pts_por_op = excluded.pts_por_op,
              ops_por_dia = excluded.ops_por_dia,
              total_pts = excluded.total_pts,
              lucro_liq = excluded.lucro_liq,
              gain_diario = excluded.gain_diario,
              inc_total = excluded.inc_total,
              total_acum = excluded.total_acum,
              updated_at_utc = now()
            "#,
        )
        .bind(trader_id)
        .bind(to_i32(r.linha, "linha")?)
        .bind(r.capital)
        .bind(r.meta_liq)
        .bind(to_i32(r.contratos, "contratos")?)
        .bind(to_i32(r.pts_por_op, "pts_por_op")?)
        .bind(to_i32(r.ops_por_dia, "ops_por_dia")?)
        .bind(to_i32(r.total_pts, "total_pts")?)
        .bind(r.lucro_liq)
        .bind(r.gain_diario)
        .bind(r.inc_total)
        .bind(r.total_acum)
        .execute(&mut *tx)
        .await
        .with_context(|| format!("upsert_plan failed at linha {}", r.linha))?;
    }

    tx.commit().await.context("upsert_plan commit failed")?;
    Ok(ordered.len())
}

/// All rows for `trader_id`, ordered by linha ascending.
pub async fn fetch_plan(pool: &PgPool, trader_id: &str) -> Result<Vec<TradingDayRow>> {
    let sql = format!("select {SELECT_COLUMNS} from trading_days where trader_id = $1 order by linha asc");
    let rows = sqlx::query(&sql)
        .bind(trader_id)
        .fetch_all(pool)
        .await
        .context("fetch_plan failed")?;

    rows.iter().map(row_to_trading_day).collect()
}

/// Record execution of a day. Returns `None` when `id` does not exist.
pub async fn update_execution(
    pool: &PgPool,
    id: i64,
    upd: &ExecutionUpdate,
    now: DateTime<Utc>,
) -> Result<Option<TradingDayRow>> {
    let sql = format!(
        r#"
        update trading_days
        set completado = $2,
            sentimento = case when $3 then $4 else sentimento end,
            notas = case when $5 then $6 else notas end,
            data_execucao = $7,
            updated_at_utc = now()
        where id = $1
        returning {SELECT_COLUMNS}
        "#
    );
    let row = sqlx::query(&sql)
        .bind(id)
        .bind(upd.completado)
        .bind(upd.sentimento.is_some())
        .bind(upd.sentimento.clone().flatten())
        .bind(upd.notas.is_some())
        .bind(upd.notas.clone().flatten())
        .bind(upd.data_execucao(now))
        .fetch_optional(pool)
        .await
        .context("update_execution failed")?;

    row.as_ref().map(row_to_trading_day).transpose()
}
