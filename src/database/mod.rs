use std::time::Duration;

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;
use sqlx::{postgres::PgPoolOptions, PgPool, Postgres, Transaction};

use crate::config;

pub mod table;

static POSTGRES: OnceCell<PostgresSQL> = OnceCell::new();

/// PostgreSQL 連線池封裝。
///
/// 連線採 lazy 建立，第一次查詢時才真正連線。
pub struct PostgresSQL {
    pub pool: PgPool,
}

/// 提供 `COPY ... FROM STDIN` 所需的 CSV 序列化能力。
pub(super) trait CopyIn: Send {
    /// 將資料列轉成 PostgreSQL `COPY` 可接受的單行 CSV。
    fn to_csv(&self) -> String;
}

/// 在既有 transaction 內以 `COPY FROM STDIN` 批次寫入，與同一 transaction 的刪除一起生效。
///
/// # Errors
/// 當建立 copy writer、傳送資料或結束 copy 流程失敗時回傳錯誤。
pub(super) async fn copy_in_raw(
    tx: &mut Transaction<'_, Postgres>,
    copy_in_query: &str,
    items: &[impl CopyIn],
) -> Result<u64> {
    let data: String = items.iter().map(CopyIn::to_csv).collect();
    let mut writer = tx.copy_in_raw(copy_in_query).await?;

    writer.send(data.as_bytes()).await?;

    Ok(writer.finish().await?)
}

impl PostgresSQL {
    /// 建立 PostgreSQL 連線池，參數來自 `config::SETTINGS.postgresql`。
    pub fn new() -> Result<PostgresSQL> {
        let pg = &config::SETTINGS.postgresql;
        let database_url = format!(
            "postgres://{}:{}@{}:{}/{}?application_name=stock_fundamentals_rust",
            pg.user, pg.password, pg.host, pg.port, pg.db
        );
        let pool = PgPoolOptions::new()
            .max_lifetime(Some(Duration::from_secs(1800)))
            .max_connections(10)
            .min_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .idle_timeout(Some(Duration::from_secs(600)))
            .connect_lazy(&database_url)
            .with_context(|| format!("wrong database URL {}:{}/{}", pg.host, pg.port, pg.db))?;

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn get_postgresql() -> Result<&'static PostgresSQL> {
    POSTGRES.get_or_try_init(PostgresSQL::new)
}

/// 取得全域 PostgreSQL 連線池。
pub fn get_connection() -> Result<&'static PgPool> {
    Ok(get_postgresql()?.pool())
}

/// 從全域 PostgreSQL 連線池建立 transaction。
///
/// # Errors
/// 當無法成功建立 transaction 時回傳錯誤。
pub async fn get_tx() -> Result<Transaction<'static, Postgres>> {
    Ok(get_connection()?.begin().await?)
}
