use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgQueryResult;

use crate::database;

/// 股票主檔
#[derive(sqlx::FromRow, Debug, Clone, Default, Deserialize, Serialize)]
pub struct Stock {
    pub id: i64,
    /// 股票代號，例如 2330
    pub symbol: String,
    pub name: String,
    /// 產業別
    pub industry: String,
    /// 市場別 TSE、OTC
    pub market: String,
}

impl Stock {
    /// 以股票代號取得主檔，找不到時回傳 `None`
    pub async fn fetch_by_symbol(symbol: &str) -> Result<Option<Stock>> {
        let sql = r#"
SELECT
    id, symbol, name, industry, market
FROM stocks
WHERE symbol = $1;
"#;

        sqlx::query_as::<_, Stock>(sql)
            .bind(symbol)
            .fetch_optional(database::get_connection()?)
            .await
            .context(format!("Failed to Stock::fetch_by_symbol({}) from database", symbol))
    }

    /// 取得所有股票代號
    pub async fn fetch_symbols() -> Result<Vec<String>> {
        let sql = "SELECT symbol FROM stocks ORDER BY symbol;";

        sqlx::query_scalar::<_, String>(sql)
            .fetch_all(database::get_connection()?)
            .await
            .context("Failed to Stock::fetch_symbols() from database")
    }

    /// 以股票代號為鍵新增，已存在時更新名稱、產業別與市場別
    pub async fn upsert(&self) -> Result<PgQueryResult> {
        let sql = r#"
INSERT INTO stocks (symbol, name, industry, market)
VALUES ($1, $2, $3, $4)
ON CONFLICT (symbol) DO UPDATE SET
    name = EXCLUDED.name,
    industry = EXCLUDED.industry,
    market = EXCLUDED.market;
"#;

        sqlx::query(sql)
            .bind(&self.symbol)
            .bind(&self.name)
            .bind(&self.industry)
            .bind(&self.market)
            .execute(database::get_connection()?)
            .await
            .context(format!("Failed to Stock::upsert({}) from database", self.symbol))
    }
}

#[cfg(test)]
mod tests {
    use crate::logging;

    use super::*;

    #[tokio::test]
    #[ignore]
    async fn test_fetch_by_symbol() {
        dotenv::dotenv().ok();
        logging::debug_file_async("開始 Stock::fetch_by_symbol".to_string());

        match Stock::fetch_by_symbol("2330").await {
            Ok(stock) => logging::debug_file_async(format!("stock: {:#?}", stock)),
            Err(why) => logging::debug_file_async(format!("Failed to fetch_by_symbol because {:?}", why)),
        }

        logging::debug_file_async("結束 Stock::fetch_by_symbol".to_string());
    }
}
