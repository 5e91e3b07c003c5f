use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Local, NaiveDate};
use rust_decimal::Decimal;
use sqlx::{postgres::PgRow, Row};

use crate::{
    calculation::period::RawObservation,
    database::{self, CopyIn},
    declare::Dataset,
    logging,
};

/// finmind_raw_data 的資料列，未經任何換算
#[derive(Debug, Clone)]
pub struct FinMindRawData {
    pub stock_id: i64,
    /// FinMind 資料集名稱，例如 TaiwanStockBalanceSheet
    pub dataset: String,
    pub date: NaiveDate,
    /// FinMind 的 type 欄位，例如 Revenue、EPS
    pub field: String,
    pub value: Decimal,
    /// 原始中文名稱
    pub origin_name: Option<String>,
    pub created_time: DateTime<Local>,
}

impl FinMindRawData {
    pub fn new(observation: &RawObservation) -> Self {
        FinMindRawData {
            stock_id: observation.stock_id,
            dataset: observation.dataset.to_string(),
            date: observation.date,
            field: observation.field.clone(),
            value: observation.value,
            origin_name: observation.origin_name.clone(),
            created_time: Local::now(),
        }
    }

    /// 取得指定股票全部的原始數據，不保證順序。
    ///
    /// 無法辨識的資料集會被略過並記錄警告。
    pub async fn fetch(stock_id: i64) -> Result<Vec<RawObservation>> {
        let sql = r#"
SELECT
    stock_id, dataset, date, type, value, origin_name, created_time
FROM finmind_raw_data
WHERE stock_id = $1;
"#;
        let rows = sqlx::query(sql)
            .bind(stock_id)
            .try_map(|row: PgRow| {
                Ok(FinMindRawData {
                    stock_id: row.try_get("stock_id")?,
                    dataset: row.try_get("dataset")?,
                    date: row.try_get("date")?,
                    field: row.try_get("type")?,
                    value: row.try_get("value")?,
                    origin_name: row.try_get("origin_name")?,
                    created_time: row.try_get("created_time")?,
                })
            })
            .fetch_all(database::get_connection()?)
            .await
            .context(format!(
                "Failed to FinMindRawData::fetch({}) from database",
                stock_id
            ))?;

        let mut observations = Vec::with_capacity(rows.len());
        for row in rows {
            match RawObservation::try_from(row) {
                Ok(observation) => observations.push(observation),
                Err(why) => logging::warn_file_async(format!("{:?}", why)),
            }
        }

        Ok(observations)
    }

    /// 以新數據整批取代某股票某資料集的舊數據，刪除與寫入在同一個 transaction。
    pub async fn replace(
        stock_id: i64,
        dataset: Dataset,
        observations: &[RawObservation],
    ) -> Result<u64> {
        let rows: Vec<FinMindRawData> = observations
            .iter()
            .filter(|o| o.stock_id == stock_id && o.dataset == dataset)
            .map(FinMindRawData::new)
            .collect();
        let mut tx = database::get_tx().await?;

        let deleted = sqlx::query("DELETE FROM finmind_raw_data WHERE stock_id = $1 AND dataset = $2;")
            .bind(stock_id)
            .bind(dataset.as_ref())
            .execute(&mut *tx)
            .await;
        if let Err(why) = deleted {
            tx.rollback().await?;
            return Err(anyhow!(
                "Failed to delete finmind_raw_data({}, {}) because {:?}",
                stock_id,
                dataset,
                why
            ));
        }

        let copy_in_query = "COPY finmind_raw_data (stock_id, dataset, date, type, value, origin_name, created_time) FROM STDIN WITH (FORMAT CSV)";
        let inserted = match database::copy_in_raw(&mut tx, copy_in_query, &rows).await {
            Ok(inserted) => inserted,
            Err(why) => {
                tx.rollback().await?;
                return Err(anyhow!(
                    "Failed to copy finmind_raw_data({}, {}) because {:?}",
                    stock_id,
                    dataset,
                    why
                ));
            }
        };

        tx.commit().await?;

        Ok(inserted)
    }
}

/// CSV 欄位以雙引號包起來，內含的雙引號加倍
fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

impl CopyIn for FinMindRawData {
    fn to_csv(&self) -> String {
        let origin_name = self.origin_name.as_deref().map(quote).unwrap_or_default();

        format!(
            "{},{},{},{},{},{},{}\n",
            self.stock_id,
            quote(&self.dataset),
            self.date.format("%Y-%m-%d"),
            quote(&self.field),
            self.value,
            origin_name,
            self.created_time.to_rfc3339()
        )
    }
}

impl TryFrom<FinMindRawData> for RawObservation {
    type Error = anyhow::Error;

    fn try_from(row: FinMindRawData) -> Result<Self> {
        let dataset = Dataset::from_str(&row.dataset).map_err(|why| {
            anyhow!(
                "unknown dataset({}) of stock({}) because {:?}",
                row.dataset,
                row.stock_id,
                why
            )
        })?;

        Ok(RawObservation {
            stock_id: row.stock_id,
            dataset,
            date: row.date,
            field: row.field,
            value: row.value,
            origin_name: row.origin_name,
        })
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn row(dataset: &str, origin_name: Option<&str>) -> FinMindRawData {
        FinMindRawData {
            stock_id: 7,
            dataset: dataset.to_string(),
            date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            field: "Revenue".to_string(),
            value: dec!(592644201),
            origin_name: origin_name.map(str::to_string),
            created_time: Local::now(),
        }
    }

    #[test]
    fn test_to_observation() {
        let observation =
            RawObservation::try_from(row("TaiwanStockFinancialStatements", Some("營業收入")))
                .unwrap();

        assert_eq!(observation.dataset, Dataset::IncomeStatement);
        assert_eq!(observation.field, "Revenue");
        assert_eq!(observation.origin_name.as_deref(), Some("營業收入"));
    }

    #[test]
    fn test_unknown_dataset() {
        assert!(RawObservation::try_from(row("TaiwanStockPrice", None)).is_err());
    }

    #[test]
    fn test_to_csv() {
        let csv = row("TaiwanStockFinancialStatements", Some("營業\"收入\"")).to_csv();

        assert!(csv.starts_with(
            "7,\"TaiwanStockFinancialStatements\",2024-03-31,\"Revenue\",592644201,\"營業\"\"收入\"\"\","
        ));
        assert!(csv.ends_with('\n'));

        let without_origin = row("TaiwanStockBalanceSheet", None).to_csv();
        assert!(without_origin.contains(",592644201,,"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_fetch() {
        dotenv::dotenv().ok();
        logging::debug_file_async("開始 FinMindRawData::fetch".to_string());

        match FinMindRawData::fetch(1).await {
            Ok(list) => logging::debug_file_async(format!("list: {}", list.len())),
            Err(why) => logging::debug_file_async(format!("Failed to fetch because {:?}", why)),
        }

        logging::debug_file_async("結束 FinMindRawData::fetch".to_string());
    }
}
