use std::str::FromStr;

use anyhow::Result;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::{calculation::period::RawObservation, crawler::finmind, declare::Dataset};

/// 股利資料集的現金股利欄位
pub const CASH_EARNINGS_DISTRIBUTION: &str = "CashEarningsDistribution";
/// 股利資料集的股票股利欄位
pub const STOCK_EARNINGS_DISTRIBUTION: &str = "StockEarningsDistribution";

/// `data` 陣列中的一列。
///
/// 財報類資料集是長表格 (type/value)，股利資料集則是寬表格，兩種欄位都放在這裡。
#[derive(Deserialize, Debug, Default, Clone)]
pub struct Row {
    #[serde(default)]
    pub date: String,
    #[serde(rename = "type")]
    pub field: Option<String>,
    pub value: Option<Value>,
    pub origin_name: Option<String>,
    #[serde(rename = "CashEarningsDistribution")]
    pub cash_earnings_distribution: Option<Value>,
    #[serde(rename = "StockEarningsDistribution")]
    pub stock_earnings_distribution: Option<Value>,
}

/// 單一資料集的查詢條件
pub fn query(dataset: Dataset, symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
    format!(
        "dataset={dataset}&data_id={symbol}&start_date={start}&end_date={end}",
        dataset = dataset,
        symbol = symbol,
        start = start.format("%Y-%m-%d"),
        end = end.format("%Y-%m-%d"),
    )
}

/// 抓取一檔股票的一個資料集
pub async fn visit(
    dataset: Dataset,
    symbol: &str,
    stock_id: i64,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Vec<RawObservation>> {
    let rows = finmind::fetch::<Row>(&query(dataset, symbol, start, end)).await?;
    Ok(parse(dataset, stock_id, &rows))
}

/// 將回應轉為原始觀測值，日期無法解析或缺欄位的列會被略過
pub fn parse(dataset: Dataset, stock_id: i64, rows: &[Row]) -> Vec<RawObservation> {
    let mut observations = Vec::with_capacity(rows.len());

    for row in rows {
        let date = match NaiveDate::parse_from_str(&row.date, "%Y-%m-%d") {
            Ok(date) => date,
            Err(_) => continue,
        };

        if dataset == Dataset::DividendPolicy {
            let columns = [
                (CASH_EARNINGS_DISTRIBUTION, &row.cash_earnings_distribution, "現金股利"),
                (STOCK_EARNINGS_DISTRIBUTION, &row.stock_earnings_distribution, "股票股利"),
            ];
            for (field, value, origin_name) in columns {
                if let Some(value) = value {
                    let mut observation =
                        RawObservation::new(stock_id, dataset, date, field, to_decimal(value));
                    observation.origin_name = Some(origin_name.to_string());
                    observations.push(observation);
                }
            }
            continue;
        }

        let (field, value) = match (&row.field, &row.value) {
            (Some(field), Some(value)) if !field.is_empty() => (field, value),
            _ => continue,
        };

        let mut observation = RawObservation::new(stock_id, dataset, date, field.as_str(), to_decimal(value));
        observation.origin_name = row.origin_name.clone();
        observations.push(observation);
    }

    observations
}

/// 只接受 JSON 數字，其餘視為 0
fn to_decimal(value: &Value) -> Decimal {
    match value {
        Value::Number(number) => {
            let text = number.to_string();
            Decimal::from_str(&text)
                .or_else(|_| Decimal::from_scientific(&text))
                .unwrap_or_default()
        }
        _ => Decimal::ZERO,
    }
}
