use std::{future::Future, time::Duration};

use anyhow::{anyhow, Result};
use chrono::{Local, Months, NaiveDate};
use strum::IntoEnumIterator;

use crate::{
    crawler::finmind,
    database::table::{finmind_raw_data::FinMindRawData, stock::Stock},
    declare::Dataset,
    logging,
};

/// 重新抓取的年數
const REFRESH_YEARS: u32 = 10;
/// 股票與股票之間的間隔，避免超過 FinMind 的流量限制
pub const STOCK_INTERVAL: Duration = Duration::from_millis(1000);

/// 依序重新抓取多檔股票，每檔之間間隔 `STOCK_INTERVAL`
pub async fn refresh_all(symbols: &[String]) -> Vec<(String, Result<u64>)> {
    refresh_each(symbols, STOCK_INTERVAL, |symbol| async move { refresh(&symbol).await }).await
}

async fn refresh_each<F, Fut>(
    symbols: &[String],
    interval: Duration,
    mut refresh_one: F,
) -> Vec<(String, Result<u64>)>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<u64>>,
{
    let mut results = Vec::with_capacity(symbols.len());

    for (i, symbol) in symbols.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(interval).await;
        }

        logging::info_file_async(format!("refresh {}/{}: {}", i + 1, symbols.len(), symbol));
        results.push((symbol.clone(), refresh_one(symbol.clone()).await));
    }

    results
}

/// 重新抓取一檔股票近十年的四個資料集，並逐一取代資料庫中的舊數據。
///
/// 單一資料集失敗只記錄錯誤，不影響其他資料集；回傳寫入的總筆數。
pub async fn refresh(symbol: &str) -> Result<u64> {
    let stock = Stock::fetch_by_symbol(symbol)
        .await?
        .ok_or_else(|| anyhow!("stock {} not found in database", symbol))?;
    let (start, end) = refresh_range(Local::now().date_naive());
    let mut stored = 0;

    logging::info_file_async(format!(
        "refresh raw data of {} from {} to {}",
        symbol, start, end
    ));

    for dataset in Dataset::iter() {
        match refresh_dataset(dataset, &stock, start, end).await {
            Ok(rows) => {
                stored += rows;
                logging::info_file_async(format!(
                    "stored {} raw records for {} - {}({})",
                    rows,
                    symbol,
                    dataset,
                    dataset.name()
                ));
            }
            Err(why) => {
                logging::error_file_async(format!(
                    "Failed to refresh {} of {} because {:?}",
                    dataset, symbol, why
                ));
            }
        }

        tokio::time::sleep(Duration::from_millis(500)).await;
    }

    Ok(stored)
}

async fn refresh_dataset(
    dataset: Dataset,
    stock: &Stock,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<u64> {
    let observations = finmind::data::visit(dataset, &stock.symbol, stock.id, start, end).await?;
    FinMindRawData::replace(stock.id, dataset, &observations).await
}

fn refresh_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = today
        .checked_sub_months(Months::new(12 * REFRESH_YEARS))
        .unwrap_or(NaiveDate::MIN);
    (start, today)
}
