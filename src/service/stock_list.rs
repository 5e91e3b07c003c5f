use anyhow::Result;

use crate::{crawler::finmind, database::table::stock::Stock, logging};

/// 以 FinMind 的台股清單更新 stocks，回傳成功寫入的筆數。
///
/// 單筆寫入失敗只記錄錯誤，不中斷其他股票。
pub async fn refresh() -> Result<usize> {
    let stocks = finmind::stock_info::visit().await?;
    let mut stored = 0;

    for stock in &stocks {
        match stock.upsert().await {
            Ok(_) => stored += 1,
            Err(why) => logging::error_file_async(format!(
                "Failed to upsert stock {} because {:?}",
                stock.symbol, why
            )),
        }
    }

    logging::info_file_async(format!(
        "stock list refreshed. stored: {}, total: {}",
        stored,
        stocks.len()
    ));

    Ok(stored)
}
