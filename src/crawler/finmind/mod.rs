//! # FinMind 開放資料採集模組
//!
//! 透過 FinMind v4 `data` 端點取得台股資料，回應以原樣轉換，不做任何換算。
//!
//! - 綜合損益表 `TaiwanStockFinancialStatements`
//! - 資產負債表 `TaiwanStockBalanceSheet`
//! - 現金流量表 `TaiwanStockCashFlowsStatement`
//! - 股利政策 `TaiwanStockDividend`
//! - 股票清單 `TaiwanStockInfo`

use anyhow::{anyhow, Result};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{config::SETTINGS, util};

/// 單一資料集的抓取與解析
pub mod data;
/// 股票清單
pub mod stock_info;

/// FinMind v4 回應，`data` 的列型別依資料集而定
#[derive(Deserialize, Debug)]
pub struct Response<T> {
    #[serde(default)]
    pub msg: String,
    #[serde(default)]
    pub status: i32,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// 組出查詢網址，`query` 不含開頭的 `?`，有設定 token 時一併帶上
fn url(query: &str) -> String {
    let finmind = &SETTINGS.finmind;
    let mut url = format!("{}?{}", finmind.base_url, query);

    if !finmind.token.is_empty() {
        url.push_str("&token=");
        url.push_str(&finmind.token);
    }

    url
}

/// 送出查詢並檢查 FinMind 自己的狀態碼
async fn fetch<T: DeserializeOwned>(query: &str) -> Result<Vec<T>> {
    let response = util::http::get_json::<Response<T>>(&url(query)).await?;

    if response.status != 200 {
        return Err(anyhow!(
            "FinMind returned status {} for {}: {}",
            response.status,
            query,
            response.msg
        ));
    }

    Ok(response.data)
}
