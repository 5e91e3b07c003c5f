use std::collections::HashSet;

use anyhow::Result;
use serde::Deserialize;

use crate::{crawler::finmind, database::table::stock::Stock};

/// 沒有產業別時的預設值
const UNCLASSIFIED: &str = "未分類";

/// TaiwanStockInfo 的一列
#[derive(Deserialize, Debug, Default, Clone)]
pub struct StockInfo {
    #[serde(default)]
    pub stock_id: String,
    #[serde(default)]
    pub stock_name: String,
    pub industry_category: Option<String>,
    /// twse 上市、tpex 上櫃、emerging 興櫃
    #[serde(rename = "type")]
    pub market_type: Option<String>,
}

/// 抓取 FinMind 的台股清單，只保留四碼的普通股
pub async fn visit() -> Result<Vec<Stock>> {
    let rows = finmind::fetch::<StockInfo>("dataset=TaiwanStockInfo").await?;
    Ok(to_stocks(&rows))
}

/// 同一檔股票可能因多個產業別出現多列，以第一列為準
pub fn to_stocks(rows: &[StockInfo]) -> Vec<Stock> {
    let mut seen = HashSet::with_capacity(rows.len());
    let mut stocks = Vec::with_capacity(rows.len());

    for row in rows {
        let symbol = row.stock_id.trim();
        if !is_common_stock(symbol) || row.stock_name.trim().is_empty() {
            continue;
        }

        if !seen.insert(symbol.to_string()) {
            continue;
        }

        let industry = row
            .industry_category
            .as_deref()
            .map(str::trim)
            .filter(|industry| !industry.is_empty())
            .unwrap_or(UNCLASSIFIED);

        stocks.push(Stock {
            id: 0,
            symbol: symbol.to_string(),
            name: row.stock_name.trim().to_string(),
            industry: industry.to_string(),
            market: market(row.market_type.as_deref().unwrap_or_default()).to_string(),
        });
    }

    stocks
}

/// 四碼數字才是股票，權證、ETN 等代號都不是四碼
fn is_common_stock(symbol: &str) -> bool {
    symbol.len() == 4 && symbol.bytes().all(|b| b.is_ascii_digit())
}

fn market(market_type: &str) -> &'static str {
    let lower = market_type.to_ascii_lowercase();
    if lower.contains("tpex") || lower.contains("otc") || market_type.contains("上櫃") {
        "OTC"
    } else if lower.contains("emerging") || market_type.contains("興櫃") {
        "ESB"
    } else {
        "TSE"
    }
}

#[cfg(test)]
mod tests {
    use crate::logging;

    use super::*;

    fn rows() -> Vec<StockInfo> {
        let response: finmind::Response<StockInfo> = serde_json::from_str(
            r#"{"msg":"success","status":200,"data":[
                {"industry_category":"半導體業","stock_id":"2330","stock_name":"台積電","type":"twse","date":"2024-01-02"},
                {"industry_category":"電子工業","stock_id":"2330","stock_name":"台積電","type":"twse","date":"2024-01-02"},
                {"industry_category":"ETF","stock_id":"0050","stock_name":"元大台灣50","type":"twse","date":"2024-01-02"},
                {"industry_category":"","stock_id":"6488","stock_name":"環球晶","type":"tpex","date":"2024-01-02"},
                {"industry_category":"生技醫療業","stock_id":"6589","stock_name":"台康生技","type":"emerging","date":"2024-01-02"},
                {"industry_category":"權證","stock_id":"03001P","stock_name":"權證","type":"twse","date":"2024-01-02"},
                {"industry_category":"ETN","stock_id":"020000","stock_name":"ETN","type":"twse","date":"2024-01-02"},
                {"industry_category":"其他","stock_id":"00AB","stock_name":"不明","type":"twse","date":"2024-01-02"},
                {"industry_category":"其他","stock_id":"1101","stock_name":"","type":"twse","date":"2024-01-02"}
            ]}"#,
        )
        .unwrap();
        response.data
    }

    #[test]
    fn test_only_four_digit_symbols() {
        let stocks = to_stocks(&rows());
        let symbols: Vec<&str> = stocks.iter().map(|s| s.symbol.as_str()).collect();

        assert_eq!(symbols, vec!["2330", "0050", "6488", "6589"]);
    }

    #[test]
    fn test_industry_and_market() {
        let stocks = to_stocks(&rows());

        assert_eq!(stocks[0].industry, "半導體業");
        assert_eq!(stocks[0].market, "TSE");
        assert_eq!(stocks[2].industry, UNCLASSIFIED);
        assert_eq!(stocks[2].market, "OTC");
        assert_eq!(stocks[3].market, "ESB");
        assert!(stocks.iter().all(|s| s.id == 0));
    }

    #[tokio::test]
    #[ignore]
    async fn test_visit() {
        dotenv::dotenv().ok();
        let _ = rustls::crypto::ring::default_provider().install_default();
        logging::debug_file_async("開始 finmind::stock_info::visit".to_string());

        match visit().await {
            Ok(list) => logging::debug_file_async(format!("stocks: {}", list.len())),
            Err(why) => logging::debug_file_async(format!("Failed to visit because {:?}", why)),
        }

        logging::debug_file_async("結束 finmind::stock_info::visit".to_string());
    }
}
