use std::env;

use anyhow::Result;
use futures::{stream, StreamExt};

use crate::{
    calculation::financial_statement::FinancialPeriod,
    config::SETTINGS,
    database::table::stock::Stock,
    service::{financial::FinancialService, raw_data, stock_list, PostgresStore},
};

#[cfg(all(target_os = "linux", target_env = "musl"))]
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// 財報計算
pub mod calculation;
/// 設定檔
pub mod config;
/// 外部資料來源
pub mod crawler;
/// 資料庫
pub mod database;
/// 共用型別
pub mod declare;
/// 日誌
pub mod logging;
/// 對外服務
pub mod service;
/// 工具
pub mod util;

/// 同時處理的股票數
const CONCURRENCY: usize = 4;

#[derive(Debug, Default, PartialEq)]
struct Args {
    /// 更新股票清單
    stocks: bool,
    /// 重新抓取 FinMind 原始數據
    refresh: bool,
    /// 輸出完整歷史而非精選
    all: bool,
    symbols: Vec<String>,
}

impl Args {
    fn parse(args: impl Iterator<Item = String>) -> Self {
        let mut parsed = Args::default();
        for arg in args {
            match arg.as_str() {
                "stocks" => parsed.stocks = true,
                "refresh" => parsed.refresh = true,
                "--all" | "-a" => parsed.all = true,
                _ => parsed.symbols.push(arg),
            }
        }
        parsed
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        logging::error_console("Failed to install rustls crypto provider".to_string());
    }

    let mut args = Args::parse(env::args().skip(1));
    if args.stocks {
        let stored = stock_list::refresh().await?;
        logging::info_console(format!("stock list refreshed {} stocks", stored));
        if !args.refresh && args.symbols.is_empty() {
            return Ok(());
        }
    }

    if args.symbols.is_empty() {
        args.symbols = Stock::fetch_symbols().await?;
    }

    logging::info_file_async(format!(
        "start stock_fundamentals refresh:{} all:{} symbols:{}",
        args.refresh,
        args.all,
        args.symbols.len()
    ));

    if args.refresh {
        for (symbol, result) in raw_data::refresh_all(&args.symbols).await {
            match result {
                Ok(rows) => logging::info_console(format!("{} refreshed {} rows", symbol, rows)),
                Err(why) => logging::error_console(format!(
                    "Failed to refresh {} because {:?}",
                    symbol, why
                )),
            }
        }
        return Ok(());
    }

    let service = FinancialService::new(PostgresStore, SETTINGS.calibration.clone());
    let service = &service;
    let all = args.all;

    let results: Vec<(String, Result<Vec<FinancialPeriod>>)> = stream::iter(args.symbols)
        .map(|symbol| async move {
            let periods = if all {
                service.get_financials(&symbol).await
            } else {
                service.get_curated_financials(&symbol).await
            };
            (symbol, periods)
        })
        .buffered(CONCURRENCY)
        .collect()
        .await;

    for (symbol, periods) in results {
        match periods.and_then(|periods| Ok(serde_json::to_string_pretty(&periods)?)) {
            Ok(json) => println!("{}\n{}", symbol, json),
            Err(why) => logging::error_console(format!(
                "Failed to get financials of {} because {:?}",
                symbol, why
            )),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = Args::parse(["2330", "--all", "2317"].into_iter().map(String::from));
        assert_eq!(
            args,
            Args {
                stocks: false,
                refresh: false,
                all: true,
                symbols: vec!["2330".to_string(), "2317".to_string()],
            }
        );

        let args = Args::parse(["refresh", "2330"].into_iter().map(String::from));
        assert!(args.refresh);
        assert!(!args.all);
        assert_eq!(args.symbols, vec!["2330".to_string()]);

        let args = Args::parse(["stocks"].into_iter().map(String::from));
        assert!(args.stocks);
        assert!(!args.refresh);
        assert!(args.symbols.is_empty());
    }
}
