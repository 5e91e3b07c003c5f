use anyhow::Result;

use crate::{
    calculation::{
        financial_statement::{self, FinancialPeriod},
        period::RawObservation,
    },
    config::Calibration,
    logging,
    service::{RawDataStore, StockLookup},
};

/// 讀取原始數據的結果，查無股票與沒有數據都不是錯誤
#[derive(Debug)]
pub enum RawData {
    StockNotFound,
    EmptyInput,
    Observations(Vec<RawObservation>),
}

/// 財報查詢服務，每次查詢都從原始數據重新計算
pub struct FinancialService<S> {
    store: S,
    calibration: Calibration,
}

impl<S> FinancialService<S>
where
    S: RawDataStore + StockLookup,
{
    pub fn new(store: S, calibration: Calibration) -> Self {
        FinancialService { store, calibration }
    }

    /// 完整歷史：所有季度與年度，依年度、季度由新到舊
    pub async fn get_financials(&self, symbol: &str) -> Result<Vec<FinancialPeriod>> {
        let observations = match self.load(symbol).await? {
            RawData::Observations(observations) => observations,
            RawData::StockNotFound | RawData::EmptyInput => return Ok(Vec::new()),
        };

        let shares = self.calibration.outstanding_shares(symbol);
        if shares.is_none() {
            logging::warn_file_async(format!(
                "outstanding shares of {} is not calibrated, net income derived from EPS will be zero",
                symbol
            ));
        }

        let periods = financial_statement::calculate(&observations, shares);
        logging::debug_file_async(format!(
            "{} raw observations of {} derived {} periods",
            observations.len(),
            symbol,
            periods.len()
        ));

        Ok(periods)
    }

    /// 精選模式：最新一季加上最近 10 個年度
    pub async fn get_curated_financials(&self, symbol: &str) -> Result<Vec<FinancialPeriod>> {
        let periods = self.get_financials(symbol).await?;
        Ok(financial_statement::curate(&periods))
    }

    pub async fn load(&self, symbol: &str) -> Result<RawData> {
        let stock_id = match self.store.resolve_stock(symbol).await? {
            Some(stock_id) => stock_id,
            None => {
                logging::info_file_async(format!("stock {} not found", symbol));
                return Ok(RawData::StockNotFound);
            }
        };

        let observations = self.store.fetch_raw_observations(stock_id).await?;
        if observations.is_empty() {
            logging::info_file_async(format!("stock {} has no raw data", symbol));
            return Ok(RawData::EmptyInput);
        }

        Ok(RawData::Observations(observations))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::declare::Dataset;

    use super::*;

    #[derive(Default)]
    struct MemoryStore {
        stocks: HashMap<String, i64>,
        raw: HashMap<i64, Vec<RawObservation>>,
        broken: bool,
    }

    #[async_trait]
    impl RawDataStore for MemoryStore {
        async fn fetch_raw_observations(&self, stock_id: i64) -> Result<Vec<RawObservation>> {
            if self.broken {
                return Err(anyhow!("connection refused"));
            }
            Ok(self.raw.get(&stock_id).cloned().unwrap_or_default())
        }
    }

    #[async_trait]
    impl StockLookup for MemoryStore {
        async fn resolve_stock(&self, symbol: &str) -> Result<Option<i64>> {
            Ok(self.stocks.get(symbol).copied())
        }
    }

    fn observation(dataset: Dataset, ymd: (i32, u32, u32), field: &str, value: Decimal) -> RawObservation {
        let date = NaiveDate::from_ymd_opt(ymd.0, ymd.1, ymd.2).unwrap();
        RawObservation::new(1, dataset, date, field, value)
    }

    fn store() -> MemoryStore {
        let mut raw = Vec::new();
        let dates = [(2023, 3, 31), (2023, 6, 30), (2023, 9, 30), (2023, 12, 31)];
        let revenues = [dec!(100), dec!(250), dec!(400), dec!(600)];
        let eps = [dec!(1.0), dec!(2.5), dec!(4.0), dec!(6.0)];
        for i in 0..4 {
            raw.push(observation(Dataset::IncomeStatement, dates[i], "Revenue", revenues[i]));
            raw.push(observation(Dataset::IncomeStatement, dates[i], "EPS", eps[i]));
        }
        raw.push(observation(Dataset::BalanceSheet, (2023, 12, 31), "TotalEquity", dec!(5000)));
        // 亂序也要能正確計算
        raw.reverse();

        MemoryStore {
            stocks: HashMap::from([("2330".to_string(), 1), ("2317".to_string(), 2)]),
            raw: HashMap::from([(1, raw)]),
            broken: false,
        }
    }

    #[tokio::test]
    async fn test_get_financials() {
        let service = FinancialService::new(store(), Calibration::default());

        let periods = service.get_financials("2330").await.unwrap();

        assert_eq!(periods.len(), 5);
        assert_eq!((periods[0].year, periods[0].quarter), (2023, 4));
        let annual = periods.iter().find(|p| p.is_annual()).unwrap();
        assert_eq!(annual.revenue, dec!(600));
        assert_eq!(annual.net_income, dec!(6.0) * dec!(25900000000));
        assert_eq!(annual.roe, annual.net_income / dec!(5000));
    }

    #[tokio::test]
    async fn test_get_curated_financials() {
        let service = FinancialService::new(store(), Calibration::default());

        let curated = service.get_curated_financials("2330").await.unwrap();

        assert_eq!(curated.len(), 2);
        assert_eq!((curated[0].quarter, curated[0].revenue, curated[0].eps), (4, dec!(200), dec!(2.0)));
        assert_eq!((curated[1].quarter, curated[1].revenue, curated[1].eps), (0, dec!(600), dec!(6.0)));
    }

    #[tokio::test]
    async fn test_unknown_and_empty_stock() {
        let service = FinancialService::new(store(), Calibration::default());

        assert!(matches!(service.load("9999").await.unwrap(), RawData::StockNotFound));
        assert!(matches!(service.load("2317").await.unwrap(), RawData::EmptyInput));
        assert!(service.get_financials("9999").await.unwrap().is_empty());
        assert!(service.get_curated_financials("2317").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_store_error_is_propagated() {
        let mut broken = store();
        broken.broken = true;
        let service = FinancialService::new(broken, Calibration::default());

        assert!(service.get_financials("2330").await.is_err());
    }

    macro_rules! aw {
        ($e:expr) => {
            tokio_test::block_on($e)
        };
    }

    #[test]
    fn test_uncalibrated_stock() {
        let mut store = store();
        let raw = store.raw.remove(&1).unwrap();
        store.raw.insert(2, raw);
        let service = FinancialService::new(store, Calibration::default());

        let periods = aw!(service.get_financials("2317")).unwrap();

        assert_eq!(periods.len(), 5);
        assert!(periods.iter().all(|p| p.net_income == Decimal::ZERO));
    }
}
