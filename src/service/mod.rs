use anyhow::Result;
use async_trait::async_trait;

use crate::{
    calculation::period::RawObservation,
    database::table::{finmind_raw_data::FinMindRawData, stock::Stock},
};

/// 財報查詢
pub mod financial;
/// FinMind 原始數據更新
pub mod raw_data;
/// 股票清單更新
pub mod stock_list;

/// 原始數據來源
#[async_trait]
pub trait RawDataStore: Send + Sync {
    /// 取得指定股票全部的原始觀測值，不保證順序
    async fn fetch_raw_observations(&self, stock_id: i64) -> Result<Vec<RawObservation>>;
}

/// 股票代號查詢
#[async_trait]
pub trait StockLookup: Send + Sync {
    /// 以股票代號取得內部 id，找不到時回傳 `None`
    async fn resolve_stock(&self, symbol: &str) -> Result<Option<i64>>;
}

/// 以 PostgreSQL 的 stocks、finmind_raw_data 表作為資料來源
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresStore;

#[async_trait]
impl RawDataStore for PostgresStore {
    async fn fetch_raw_observations(&self, stock_id: i64) -> Result<Vec<RawObservation>> {
        FinMindRawData::fetch(stock_id).await
    }
}

#[async_trait]
impl StockLookup for PostgresStore {
    async fn resolve_stock(&self, symbol: &str) -> Result<Option<i64>> {
        Ok(Stock::fetch_by_symbol(symbol).await?.map(|stock| stock.id))
    }
}
