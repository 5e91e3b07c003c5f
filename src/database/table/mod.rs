/// FinMind 原始數據
pub mod finmind_raw_data;
/// 股票主檔
pub mod stock;
