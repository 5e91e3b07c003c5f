/// 由 FinMind 原始數據推導季度與年度財報
pub mod financial_statement;
/// 原始數據依年度、季度分桶
pub mod period;
