use std::fmt;

use strum::EnumIter;
use strum_macros::{AsRefStr, Display, EnumString};

/// 季度
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Copy, Clone)]
pub enum Quarter {
    /// 第一季 (3 月底)
    Q1 = 1,
    /// 第二季 (6 月底)
    Q2 = 2,
    /// 第三季 (9 月底)
    Q3 = 3,
    /// 第四季 (12 月底)，同時也是年度累計的終點
    Q4 = 4,
}

impl Quarter {
    pub fn serial(&self) -> u8 {
        *self as u8
    }

    /// 只有季末月份 (3、6、9、12) 才有對應的季度
    pub fn from_quarter_end_month(month: u32) -> Option<Quarter> {
        match month {
            3 => Some(Quarter::Q1),
            6 => Some(Quarter::Q2),
            9 => Some(Quarter::Q3),
            12 => Some(Quarter::Q4),
            _ => None,
        }
    }
}

impl fmt::Display for Quarter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}", self.serial())
    }
}

/// FinMind 資料集
#[derive(
    PartialEq,
    Eq,
    Hash,
    Debug,
    Copy,
    Clone,
    Display,
    EnumString,
    AsRefStr,
    EnumIter,
)]
pub enum Dataset {
    /// 損益表
    #[strum(serialize = "TaiwanStockFinancialStatements")]
    IncomeStatement,
    /// 資產負債表
    #[strum(serialize = "TaiwanStockBalanceSheet")]
    BalanceSheet,
    /// 現金流量表
    #[strum(serialize = "TaiwanStockCashFlowsStatement")]
    CashFlowStatement,
    /// 股利政策
    #[strum(serialize = "TaiwanStockDividend")]
    DividendPolicy,
}

impl Dataset {
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::IncomeStatement => "損益表",
            Dataset::BalanceSheet => "資產負債表",
            Dataset::CashFlowStatement => "現金流量表",
            Dataset::DividendPolicy => "股利政策",
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use strum::IntoEnumIterator;

    use super::*;

    #[test]
    fn test_quarter_from_month() {
        assert_eq!(Quarter::from_quarter_end_month(3), Some(Quarter::Q1));
        assert_eq!(Quarter::from_quarter_end_month(12), Some(Quarter::Q4));
        assert_eq!(Quarter::from_quarter_end_month(5), None);
        assert_eq!(Quarter::Q3.to_string(), "Q3");
    }

    #[test]
    fn test_dataset_names() {
        assert_eq!(
            Dataset::BalanceSheet.to_string(),
            "TaiwanStockBalanceSheet"
        );
        assert_eq!(
            Dataset::from_str("TaiwanStockCashFlowsStatement").ok(),
            Some(Dataset::CashFlowStatement)
        );
        assert!(Dataset::from_str("TaiwanStockPrice").is_err());
        assert_eq!(Dataset::iter().count(), 4);
    }
}
