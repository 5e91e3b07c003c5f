//! 由 FinMind 原始數據推導季度與年度財報。
//!
//! FinMind 的損益與現金流量是年初至季末的累計值，季度數值需以本季累計減去同年度
//! 上一季累計；資產負債表是時點數值，不做相減。年度 (quarter = 0) 直接取 Q4 累計。
//! 所有比率在分母不為正時一律為零，不會回傳錯誤。

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::Serialize;

use crate::{
    calculation::period::{self, PeriodBucket, PeriodKey, RawObservation},
    declare::{Dataset, Quarter},
};

/// 精選模式保留的年度筆數
pub const CURATED_ANNUAL_LIMIT: usize = 10;

const REVENUE: &str = "Revenue";
const GROSS_PROFIT: &str = "GrossProfit";
const OPERATING_INCOME: &str = "OperatingIncome";
const EPS: &str = "EPS";
const INCOME_AFTER_TAXES: &str = "IncomeAfterTaxes";
const TOTAL_ASSETS: &str = "TotalAssets";
const LIABILITIES: [&str; 2] = ["Liabilities", "TotalLiabilities"];
const EQUITY: [&str; 2] = ["Equity", "TotalEquity"];
const CASH: &str = "CashAndCashEquivalents";
const CURRENT_ASSETS: &str = "CurrentAssets";
const CURRENT_LIABILITIES: &str = "CurrentLiabilities";
const OPERATING_CASH_FLOW: &str = "CashFlowFromOperatingActivities";
const CAPITAL_EXPENDITURES: &str = "CapitalExpenditures";
const CASH_DIVIDEND: &str = "CashEarningsDistribution";
const STOCK_DIVIDEND: &str = "StockEarningsDistribution";

/// 尚未計算比率的財報數字，季度的流量欄位已完成累計轉單季
#[derive(Debug, Clone, PartialEq)]
pub struct StatementFigures {
    pub year: i32,
    /// 0 為年度，1~4 為季度
    pub quarter: u8,
    pub revenue: Decimal,
    pub gross_profit: Decimal,
    pub operating_income: Decimal,
    pub net_income: Decimal,
    pub eps: Decimal,
    pub total_assets: Decimal,
    pub total_liabilities: Decimal,
    pub total_equity: Decimal,
    pub cash_and_cash_equivalents: Decimal,
    pub current_assets: Decimal,
    pub current_liabilities: Decimal,
    pub operating_cash_flow: Decimal,
    /// 已取絕對值
    pub capital_expenditure: Decimal,
    pub dividends: Decimal,
}

impl StatementFigures {
    /// 單季數字：本季累計減去同年度前一個有資料的季度累計，Q1 直接使用累計值
    pub fn quarterly(
        key: PeriodKey,
        current: &PeriodBucket,
        previous: Option<&PeriodBucket>,
        outstanding_shares: Option<Decimal>,
    ) -> Self {
        let flow = |dataset: Dataset, field: &str| -> Decimal {
            let prior = previous.map_or(Decimal::ZERO, |p| p.value(dataset, field));
            current.value(dataset, field) - prior
        };

        let eps = flow(Dataset::IncomeStatement, EPS);
        let net_income = if current.contains(Dataset::IncomeStatement, INCOME_AFTER_TAXES) {
            flow(Dataset::IncomeStatement, INCOME_AFTER_TAXES)
        } else {
            net_income_from_eps(eps, outstanding_shares)
        };

        StatementFigures {
            year: key.year,
            quarter: key.quarter.serial(),
            revenue: flow(Dataset::IncomeStatement, REVENUE),
            gross_profit: flow(Dataset::IncomeStatement, GROSS_PROFIT),
            operating_income: flow(Dataset::IncomeStatement, OPERATING_INCOME),
            net_income,
            eps,
            operating_cash_flow: flow(Dataset::CashFlowStatement, OPERATING_CASH_FLOW),
            capital_expenditure: flow(Dataset::CashFlowStatement, CAPITAL_EXPENDITURES).abs(),
            // 股利屬於年度數字，只出現在年度資料
            dividends: Decimal::ZERO,
            ..Self::snapshot(key.year, current)
        }
    }

    /// 年度數字：直接採用 Q4 的年度累計
    pub fn annual(year: i32, year_end: &PeriodBucket, outstanding_shares: Option<Decimal>) -> Self {
        let eps = year_end.value(Dataset::IncomeStatement, EPS);
        let net_income = match year_end.get(Dataset::IncomeStatement, INCOME_AFTER_TAXES) {
            Some(net_income) => net_income,
            None => net_income_from_eps(eps, outstanding_shares),
        };

        StatementFigures {
            quarter: 0,
            revenue: year_end.value(Dataset::IncomeStatement, REVENUE),
            gross_profit: year_end.value(Dataset::IncomeStatement, GROSS_PROFIT),
            operating_income: year_end.value(Dataset::IncomeStatement, OPERATING_INCOME),
            net_income,
            eps,
            operating_cash_flow: year_end.value(Dataset::CashFlowStatement, OPERATING_CASH_FLOW),
            capital_expenditure: year_end
                .value(Dataset::CashFlowStatement, CAPITAL_EXPENDITURES)
                .abs(),
            dividends: year_end.value(Dataset::DividendPolicy, CASH_DIVIDEND)
                + year_end.value(Dataset::DividendPolicy, STOCK_DIVIDEND),
            ..Self::snapshot(year, year_end)
        }
    }

    /// 資產負債表的時點數值，流量欄位先填零
    fn snapshot(year: i32, bucket: &PeriodBucket) -> Self {
        StatementFigures {
            year,
            quarter: 0,
            revenue: Decimal::ZERO,
            gross_profit: Decimal::ZERO,
            operating_income: Decimal::ZERO,
            net_income: Decimal::ZERO,
            eps: Decimal::ZERO,
            total_assets: bucket.value(Dataset::BalanceSheet, TOTAL_ASSETS),
            total_liabilities: bucket.first_of(Dataset::BalanceSheet, &LIABILITIES),
            total_equity: bucket.first_of(Dataset::BalanceSheet, &EQUITY),
            cash_and_cash_equivalents: bucket.value(Dataset::BalanceSheet, CASH),
            current_assets: bucket.value(Dataset::BalanceSheet, CURRENT_ASSETS),
            current_liabilities: bucket.value(Dataset::BalanceSheet, CURRENT_LIABILITIES),
            operating_cash_flow: Decimal::ZERO,
            capital_expenditure: Decimal::ZERO,
            dividends: Decimal::ZERO,
        }
    }
}

/// FinMind 沒有直接的稅後淨利欄位時，以 EPS × 流通股數回推；沒有股數設定或溢位則為零
fn net_income_from_eps(eps: Decimal, outstanding_shares: Option<Decimal>) -> Decimal {
    outstanding_shares
        .and_then(|shares| eps.checked_mul(shares))
        .unwrap_or_default()
}

/// 分母為正才相除，否則為零
fn ratio(numerator: Decimal, denominator: Decimal) -> Decimal {
    if denominator > Decimal::ZERO {
        numerator / denominator
    } else {
        Decimal::ZERO
    }
}

/// 財報期別，比率皆為原始小數 (0.245 而非 24.5)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialPeriod {
    /// 年度
    pub year: i32,
    /// 0 為年度，1~4 為季度
    pub quarter: u8,
    /// 營業收入
    pub revenue: Decimal,
    /// 營業毛利
    pub gross_profit: Decimal,
    /// 營業利益
    pub operating_income: Decimal,
    /// 稅後淨利
    pub net_income: Decimal,
    /// 每股盈餘
    pub eps: Decimal,
    /// 資產總額
    pub total_assets: Decimal,
    /// 負債總額
    pub total_liabilities: Decimal,
    /// 權益總額
    pub total_equity: Decimal,
    /// 現金及約當現金
    pub cash_and_cash_equivalents: Decimal,
    /// 營業活動現金流量
    pub operating_cash_flow: Decimal,
    /// 資本支出
    pub capital_expenditure: Decimal,
    /// 自由現金流量
    pub free_cash_flow: Decimal,
    /// 股東權益報酬率
    pub roe: Decimal,
    /// 資產報酬率
    pub roa: Decimal,
    /// 毛利率
    pub gross_margin: Decimal,
    /// 營業利益率
    pub operating_margin: Decimal,
    /// 淨利率
    pub net_margin: Decimal,
    /// 負債權益比
    pub debt_to_equity: Decimal,
    /// 股利 (現金 + 股票)
    pub dividends: Decimal,
    /// 以負債總額近似
    pub total_debt: Decimal,
    pub net_debt: Decimal,
    /// 流動比率
    pub current_ratio: Decimal,
}

impl FinancialPeriod {
    pub fn is_annual(&self) -> bool {
        self.quarter == 0
    }
}

impl From<StatementFigures> for FinancialPeriod {
    fn from(f: StatementFigures) -> Self {
        let total_debt = f.total_liabilities;

        FinancialPeriod {
            year: f.year,
            quarter: f.quarter,
            revenue: f.revenue,
            gross_profit: f.gross_profit,
            operating_income: f.operating_income,
            net_income: f.net_income,
            eps: f.eps,
            total_assets: f.total_assets,
            total_liabilities: f.total_liabilities,
            total_equity: f.total_equity,
            cash_and_cash_equivalents: f.cash_and_cash_equivalents,
            operating_cash_flow: f.operating_cash_flow,
            capital_expenditure: f.capital_expenditure,
            free_cash_flow: f.operating_cash_flow - f.capital_expenditure.abs(),
            roe: ratio(f.net_income, f.total_equity),
            roa: ratio(f.net_income, f.total_assets),
            gross_margin: ratio(f.gross_profit, f.revenue),
            operating_margin: ratio(f.operating_income, f.revenue),
            net_margin: ratio(f.net_income, f.revenue),
            debt_to_equity: ratio(f.total_liabilities, f.total_equity),
            dividends: f.dividends,
            total_debt,
            net_debt: total_debt - f.cash_and_cash_equivalents,
            current_ratio: ratio(f.current_assets, f.current_liabilities),
        }
    }
}

/// 計算所有期別 (季度 + 年度)，依年度、季度由新到舊排序。
///
/// 營收不為正的期別視為沒有實際數據而略過。
pub fn calculate(
    observations: &[RawObservation],
    outstanding_shares: Option<Decimal>,
) -> Vec<FinancialPeriod> {
    let buckets = period::bucket(observations);
    let mut by_year: BTreeMap<i32, Vec<(Quarter, &PeriodBucket)>> = BTreeMap::new();
    for (key, bucket) in &buckets {
        by_year
            .entry(key.year)
            .or_default()
            .push((key.quarter, bucket));
    }

    let mut figures = Vec::with_capacity(buckets.len() + by_year.len());
    for (year, quarters) in by_year {
        // BTreeMap 的順序保證同年度季度由 Q1 到 Q4
        let mut previous: Option<&PeriodBucket> = None;
        for &(quarter, bucket) in &quarters {
            figures.push(StatementFigures::quarterly(
                PeriodKey::new(year, quarter),
                bucket,
                previous,
                outstanding_shares,
            ));
            previous = Some(bucket);
        }

        if let Some((_, year_end)) = quarters.iter().find(|(q, _)| *q == Quarter::Q4) {
            figures.push(StatementFigures::annual(year, year_end, outstanding_shares));
        }
    }

    let mut periods: Vec<FinancialPeriod> = figures
        .into_iter()
        .filter(|f| f.revenue > Decimal::ZERO)
        .map(FinancialPeriod::from)
        .collect();

    periods.sort_by(|a, b| b.year.cmp(&a.year).then(b.quarter.cmp(&a.quarter)));
    periods
}

/// 精選模式：最近 10 個年度，最前面再放最新的一季
pub fn curate(periods: &[FinancialPeriod]) -> Vec<FinancialPeriod> {
    let mut annual: Vec<FinancialPeriod> = periods
        .iter()
        .filter(|p| p.is_annual())
        .cloned()
        .collect();
    annual.sort_by(|a, b| b.year.cmp(&a.year));
    annual.truncate(CURATED_ANNUAL_LIMIT);

    let latest_quarter = periods
        .iter()
        .filter(|p| !p.is_annual())
        .max_by(|a, b| a.year.cmp(&b.year).then(a.quarter.cmp(&b.quarter)));

    if let Some(latest) = latest_quarter {
        annual.insert(0, latest.clone());
    }

    annual
}
