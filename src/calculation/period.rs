use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;

use crate::declare::{Dataset, Quarter};

/// FinMind 原始數據的一筆觀測值 (stock, dataset, date, field) 唯一
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub stock_id: i64,
    pub dataset: Dataset,
    /// 季末日期，股利資料則為公告日
    pub date: NaiveDate,
    /// FinMind 的欄位名稱，例如 Revenue、EPS、TotalAssets
    pub field: String,
    pub value: Decimal,
    /// 原始中文名稱，例如 營業收入
    pub origin_name: Option<String>,
}

impl RawObservation {
    pub fn new(
        stock_id: i64,
        dataset: Dataset,
        date: NaiveDate,
        field: impl Into<String>,
        value: Decimal,
    ) -> Self {
        RawObservation {
            stock_id,
            dataset,
            date,
            field: field.into(),
            value,
            origin_name: None,
        }
    }

    /// 該筆數據應歸屬的年度與季度。
    ///
    /// 股利在 Y 年公告的是 Y-1 年度的盈餘分配，因此一律歸到前一年的 Q4 (年度)；
    /// 其餘資料集只接受季末月份，其他月份回傳 `None`。
    pub fn period_key(&self) -> Option<PeriodKey> {
        if self.dataset == Dataset::DividendPolicy {
            return Some(PeriodKey::new(self.date.year() - 1, Quarter::Q4));
        }

        Quarter::from_quarter_end_month(self.date.month())
            .map(|quarter| PeriodKey::new(self.date.year(), quarter))
    }
}

/// 期別，依 (年度, 季度) 排序
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Copy, Clone)]
pub struct PeriodKey {
    pub year: i32,
    pub quarter: Quarter,
}

impl PeriodKey {
    pub fn new(year: i32, quarter: Quarter) -> Self {
        PeriodKey { year, quarter }
    }
}

/// 同一期別下的累計數值，key 為 `dataset_field`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeriodBucket {
    values: HashMap<String, Decimal>,
}

impl PeriodBucket {
    pub fn field_key(dataset: Dataset, field: &str) -> String {
        format!("{}_{}", dataset, field)
    }

    pub fn get(&self, dataset: Dataset, field: &str) -> Option<Decimal> {
        self.values
            .get(&Self::field_key(dataset, field))
            .copied()
    }

    pub fn contains(&self, dataset: Dataset, field: &str) -> bool {
        self.values.contains_key(&Self::field_key(dataset, field))
    }

    /// 取得欄位數值，沒有的欄位視為零
    pub fn value(&self, dataset: Dataset, field: &str) -> Decimal {
        self.get(dataset, field).unwrap_or(Decimal::ZERO)
    }

    /// 依序尋找別名，回傳第一個存在的欄位數值
    pub fn first_of(&self, dataset: Dataset, fields: &[&str]) -> Decimal {
        fields
            .iter()
            .find_map(|field| self.get(dataset, field))
            .unwrap_or(Decimal::ZERO)
    }

    fn put(&mut self, observation: &RawObservation) {
        let key = Self::field_key(observation.dataset, &observation.field);
        if observation.dataset == Dataset::DividendPolicy {
            // 同一年度可能分多次配息，全部加總
            *self.values.entry(key).or_insert(Decimal::ZERO) += observation.value;
        } else {
            self.values.insert(key, observation.value);
        }
    }
}

/// 將原始觀測值依 (年度, 季度) 分桶，非季末的數據直接捨棄
pub fn bucket(observations: &[RawObservation]) -> BTreeMap<PeriodKey, PeriodBucket> {
    let mut buckets: BTreeMap<PeriodKey, PeriodBucket> = BTreeMap::new();

    for observation in observations {
        if let Some(key) = observation.period_key() {
            buckets.entry(key).or_default().put(observation);
        }
    }

    buckets
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_bucket_by_quarter_end_month() {
        let observations = vec![
            RawObservation::new(1, Dataset::IncomeStatement, date(2023, 3, 31), "Revenue", dec!(100)),
            RawObservation::new(1, Dataset::IncomeStatement, date(2023, 6, 30), "Revenue", dec!(250)),
            RawObservation::new(1, Dataset::IncomeStatement, date(2023, 5, 15), "Revenue", dec!(999)),
            RawObservation::new(1, Dataset::IncomeStatement, date(2023, 12, 31), "Revenue", dec!(600)),
        ];

        let buckets = bucket(&observations);

        assert_eq!(buckets.len(), 3);
        let q1 = &buckets[&PeriodKey::new(2023, Quarter::Q1)];
        assert_eq!(q1.value(Dataset::IncomeStatement, "Revenue"), dec!(100));
        assert!(!buckets.contains_key(&PeriodKey::new(2023, Quarter::Q3)));
        let q4 = &buckets[&PeriodKey::new(2023, Quarter::Q4)];
        assert_eq!(q4.value(Dataset::IncomeStatement, "Revenue"), dec!(600));
    }

    #[test]
    fn test_same_field_name_across_datasets() {
        let observations = vec![
            RawObservation::new(1, Dataset::IncomeStatement, date(2023, 9, 30), "Total", dec!(1)),
            RawObservation::new(1, Dataset::BalanceSheet, date(2023, 9, 30), "Total", dec!(2)),
        ];

        let buckets = bucket(&observations);
        let q3 = &buckets[&PeriodKey::new(2023, Quarter::Q3)];

        assert!(q3.contains(Dataset::IncomeStatement, "Total"));
        assert!(q3.contains(Dataset::BalanceSheet, "Total"));
        assert_eq!(q3.value(Dataset::IncomeStatement, "Total"), dec!(1));
        assert_eq!(q3.value(Dataset::BalanceSheet, "Total"), dec!(2));
        assert_eq!(q3.value(Dataset::CashFlowStatement, "Total"), Decimal::ZERO);
    }

    #[test]
    fn test_dividend_shift_to_previous_year() {
        let observations = vec![
            RawObservation::new(1, Dataset::DividendPolicy, date(2025, 3, 31), "CashEarningsDistribution", dec!(4.5)),
            RawObservation::new(1, Dataset::DividendPolicy, date(2025, 8, 14), "CashEarningsDistribution", dec!(5)),
        ];

        let buckets = bucket(&observations);

        assert_eq!(buckets.len(), 1);
        let fiscal = &buckets[&PeriodKey::new(2024, Quarter::Q4)];
        assert_eq!(
            fiscal.value(Dataset::DividendPolicy, "CashEarningsDistribution"),
            dec!(9.5)
        );
    }

    #[test]
    fn test_first_of_aliases() {
        let observations = vec![RawObservation::new(
            1,
            Dataset::BalanceSheet,
            date(2023, 12, 31),
            "TotalEquity",
            dec!(5000),
        )];

        let buckets = bucket(&observations);
        let q4 = &buckets[&PeriodKey::new(2023, Quarter::Q4)];

        assert_eq!(
            q4.first_of(Dataset::BalanceSheet, &["Equity", "TotalEquity"]),
            dec!(5000)
        );
        assert_eq!(q4.first_of(Dataset::BalanceSheet, &["Liabilities"]), Decimal::ZERO);
    }

    #[test]
    fn test_empty_input() {
        assert!(bucket(&[]).is_empty());
    }
}
