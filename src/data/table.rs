//! Sales Record Table
//! Cleaned, non-empty table of (date, entity, amount) rows with derived
//! calendar fields, plus filtering and conversion to a Polars DataFrame.

use crate::config::CalendarNames;
use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use std::collections::BTreeSet;

/// One cleaned sale.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesRecord {
    pub date: NaiveDate,
    pub entity: String,
    pub amount: f64,
    pub year: i32,
    /// 1..=12
    pub month: u32,
    pub month_name: String,
    /// Monday = 0
    pub weekday: u32,
    pub weekday_name: String,
}

impl SalesRecord {
    pub fn new(date: NaiveDate, entity: String, amount: f64, names: &CalendarNames) -> Self {
        let month = date.month();
        let weekday = date.weekday().num_days_from_monday();
        Self {
            date,
            entity,
            amount,
            year: date.year(),
            month,
            month_name: names.month(month),
            weekday,
            weekday_name: names.weekday(weekday),
        }
    }
}

/// Display names of the three positional columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnNames {
    pub date: String,
    pub entity: String,
    pub amount: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            date: "Data".to_string(),
            entity: "Cliente".to_string(),
            amount: "Valor".to_string(),
        }
    }
}

/// Non-empty table of sales records. Cannot be constructed empty.
#[derive(Debug, Clone, PartialEq)]
pub struct SalesTable {
    records: Vec<SalesRecord>,
    columns: ColumnNames,
}

impl SalesTable {
    /// Returns `None` for an empty record list.
    pub fn new(records: Vec<SalesRecord>, columns: ColumnNames) -> Option<Self> {
        if records.is_empty() {
            None
        } else {
            Some(Self { records, columns })
        }
    }

    pub fn records(&self) -> &[SalesRecord] {
        &self.records
    }

    pub fn columns(&self) -> &ColumnNames {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Earliest and latest sale date.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        let first = self.records[0].date;
        self.records
            .iter()
            .fold((first, first), |(lo, hi), r| (lo.min(r.date), hi.max(r.date)))
    }

    /// Sorted unique entity labels.
    pub fn entities(&self) -> Vec<String> {
        self.records
            .iter()
            .map(|r| r.entity.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    pub fn amounts(&self) -> Vec<f64> {
        self.records.iter().map(|r| r.amount).collect()
    }

    /// Derived copy holding only matching rows; `None` when nothing matches.
    pub fn filter(&self, filter: &SalesFilter) -> Option<SalesTable> {
        let records: Vec<SalesRecord> = self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        SalesTable::new(records, self.columns.clone())
    }

    /// Columnar view for aggregation.
    pub fn to_dataframe(&self) -> PolarsResult<DataFrame> {
        let n = self.records.len();
        let mut dates = Vec::with_capacity(n);
        let mut entities = Vec::with_capacity(n);
        let mut amounts = Vec::with_capacity(n);
        let mut years = Vec::with_capacity(n);
        let mut months = Vec::with_capacity(n);
        let mut month_names = Vec::with_capacity(n);
        let mut weekdays = Vec::with_capacity(n);
        let mut weekday_names = Vec::with_capacity(n);

        for r in &self.records {
            dates.push(r.date.format("%Y-%m-%d").to_string());
            entities.push(r.entity.clone());
            amounts.push(r.amount);
            years.push(r.year);
            months.push(r.month);
            month_names.push(r.month_name.clone());
            weekdays.push(r.weekday);
            weekday_names.push(r.weekday_name.clone());
        }

        DataFrame::new(vec![
            Column::new("date".into(), dates),
            Column::new("entity".into(), entities),
            Column::new("amount".into(), amounts),
            Column::new("year".into(), years),
            Column::new("month".into(), months),
            Column::new("month_name".into(), month_names),
            Column::new("weekday".into(), weekdays),
            Column::new("weekday_name".into(), weekday_names),
        ])
    }
}

/// Date range and client selection. Every criterion is optional.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SalesFilter {
    /// Inclusive
    pub since: Option<NaiveDate>,
    /// Inclusive
    pub until: Option<NaiveDate>,
    /// `None` keeps every entity.
    pub entities: Option<BTreeSet<String>>,
}

impl SalesFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_since(mut self, date: NaiveDate) -> Self {
        self.since = Some(date);
        self
    }

    pub fn with_until(mut self, date: NaiveDate) -> Self {
        self.until = Some(date);
        self
    }

    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities = Some(entities.into_iter().map(Into::into).collect());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.since.is_none() && self.until.is_none() && self.entities.is_none()
    }

    pub fn matches(&self, record: &SalesRecord) -> bool {
        if self.since.is_some_and(|since| record.date < since) {
            return false;
        }
        if self.until.is_some_and(|until| record.date > until) {
            return false;
        }
        match &self.entities {
            Some(set) => set.contains(&record.entity),
            None => true,
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_table() -> SalesTable {
        let names = CalendarNames::default();
        let rows = [
            ("2023-01-02", "Alfa", 100.0),
            ("2023-01-15", "Beta", 250.0),
            ("2023-02-01", "Alfa", 50.0),
            ("2023-03-10", "Gama", 400.0),
            ("2024-01-05", "Beta", 10.0),
        ];
        let records = rows
            .iter()
            .map(|(d, e, a)| {
                let date = NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap();
                SalesRecord::new(date, e.to_string(), *a, &names)
            })
            .collect();
        SalesTable::new(records, ColumnNames::default()).unwrap()
    }

    #[test]
    fn test_empty_table_rejected() {
        assert!(SalesTable::new(Vec::new(), ColumnNames::default()).is_none());
    }

    #[test]
    fn test_derived_fields() {
        let table = sample_table();
        let first = &table.records()[0];
        assert_eq!(first.year, 2023);
        assert_eq!(first.month, 1);
        assert_eq!(first.month_name, "Janeiro");
        // 2023-01-02 was a Monday
        assert_eq!(first.weekday, 0);
        assert_eq!(first.weekday_name, "Segunda-feira");
    }

    #[test]
    fn test_date_range_and_entities() {
        let table = sample_table();
        let (lo, hi) = table.date_range();
        assert_eq!(lo, NaiveDate::from_ymd_opt(2023, 1, 2).unwrap());
        assert_eq!(hi, NaiveDate::from_ymd_opt(2024, 1, 5).unwrap());
        assert_eq!(table.entities(), vec!["Alfa", "Beta", "Gama"]);
    }

    #[test]
    fn test_filter_is_inclusive_and_non_mutating() {
        let table = sample_table();
        let filter = SalesFilter::new()
            .with_since(NaiveDate::from_ymd_opt(2023, 1, 15).unwrap())
            .with_until(NaiveDate::from_ymd_opt(2023, 3, 10).unwrap());

        let filtered = table.filter(&filter).unwrap();
        assert_eq!(filtered.len(), 3);
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_filter_by_entity() {
        let table = sample_table();
        let filtered = table
            .filter(&SalesFilter::new().with_entities(["Beta"]))
            .unwrap();
        assert!(filtered.records().iter().all(|r| r.entity == "Beta"));
        assert_eq!(filtered.len(), 2);
    }

    #[test]
    fn test_filter_without_matches_is_none() {
        let table = sample_table();
        let filter = SalesFilter::new().with_entities(["Nobody"]);
        assert!(table.filter(&filter).is_none());
    }

    #[test]
    fn test_to_dataframe_shape() {
        let df = sample_table().to_dataframe().unwrap();
        assert_eq!(df.height(), 5);
        assert_eq!(df.width(), 8);
    }
}
