//! Data Processor Module
//! Aggregations over a cleaned sales table: totals, rankings, time series
//! and the amount histogram.

use crate::data::table::SalesTable;
use crate::stats::{AmountStats, StatsCalculator};
use chrono::NaiveDate;
use polars::prelude::*;
use std::cmp::Ordering;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessorError {
    #[error("Polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("Histogram needs at least one bin")]
    InvalidBins,
}

/// Headline figures of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    pub total: f64,
    pub mean: f64,
    pub count: usize,
    pub entities: usize,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

/// Aggregate of one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityTotal {
    pub entity: String,
    pub total: f64,
    pub mean: f64,
    pub count: usize,
    /// Fraction of the grand total.
    pub share: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyTotal {
    pub year: i32,
    pub month: u32,
    pub total: f64,
    pub count: usize,
}

impl MonthlyTotal {
    pub fn label(&self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }
}

/// Total for a calendar bucket (year, weekday, month of year).
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledTotal {
    pub key: i64,
    pub label: String,
    pub total: f64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HistogramBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
}

impl HistogramBin {
    pub fn center(&self) -> f64 {
        (self.lower + self.upper) / 2.0
    }
}

/// Everything the dashboard and batch output display for one table.
#[derive(Debug, Clone)]
pub struct SalesReport {
    pub summary: Summary,
    pub amount_stats: AmountStats,
    pub entity_totals: Vec<EntityTotal>,
    pub top_n: usize,
    pub monthly: Vec<MonthlyTotal>,
    pub yearly: Vec<LabelledTotal>,
    pub weekdays: Vec<LabelledTotal>,
    pub months_of_year: Vec<LabelledTotal>,
    pub histogram: Vec<HistogramBin>,
}

impl SalesReport {
    pub fn top_entities(&self) -> &[EntityTotal] {
        let n = self.top_n.min(self.entity_totals.len());
        &self.entity_totals[..n]
    }
}

/// Handles aggregation operations.
pub struct DataProcessor;

impl DataProcessor {
    pub fn summary(table: &SalesTable) -> Summary {
        let amounts = table.amounts();
        let total: f64 = amounts.iter().sum();
        let (first_date, last_date) = table.date_range();
        Summary {
            total,
            mean: total / amounts.len() as f64,
            count: amounts.len(),
            entities: table.entities().len(),
            first_date,
            last_date,
        }
    }

    /// Every entity with sum, mean and count, ranked by total descending.
    /// Ties are ordered by entity name.
    pub fn entity_totals(table: &SalesTable) -> Result<Vec<EntityTotal>, ProcessorError> {
        let df = table.to_dataframe()?;
        let grouped = Self::totals_by(&df, &["entity"])?;

        let entities = string_values(&grouped, "entity")?;
        let totals = f64_values(&grouped, "total")?;
        let means = f64_values(&grouped, "mean")?;
        let counts = i64_values(&grouped, "count")?;
        let grand_total: f64 = totals.iter().sum();

        let mut result: Vec<EntityTotal> = entities
            .into_iter()
            .zip(totals)
            .zip(means)
            .zip(counts)
            .map(|(((entity, total), mean), count)| EntityTotal {
                entity,
                total,
                mean,
                count: count as usize,
                share: if grand_total != 0.0 {
                    total / grand_total
                } else {
                    0.0
                },
            })
            .collect();

        result.sort_by(|a, b| {
            b.total
                .partial_cmp(&a.total)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.entity.cmp(&b.entity))
        });
        Ok(result)
    }

    /// Totals per (year, month), chronological.
    pub fn monthly_series(table: &SalesTable) -> Result<Vec<MonthlyTotal>, ProcessorError> {
        let df = table.to_dataframe()?;
        let grouped = Self::totals_by(&df, &["year", "month"])?;

        let years = i64_values(&grouped, "year")?;
        let months = i64_values(&grouped, "month")?;
        let totals = f64_values(&grouped, "total")?;
        let counts = i64_values(&grouped, "count")?;

        let mut series: Vec<MonthlyTotal> = years
            .into_iter()
            .zip(months)
            .zip(totals)
            .zip(counts)
            .map(|(((year, month), total), count)| MonthlyTotal {
                year: year as i32,
                month: month as u32,
                total,
                count: count as usize,
            })
            .collect();
        series.sort_by_key(|m| (m.year, m.month));
        Ok(series)
    }

    pub fn yearly_totals(table: &SalesTable) -> Result<Vec<LabelledTotal>, ProcessorError> {
        let df = table.to_dataframe()?;
        let grouped = Self::totals_by(&df, &["year"])?;
        let keys = i64_values(&grouped, "year")?;
        let labels = keys.iter().map(|y| y.to_string()).collect();
        Self::labelled(&grouped, keys, labels)
    }

    /// Totals per weekday, Monday first.
    pub fn weekday_totals(table: &SalesTable) -> Result<Vec<LabelledTotal>, ProcessorError> {
        let df = table.to_dataframe()?;
        let grouped = Self::totals_by(&df, &["weekday", "weekday_name"])?;
        let keys = i64_values(&grouped, "weekday")?;
        let labels = string_values(&grouped, "weekday_name")?;
        Self::labelled(&grouped, keys, labels)
    }

    /// Totals per calendar month across years, January first.
    pub fn month_of_year_totals(table: &SalesTable) -> Result<Vec<LabelledTotal>, ProcessorError> {
        let df = table.to_dataframe()?;
        let grouped = Self::totals_by(&df, &["month", "month_name"])?;
        let keys = i64_values(&grouped, "month")?;
        let labels = string_values(&grouped, "month_name")?;
        Self::labelled(&grouped, keys, labels)
    }

    /// Equal-width histogram of amounts. The maximum lands in the last bin;
    /// a single distinct value gives a single bin.
    pub fn histogram(table: &SalesTable, bins: usize) -> Result<Vec<HistogramBin>, ProcessorError> {
        if bins == 0 {
            return Err(ProcessorError::InvalidBins);
        }
        let amounts = table.amounts();
        let min = amounts.iter().copied().fold(f64::INFINITY, f64::min);
        let max = amounts.iter().copied().fold(f64::NEG_INFINITY, f64::max);

        if min == max {
            return Ok(vec![HistogramBin {
                lower: min,
                upper: max,
                count: amounts.len(),
            }]);
        }

        let width = (max - min) / bins as f64;
        let mut result: Vec<HistogramBin> = (0..bins)
            .map(|i| HistogramBin {
                lower: min + i as f64 * width,
                upper: if i + 1 == bins {
                    max
                } else {
                    min + (i + 1) as f64 * width
                },
                count: 0,
            })
            .collect();

        for v in amounts {
            let idx = (((v - min) / width).floor() as usize).min(bins - 1);
            result[idx].count += 1;
        }
        Ok(result)
    }

    /// Full report for display.
    pub fn build_report(
        table: &SalesTable,
        top_n: usize,
        bins: usize,
    ) -> Result<SalesReport, ProcessorError> {
        Ok(SalesReport {
            summary: Self::summary(table),
            amount_stats: StatsCalculator::compute_descriptive_stats(&table.amounts()),
            entity_totals: Self::entity_totals(table)?,
            top_n,
            monthly: Self::monthly_series(table)?,
            yearly: Self::yearly_totals(table)?,
            weekdays: Self::weekday_totals(table)?,
            months_of_year: Self::month_of_year_totals(table)?,
            histogram: Self::histogram(table, bins)?,
        })
    }

    fn totals_by(df: &DataFrame, keys: &[&str]) -> Result<DataFrame, ProcessorError> {
        let by: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();
        let grouped = df
            .clone()
            .lazy()
            .group_by(by)
            .agg([
                col("amount").sum().alias("total"),
                col("amount").mean().alias("mean"),
                col("amount").count().alias("count"),
            ])
            .collect()?;
        Ok(grouped)
    }

    fn labelled(
        grouped: &DataFrame,
        keys: Vec<i64>,
        labels: Vec<String>,
    ) -> Result<Vec<LabelledTotal>, ProcessorError> {
        let totals = f64_values(grouped, "total")?;
        let counts = i64_values(grouped, "count")?;

        let mut result: Vec<LabelledTotal> = keys
            .into_iter()
            .zip(labels)
            .zip(totals)
            .zip(counts)
            .map(|(((key, label), total), count)| LabelledTotal {
                key,
                label,
                total,
                count: count as usize,
            })
            .collect();
        result.sort_by_key(|t| t.key);
        Ok(result)
    }
}

fn f64_values(df: &DataFrame, name: &str) -> Result<Vec<f64>, ProcessorError> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Float64)?;
    Ok(series.f64()?.into_iter().map(|v| v.unwrap_or(0.0)).collect())
}

fn i64_values(df: &DataFrame, name: &str) -> Result<Vec<i64>, ProcessorError> {
    let series = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Int64)?;
    Ok(series.i64()?.into_iter().map(|v| v.unwrap_or(0)).collect())
}

fn string_values(df: &DataFrame, name: &str) -> Result<Vec<String>, ProcessorError> {
    let series = df.column(name)?.as_materialized_series();
    Ok(series
        .str()?
        .into_iter()
        .map(|v| v.unwrap_or_default().to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_table;

    #[test]
    fn test_summary() {
        let summary = DataProcessor::summary(&sample_table());
        assert_eq!(summary.total, 810.0);
        assert_eq!(summary.count, 5);
        assert_eq!(summary.entities, 3);
        assert!((summary.mean - 162.0).abs() < 1e-9);
    }

    #[test]
    fn test_entity_totals_ranked() {
        let totals = DataProcessor::entity_totals(&sample_table()).unwrap();
        let names: Vec<&str> = totals.iter().map(|t| t.entity.as_str()).collect();
        assert_eq!(names, vec!["Gama", "Beta", "Alfa"]);
        assert_eq!(totals[1].total, 260.0);
        assert_eq!(totals[1].count, 2);
        assert_eq!(totals[1].mean, 130.0);
        let share_sum: f64 = totals.iter().map(|t| t.share).sum();
        assert!((share_sum - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_top_entities_truncates() {
        let report = DataProcessor::build_report(&sample_table(), 2, 5).unwrap();
        let top = report.top_entities();
        assert_eq!(top.len(), 2);
        assert_eq!(top[0].entity, "Gama");
        assert_eq!(top[1].entity, "Beta");

        let report = DataProcessor::build_report(&sample_table(), 50, 5).unwrap();
        assert_eq!(report.top_entities().len(), 3);
    }

    #[test]
    fn test_monthly_series_chronological() {
        let monthly = DataProcessor::monthly_series(&sample_table()).unwrap();
        let labels: Vec<String> = monthly.iter().map(|m| m.label()).collect();
        assert_eq!(labels, vec!["2023-01", "2023-02", "2023-03", "2024-01"]);
        assert_eq!(monthly[0].total, 350.0);
        assert_eq!(monthly[0].count, 2);
    }

    #[test]
    fn test_month_of_year_merges_years() {
        let months = DataProcessor::month_of_year_totals(&sample_table()).unwrap();
        assert_eq!(months[0].label, "Janeiro");
        assert_eq!(months[0].total, 360.0);
        assert_eq!(months.len(), 3);
    }

    #[test]
    fn test_yearly_and_weekday_totals() {
        let table = sample_table();
        let yearly = DataProcessor::yearly_totals(&table).unwrap();
        assert_eq!(yearly.len(), 2);
        assert_eq!(yearly[1].label, "2024");
        assert_eq!(yearly[1].total, 10.0);

        let weekdays = DataProcessor::weekday_totals(&table).unwrap();
        assert!(weekdays.windows(2).all(|w| w[0].key < w[1].key));
        let count: usize = weekdays.iter().map(|w| w.count).sum();
        assert_eq!(count, 5);
    }

    #[test]
    fn test_histogram_edges() {
        let bins = DataProcessor::histogram(&sample_table(), 4).unwrap();
        assert_eq!(bins.len(), 4);
        assert_eq!(bins[0].lower, 10.0);
        assert_eq!(bins[3].upper, 400.0);
        // 10, 50, 100 | 250 | - | 400
        let counts: Vec<usize> = bins.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![3, 0, 1, 1]);
    }

    #[test]
    fn test_histogram_rejects_zero_bins() {
        assert!(matches!(
            DataProcessor::histogram(&sample_table(), 0),
            Err(ProcessorError::InvalidBins)
        ));
    }

    #[test]
    fn test_report_top_slice() {
        let report = DataProcessor::build_report(&sample_table(), 1, 5).unwrap();
        assert_eq!(report.top_entities().len(), 1);
        assert_eq!(report.entity_totals.len(), 3);
        assert_eq!(report.histogram.len(), 5);
    }
}
