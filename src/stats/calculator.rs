//! Statistics Calculator Module
//! Descriptive statistics over sale amounts, overall and per entity.

use crate::data::SalesTable;
use rayon::prelude::*;
use statrs::statistics::Statistics;
use std::collections::{BTreeMap, HashMap};

/// Descriptive statistics for a set of amounts.
#[derive(Debug, Clone, PartialEq)]
pub struct AmountStats {
    pub count: usize,
    pub total: f64,
    pub mean: f64,
    pub median: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
    pub p95: f64,
    pub p05: f64,
}

impl Default for AmountStats {
    fn default() -> Self {
        Self {
            count: 0,
            total: 0.0,
            mean: f64::NAN,
            median: f64::NAN,
            std: f64::NAN,
            min: f64::NAN,
            max: f64::NAN,
            p95: f64::NAN,
            p05: f64::NAN,
        }
    }
}

/// Handles statistical calculations with multi-threading support.
pub struct StatsCalculator;

impl StatsCalculator {
    /// Compute descriptive statistics for an array of values.
    pub fn compute_descriptive_stats(values: &[f64]) -> AmountStats {
        let n = values.len();
        if n == 0 {
            return AmountStats::default();
        }

        let mut sorted = values.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

        let median = if n % 2 == 0 {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        } else {
            sorted[n / 2]
        };

        // Sample standard deviation; a single value has no spread.
        let std = if n > 1 { values.std_dev() } else { 0.0 };

        AmountStats {
            count: n,
            total: values.iter().sum(),
            mean: values.mean(),
            median,
            std,
            min: sorted[0],
            max: sorted[n - 1],
            p95: Self::percentile(&sorted, 95.0),
            p05: Self::percentile(&sorted, 5.0),
        }
    }

    /// Calculate percentile using linear interpolation (NumPy compatible).
    pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
        let n = sorted_values.len();
        if n == 0 {
            return f64::NAN;
        }
        if n == 1 {
            return sorted_values[0];
        }

        let rank = (p / 100.0) * (n - 1) as f64;
        let lower = rank.floor() as usize;
        let upper = (rank.ceil() as usize).min(n - 1);
        let frac = rank - lower as f64;

        if lower == upper {
            sorted_values[lower]
        } else {
            sorted_values[lower] * (1.0 - frac) + sorted_values[upper] * frac
        }
    }

    /// Statistics for every entity, computed in parallel. Keys are sorted.
    pub fn compute_entity_stats_parallel(table: &SalesTable) -> BTreeMap<String, AmountStats> {
        let mut by_entity: HashMap<&str, Vec<f64>> = HashMap::new();
        for record in table.records() {
            by_entity
                .entry(record.entity.as_str())
                .or_default()
                .push(record.amount);
        }

        by_entity
            .into_par_iter()
            .map(|(entity, values)| {
                (
                    entity.to_string(),
                    Self::compute_descriptive_stats(&values),
                )
            })
            .collect::<Vec<_>>()
            .into_iter()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_table;

    #[test]
    fn test_descriptive_stats() {
        let stats = StatsCalculator::compute_descriptive_stats(&[1.0, 2.0, 3.0, 4.0]);
        assert_eq!(stats.count, 4);
        assert_eq!(stats.total, 10.0);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert!((stats.std - 1.2909944487).abs() < 1e-9);
    }

    #[test]
    fn test_single_value_has_zero_std() {
        let stats = StatsCalculator::compute_descriptive_stats(&[7.0]);
        assert_eq!(stats.std, 0.0);
        assert_eq!(stats.p95, 7.0);
    }

    #[test]
    fn test_empty_values() {
        let stats = StatsCalculator::compute_descriptive_stats(&[]);
        assert_eq!(stats.count, 0);
        assert!(stats.mean.is_nan());
    }

    #[test]
    fn test_percentile_interpolation() {
        let sorted = [10.0, 20.0, 30.0, 40.0, 50.0];
        assert_eq!(StatsCalculator::percentile(&sorted, 50.0), 30.0);
        assert!((StatsCalculator::percentile(&sorted, 95.0) - 48.0).abs() < 1e-9);
        assert!((StatsCalculator::percentile(&sorted, 5.0) - 12.0).abs() < 1e-9);
    }

    #[test]
    fn test_entity_stats() {
        let stats = StatsCalculator::compute_entity_stats_parallel(&sample_table());
        let keys: Vec<&String> = stats.keys().collect();
        assert_eq!(keys, vec!["Alfa", "Beta", "Gama"]);
        assert_eq!(stats["Alfa"].total, 150.0);
        assert_eq!(stats["Gama"].count, 1);
    }
}
