//! Statistics module - descriptive statistics over sale amounts

mod calculator;

pub use calculator::{AmountStats, StatsCalculator};
