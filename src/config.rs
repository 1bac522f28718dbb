//! Application Configuration
//! JSON-backed settings shared by the loader, the dashboard and batch mode.

use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::Path;
use thiserror::Error;

/// File looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "salesboard.json";

/// Candidate delimiters, in the order they are tried.
pub const DEFAULT_DELIMITERS: [u8; 3] = [b';', b',', b'\t'];

pub const TOP_N_RANGE: RangeInclusive<usize> = 1..=100;
pub const HISTOGRAM_BINS_RANGE: RangeInclusive<usize> = 1..=200;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid delimiter {0:?}: must be a single ASCII character")]
    InvalidDelimiter(String),
    #[error("At least one {0} must be configured")]
    Empty(&'static str),
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: &'static str,
        value: usize,
        min: usize,
        max: usize,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub loader: LoaderSettings,
    pub dashboard: DashboardSettings,
    pub calendar: CalendarNames,
}

/// Fallback ladders used by the tolerant loader.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderSettings {
    /// Candidate delimiters, tried in order.
    pub delimiters: Vec<String>,
    /// Explicit date patterns (chrono syntax), tried in order when default
    /// parsing leaves the whole date column empty.
    pub date_patterns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSettings {
    pub top_n: usize,
    pub histogram_bins: usize,
    pub window_width: f32,
    pub window_height: f32,
}

/// Display names for the derived month/weekday fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarNames {
    /// January first.
    pub months: Vec<String>,
    /// Monday first.
    pub weekdays: Vec<String>,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            delimiters: DEFAULT_DELIMITERS
                .iter()
                .map(|&d| (d as char).to_string())
                .collect(),
            date_patterns: vec![
                "%d/%m/%Y".into(),
                "%Y-%m-%d".into(),
                "%m/%d/%Y".into(),
                "%d-%m-%Y".into(),
                "%d.%m.%Y".into(),
            ],
        }
    }
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            top_n: 10,
            histogram_bins: 20,
            window_width: 1400.0,
            window_height: 850.0,
        }
    }
}

impl Default for CalendarNames {
    fn default() -> Self {
        let months = [
            "Janeiro", "Fevereiro", "Março", "Abril", "Maio", "Junho", "Julho", "Agosto",
            "Setembro", "Outubro", "Novembro", "Dezembro",
        ];
        let weekdays = [
            "Segunda-feira",
            "Terça-feira",
            "Quarta-feira",
            "Quinta-feira",
            "Sexta-feira",
            "Sábado",
            "Domingo",
        ];
        Self {
            months: months.iter().map(|s| s.to_string()).collect(),
            weekdays: weekdays.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CalendarNames {
    /// Name for a 1-based month. Falls back to the number when the configured
    /// list is short.
    pub fn month(&self, month: u32) -> String {
        self.months
            .get(month.saturating_sub(1) as usize)
            .cloned()
            .unwrap_or_else(|| month.to_string())
    }

    /// Name for a weekday counted from Monday = 0.
    pub fn weekday(&self, weekday: u32) -> String {
        self.weekdays
            .get(weekday as usize)
            .cloned()
            .unwrap_or_else(|| weekday.to_string())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            loader: LoaderSettings::default(),
            dashboard: DashboardSettings::default(),
            calendar: CalendarNames::default(),
        }
    }
}

impl AppConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, else `salesboard.json` when it exists, else defaults.
    pub fn resolve(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    Self::load(fallback)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.delimiter_bytes()?;
        if self.loader.date_patterns.is_empty() {
            return Err(ConfigError::Empty("date pattern"));
        }
        check_range("dashboard.top_n", self.dashboard.top_n, &TOP_N_RANGE)?;
        check_range(
            "dashboard.histogram_bins",
            self.dashboard.histogram_bins,
            &HISTOGRAM_BINS_RANGE,
        )?;
        Ok(())
    }

    /// Candidate delimiters as bytes for the CSV reader.
    pub fn delimiter_bytes(&self) -> Result<Vec<u8>, ConfigError> {
        if self.loader.delimiters.is_empty() {
            return Err(ConfigError::Empty("delimiter"));
        }
        self.loader
            .delimiters
            .iter()
            .map(|d| match d.as_bytes() {
                [b] if b.is_ascii() => Ok(*b),
                _ => Err(ConfigError::InvalidDelimiter(d.clone())),
            })
            .collect()
    }
}

fn check_range(
    field: &'static str,
    value: usize,
    range: &RangeInclusive<usize>,
) -> Result<(), ConfigError> {
    if range.contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            min: *range.start(),
            max: *range.end(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_delimiters_in_order() {
        let config = AppConfig::default();
        assert_eq!(config.delimiter_bytes().unwrap(), vec![b';', b',', b'\t']);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"dashboard": {{"top_n": 5}}}}"#).unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(config.dashboard.top_n, 5);
        assert_eq!(config.dashboard.histogram_bins, 20);
        assert_eq!(config.loader, LoaderSettings::default());
    }

    #[test]
    fn test_multi_char_delimiter_rejected() {
        let mut config = AppConfig::default();
        config.loader.delimiters = vec![";;".into()];
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidDelimiter(_))
        ));
    }

    #[test]
    fn test_empty_patterns_rejected() {
        let mut config = AppConfig::default();
        config.loader.date_patterns.clear();
        assert!(matches!(config.validate(), Err(ConfigError::Empty(_))));
    }

    #[test]
    fn test_dashboard_ranges_enforced() {
        let mut config = AppConfig::default();
        config.dashboard.histogram_bins = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "dashboard.histogram_bins",
                ..
            })
        ));

        config.dashboard.histogram_bins = 1_000_000;
        assert!(config.validate().is_err());

        config.dashboard.histogram_bins = 200;
        config.dashboard.top_n = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::OutOfRange {
                field: "dashboard.top_n",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_bins_in_file_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"dashboard": {{"histogram_bins": 0}}}}"#).unwrap();
        assert!(matches!(
            AppConfig::load(file.path()),
            Err(ConfigError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_malformed_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(
            AppConfig::load(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_round_trip_through_file() {
        let mut config = AppConfig::default();
        config.dashboard.histogram_bins = 8;
        config.loader.delimiters = vec!["|".into()];

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string_pretty(&config).unwrap().as_bytes())
            .unwrap();
        assert_eq!(AppConfig::resolve(Some(file.path())).unwrap(), config);
    }

    #[test]
    fn test_calendar_names() {
        let names = CalendarNames::default();
        assert_eq!(names.month(1), "Janeiro");
        assert_eq!(names.month(12), "Dezembro");
        assert_eq!(names.weekday(6), "Domingo");
        assert_eq!(names.month(13), "13");
    }
}
