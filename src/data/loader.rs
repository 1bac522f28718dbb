//! Tolerant Sales Loader
//! Turns a raw delimited-text blob into a cleaned `SalesTable`.
//!
//! Pipeline: delimiter ladder -> first three columns (date, entity, amount,
//! by position) -> date normalization -> amount coercion -> non-empty check.
//!
//! Column roles are positional. A file whose first three columns are in a
//! different order loads garbage or fails with `DateFormatError`; nothing
//! looks at header names or cell contents to reorder them.

use crate::config::{AppConfig, CalendarNames, ConfigError, DEFAULT_DELIMITERS};
use crate::data::amount::parse_amount;
use crate::data::dates::{self, DateStrategy};
use crate::data::table::{ColumnNames, SalesRecord, SalesTable};
use csv::{ByteRecord, ReaderBuilder};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;

const MIN_COLUMNS: usize = 3;
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Format error: {0}")]
    FormatError(String),
    #[error("Date format error: no known date pattern matched")]
    DateFormatError,
    #[error("Empty result: no valid rows left after cleaning")]
    EmptyResultError,
    #[error("Processing error: {0}")]
    ProcessingError(String),
}

impl LoadError {
    /// Message shown to the user in the dashboard or batch output.
    pub fn user_message(&self) -> String {
        match self {
            LoadError::FormatError(_) => {
                "The file could not be split into at least 3 columns with any of the supported delimiters (; , tab).".to_string()
            }
            LoadError::DateFormatError => {
                "The first column does not contain dates in any supported format.".to_string()
            }
            LoadError::EmptyResultError => {
                "No row has both a valid date and a numeric amount.".to_string()
            }
            LoadError::ProcessingError(msg) => format!("Unexpected error while loading: {}", msg),
        }
    }
}

impl From<std::io::Error> for LoadError {
    fn from(err: std::io::Error) -> Self {
        LoadError::ProcessingError(err.to_string())
    }
}

/// Loader settings: the two fallback ladders and the calendar names used for
/// derived fields.
#[derive(Debug, Clone)]
pub struct LoaderOptions {
    pub delimiters: Vec<u8>,
    pub date_patterns: Vec<String>,
    pub calendar: CalendarNames,
}

impl Default for LoaderOptions {
    fn default() -> Self {
        let config = AppConfig::default();
        Self {
            delimiters: DEFAULT_DELIMITERS.to_vec(),
            date_patterns: config.loader.date_patterns,
            calendar: config.calendar,
        }
    }
}

impl LoaderOptions {
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        Ok(Self {
            delimiters: config.delimiter_bytes()?,
            date_patterns: config.loader.date_patterns.clone(),
            calendar: config.calendar.clone(),
        })
    }
}

/// Structured status of a successful load.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub delimiter: u8,
    pub header_detected: bool,
    pub date_strategy: DateStrategy,
    /// Data records read (header excluded, malformed included).
    pub rows_read: usize,
    /// Wrong column count or undecodable text.
    pub malformed_rows: usize,
    pub invalid_dates: usize,
    pub invalid_amounts: usize,
    pub rows_loaded: usize,
}

impl LoadReport {
    pub fn delimiter_label(&self) -> String {
        match self.delimiter {
            b'\t' => "tab".to_string(),
            d => (d as char).to_string(),
        }
    }

    pub fn dropped_rows(&self) -> usize {
        self.malformed_rows + self.invalid_dates + self.invalid_amounts
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} rows loaded (delimiter '{}', dates: {}, dropped: {} malformed, {} bad dates, {} bad amounts)",
            self.rows_loaded,
            self.delimiter_label(),
            self.date_strategy,
            self.malformed_rows,
            self.invalid_dates,
            self.invalid_amounts
        )
    }
}

/// First three columns of the accepted parse, as raw text.
#[derive(Debug, Default)]
struct RawColumns {
    header: Option<ColumnNames>,
    dates: Vec<String>,
    entities: Vec<String>,
    amounts: Vec<String>,
    rows_read: usize,
    malformed_rows: usize,
}

/// Loads sales data with fallback ladders for delimiters and date formats.
pub struct TolerantLoader {
    options: LoaderOptions,
}

impl Default for TolerantLoader {
    fn default() -> Self {
        Self::new(LoaderOptions::default())
    }
}

impl TolerantLoader {
    pub fn new(options: LoaderOptions) -> Self {
        Self { options }
    }

    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<(SalesTable, LoadReport), LoadError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| {
            LoadError::ProcessingError(format!("cannot open {}: {}", path.display(), e))
        })?;
        self.load_reader(file)
    }

    pub fn load_reader<R: Read>(&self, mut reader: R) -> Result<(SalesTable, LoadReport), LoadError> {
        let mut raw = Vec::new();
        reader.read_to_end(&mut raw)?;
        self.load(&raw)
    }

    /// Load a raw blob. Every failure comes back as a `LoadError`.
    pub fn load(&self, raw: &[u8]) -> Result<(SalesTable, LoadReport), LoadError> {
        let result = self.load_inner(raw);
        match &result {
            Ok((_, report)) => tracing::info!("{}", report),
            Err(e) => tracing::error!(error = %e, "load failed"),
        }
        result
    }

    fn load_inner(&self, raw: &[u8]) -> Result<(SalesTable, LoadReport), LoadError> {
        let raw = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);

        let (delimiter, columns) = self
            .options
            .delimiters
            .iter()
            .find_map(|&d| self.parse_with_delimiter(raw, d).map(|cols| (d, cols)))
            .ok_or_else(|| LoadError::FormatError("insufficient columns".to_string()))?;

        let parsed = dates::normalize_dates(&columns.dates, &self.options.date_patterns)
            .ok_or(LoadError::DateFormatError)?;
        tracing::debug!(
            strategy = %parsed.strategy,
            valid = parsed.valid_count(),
            "date column normalized"
        );

        let mut invalid_dates = 0;
        let mut invalid_amounts = 0;
        let mut records = Vec::with_capacity(columns.dates.len());

        for ((date, entity), amount) in parsed
            .values
            .iter()
            .zip(&columns.entities)
            .zip(&columns.amounts)
        {
            let Some(date) = date else {
                invalid_dates += 1;
                continue;
            };
            let Some(amount) = parse_amount(amount) else {
                invalid_amounts += 1;
                continue;
            };
            records.push(SalesRecord::new(
                *date,
                entity.trim().to_string(),
                amount,
                &self.options.calendar,
            ));
        }

        if invalid_dates > 0 || invalid_amounts > 0 {
            tracing::warn!(invalid_dates, invalid_amounts, "dropped rows during cleaning");
        }

        let rows_loaded = records.len();
        let header_detected = columns.header.is_some();
        let table = SalesTable::new(records, columns.header.unwrap_or_default())
            .ok_or(LoadError::EmptyResultError)?;

        let report = LoadReport {
            delimiter,
            header_detected,
            date_strategy: parsed.strategy,
            rows_read: columns.rows_read,
            malformed_rows: columns.malformed_rows,
            invalid_dates,
            invalid_amounts,
            rows_loaded,
        };
        Ok((table, report))
    }

    /// Lenient parse with one delimiter. `None` when the table is narrower
    /// than three columns.
    fn parse_with_delimiter(&self, raw: &[u8], delimiter: u8) -> Option<RawColumns> {
        let mut reader = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(raw);

        let mut width = None;
        let mut columns = RawColumns::default();
        let mut record = ByteRecord::new();

        loop {
            match reader.read_byte_record(&mut record) {
                Ok(true) => {}
                Ok(false) => break,
                Err(e) => {
                    // Unrecoverable reader state; keep what was read so far.
                    tracing::warn!(error = %e, "stopping parse at reader error");
                    break;
                }
            }

            if is_blank(&record) {
                continue;
            }

            let Some(expected) = width else {
                if record.len() < MIN_COLUMNS {
                    tracing::debug!(
                        delimiter = %(delimiter as char).escape_default(),
                        width = record.len(),
                        "too few columns"
                    );
                    return None;
                }
                width = Some(record.len());
                match decode_first_three(&record) {
                    Some(fields) if self.is_header(&fields) => {
                        columns.header = Some(ColumnNames {
                            date: fields[0].trim().to_string(),
                            entity: fields[1].trim().to_string(),
                            amount: fields[2].trim().to_string(),
                        });
                    }
                    Some(fields) => columns.push(fields),
                    None => {
                        columns.rows_read += 1;
                        columns.malformed_rows += 1;
                    }
                }
                continue;
            };

            columns.rows_read += 1;
            if record.len() != expected {
                columns.malformed_rows += 1;
                continue;
            }
            match decode_first_three(&record) {
                Some(fields) => columns.push(fields),
                None => columns.malformed_rows += 1,
            }
        }

        // Empty input never reaches three columns.
        width?;

        if columns.malformed_rows > 0 {
            tracing::warn!(
                malformed = columns.malformed_rows,
                "skipped malformed rows"
            );
        }
        Some(columns)
    }

    /// The first record is data when its first cell reads as a date or its
    /// third cell reads as an amount; otherwise it is a header.
    fn is_header(&self, fields: &[String; 3]) -> bool {
        !dates::looks_like_date(&fields[0], &self.options.date_patterns)
            && parse_amount(&fields[2]).is_none()
    }
}

impl RawColumns {
    fn push(&mut self, [date, entity, amount]: [String; 3]) {
        self.rows_read += 1;
        self.dates.push(date);
        self.entities.push(entity);
        self.amounts.push(amount);
    }
}

fn is_blank(record: &ByteRecord) -> bool {
    record.iter().all(|field| field.trim_ascii().is_empty())
}

/// UTF-8 decode of the first three fields; `None` on invalid text.
fn decode_first_three(record: &ByteRecord) -> Option<[String; 3]> {
    let field = |i: usize| -> Option<String> {
        std::str::from_utf8(record.get(i)?).ok().map(str::to_string)
    };
    Some([field(0)?, field(1)?, field(2)?])
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn load(input: &str) -> Result<(SalesTable, LoadReport), LoadError> {
        TolerantLoader::default().load(input.as_bytes())
    }

    #[test]
    fn test_semicolon_with_header() {
        let (table, report) =
            load("Data;Cliente;Valor\n01/15/2023;Alfa;100\n01/16/2023;Beta;200.5\n").unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(report.delimiter, b';');
        assert!(report.header_detected);
        assert_eq!(table.columns().entity, "Cliente");
        assert_eq!(table.records()[1].amount, 200.5);
    }

    #[test]
    fn test_headerless_keeps_first_row() {
        let (table, report) = load("2023-01-01;Alfa;100\n2023-01-02;Beta;50\n").unwrap();
        assert_eq!(table.len(), 2);
        assert!(!report.header_detected);
        assert_eq!(table.columns(), &ColumnNames::default());
    }

    #[test]
    fn test_invalid_amount_row_dropped() {
        let (table, report) = load("01/01/2023;A;100\n02/01/2023;B;abc\n").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(report.invalid_amounts, 1);
        assert_eq!(table.records()[0].entity, "A");
        assert_eq!(table.records()[0].amount, 100.0);
    }

    #[test]
    fn test_comma_fallback() {
        let (table, report) = load("date,client,value\n2023-05-01,Alfa,10\n").unwrap();
        assert_eq!(report.delimiter, b',');
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_tab_fallback() {
        let (_, report) = load("2023-05-01\tAlfa\t10\n").unwrap();
        assert_eq!(report.delimiter, b'\t');
    }

    #[test]
    fn test_extra_columns_discarded() {
        let (table, _) = load("2023-05-01;Alfa;10;ignored;more\n").unwrap();
        assert_eq!(table.records()[0].amount, 10.0);
        assert_eq!(table.records()[0].entity, "Alfa");
    }

    #[test]
    fn test_insufficient_columns() {
        assert_eq!(
            load("2023-01-01;100\n2023-01-02;200\n").unwrap_err(),
            LoadError::FormatError("insufficient columns".to_string())
        );
        assert!(matches!(load(""), Err(LoadError::FormatError(_))));
    }

    #[test]
    fn test_all_dates_invalid() {
        let input = "not-a-date;A;1\nnot-a-date;B;2\n";
        assert_eq!(load(input).unwrap_err(), LoadError::DateFormatError);
    }

    #[test]
    fn test_two_digit_years_rejected() {
        assert_eq!(
            load("15/03/23;A;10\n16/03/23;B;20\n").unwrap_err(),
            LoadError::DateFormatError
        );
        assert_eq!(
            load("23-03-15;A;10\n").unwrap_err(),
            LoadError::DateFormatError
        );
    }

    #[test]
    fn test_short_year_rows_dropped_from_valid_column() {
        let (table, report) = load("2023-03-15;A;10\n23-03-16;B;20\n").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(report.invalid_dates, 1);
        assert_eq!(table.records()[0].year, 2023);
    }

    #[test]
    fn test_us_grouped_and_malformed_amounts_dropped() {
        let (table, report) =
            load("2023-01-01;A;1,234.56\n2023-01-02;B;1.2.3\n2023-01-03;C;1.234,56\n").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(report.invalid_amounts, 2);
        assert_eq!(table.records()[0].entity, "C");
        assert_eq!(table.records()[0].amount, 1234.56);
    }

    #[test]
    fn test_single_row_invalid_amount_is_empty_result() {
        assert_eq!(
            load("01/01/2023;A;abc\n").unwrap_err(),
            LoadError::EmptyResultError
        );
    }

    #[test]
    fn test_ambiguous_date_uses_default_parsing() {
        let (table, report) = load("01/02/2023;A;1\n").unwrap();
        assert_eq!(
            table.records()[0].date,
            NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
        );
        assert_eq!(report.date_strategy, DateStrategy::Inferred("%m/%d/%Y".into()));
    }

    #[test]
    fn test_malformed_rows_skipped() {
        let input = "2023-01-01;A;1\n2023-01-02;B\n2023-01-03;C;3\n";
        let (table, report) = load(input).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(report.malformed_rows, 1);
        assert_eq!(report.rows_read, 3);
    }

    #[test]
    fn test_invalid_utf8_row_skipped() {
        let mut input = b"2023-01-01;A;1\n2023-01-02;".to_vec();
        input.extend_from_slice(&[0xC3, 0x28]);
        input.extend_from_slice(b";2\n2023-01-03;C;3\n");
        let (table, report) = TolerantLoader::default().load(&input).unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(report.malformed_rows, 1);
    }

    #[test]
    fn test_partial_date_failures_tolerated() {
        let (table, report) = load("2023-01-01;A;1\nsoon;B;2\n").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(report.invalid_dates, 1);
    }

    #[test]
    fn test_brazilian_amounts_and_bom() {
        let input = "\u{feff}Data;Cliente;Valor\n10/02/2023;Alfa;1.234,56\n";
        let (table, report) = load(input).unwrap();
        assert!(report.header_detected);
        assert_eq!(table.records()[0].amount, 1234.56);
    }

    #[test]
    fn test_default_options_match_default_config() {
        let from_config = LoaderOptions::from_config(&AppConfig::default()).unwrap();
        let defaults = LoaderOptions::default();
        assert_eq!(defaults.delimiters, from_config.delimiters);
        assert_eq!(defaults.date_patterns, from_config.date_patterns);
    }

    #[test]
    fn test_load_reader() {
        let cursor = std::io::Cursor::new("2023-01-01;A;5\n");
        let (table, _) = TolerantLoader::default().load_reader(cursor).unwrap();
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_missing_file_is_processing_error() {
        let err = TolerantLoader::default()
            .load_path("/definitely/not/here.csv")
            .unwrap_err();
        assert!(matches!(err, LoadError::ProcessingError(_)));
    }

    #[test]
    fn test_user_messages_are_distinct() {
        let messages = [
            LoadError::FormatError("x".into()).user_message(),
            LoadError::DateFormatError.user_message(),
            LoadError::EmptyResultError.user_message(),
        ];
        assert_ne!(messages[0], messages[1]);
        assert_ne!(messages[1], messages[2]);
    }
}
