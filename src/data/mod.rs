//! Data module - tolerant loading, the sales table and aggregation

mod amount;
pub mod dates;
mod loader;
mod processor;
mod table;

pub use loader::{LoadError, LoadReport, LoaderOptions, TolerantLoader};
pub use processor::{
    DataProcessor, EntityTotal, HistogramBin, LabelledTotal, MonthlyTotal, ProcessorError,
    SalesReport,
};
pub use table::{SalesFilter, SalesTable};

#[cfg(test)]
pub(crate) use table::tests::sample_table;
