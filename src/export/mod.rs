//! Export module - spreadsheet re-export of derived tables

mod xlsx;

pub use xlsx::export_sales_table;
