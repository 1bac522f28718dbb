//! Charts module - dashboard chart rendering

mod plotter;

pub use plotter::ChartPlotter;
