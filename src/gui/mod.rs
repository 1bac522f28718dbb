//! GUI module - dashboard user interface components

mod app;
mod chart_viewer;
mod control_panel;

pub use app::SalesboardApp;
pub use chart_viewer::ChartViewer;
pub use control_panel::{ControlPanel, ControlPanelAction};
