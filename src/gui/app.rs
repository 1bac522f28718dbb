//! Salesboard Main Application
//! Main window with control panel and dashboard.

use crate::config::AppConfig;
use crate::data::{DataProcessor, LoadError, LoadReport, LoaderOptions, SalesTable, TolerantLoader};
use crate::export::export_sales_table;
use crate::gui::{ChartViewer, ControlPanel, ControlPanelAction};
use egui::SidePanel;
use std::path::PathBuf;
use std::sync::mpsc::{channel, Receiver};
use std::thread;

/// CSV loading result from background thread
enum LoadResult {
    Complete {
        table: SalesTable,
        report: LoadReport,
    },
    Error(LoadError),
}

/// Main application window.
pub struct SalesboardApp {
    loader_options: LoaderOptions,
    /// Table of the current session; filters derive copies from it.
    table: Option<SalesTable>,
    control_panel: ControlPanel,
    chart_viewer: ChartViewer,

    // Async CSV loading
    load_rx: Option<Receiver<LoadResult>>,
    is_loading: bool,
}

impl SalesboardApp {
    pub fn new(
        _cc: &eframe::CreationContext<'_>,
        config: &AppConfig,
        loader_options: LoaderOptions,
        initial_file: Option<PathBuf>,
    ) -> Self {
        let mut app = Self {
            loader_options,
            table: None,
            control_panel: ControlPanel::new(
                config.dashboard.top_n,
                config.dashboard.histogram_bins,
            ),
            chart_viewer: ChartViewer::new(),
            load_rx: None,
            is_loading: false,
        };
        if let Some(path) = initial_file {
            app.start_load(path);
        }
        app
    }

    /// Handle CSV file selection
    fn handle_browse_csv(&mut self) {
        if self.is_loading {
            return;
        }

        if let Some(path) = rfd::FileDialog::new()
            .add_filter("CSV Files", &["csv", "txt", "tsv"])
            .pick_file()
        {
            self.start_load(path);
        }
    }

    /// Load a file in a background thread; the previous table is discarded.
    fn start_load(&mut self, path: PathBuf) {
        self.table = None;
        self.chart_viewer.clear();
        self.control_panel.settings.csv_path = Some(path.clone());
        self.control_panel.set_status("Loading CSV file...");
        self.is_loading = true;

        let (tx, rx) = channel();
        self.load_rx = Some(rx);
        let loader = TolerantLoader::new(self.loader_options.clone());

        thread::spawn(move || {
            let result = match loader.load_path(&path) {
                Ok((table, report)) => LoadResult::Complete { table, report },
                Err(e) => LoadResult::Error(e),
            };
            let _ = tx.send(result);
        });
    }

    /// Check for CSV loading results
    fn check_load_results(&mut self) {
        let Some(rx) = self.load_rx.take() else {
            return;
        };

        match rx.try_recv() {
            Ok(LoadResult::Complete { table, report }) => {
                self.control_panel.on_table_loaded(table.entities(), &report);
                self.control_panel.set_status(&format!(
                    "Loaded {} rows ({} dropped)",
                    report.rows_loaded,
                    report.dropped_rows()
                ));
                self.table = Some(table);
                self.is_loading = false;
                self.refresh_report();
            }
            Ok(LoadResult::Error(error)) => {
                let message = error.user_message();
                self.control_panel.on_load_failed(&message);
                self.chart_viewer.set_message(message);
                self.is_loading = false;
            }
            Err(std::sync::mpsc::TryRecvError::Empty) => {
                self.load_rx = Some(rx);
            }
            Err(std::sync::mpsc::TryRecvError::Disconnected) => {
                let message = LoadError::ProcessingError("loader thread stopped".to_string())
                    .user_message();
                self.control_panel.on_load_failed(&message);
                self.chart_viewer.set_message(message);
                self.is_loading = false;
            }
        }
    }

    /// Filtered copy of the session table, or a message explaining why there
    /// is nothing to show.
    fn filtered_table(&self) -> Result<SalesTable, String> {
        let Some(table) = &self.table else {
            return Err("No data loaded".to_string());
        };
        let filter = self.control_panel.filter()?;
        if filter.is_empty() {
            return Ok(table.clone());
        }
        table
            .filter(&filter)
            .ok_or_else(|| "No sales match the current filters".to_string())
    }

    /// Recompute every aggregate from the session table.
    fn refresh_report(&mut self) {
        let table = match self.filtered_table() {
            Ok(table) => table,
            Err(message) => {
                self.chart_viewer.set_message(message.clone());
                self.control_panel.set_error(&message);
                return;
            }
        };

        let settings = &self.control_panel.settings;
        match DataProcessor::build_report(&table, settings.top_n, settings.histogram_bins) {
            Ok(report) => {
                let rows = report.summary.count;
                self.chart_viewer
                    .set_report(report, &table.columns().entity);
                self.control_panel
                    .set_status(&format!("Showing {} sales", rows));
            }
            Err(e) => {
                tracing::error!(error = %e, "aggregation failed");
                let message = format!("Error: {}", e);
                self.chart_viewer.set_message(message.clone());
                self.control_panel.set_error(&message);
            }
        }
    }

    /// Export the filtered table as a spreadsheet.
    fn handle_export_xlsx(&mut self) {
        let table = match self.filtered_table() {
            Ok(table) => table,
            Err(message) => {
                self.control_panel.set_error(&message);
                return;
            }
        };

        let Some(output_path) = rfd::FileDialog::new()
            .add_filter("Excel", &["xlsx"])
            .set_file_name("salesboard_export.xlsx")
            .save_file()
        else {
            return;
        };

        match export_sales_table(&table, &output_path) {
            Ok(()) => self.control_panel.set_status(&format!(
                "Exported {} rows to {}",
                table.len(),
                output_path.display()
            )),
            Err(e) => {
                tracing::error!(error = %e, "export failed");
                self.control_panel.set_error(&format!("Export error: {}", e));
            }
        }
    }
}

impl eframe::App for SalesboardApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.check_load_results();

        if self.is_loading {
            ctx.request_repaint();
        }

        // Left panel - Control Panel
        SidePanel::left("control_panel")
            .min_width(300.0)
            .max_width(350.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    let action = self.control_panel.show(ui);

                    match action {
                        ControlPanelAction::BrowseCsv => self.handle_browse_csv(),
                        ControlPanelAction::FiltersChanged => self.refresh_report(),
                        ControlPanelAction::ResetFilters => {
                            self.control_panel.reset_filters();
                            self.refresh_report();
                        }
                        ControlPanelAction::ExportXlsx => self.handle_export_xlsx(),
                        ControlPanelAction::None => {}
                    }
                });
            });

        // Central panel - Dashboard
        egui::CentralPanel::default().show(ctx, |ui| {
            self.chart_viewer.show(ui);
        });
    }
}
