//! Control Panel Widget
//! Left side panel with file selection, filters and export.

use crate::config::{HISTOGRAM_BINS_RANGE, TOP_N_RANGE};
use crate::data::dates::parse_user_date;
use crate::data::{LoadReport, SalesFilter};
use chrono::NaiveDate;
use egui::{Color32, RichText, ScrollArea};
use std::path::PathBuf;

/// Per-session user choices.
#[derive(Default, Clone)]
pub struct UserSettings {
    pub csv_path: Option<PathBuf>,
    pub since_text: String,
    pub until_text: String,
    pub top_n: usize,
    pub histogram_bins: usize,
}

impl UserSettings {
    /// Build the table filter from the text fields and the client checkboxes.
    /// All clients selected means no client restriction.
    pub fn to_filter(&self, entities: &[String], selected: &[bool]) -> Result<SalesFilter, String> {
        let mut filter = SalesFilter::new();
        if let Some(date) = parse_filter_date(&self.since_text)? {
            filter = filter.with_since(date);
        }
        if let Some(date) = parse_filter_date(&self.until_text)? {
            filter = filter.with_until(date);
        }
        if let (Some(since), Some(until)) = (filter.since, filter.until) {
            if since > until {
                return Err("Start date is after end date".to_string());
            }
        }

        if selected.iter().any(|s| !s) {
            filter = filter.with_entities(
                entities
                    .iter()
                    .zip(selected)
                    .filter(|(_, &s)| s)
                    .map(|(e, _)| e.clone()),
            );
        }
        Ok(filter)
    }
}

/// Blank text means no bound.
fn parse_filter_date(text: &str) -> Result<Option<NaiveDate>, String> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    parse_user_date(text)
        .map(Some)
        .ok_or_else(|| format!("Invalid date '{}': use DD/MM/YYYY", text))
}

/// Left side control panel with file selection and filter controls.
pub struct ControlPanel {
    pub settings: UserSettings,
    pub entities: Vec<String>,
    pub selected_entities: Vec<bool>,
    pub entity_search: String,
    pub report_lines: Vec<String>,
    pub status: String,
    pub is_error: bool,
    pub data_loaded: bool,
}

impl ControlPanel {
    pub fn new(top_n: usize, histogram_bins: usize) -> Self {
        Self {
            settings: UserSettings {
                top_n,
                histogram_bins,
                ..UserSettings::default()
            },
            entities: Vec::new(),
            selected_entities: Vec::new(),
            entity_search: String::new(),
            report_lines: Vec::new(),
            status: "Ready".to_string(),
            is_error: false,
            data_loaded: false,
        }
    }

    /// Reset filters for a freshly loaded table.
    pub fn on_table_loaded(&mut self, entities: Vec<String>, report: &LoadReport) {
        self.selected_entities = vec![true; entities.len()];
        self.entities = entities;
        self.entity_search.clear();
        self.settings.since_text.clear();
        self.settings.until_text.clear();
        self.report_lines = vec![
            format!("Rows loaded: {} of {}", report.rows_loaded, report.rows_read),
            format!("Delimiter: {}", report.delimiter_label()),
            format!(
                "Header: {}",
                if report.header_detected { "yes" } else { "no" }
            ),
            format!("Dates: {}", report.date_strategy),
            format!("Rows dropped: {}", report.dropped_rows()),
        ];
        self.data_loaded = true;
    }

    /// Forget the previous table after a failed load.
    pub fn on_load_failed(&mut self, message: &str) {
        self.entities.clear();
        self.selected_entities.clear();
        self.report_lines.clear();
        self.data_loaded = false;
        self.set_error(message);
    }

    pub fn filter(&self) -> Result<SalesFilter, String> {
        self.settings
            .to_filter(&self.entities, &self.selected_entities)
    }

    pub fn set_status(&mut self, status: &str) {
        self.status = status.to_string();
        self.is_error = false;
    }

    pub fn set_error(&mut self, status: &str) {
        self.status = status.to_string();
        self.is_error = true;
    }

    /// Draw the control panel
    pub fn show(&mut self, ui: &mut egui::Ui) -> ControlPanelAction {
        let mut action = ControlPanelAction::None;

        // Title
        ui.vertical_centered(|ui| {
            ui.add_space(5.0);
            ui.label(
                RichText::new("📊 Salesboard")
                    .size(22.0)
                    .color(Color32::from_rgb(100, 149, 237)),
            );
            ui.label(RichText::new("Painel de Vendas").size(11.0).color(Color32::GRAY));
        });
        ui.add_space(10.0);
        ui.separator();
        ui.add_space(5.0);

        // ===== Data Source =====
        ui.label(RichText::new("📁 Data Source").size(14.0).strong());
        ui.add_space(5.0);

        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                ui.horizontal(|ui| {
                    let path_text = self
                        .settings
                        .csv_path
                        .as_ref()
                        .and_then(|p| p.file_name())
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_else(|| "No file selected".to_string());

                    ui.label(RichText::new(&path_text).size(12.0));

                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("📂 Browse").clicked() {
                            action = ControlPanelAction::BrowseCsv;
                        }
                    });
                });

                for line in &self.report_lines {
                    ui.label(RichText::new(line).size(11.0).color(Color32::GRAY));
                }
            });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        ui.add_enabled_ui(self.data_loaded, |ui| {
            // ===== Period =====
            ui.label(RichText::new("📅 Period").size(14.0).strong());
            ui.add_space(5.0);

            let label_width = 60.0;
            ui.horizontal(|ui| {
                ui.add_sized([label_width, 20.0], egui::Label::new("From:"));
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.settings.since_text)
                        .hint_text("DD/MM/YYYY")
                        .desired_width(120.0),
                );
                if response.lost_focus() {
                    action = ControlPanelAction::FiltersChanged;
                }
            });
            ui.horizontal(|ui| {
                ui.add_sized([label_width, 20.0], egui::Label::new("To:"));
                let response = ui.add(
                    egui::TextEdit::singleline(&mut self.settings.until_text)
                        .hint_text("DD/MM/YYYY")
                        .desired_width(120.0),
                );
                if response.lost_focus() {
                    action = ControlPanelAction::FiltersChanged;
                }
            });

            ui.add_space(15.0);
            ui.separator();
            ui.add_space(10.0);

            // ===== Clients =====
            ui.label(RichText::new("👥 Clients").size(14.0).strong());
            ui.add_space(5.0);
            ui.add(
                egui::TextEdit::singleline(&mut self.entity_search)
                    .hint_text("Search...")
                    .desired_width(f32::INFINITY),
            );

            let search = self.entity_search.to_lowercase();
            egui::Frame::none()
                .fill(ui.visuals().widgets.noninteractive.bg_fill)
                .rounding(5.0)
                .inner_margin(5.0)
                .show(ui, |ui| {
                    ScrollArea::vertical().max_height(200.0).show(ui, |ui| {
                        for (i, entity) in self.entities.iter().enumerate() {
                            if !search.is_empty() && !entity.to_lowercase().contains(&search) {
                                continue;
                            }
                            if i < self.selected_entities.len()
                                && ui.checkbox(&mut self.selected_entities[i], entity).changed()
                            {
                                action = ControlPanelAction::FiltersChanged;
                            }
                        }
                    });
                });

            ui.add_space(5.0);
            ui.horizontal(|ui| {
                if ui.small_button("Select All").clicked() {
                    self.selected_entities.iter_mut().for_each(|v| *v = true);
                    action = ControlPanelAction::FiltersChanged;
                }
                if ui.small_button("Clear All").clicked() {
                    self.selected_entities.iter_mut().for_each(|v| *v = false);
                    action = ControlPanelAction::FiltersChanged;
                }
            });

            ui.add_space(15.0);
            ui.separator();
            ui.add_space(10.0);

            // ===== Display =====
            ui.label(RichText::new("⚙️ Display").size(14.0).strong());
            ui.add_space(5.0);
            ui.horizontal(|ui| {
                ui.label("Top N:");
                if ui
                    .add(egui::DragValue::new(&mut self.settings.top_n).range(TOP_N_RANGE))
                    .changed()
                {
                    action = ControlPanelAction::FiltersChanged;
                }
            });
            ui.horizontal(|ui| {
                ui.label("Histogram bins:");
                if ui
                    .add(egui::DragValue::new(&mut self.settings.histogram_bins).range(HISTOGRAM_BINS_RANGE))
                    .changed()
                {
                    action = ControlPanelAction::FiltersChanged;
                }
            });

            ui.add_space(15.0);
            ui.separator();
            ui.add_space(10.0);

            // ===== Action Buttons =====
            ui.vertical_centered(|ui| {
                let reset = egui::Button::new(RichText::new("↺ Reset Filters").size(14.0))
                    .min_size(egui::vec2(150.0, 30.0));
                if ui.add(reset).clicked() {
                    action = ControlPanelAction::ResetFilters;
                }

                ui.add_space(8.0);

                let export = egui::Button::new(RichText::new("📄 Export XLSX").size(14.0))
                    .min_size(egui::vec2(150.0, 30.0));
                if ui.add(export).clicked() {
                    action = ControlPanelAction::ExportXlsx;
                }
            });
        });

        ui.add_space(15.0);
        ui.separator();
        ui.add_space(10.0);

        // ===== Status =====
        let status_color = if self.is_error {
            Color32::from_rgb(220, 53, 69)
        } else {
            Color32::GRAY
        };
        ui.label(RichText::new(&self.status).size(11.0).color(status_color));

        action
    }

    /// Restore every filter to "everything".
    pub fn reset_filters(&mut self) {
        self.settings.since_text.clear();
        self.settings.until_text.clear();
        self.entity_search.clear();
        self.selected_entities.iter_mut().for_each(|v| *v = true);
    }
}

/// Actions triggered by control panel
#[derive(Debug, Clone, PartialEq)]
pub enum ControlPanelAction {
    None,
    BrowseCsv,
    FiltersChanged,
    ResetFilters,
    ExportXlsx,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entities() -> Vec<String> {
        vec!["Alfa".into(), "Beta".into()]
    }

    #[test]
    fn test_empty_settings_mean_no_filter() {
        let filter = UserSettings::default()
            .to_filter(&entities(), &[true, true])
            .unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_dates_in_both_formats() {
        let settings = UserSettings {
            since_text: "01/02/2023".into(),
            until_text: "2023-03-31".into(),
            ..UserSettings::default()
        };
        let filter = settings.to_filter(&entities(), &[true, true]).unwrap();
        assert_eq!(filter.since, NaiveDate::from_ymd_opt(2023, 2, 1));
        assert_eq!(filter.until, NaiveDate::from_ymd_opt(2023, 3, 31));
    }

    #[test]
    fn test_partial_client_selection() {
        let filter = UserSettings::default()
            .to_filter(&entities(), &[false, true])
            .unwrap();
        let set = filter.entities.unwrap();
        assert_eq!(set.len(), 1);
        assert!(set.contains("Beta"));
    }

    #[test]
    fn test_invalid_and_inverted_dates() {
        let bad = UserSettings {
            since_text: "yesterday".into(),
            ..UserSettings::default()
        };
        assert!(bad.to_filter(&entities(), &[true, true]).is_err());

        let inverted = UserSettings {
            since_text: "10/02/2023".into(),
            until_text: "01/02/2023".into(),
            ..UserSettings::default()
        };
        assert!(inverted.to_filter(&entities(), &[true, true]).is_err());
    }
}
