//! Chart Viewer Widget
//! Central panel: KPI cards and the dashboard charts for the current report.

use crate::charts::ChartPlotter;
use crate::data::SalesReport;
use crate::format::format_brl;
use egui::{Color32, RichText, ScrollArea};

const CARD_WIDTH: f32 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DashboardTab {
    #[default]
    Overview,
    Calendar,
    Distribution,
    Ranking,
}

/// What the central panel currently shows.
enum ViewState {
    Empty,
    /// A loaded table with no rows under the current filters, or a load error.
    Message(String),
    Report(Box<SalesReport>),
}

/// Dashboard display area.
pub struct ChartViewer {
    state: ViewState,
    tab: DashboardTab,
    entity_header: String,
}

impl Default for ChartViewer {
    fn default() -> Self {
        Self {
            state: ViewState::Empty,
            tab: DashboardTab::default(),
            entity_header: "Cliente".to_string(),
        }
    }
}

impl ChartViewer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.state = ViewState::Empty;
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.state = ViewState::Message(message.into());
    }

    pub fn set_report(&mut self, report: SalesReport, entity_header: &str) {
        self.state = ViewState::Report(Box::new(report));
        self.entity_header = entity_header.to_string();
    }

    pub fn show(&mut self, ui: &mut egui::Ui) {
        let report = match &self.state {
            ViewState::Empty => {
                ui.centered_and_justified(|ui| {
                    ui.label(RichText::new("Select a CSV file to start").size(20.0));
                });
                return;
            }
            ViewState::Message(message) => {
                ui.centered_and_justified(|ui| {
                    ui.label(
                        RichText::new(message)
                            .size(18.0)
                            .color(Color32::from_rgb(220, 53, 69)),
                    );
                });
                return;
            }
            ViewState::Report(report) => report,
        };

        Self::draw_kpis(ui, report);
        ui.add_space(10.0);

        ui.horizontal(|ui| {
            ui.selectable_value(&mut self.tab, DashboardTab::Overview, "Overview");
            ui.selectable_value(&mut self.tab, DashboardTab::Calendar, "Calendar");
            ui.selectable_value(&mut self.tab, DashboardTab::Distribution, "Distribution");
            ui.selectable_value(&mut self.tab, DashboardTab::Ranking, "Ranking");
        });
        ui.separator();

        ScrollArea::vertical()
            .auto_shrink([false, false])
            .show(ui, |ui| match self.tab {
                DashboardTab::Overview => {
                    Self::section(ui, "Monthly revenue");
                    ChartPlotter::draw_monthly_line(ui, &report.monthly);
                    ui.add_space(15.0);
                    Self::section(ui, &format!("Top {} clients", report.top_entities().len()));
                    ChartPlotter::draw_top_entities(ui, report.top_entities());
                }
                DashboardTab::Calendar => {
                    Self::section(ui, "Revenue by weekday");
                    ChartPlotter::draw_labelled_totals(ui, "weekday_totals", &report.weekdays);
                    ui.add_space(15.0);
                    Self::section(ui, "Revenue by month");
                    ChartPlotter::draw_labelled_totals(ui, "month_totals", &report.months_of_year);
                    ui.add_space(15.0);
                    Self::section(ui, "Revenue by year");
                    ChartPlotter::draw_labelled_totals(ui, "year_totals", &report.yearly);
                }
                DashboardTab::Distribution => {
                    Self::section(ui, "Sale amount distribution");
                    ChartPlotter::draw_histogram(ui, &report.histogram);
                    ui.add_space(15.0);
                    ChartPlotter::draw_stats_table(ui, &report.amount_stats);
                }
                DashboardTab::Ranking => {
                    ChartPlotter::draw_ranking_table(
                        ui,
                        &report.entity_totals,
                        &self.entity_header,
                    );
                }
            });
    }

    fn section(ui: &mut egui::Ui, title: &str) {
        ui.label(RichText::new(title).size(16.0).strong());
        ui.add_space(5.0);
    }

    fn draw_kpis(ui: &mut egui::Ui, report: &SalesReport) {
        let s = &report.summary;
        let period = format!(
            "{} - {}",
            s.first_date.format("%d/%m/%Y"),
            s.last_date.format("%d/%m/%Y")
        );
        let cards = [
            ("Faturamento total", format_brl(s.total)),
            ("Ticket médio", format_brl(s.mean)),
            ("Vendas", s.count.to_string()),
            ("Clientes", s.entities.to_string()),
            ("Período", period),
        ];

        ui.horizontal_wrapped(|ui| {
            for (title, value) in cards {
                egui::Frame::none()
                    .fill(ui.visuals().widgets.noninteractive.bg_fill)
                    .rounding(8.0)
                    .inner_margin(10.0)
                    .show(ui, |ui| {
                        ui.set_width(CARD_WIDTH);
                        ui.label(RichText::new(title).size(12.0).color(Color32::GRAY));
                        ui.label(RichText::new(value).size(18.0).strong());
                    });
            }
        });
    }
}
