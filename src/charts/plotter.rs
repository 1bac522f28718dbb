//! Chart Plotter Module
//! Creates interactive visualizations using egui_plot.

use crate::data::{EntityTotal, HistogramBin, LabelledTotal, MonthlyTotal};
use crate::format::format_brl;
use crate::stats::AmountStats;
use egui::{Color32, RichText};
use egui_plot::{Bar, BarChart, GridMark, Line, Plot, PlotPoints, Points};
use std::ops::RangeInclusive;

pub const PRIMARY_COLOR: Color32 = Color32::from_rgb(52, 152, 219); // Blue

pub const PALETTE: [Color32; 10] = [
    Color32::from_rgb(231, 76, 60),  // Red
    Color32::from_rgb(46, 204, 113), // Green
    Color32::from_rgb(155, 89, 182), // Purple
    Color32::from_rgb(243, 156, 18), // Orange
    Color32::from_rgb(26, 188, 156), // Teal
    Color32::from_rgb(233, 30, 99),  // Pink
    Color32::from_rgb(0, 188, 212),  // Cyan
    Color32::from_rgb(255, 87, 34),  // Deep Orange
    Color32::from_rgb(121, 85, 72),  // Brown
    Color32::from_rgb(96, 125, 139), // Blue Grey
];

const CHART_HEIGHT: f32 = 260.0;

/// Creates dashboard charts using egui_plot.
pub struct ChartPlotter;

impl ChartPlotter {
    pub fn get_color(index: usize) -> Color32 {
        PALETTE[index % PALETTE.len()]
    }

    /// Axis label for integer positions only; bars sit on 0, 1, 2...
    fn category_label(labels: &[String], mark: GridMark) -> String {
        let rounded = mark.value.round();
        if (mark.value - rounded).abs() > 1e-6 || rounded < 0.0 {
            return String::new();
        }
        labels.get(rounded as usize).cloned().unwrap_or_default()
    }

    /// Compact axis value: 1.5k, 2.3M.
    fn short_value(mark: GridMark, _range: &RangeInclusive<f64>) -> String {
        let v = mark.value;
        let abs = v.abs();
        if abs >= 1e6 {
            format!("{:.1}M", v / 1e6)
        } else if abs >= 1e3 {
            format!("{:.1}k", v / 1e3)
        } else {
            format!("{:.0}", v)
        }
    }

    /// Bar chart of labelled values, one color per bar.
    pub fn draw_bar_chart(ui: &mut egui::Ui, id: &str, labels: &[String], values: &[f64]) {
        let axis_labels = labels.to_vec();

        Plot::new(id)
            .height(CHART_HEIGHT)
            .allow_zoom(false)
            .allow_drag(false)
            .allow_scroll(false)
            .y_axis_label("R$")
            .x_axis_formatter(move |mark, _range| Self::category_label(&axis_labels, mark))
            .y_axis_formatter(Self::short_value)
            .show(ui, |plot_ui| {
                let bars: Vec<Bar> = values
                    .iter()
                    .enumerate()
                    .map(|(i, &v)| {
                        Bar::new(i as f64, v)
                            .width(0.6)
                            .fill(Self::get_color(i))
                            .name(format!("{}: {}", labels[i], format_brl(v)))
                    })
                    .collect();
                plot_ui.bar_chart(BarChart::new(bars));
            });
    }

    /// Ranking chart for the top entities.
    pub fn draw_top_entities(ui: &mut egui::Ui, top: &[EntityTotal]) {
        let labels: Vec<String> = top.iter().map(|t| t.entity.clone()).collect();
        let values: Vec<f64> = top.iter().map(|t| t.total).collect();
        Self::draw_bar_chart(ui, "top_entities", &labels, &values);
    }

    /// Totals per calendar bucket (weekday, month, year).
    pub fn draw_labelled_totals(ui: &mut egui::Ui, id: &str, totals: &[LabelledTotal]) {
        let labels: Vec<String> = totals.iter().map(|t| t.label.clone()).collect();
        let values: Vec<f64> = totals.iter().map(|t| t.total).collect();
        Self::draw_bar_chart(ui, id, &labels, &values);
    }

    /// Monthly revenue line, one point per (year, month).
    pub fn draw_monthly_line(ui: &mut egui::Ui, monthly: &[MonthlyTotal]) {
        let labels: Vec<String> = monthly.iter().map(|m| m.label()).collect();
        let points: Vec<[f64; 2]> = monthly
            .iter()
            .enumerate()
            .map(|(i, m)| [i as f64, m.total])
            .collect();

        Plot::new("monthly_line")
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .y_axis_label("R$")
            .x_axis_formatter(move |mark, _range| Self::category_label(&labels, mark))
            .y_axis_formatter(Self::short_value)
            .show(ui, |plot_ui| {
                plot_ui.line(
                    Line::new(PlotPoints::from_iter(points.iter().copied()))
                        .color(PRIMARY_COLOR)
                        .width(2.0)
                        .name("Faturamento"),
                );
                plot_ui.points(
                    Points::new(PlotPoints::from_iter(points.iter().copied()))
                        .radius(3.5)
                        .color(PRIMARY_COLOR),
                );
            });
    }

    /// Histogram of sale amounts.
    pub fn draw_histogram(ui: &mut egui::Ui, bins: &[HistogramBin]) {
        Plot::new("amount_histogram")
            .height(CHART_HEIGHT)
            .allow_scroll(false)
            .x_axis_label("Valor")
            .y_axis_label("Vendas")
            .x_axis_formatter(Self::short_value)
            .show(ui, |plot_ui| {
                let bars: Vec<Bar> = bins
                    .iter()
                    .map(|b| {
                        let width = (b.upper - b.lower).max(f64::EPSILON);
                        Bar::new(b.center(), b.count as f64)
                            .width(width)
                            .fill(PRIMARY_COLOR.gamma_multiply(0.6))
                            .stroke(egui::Stroke::new(1.0, PRIMARY_COLOR))
                            .name(format!(
                                "{} - {}: {}",
                                format_brl(b.lower),
                                format_brl(b.upper),
                                b.count
                            ))
                    })
                    .collect();
                plot_ui.bar_chart(BarChart::new(bars));
            });
    }

    /// Ranking table with totals, means, counts and share.
    pub fn draw_ranking_table(ui: &mut egui::Ui, totals: &[EntityTotal], entity_header: &str) {
        egui::Frame::none()
            .fill(ui.visuals().widgets.noninteractive.bg_fill)
            .rounding(5.0)
            .inner_margin(8.0)
            .show(ui, |ui| {
                egui::Grid::new("ranking_table")
                    .striped(true)
                    .min_col_width(60.0)
                    .spacing([12.0, 4.0])
                    .show(ui, |ui| {
                        ui.label(RichText::new("#").strong());
                        ui.label(RichText::new(entity_header).strong());
                        ui.label(RichText::new("Total").strong());
                        ui.label(RichText::new("Média").strong());
                        ui.label(RichText::new("Vendas").strong());
                        ui.label(RichText::new("%").strong());
                        ui.end_row();

                        for (rank, t) in totals.iter().enumerate() {
                            ui.label((rank + 1).to_string());
                            ui.label(&t.entity);
                            ui.label(format_brl(t.total));
                            ui.label(format_brl(t.mean));
                            ui.label(t.count.to_string());
                            ui.label(format!("{:.1}%", t.share * 100.0));
                            ui.end_row();
                        }
                    });
            });
    }

    /// Descriptive statistics of amounts.
    pub fn draw_stats_table(ui: &mut egui::Ui, stats: &AmountStats) {
        let rows = [
            ("Média", format_brl(stats.mean)),
            ("Mediana", format_brl(stats.median)),
            ("Desvio padrão", format_brl(stats.std)),
            ("Mínimo", format_brl(stats.min)),
            ("Máximo", format_brl(stats.max)),
            ("P05", format_brl(stats.p05)),
            ("P95", format_brl(stats.p95)),
        ];

        egui::Grid::new("amount_stats")
            .striped(true)
            .spacing([12.0, 4.0])
            .show(ui, |ui| {
                for (name, value) in rows {
                    ui.label(RichText::new(name).strong());
                    ui.label(value);
                    ui.end_row();
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mark(value: f64) -> GridMark {
        GridMark {
            value,
            step_size: 1.0,
        }
    }

    #[test]
    fn test_category_label_only_on_integers() {
        let labels = vec!["A".to_string(), "B".to_string()];
        assert_eq!(ChartPlotter::category_label(&labels, mark(1.0)), "B");
        assert_eq!(ChartPlotter::category_label(&labels, mark(0.5)), "");
        assert_eq!(ChartPlotter::category_label(&labels, mark(-1.0)), "");
        assert_eq!(ChartPlotter::category_label(&labels, mark(5.0)), "");
    }

    #[test]
    fn test_short_value() {
        let range = 0.0..=1.0;
        assert_eq!(ChartPlotter::short_value(mark(1500.0), &range), "1.5k");
        assert_eq!(ChartPlotter::short_value(mark(2_300_000.0), &range), "2.3M");
        assert_eq!(ChartPlotter::short_value(mark(12.0), &range), "12");
    }
}
