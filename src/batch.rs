//! Headless mode: load, filter, print the summary and optionally export.

use crate::cli::Cli;
use crate::config::AppConfig;
use crate::data::{DataProcessor, LoaderOptions, SalesReport, TolerantLoader};
use crate::export::export_sales_table;
use crate::format::format_brl;
use crate::stats::{AmountStats, StatsCalculator};
use anyhow::{anyhow, Context, Result};
use std::collections::BTreeMap;
use std::fmt::Write;
use tracing::info;

pub fn run(cli: &Cli, config: &AppConfig) -> Result<()> {
    let path = cli
        .file
        .as_deref()
        .context("batch mode needs a CSV file")?;
    let filter = cli.filter().map_err(|e| anyhow!(e))?;
    let options = LoaderOptions::from_config(config).context("invalid loader settings")?;

    let (table, load_report) = TolerantLoader::new(options)
        .load_path(path)
        .map_err(|e| anyhow!(e.user_message()))?;
    info!("{}: {}", path.display(), load_report);

    let table = if filter.is_empty() {
        table
    } else {
        table
            .filter(&filter)
            .context("no sales match the given filters")?
    };

    let top_n = cli.top.unwrap_or(config.dashboard.top_n);
    let report = DataProcessor::build_report(&table, top_n, config.dashboard.histogram_bins)
        .context("failed to aggregate sales")?;
    let entity_stats = StatsCalculator::compute_entity_stats_parallel(&table);
    print!(
        "{}",
        render_report(&report, &entity_stats, &table.columns().entity)
    );

    if let Some(output) = &cli.export {
        export_sales_table(&table, output)
            .with_context(|| format!("failed to write {}", output.display()))?;
        println!("\nExported {} rows to {}", table.len(), output.display());
    }
    Ok(())
}

/// Plain-text summary: headline figures, ranking and monthly totals.
pub fn render_report(
    report: &SalesReport,
    entity_stats: &BTreeMap<String, AmountStats>,
    entity_header: &str,
) -> String {
    let s = &report.summary;
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "Faturamento total: {}", format_brl(s.total));
    let _ = writeln!(out, "Total: {:.2}", s.total);
    let _ = writeln!(out, "Ticket médio: {}", format_brl(s.mean));
    let _ = writeln!(out, "Vendas: {}", s.count);
    let _ = writeln!(out, "Clientes: {}", s.entities);
    let _ = writeln!(
        out,
        "Período: {} - {}",
        s.first_date.format("%d/%m/%Y"),
        s.last_date.format("%d/%m/%Y")
    );

    let top = report.top_entities();
    let _ = writeln!(out, "\nTop {} ({})", top.len(), entity_header);
    let width = top.iter().map(|t| t.entity.chars().count()).max().unwrap_or(0);
    for (rank, t) in top.iter().enumerate() {
        let median = entity_stats
            .get(&t.entity)
            .map(|stats| format_brl(stats.median))
            .unwrap_or_default();
        let _ = writeln!(
            out,
            "{:>3}. {:<width$}  {:>18}  {:>5.1}%  {} vendas, mediana {}",
            rank + 1,
            t.entity,
            format_brl(t.total),
            t.share * 100.0,
            t.count,
            median,
            width = width
        );
    }

    let _ = writeln!(out, "\nFaturamento mensal");
    for m in &report.monthly {
        let _ = writeln!(out, "  {}  {:>18}", m.label(), format_brl(m.total));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::sample_table;
    use std::path::PathBuf;

    fn rendered(top_n: usize) -> String {
        let table = sample_table();
        let report = DataProcessor::build_report(&table, top_n, 5).unwrap();
        let stats = StatsCalculator::compute_entity_stats_parallel(&table);
        render_report(&report, &stats, &table.columns().entity)
    }

    #[test]
    fn test_headline_figures() {
        let out = rendered(3);
        assert!(out.contains("Faturamento total: R$ 810,00"));
        assert!(out.contains("Total: 810.00"));
        assert!(out.contains("Vendas: 5"));
        assert!(out.contains("Clientes: 3"));
        assert!(out.contains("Período: 02/01/2023 - 05/01/2024"));
    }

    #[test]
    fn test_ranking_is_cut_at_top_n() {
        let out = rendered(2);
        assert!(out.contains("Top 2 (Cliente)"));
        assert!(out.contains("1. Gama"));
        assert!(out.contains("2. Beta"));
        assert!(!out.contains("3. Alfa"));
    }

    #[test]
    fn test_monthly_lines_in_order() {
        let out = rendered(3);
        let jan = out.find("2023-01").unwrap();
        let feb = out.find("2023-02").unwrap();
        let next_year = out.find("2024-01").unwrap();
        assert!(jan < feb && feb < next_year);
        assert!(out.contains("R$ 350,00"));
    }

    #[test]
    fn test_run_exports_filtered_table() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("vendas.csv");
        std::fs::write(
            &csv,
            "Data;Cliente;Valor\n2023-01-02;Alfa;100\n2023-02-03;Beta;200\n",
        )
        .unwrap();
        let output = dir.path().join("out.xlsx");

        let cli = Cli {
            file: Some(csv),
            batch: true,
            export: Some(output.clone()),
            top: Some(5),
            since: None,
            until: None,
            clients: vec!["Beta".to_string()],
            config: None,
            verbose: false,
        };
        run(&cli, &AppConfig::default()).unwrap();
        assert!(output.exists());
    }

    #[test]
    fn test_run_reports_load_failure() {
        let dir = tempfile::tempdir().unwrap();
        let csv = dir.path().join("vendas.csv");
        std::fs::write(&csv, "just one column\nanother\n").unwrap();

        let cli = Cli {
            file: Some(csv),
            batch: true,
            export: None,
            top: None,
            since: None,
            until: None,
            clients: Vec::new(),
            config: None,
            verbose: false,
        };
        let err = run(&cli, &AppConfig::default()).unwrap_err();
        assert!(err.to_string().contains("at least 3 columns"));
    }

    #[test]
    fn test_run_needs_a_file() {
        let cli = Cli {
            file: None::<PathBuf>,
            batch: true,
            export: None,
            top: None,
            since: None,
            until: None,
            clients: Vec::new(),
            config: None,
            verbose: false,
        };
        assert!(run(&cli, &AppConfig::default()).is_err());
    }
}
