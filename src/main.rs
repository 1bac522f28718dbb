//! Salesboard - sales dashboard for loosely formatted CSV exports
//!
//! Opens an interactive dashboard, or prints a summary in batch mode.

mod batch;
mod charts;
mod cli;
mod config;
mod data;
mod export;
mod format;
mod gui;
mod stats;

use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cli::Cli;
use config::AppConfig;
use data::LoaderOptions;
use eframe::egui;
use gui::SalesboardApp;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // --verbose overrides RUST_LOG; logs go to stderr so batch output stays clean.
    let filter = if cli.verbose {
        EnvFilter::new("salesboard=info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match AppConfig::resolve(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) if cli.is_batch() => return Err(e).context("failed to load configuration"),
        Err(e) => {
            warn!(error = %e, "invalid configuration, using defaults");
            AppConfig::default()
        }
    };

    if cli.is_batch() {
        return batch::run(&cli, &config);
    }

    let loader_options = LoaderOptions::from_config(&config).unwrap_or_else(|e| {
        warn!(error = %e, "invalid loader settings, using defaults");
        LoaderOptions::default()
    });

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([config.dashboard.window_width, config.dashboard.window_height])
            .with_min_inner_size([1000.0, 650.0])
            .with_title("Salesboard"),
        ..Default::default()
    };

    let initial_file = cli.file.clone();
    eframe::run_native(
        "Salesboard",
        options,
        Box::new(move |cc| {
            Ok(Box::new(SalesboardApp::new(
                cc,
                &config,
                loader_options,
                initial_file,
            )))
        }),
    )
    .map_err(|e| anyhow!("failed to start the dashboard: {}", e))
}
