use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use sitescope::analysis::radius_filter::filter_within_radius;
use sitescope::analysis::report_composer::{compose_report, poi_table, PlotBuffer};
use sitescope::cli::cli::{Args, Command};
use sitescope::config::app_config::AppConfig;
use sitescope::data::dataset_loader::load_datasets;
use sitescope::models::query_point::QueryPoint;
use sitescope::render::pdf::assemble_pdf;
use sitescope::server::routes::serve;
use sitescope::utils::csv_export::write_poi_csv;
use sitescope::utils::logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    logging::init_logging(args.enable_timing(), args.debug_logging())?;

    let mut config = match args.config() {
        Some(path) => AppConfig::load_from_file(path)?,
        None => AppConfig::default(),
    };
    args.apply_overrides(&mut config);

    // Dataset failures abort startup
    let datasets = Arc::new(
        load_datasets(&config.datasets)
            .await
            .context("failed to load geospatial datasets")?,
    );
    info!(features = datasets.total_features(), "Datasets ready");

    match args.command().clone() {
        Command::Serve { .. } => serve(&config, datasets).await?,
        Command::Report { lat, lon, out, csv } => {
            let point = QueryPoint::new(lat, lon)?;
            let filtered = filter_within_radius(&datasets, point.latitude(), point.longitude())?;

            let mut buffer = PlotBuffer::new();
            compose_report(&filtered, &point, &mut buffer)?;
            if let Some(csv_path) = csv {
                write_poi_csv(&poi_table(&filtered.pois)?, &csv_path)?;
            }

            let bytes = assemble_pdf(buffer)?;
            fs::write(&out, &bytes).with_context(|| format!("failed to write {}", out))?;
            println!("Report written to {} ({} bytes)", out, bytes.len());
        }
    }

    logging::print_timing_report();
    Ok(())
}
