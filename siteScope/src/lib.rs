// Main module declarations for the site report service

// Fixed constants and runtime configuration
pub mod config {
    pub mod constants;
    pub mod app_config;
}

// Feature and coordinate models
pub mod models {
    pub mod feature;
    pub mod query_point;
}

// Data loaders
pub mod data {
    pub mod dataset_loader;
}

// Spatial analysis and report composition
pub mod analysis {
    pub mod radius_filter;
    pub mod attribute_counts;
    pub mod report_composer;
}

// Rendering of maps, charts, tables and the final PDF
pub mod render {
    pub mod map_renderer;
    pub mod charts;
    pub mod pdf;
}

// Utility functions
pub mod utils {
    pub mod logging;
    pub mod csv_export;
}

// HTTP interaction layer
pub mod server {
    pub mod handlers;
    pub mod routes;
    pub mod pages;
}

// CLI interface
pub mod cli {
    pub mod cli;
}

pub mod error;

// Re-export commonly used items
pub use crate::analysis::radius_filter::{filter_within_radius, FilteredResult};
pub use crate::analysis::report_composer::{compose_report, PlotBuffer, ReportArtifact};
pub use crate::data::dataset_loader::GeoDatasets;
pub use crate::error::ReportError;
pub use crate::models::query_point::QueryPoint;
pub use crate::render::pdf::assemble_pdf;
