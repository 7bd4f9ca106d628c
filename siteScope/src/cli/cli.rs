use clap::{Parser, Subcommand};

use crate::config::app_config::AppConfig;
use crate::config::constants::REPORT_FILE_NAME;

#[derive(Parser)]
#[command(author, version, about = "Buildings, roads and POIs around a point, as a map and a PDF report", long_about = None)]
pub struct Args {
    #[command(subcommand)]
    command: Command,

    #[arg(long, global = true, help = "JSON config file; flags below override it")]
    config: Option<String>,

    #[arg(long, global = true, default_value_t = false)]
    enable_timing: bool,

    #[arg(long, global = true, default_value_t = false)]
    debug_logging: bool,

    #[arg(long, global = true, help = "Buildings GeoJSON URL or path")]
    buildings: Option<String>,

    #[arg(long, global = true, help = "Roads GeoJSON URL or path")]
    roads: Option<String>,

    #[arg(long, global = true, help = "POIs GeoJSON URL or path")]
    pois: Option<String>,
}

#[derive(Subcommand, Clone)]
pub enum Command {
    /// Run the web UI
    Serve {
        #[arg(short, long)]
        bind: Option<String>,

        #[arg(long, help = "Where the latest rendered map is written")]
        map_artifact: Option<String>,
    },
    /// Write a report for one point without starting the server
    Report {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(short, long, default_value = REPORT_FILE_NAME)]
        out: String,

        #[arg(long, help = "Also export the POI table as CSV")]
        csv: Option<String>,
    },
}

// Add getter methods for all fields
impl Args {
    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn config(&self) -> Option<&str> {
        self.config.as_deref()
    }

    pub fn enable_timing(&self) -> bool {
        self.enable_timing
    }

    pub fn debug_logging(&self) -> bool {
        self.debug_logging
    }

    /// Applies command-line overrides on top of a loaded or default config.
    pub fn apply_overrides(&self, config: &mut AppConfig) {
        if let Some(buildings) = &self.buildings {
            config.datasets.buildings = buildings.clone();
        }
        if let Some(roads) = &self.roads {
            config.datasets.roads = roads.clone();
        }
        if let Some(pois) = &self.pois {
            config.datasets.pois = pois.clone();
        }
        if let Command::Serve { bind, map_artifact } = &self.command {
            if let Some(bind) = bind {
                config.bind_addr = bind.clone();
            }
            if let Some(path) = map_artifact {
                config.map_artifact_path = path.clone();
            }
        }
    }
}
