use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::config::constants::{
    BUILDING_FOOTPRINTS_URL, DEFAULT_BIND_ADDR, DEFAULT_LATITUDE, DEFAULT_LONGITUDE,
    MAP_ARTIFACT_PATH, POIS_URL, ROADS_URL,
};
use crate::error::ReportError;

/// Where each of the three feature collections is read from.
/// A source is either an `http(s)://` URL or a local file path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DatasetSources {
    pub buildings: String,
    pub roads: String,
    pub pois: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub bind_addr: String,
    pub datasets: DatasetSources,
    pub map_artifact_path: String,
    pub default_latitude: f64,  // Fallback view when no point has been submitted
    pub default_longitude: f64,
}

impl Default for DatasetSources {
    fn default() -> Self {
        Self {
            buildings: BUILDING_FOOTPRINTS_URL.to_string(),
            roads: ROADS_URL.to_string(),
            pois: POIS_URL.to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            datasets: DatasetSources::default(),
            map_artifact_path: MAP_ARTIFACT_PATH.to_string(),
            default_latitude: DEFAULT_LATITUDE,
            default_longitude: DEFAULT_LONGITUDE,
        }
    }
}

impl AppConfig {
    /// Reads a JSON config file. Missing keys fall back to their defaults.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, ReportError> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .map_err(|e| ReportError::Config(format!("{}: {}", path.as_ref().display(), e)))
    }
}
