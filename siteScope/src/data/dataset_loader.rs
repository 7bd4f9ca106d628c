use std::fs;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info};

use crate::config::app_config::DatasetSources;
use crate::error::ReportError;
use crate::models::feature::FeatureCollection;
use crate::utils::logging::{self, DataLoadType, OperationCategory};

/// The three feature collections, loaded once at startup and never mutated.
#[derive(Debug, Clone, Default)]
pub struct GeoDatasets {
    pub buildings: FeatureCollection,
    pub roads: FeatureCollection,
    pub pois: FeatureCollection,
}

impl GeoDatasets {
    pub fn new(
        buildings: FeatureCollection,
        roads: FeatureCollection,
        pois: FeatureCollection,
    ) -> Self {
        Self { buildings, roads, pois }
    }

    pub fn total_features(&self) -> usize {
        self.buildings.len() + self.roads.len() + self.pois.len()
    }
}

fn is_remote(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

async fn read_source(client: &reqwest::Client, source: &str) -> Result<String, ReportError> {
    let load_err = |reason: String| ReportError::DatasetLoad {
        source: source.to_string(),
        reason,
    };

    if is_remote(source) {
        let _timing = logging::start_timing("fetch_remote_dataset",
            OperationCategory::DataLoad { subcategory: DataLoadType::RemoteFetch });
        let response = client
            .get(source)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| load_err(e.to_string()))?;
        response.text().await.map_err(|e| load_err(e.to_string()))
    } else {
        let _timing = logging::start_timing("read_local_dataset",
            OperationCategory::DataLoad { subcategory: DataLoadType::LocalRead });
        fs::read_to_string(source).map_err(|e| load_err(e.to_string()))
    }
}

/// Fetches and parses buildings, roads and POIs. Any failure is returned to the
/// caller, which treats it as fatal.
pub async fn load_datasets(sources: &DatasetSources) -> Result<GeoDatasets, ReportError> {
    let _timing = logging::start_timing("load_datasets",
        OperationCategory::DataLoad { subcategory: DataLoadType::Parse });

    let client = reqwest::Client::new();
    let progress = ProgressBar::new(3);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    let mut loaded = Vec::with_capacity(3);
    for (name, source) in [
        ("buildings", &sources.buildings),
        ("roads", &sources.roads),
        ("pois", &sources.pois),
    ] {
        progress.set_message(format!("loading {}", name));
        let text = read_source(&client, source).await?;
        let collection = FeatureCollection::from_geojson_str(name, &text)?;
        info!(dataset = name, features = collection.len(), source = %source, "Loaded dataset");
        debug!(dataset = name, columns = ?collection.columns().collect::<Vec<_>>(), "Dataset columns");
        loaded.push(collection);
        progress.inc(1);
    }
    progress.finish_with_message("datasets loaded");

    let pois = loaded.pop().unwrap_or_default();
    let roads = loaded.pop().unwrap_or_default();
    let buildings = loaded.pop().unwrap_or_default();
    Ok(GeoDatasets::new(buildings, roads, pois))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_fixture(body: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(body.as_bytes()).unwrap();
        file
    }

    #[tokio::test]
    async fn loads_local_files_in_order() {
        let buildings = write_fixture(r#"{"type":"FeatureCollection","features":[
            {"type":"Feature","geometry":{"type":"Point","coordinates":[3.0,6.0]},"properties":{"Use":"Residential"}}]}"#);
        let roads = write_fixture(r#"{"type":"FeatureCollection","features":[]}"#);
        let pois = write_fixture(r#"{"type":"FeatureCollection","features":[]}"#);

        let sources = DatasetSources {
            buildings: buildings.path().display().to_string(),
            roads: roads.path().display().to_string(),
            pois: pois.path().display().to_string(),
        };
        let datasets = load_datasets(&sources).await.unwrap();
        assert_eq!(datasets.buildings.name(), "buildings");
        assert_eq!(datasets.buildings.len(), 1);
        assert!(datasets.roads.is_empty());
        assert_eq!(datasets.pois.name(), "pois");
    }

    #[tokio::test]
    async fn missing_file_is_fatal() {
        let sources = DatasetSources {
            buildings: "/definitely/not/here.geojson".to_string(),
            roads: String::new(),
            pois: String::new(),
        };
        let err = load_datasets(&sources).await.unwrap_err();
        assert!(matches!(err, ReportError::DatasetLoad { .. }));
    }
}
