use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Deserializer};
use tracing::{info, warn};

use crate::analysis::radius_filter::filter_point;
use crate::analysis::report_composer::{compose_report, poi_table, PlotBuffer, ReportPanel};
use crate::config::app_config::AppConfig;
use crate::config::constants::{POI_CSV_FILE_NAME, REPORT_FILE_NAME};
use crate::data::dataset_loader::GeoDatasets;
use crate::error::ReportError;
use crate::models::query_point::QueryPoint;
use crate::render::map_renderer::{render_map, MapDocument};
use crate::render::pdf::assemble_pdf;
use crate::utils::csv_export::poi_table_to_csv;
use crate::utils::logging::{self, OperationCategory};

/// Raw coordinates as they arrive from a form or query string.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct CoordinateInput {
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub lat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_coordinate")]
    pub lon: Option<f64>,
}

/// Blank fields read as absent. Unparsable text reads as NaN so that it is
/// rejected by `QueryPoint` validation like any other bad coordinate.
fn lenient_coordinate<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw
        .as_deref()
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(|text| text.parse().unwrap_or(f64::NAN)))
}

impl CoordinateInput {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat: Some(lat), lon: Some(lon) }
    }

    /// A half-filled pair counts as invalid, not as "no point".
    fn optional_point(&self) -> Result<Option<QueryPoint>, ReportError> {
        match (self.lat, self.lon) {
            (None, None) => Ok(None),
            _ => self.point().map(Some),
        }
    }

    fn point(&self) -> Result<QueryPoint, ReportError> {
        QueryPoint::new(self.lat.unwrap_or(f64::NAN), self.lon.unwrap_or(f64::NAN))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    RenderMap,
    GenerateReport,
    DownloadReport,
    ExportPois,
}

/// A validated request. Building one is where out-of-range input is rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    RenderMap(Option<QueryPoint>),
    GenerateReport(QueryPoint),
    DownloadReport(QueryPoint),
    ExportPois(QueryPoint),
}

impl Action {
    pub fn parse(kind: ActionKind, input: &CoordinateInput) -> Result<Self, ReportError> {
        Ok(match kind {
            ActionKind::RenderMap => Action::RenderMap(input.optional_point()?),
            ActionKind::GenerateReport => Action::GenerateReport(input.point()?),
            ActionKind::DownloadReport => Action::DownloadReport(input.point()?),
            ActionKind::ExportPois => Action::ExportPois(input.point()?),
        })
    }

    pub fn kind(&self) -> ActionKind {
        match self {
            Action::RenderMap(_) => ActionKind::RenderMap,
            Action::GenerateReport(_) => ActionKind::GenerateReport,
            Action::DownloadReport(_) => ActionKind::DownloadReport,
            Action::ExportPois(_) => ActionKind::ExportPois,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DownloadFile {
    pub file_name: &'static str,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutput {
    Map(MapDocument),
    Panel(ReportPanel),
    Download(DownloadFile),
}

/// Serves every action against one set of startup datasets.
pub struct RequestHandler {
    datasets: Arc<GeoDatasets>,
    fallback: (f64, f64),
    map_artifact: Mutex<PathBuf>,
}

impl RequestHandler {
    pub fn new(datasets: Arc<GeoDatasets>, config: &AppConfig) -> Self {
        Self {
            datasets,
            fallback: (config.default_latitude, config.default_longitude),
            map_artifact: Mutex::new(PathBuf::from(&config.map_artifact_path)),
        }
    }

    pub fn datasets(&self) -> &GeoDatasets {
        &self.datasets
    }

    pub fn handle(&self, action: Action) -> Result<ActionOutput, ReportError> {
        let _timing = logging::start_timing("handle_action", OperationCategory::Request);

        let result = match action {
            Action::RenderMap(point) => self.render_map(point.as_ref()).map(ActionOutput::Map),
            Action::GenerateReport(point) => self.generate_report(&point).map(ActionOutput::Panel),
            Action::DownloadReport(point) => self.download_report(&point).map(ActionOutput::Download),
            Action::ExportPois(point) => self.export_pois(&point).map(ActionOutput::Download),
        };

        if let Err(err) = &result {
            warn!(action = ?action.kind(), error = %err, "Action failed");
        }
        result
    }

    fn render_map(&self, point: Option<&QueryPoint>) -> Result<MapDocument, ReportError> {
        let document = render_map(point, self.fallback);
        // Last writer wins, but two writers never interleave
        let path = self.map_artifact.lock();
        document.write_artifact(&*path)?;
        Ok(document)
    }

    fn generate_report(&self, point: &QueryPoint) -> Result<ReportPanel, ReportError> {
        let filtered = filter_point(&self.datasets, point);
        let mut buffer = PlotBuffer::new();
        compose_report(&filtered, point, &mut buffer)
    }

    fn download_report(&self, point: &QueryPoint) -> Result<DownloadFile, ReportError> {
        let filtered = filter_point(&self.datasets, point);
        let mut buffer = PlotBuffer::new();
        compose_report(&filtered, point, &mut buffer)?;
        let bytes = assemble_pdf(buffer)?;
        info!(lat = point.latitude(), lon = point.longitude(), bytes = bytes.len(), "Prepared report download");
        Ok(DownloadFile {
            file_name: REPORT_FILE_NAME,
            content_type: "application/pdf",
            bytes,
        })
    }

    fn export_pois(&self, point: &QueryPoint) -> Result<DownloadFile, ReportError> {
        let filtered = filter_point(&self.datasets, point);
        let table = poi_table(&filtered.pois)?;
        Ok(DownloadFile {
            file_name: POI_CSV_FILE_NAME,
            content_type: "text/csv",
            bytes: poi_table_to_csv(&table)?,
        })
    }
}
