use std::io::Write;
use std::sync::Arc;

use sitescope::analysis::report_composer::{ArtifactKind, ReportArtifact, REPORT_ORDER};
use sitescope::config::app_config::{AppConfig, DatasetSources};
use sitescope::data::dataset_loader::load_datasets;
use sitescope::render::map_renderer::render_map_at;
use sitescope::server::handlers::{Action, ActionKind, ActionOutput, CoordinateInput, RequestHandler};
use sitescope::{assemble_pdf, compose_report, filter_within_radius, GeoDatasets, PlotBuffer, QueryPoint, ReportError};

const LAT: f64 = 6.580364;
const LON: f64 = 3.362485;

const BUILDINGS: &str = r#"{"type": "FeatureCollection", "features": [
  {"type": "Feature", "properties": {"Use": "Residential", "Height": 2},
   "geometry": {"type": "Polygon", "coordinates": [[[3.36240, 6.58030], [3.36260, 6.58030], [3.36260, 6.58045], [3.36240, 6.58045], [3.36240, 6.58030]]]}},
  {"type": "Feature", "properties": {"Use": "Commercial", "Height": 4},
   "geometry": {"type": "Polygon", "coordinates": [[[3.36300, 6.58100], [3.36320, 6.58100], [3.36320, 6.58120], [3.36300, 6.58100]]]}},
  {"type": "Feature", "properties": {"Use": "Residential", "Height": 2.0},
   "geometry": {"type": "Polygon", "coordinates": [[[3.36150, 6.57990], [3.36170, 6.57990], [3.36170, 6.58010], [3.36150, 6.57990]]]}},
  {"type": "Feature", "properties": {"Use": "Industrial", "Height": 9},
   "geometry": {"type": "Polygon", "coordinates": [[[3.40000, 6.60000], [3.40020, 6.60000], [3.40020, 6.60020], [3.40000, 6.60000]]]}}
]}"#;

const ROADS: &str = r#"{"type": "FeatureCollection", "features": [
  {"type": "Feature", "properties": {"Class": "Primary", "Condition": "Good"},
   "geometry": {"type": "LineString", "coordinates": [[3.35000, 6.58050], [3.37500, 6.58050]]}},
  {"type": "Feature", "properties": {"Class": "Residential", "Condition": null},
   "geometry": {"type": "LineString", "coordinates": [[3.36250, 6.57500], [3.36250, 6.58500]]}},
  {"type": "Feature", "properties": {"Class": "Motorway", "Condition": "Fair"},
   "geometry": {"type": "LineString", "coordinates": [[3.30000, 6.50000], [3.31000, 6.51000]]}}
]}"#;

const POIS: &str = r#"{"type": "FeatureCollection", "features": [
  {"type": "Feature", "properties": {"Name": "Ikeja Clinic", "Type": "Health"},
   "geometry": {"type": "Point", "coordinates": [3.36270, 6.58050]}},
  {"type": "Feature", "properties": {"Name": "Far Market", "Type": "Retail"},
   "geometry": {"type": "Point", "coordinates": [3.38000, 6.59000]}}
]}"#;

fn fixture(body: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(body.as_bytes()).unwrap();
    file
}

async fn load(roads: &str) -> GeoDatasets {
    let files = [fixture(BUILDINGS), fixture(roads), fixture(POIS)];
    let sources = DatasetSources {
        buildings: files[0].path().display().to_string(),
        roads: files[1].path().display().to_string(),
        pois: files[2].path().display().to_string(),
    };
    load_datasets(&sources).await.unwrap()
}

#[tokio::test]
async fn default_point_produces_full_report() {
    let datasets = load(ROADS).await;
    let filtered = filter_within_radius(&datasets, LAT, LON).unwrap();
    assert_eq!(filtered.buildings.len(), 3);
    assert_eq!(filtered.roads.len(), 2);
    assert_eq!(filtered.pois.len(), 1);

    let point = QueryPoint::new(LAT, LON).unwrap();
    let mut buffer = PlotBuffer::new();
    let panel = compose_report(&filtered, &point, &mut buffer).unwrap();
    assert_eq!(panel.images.len(), 6);

    let kinds = buffer.kinds();
    assert_eq!(&kinds[kinds.len() - 6..], &REPORT_ORDER);

    for artifact in buffer.artifacts() {
        match artifact {
            ReportArtifact::BarChart(chart) if chart.kind == ArtifactKind::BuildingUse => {
                assert_eq!(chart.counts.entries[0], ("Residential".to_string(), 2));
            }
            ReportArtifact::BarChart(chart) if chart.kind == ArtifactKind::RoadCondition => {
                // The null condition is skipped
                assert_eq!(chart.counts.total(), 1);
            }
            ReportArtifact::BarChart(chart) => assert!(!chart.counts.is_empty()),
            ReportArtifact::PoiTable(table) => assert_eq!(table.rows[0].name, "Ikeja Clinic"),
            ReportArtifact::MapSnapshot(snapshot) => assert_eq!(snapshot.footprints.len(), 3),
        }
    }

    let map = render_map_at(LAT, LON, (LAT, LON)).unwrap();
    assert!((map.center.0 - LAT).abs() < 0.01 && (map.center.1 - LON).abs() < 0.01);

    let pdf = assemble_pdf(buffer).unwrap();
    assert!(pdf.starts_with(b"%PDF"));
}

#[tokio::test]
async fn invalid_latitude_is_rejected_everywhere() {
    let datasets = load(ROADS).await;
    assert!(filter_within_radius(&datasets, 95.0, LON).unwrap_err().is_invalid_input());
    assert!(render_map_at(95.0, LON, (LAT, LON)).unwrap_err().is_invalid_input());

    let input = CoordinateInput::new(95.0, LON);
    for kind in [ActionKind::RenderMap, ActionKind::GenerateReport, ActionKind::DownloadReport] {
        assert!(Action::parse(kind, &input).unwrap_err().is_invalid_input());
    }
}

#[tokio::test]
async fn missing_road_column_fails_only_that_report() {
    let roads_without_condition = ROADS.replace("\"Condition\"", "\"State\"");
    let datasets = load(&roads_without_condition).await;
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        map_artifact_path: dir.path().join("map.html").display().to_string(),
        ..AppConfig::default()
    };
    let handler = RequestHandler::new(Arc::new(datasets), &config);
    let point = QueryPoint::new(LAT, LON).unwrap();

    let err = handler.handle(Action::GenerateReport(point)).unwrap_err();
    assert!(matches!(err, ReportError::MissingAttribute { ref attribute, .. } if attribute == "Condition"));

    // Map rendering and POI export do not depend on road attributes
    assert!(matches!(handler.handle(Action::RenderMap(Some(point))), Ok(ActionOutput::Map(_))));
    assert!(matches!(handler.handle(Action::ExportPois(point)), Ok(ActionOutput::Download(_))));
}

#[tokio::test]
async fn separate_downloads_do_not_accumulate() {
    let datasets = load(ROADS).await;
    let dir = tempfile::tempdir().unwrap();
    let config = AppConfig {
        map_artifact_path: dir.path().join("map.html").display().to_string(),
        ..AppConfig::default()
    };
    let handler = RequestHandler::new(Arc::new(datasets), &config);
    let point = QueryPoint::new(LAT, LON).unwrap();

    let size = |output: ActionOutput| match output {
        ActionOutput::Download(file) => file.bytes.len(),
        other => panic!("unexpected output: {:?}", other),
    };
    let first = size(handler.handle(Action::DownloadReport(point)).unwrap());
    let second = size(handler.handle(Action::DownloadReport(point)).unwrap());
    // Same content apart from the timestamp line
    assert!((first as i64 - second as i64).abs() < 64);
}
