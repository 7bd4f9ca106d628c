use tracing::{debug, instrument};

use crate::analysis::attribute_counts::value_counts;
use crate::analysis::radius_filter::FilteredResult;
use crate::config::constants::{
    BUILDING_HEIGHT_COLUMN, BUILDING_HEIGHT_TITLE, BUILDING_USE_COLUMN, BUILDING_USE_TITLE,
    POI_NAME_COLUMN, POI_TYPE_COLUMN, ROAD_CLASS_COLUMN, ROAD_CLASS_TITLE,
    ROAD_CONDITION_COLUMN, ROAD_CONDITION_TITLE, SEARCH_RADIUS_M,
};
use crate::error::ReportError;
use crate::models::feature::FeatureSubset;
use crate::models::query_point::QueryPoint;
use crate::render::charts::{BarChart, PoiRow, PoiTable};
use crate::render::map_renderer::MapSnapshot;

/// Identifies which slot of the report an artifact fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Map,
    BuildingUse,
    BuildingHeight,
    RoadClass,
    RoadCondition,
    PoiTable,
}

/// Order in which one composition pass appends artifacts.
pub const REPORT_ORDER: [ArtifactKind; 6] = [
    ArtifactKind::Map,
    ArtifactKind::BuildingUse,
    ArtifactKind::BuildingHeight,
    ArtifactKind::RoadClass,
    ArtifactKind::RoadCondition,
    ArtifactKind::PoiTable,
];

/// Reusable form of one report item. Holds data, not pixels, so it can be drawn
/// as SVG for the browser and as vector shapes in the PDF.
#[derive(Debug, Clone, PartialEq)]
pub enum ReportArtifact {
    MapSnapshot(MapSnapshot),
    BarChart(BarChart),
    PoiTable(PoiTable),
}

impl ReportArtifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            ReportArtifact::MapSnapshot(_) => ArtifactKind::Map,
            ReportArtifact::BarChart(chart) => chart.kind,
            ReportArtifact::PoiTable(_) => ArtifactKind::PoiTable,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            ReportArtifact::MapSnapshot(snapshot) => &snapshot.title,
            ReportArtifact::BarChart(chart) => &chart.title,
            ReportArtifact::PoiTable(table) => &table.title,
        }
    }

    /// Displayable form for the interaction layer.
    pub fn to_svg(&self) -> Result<String, ReportError> {
        match self {
            ReportArtifact::MapSnapshot(snapshot) => snapshot.to_svg(),
            ReportArtifact::BarChart(chart) => chart.to_svg(),
            ReportArtifact::PoiTable(table) => table.to_svg(),
        }
    }
}

/// Artifacts collected by one request, consumed once by PDF assembly.
#[derive(Debug, Clone, Default)]
pub struct PlotBuffer {
    artifacts: Vec<ReportArtifact>,
}

impl PlotBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.artifacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.artifacts.is_empty()
    }

    pub fn artifacts(&self) -> &[ReportArtifact] {
        &self.artifacts
    }

    pub fn kinds(&self) -> Vec<ArtifactKind> {
        self.artifacts.iter().map(ReportArtifact::kind).collect()
    }

    pub fn into_artifacts(self) -> Vec<ReportArtifact> {
        self.artifacts
    }

    fn extend(&mut self, artifacts: Vec<ReportArtifact>) {
        self.artifacts.extend(artifacts);
    }
}

/// One image of the on-screen report panel.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelImage {
    pub kind: ArtifactKind,
    pub title: String,
    pub svg: String,
}

/// Displayable images in the same order as the artifacts appended to the buffer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReportPanel {
    pub images: Vec<PanelImage>,
}

struct ChartSpec {
    kind: ArtifactKind,
    column: &'static str,
    title: &'static str,
}

const BUILDING_CHARTS: [ChartSpec; 2] = [
    ChartSpec { kind: ArtifactKind::BuildingUse, column: BUILDING_USE_COLUMN, title: BUILDING_USE_TITLE },
    ChartSpec { kind: ArtifactKind::BuildingHeight, column: BUILDING_HEIGHT_COLUMN, title: BUILDING_HEIGHT_TITLE },
];

const ROAD_CHARTS: [ChartSpec; 2] = [
    ChartSpec { kind: ArtifactKind::RoadClass, column: ROAD_CLASS_COLUMN, title: ROAD_CLASS_TITLE },
    ChartSpec { kind: ArtifactKind::RoadCondition, column: ROAD_CONDITION_COLUMN, title: ROAD_CONDITION_TITLE },
];

fn bar_chart(subset: &FeatureSubset<'_>, spec: &ChartSpec) -> Result<BarChart, ReportError> {
    let counts = value_counts(subset, spec.column)?;
    Ok(BarChart::new(spec.kind, spec.title, counts))
}

pub fn poi_table(pois: &FeatureSubset<'_>) -> Result<PoiTable, ReportError> {
    pois.require_column(POI_NAME_COLUMN)?;
    pois.require_column(POI_TYPE_COLUMN)?;

    let rows = pois
        .records()
        .iter()
        .map(|record| PoiRow {
            name: record.label(POI_NAME_COLUMN).unwrap_or_default(),
            poi_type: record.label(POI_TYPE_COLUMN).unwrap_or_default(),
        })
        .collect();
    Ok(PoiTable::new(rows))
}

/// Builds the map snapshot, the four bar charts and the POI table for one
/// filtered result, appends them to `buffer`, and returns their SVG forms.
///
/// Nothing is appended unless every artifact was built, so a missing
/// attribute leaves the buffer as it was.
#[instrument(skip(filtered, buffer), fields(lat = point.latitude(), lon = point.longitude()))]
pub fn compose_report(
    filtered: &FilteredResult<'_>,
    point: &QueryPoint,
    buffer: &mut PlotBuffer,
) -> Result<ReportPanel, ReportError> {
    let mut artifacts = Vec::with_capacity(REPORT_ORDER.len());

    artifacts.push(ReportArtifact::MapSnapshot(MapSnapshot::from_buildings(
        point,
        SEARCH_RADIUS_M,
        &filtered.buildings,
    )));
    for spec in &BUILDING_CHARTS {
        artifacts.push(ReportArtifact::BarChart(bar_chart(&filtered.buildings, spec)?));
    }
    for spec in &ROAD_CHARTS {
        artifacts.push(ReportArtifact::BarChart(bar_chart(&filtered.roads, spec)?));
    }
    artifacts.push(ReportArtifact::PoiTable(poi_table(&filtered.pois)?));

    let images = artifacts
        .iter()
        .map(|artifact| {
            Ok(PanelImage {
                kind: artifact.kind(),
                title: artifact.title().to_string(),
                svg: artifact.to_svg()?,
            })
        })
        .collect::<Result<Vec<_>, ReportError>>()?;

    debug!(artifacts = artifacts.len(), buffered = buffer.len(), "Composed report");
    buffer.extend(artifacts);
    Ok(ReportPanel { images })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::radius_filter::filter_point;
    use crate::data::dataset_loader::GeoDatasets;
    use crate::models::feature::{FeatureCollection, FeatureRecord};
    use geo::{point, polygon, Geometry};
    use serde_json::{json, Map, Value};

    const LAT: f64 = 6.580364;
    const LON: f64 = 3.362485;

    fn record(geometry: Geometry<f64>, props: Value) -> FeatureRecord {
        let properties: Map<String, Value> = props.as_object().cloned().unwrap_or_default();
        FeatureRecord::new(geometry, properties)
    }

    fn datasets(road_props: Value) -> GeoDatasets {
        let footprint: Geometry<f64> = polygon![
            (x: LON, y: LAT),
            (x: LON + 0.0001, y: LAT),
            (x: LON + 0.0001, y: LAT + 0.0001),
        ]
        .into();
        let here: Geometry<f64> = point!(x: LON, y: LAT).into();
        GeoDatasets::new(
            FeatureCollection::new("buildings", vec![
                record(footprint, json!({"Use": "Residential", "Height": 2})),
            ]),
            FeatureCollection::new("roads", vec![record(here.clone(), road_props)]),
            FeatureCollection::new("pois", vec![
                record(here, json!({"Name": "Clinic", "Type": "Health"})),
            ]),
        )
    }

    #[test]
    fn appends_artifacts_in_report_order() {
        let data = datasets(json!({"Class": "Primary", "Condition": "Good"}));
        let point = QueryPoint::new(LAT, LON).unwrap();
        let filtered = filter_point(&data, &point);

        let mut buffer = PlotBuffer::new();
        let panel = compose_report(&filtered, &point, &mut buffer).unwrap();

        assert_eq!(buffer.kinds(), REPORT_ORDER.to_vec());
        let panel_kinds: Vec<_> = panel.images.iter().map(|i| i.kind).collect();
        assert_eq!(panel_kinds, buffer.kinds());
        assert!(panel.images.iter().all(|i| i.svg.starts_with("<svg")));
        assert_eq!(buffer.artifacts()[1].title(), BUILDING_USE_TITLE);
    }

    #[test]
    fn missing_column_leaves_buffer_untouched() {
        let data = datasets(json!({"Class": "Primary"}));
        let point = QueryPoint::new(LAT, LON).unwrap();
        let filtered = filter_point(&data, &point);

        let mut buffer = PlotBuffer::new();
        let err = compose_report(&filtered, &point, &mut buffer).unwrap_err();
        assert!(matches!(err, ReportError::MissingAttribute { ref attribute, .. } if attribute == "Condition"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn empty_area_renders_zero_category_charts() {
        let data = datasets(json!({"Class": "Primary", "Condition": "Good"}));
        let point = QueryPoint::new(-30.0, 120.0).unwrap();
        let filtered = filter_point(&data, &point);

        let mut buffer = PlotBuffer::new();
        compose_report(&filtered, &point, &mut buffer).unwrap();
        for artifact in buffer.artifacts() {
            if let ReportArtifact::BarChart(chart) = artifact {
                assert!(chart.counts.is_empty());
            }
        }
    }
}
