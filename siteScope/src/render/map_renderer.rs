use std::fs;
use std::path::Path;

use geo::{CoordsIter, Geometry};
use maud::{html, PreEscaped, DOCTYPE};
use plotters::prelude::*;
use tracing::debug;

use crate::config::constants::{
    CIRCLE_COLOR, CIRCLE_FILL_OPACITY, DEFAULT_ZOOM, FIT_BOUNDS_PADDING_DEG, LEAFLET_CSS_URL,
    LEAFLET_JS_URL, MAP_SNAPSHOT_PX, MAP_SNAPSHOT_TITLE, MARKER_POPUP, SEARCH_RADIUS_M,
    TILE_ATTRIBUTION, TILE_URL_TEMPLATE,
};
use crate::error::ReportError;
use crate::models::feature::FeatureSubset;
use crate::models::query_point::QueryPoint;
use crate::utils::logging::{self, OperationCategory, RenderType};

const CIRCLE_SEGMENTS: usize = 72;

/// Marker plus radius circle drawn on a map document.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SiteOverlay {
    pub point: QueryPoint,
    pub radius_m: f64,
    pub bounds: [[f64; 2]; 2], // [[south, west], [north, east]]
}

/// A self-contained Leaflet page.
#[derive(Debug, Clone, PartialEq)]
pub struct MapDocument {
    pub center: (f64, f64),
    pub zoom: u8,
    pub overlay: Option<SiteOverlay>,
    pub html: String,
}

impl MapDocument {
    /// Overwrites the transient map artifact. Concurrent requests share this file.
    pub fn write_artifact(&self, path: impl AsRef<Path>) -> Result<(), ReportError> {
        fs::write(path.as_ref(), self.html.as_bytes())?;
        debug!(path = %path.as_ref().display(), "Wrote map artifact");
        Ok(())
    }
}

/// Renders the interactive map. Without a point, shows the fallback centre with
/// no marker. With a point, adds the marker and circle and fits the view to
/// a box around it.
pub fn render_map(point: Option<&QueryPoint>, fallback: (f64, f64)) -> MapDocument {
    let _timing = logging::start_timing("render_map",
        OperationCategory::Rendering { subcategory: RenderType::Map });

    let overlay = point.map(|p| SiteOverlay {
        point: *p,
        radius_m: SEARCH_RADIUS_M,
        bounds: [
            [p.latitude() - FIT_BOUNDS_PADDING_DEG, p.longitude() - FIT_BOUNDS_PADDING_DEG],
            [p.latitude() + FIT_BOUNDS_PADDING_DEG, p.longitude() + FIT_BOUNDS_PADDING_DEG],
        ],
    });
    // fitBounds on a symmetric box lands on the point itself
    let center = overlay
        .map(|o| (o.point.latitude(), o.point.longitude()))
        .unwrap_or(fallback);

    let html = map_html(fallback, overlay.as_ref());
    MapDocument { center, zoom: DEFAULT_ZOOM, overlay, html }
}

/// Validates raw input first. Out-of-range coordinates draw nothing.
pub fn render_map_at(latitude: f64, longitude: f64, fallback: (f64, f64)) -> Result<MapDocument, ReportError> {
    let point = QueryPoint::new(latitude, longitude)?;
    Ok(render_map(Some(&point), fallback))
}

fn map_script(fallback: (f64, f64), overlay: Option<&SiteOverlay>) -> String {
    let mut script = format!(
        "var map = L.map('map').setView([{}, {}], {});\n\
         L.tileLayer({}, {{maxZoom: 19, attribution: {}}}).addTo(map);\n",
        fallback.0,
        fallback.1,
        DEFAULT_ZOOM,
        serde_json::Value::from(TILE_URL_TEMPLATE),
        serde_json::Value::from(TILE_ATTRIBUTION),
    );
    if let Some(o) = overlay {
        let (lat, lon) = (o.point.latitude(), o.point.longitude());
        script.push_str(&format!(
            "L.marker([{lat}, {lon}]).addTo(map).bindPopup({popup});\n\
             L.circle([{lat}, {lon}], {{radius: {radius}, color: {color}, fill: true, fillOpacity: {opacity}}}).addTo(map);\n\
             map.fitBounds([[{s}, {w}], [{n}, {e}]]);\n",
            popup = serde_json::Value::from(MARKER_POPUP),
            radius = o.radius_m,
            color = serde_json::Value::from(CIRCLE_COLOR),
            opacity = CIRCLE_FILL_OPACITY,
            s = o.bounds[0][0],
            w = o.bounds[0][1],
            n = o.bounds[1][0],
            e = o.bounds[1][1],
        ));
    }
    script
}

fn map_html(fallback: (f64, f64), overlay: Option<&SiteOverlay>) -> String {
    let markup = html! {
        (DOCTYPE)
        html {
            head {
                meta charset="utf-8";
                link rel="stylesheet" href=(LEAFLET_CSS_URL);
                script src=(LEAFLET_JS_URL) {}
                style { "html, body, #map { height: 100%; margin: 0; }" }
            }
            body {
                div #map {}
                script { (PreEscaped(map_script(fallback, overlay))) }
            }
        }
    };
    markup.into_string()
}

/// Static picture of the buildings inside the radius, in metres around the point.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSnapshot {
    pub title: String,
    pub center: QueryPoint,
    pub radius_m: f64,
    pub footprints: Vec<Vec<(f64, f64)>>,
}

impl MapSnapshot {
    pub fn from_buildings(point: &QueryPoint, radius_m: f64, buildings: &FeatureSubset<'_>) -> Self {
        let footprints = buildings
            .records()
            .iter()
            .flat_map(|record| outlines(&record.geometry))
            .map(|ring| {
                ring.into_iter()
                    .map(|(lon, lat)| {
                        let c = point.project(geo::Coord { x: lon, y: lat });
                        (c.x, c.y)
                    })
                    .collect()
            })
            .collect();

        Self {
            title: MAP_SNAPSHOT_TITLE.to_string(),
            center: *point,
            radius_m,
            footprints,
        }
    }

    /// Half-width in metres of the square view.
    pub fn extent(&self) -> f64 {
        self.radius_m * 1.2
    }

    pub fn circle_outline(&self) -> Vec<(f64, f64)> {
        (0..=CIRCLE_SEGMENTS)
            .map(|i| {
                let angle = i as f64 / CIRCLE_SEGMENTS as f64 * std::f64::consts::TAU;
                (self.radius_m * angle.cos(), self.radius_m * angle.sin())
            })
            .collect()
    }

    pub fn to_svg(&self) -> Result<String, ReportError> {
        let _timing = logging::start_timing("map_snapshot_svg",
            OperationCategory::Rendering { subcategory: RenderType::Map });

        let extent = self.extent();
        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (MAP_SNAPSHOT_PX, MAP_SNAPSHOT_PX))
                .into_drawing_area();
            root.fill(&WHITE).map_err(render_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(&self.title, ("sans-serif", 18))
                .margin(12)
                .build_cartesian_2d(-extent..extent, -extent..extent)
                .map_err(render_err)?;

            chart
                .draw_series(self.footprints.iter().filter(|ring| ring.len() > 1).map(|ring| {
                    Polygon::new(ring.clone(), RGBColor(120, 120, 120).mix(0.6).filled())
                }))
                .map_err(render_err)?;

            chart
                .draw_series(std::iter::once(PathElement::new(self.circle_outline(), BLUE.stroke_width(2))))
                .map_err(render_err)?;

            chart
                .draw_series(std::iter::once(Circle::new((0.0, 0.0), 5, RED.filled())))
                .map_err(render_err)?;

            root.present().map_err(render_err)?;
        }
        Ok(svg)
    }
}

fn render_err<E: std::fmt::Display>(err: E) -> ReportError {
    ReportError::Render(err.to_string())
}

/// Exterior rings (or paths) of a geometry as lon/lat pairs.
fn outlines(geometry: &Geometry<f64>) -> Vec<Vec<(f64, f64)>> {
    fn ring(polygon: &geo::Polygon<f64>) -> Vec<(f64, f64)> {
        polygon.exterior().coords().map(|c| (c.x, c.y)).collect()
    }
    match geometry {
        Geometry::Polygon(p) => vec![ring(p)],
        Geometry::MultiPolygon(mp) => mp.iter().map(ring).collect(),
        Geometry::GeometryCollection(gc) => gc.iter().flat_map(outlines).collect(),
        other => vec![other.coords_iter().map(|c| (c.x, c.y)).collect()],
    }
}
