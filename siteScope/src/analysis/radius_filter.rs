use geo::{BoundingRect, Distance, Euclidean, Geometry, MapCoords, Point, Rect};
use tracing::debug;

use crate::config::constants::SEARCH_RADIUS_M;
use crate::data::dataset_loader::GeoDatasets;
use crate::error::ReportError;
use crate::models::feature::{FeatureCollection, FeatureSubset};
use crate::models::query_point::{wrap_longitude, QueryPoint};
use crate::utils::logging::{self, OperationCategory};

/// Buildings, roads and POIs within the search radius of one query point.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredResult<'a> {
    pub buildings: FeatureSubset<'a>,
    pub roads: FeatureSubset<'a>,
    pub pois: FeatureSubset<'a>,
}

/// Validates raw coordinates and filters every dataset to the fixed radius.
///
/// Out-of-range coordinates fail with [`ReportError::InvalidInput`] before any
/// distance is computed.
pub fn filter_within_radius(
    datasets: &GeoDatasets,
    latitude: f64,
    longitude: f64,
) -> Result<FilteredResult<'_>, ReportError> {
    let point = QueryPoint::new(latitude, longitude)?;
    Ok(filter_point(datasets, &point))
}

/// Same as [`filter_within_radius`] for an already validated point.
pub fn filter_point<'a>(datasets: &'a GeoDatasets, point: &QueryPoint) -> FilteredResult<'a> {
    let _timing = logging::start_timing("filter_point", OperationCategory::SpatialFilter);

    let (buildings, (roads, pois)) = rayon::join(
        || filter_collection(&datasets.buildings, point, SEARCH_RADIUS_M),
        || {
            rayon::join(
                || filter_collection(&datasets.roads, point, SEARCH_RADIUS_M),
                || filter_collection(&datasets.pois, point, SEARCH_RADIUS_M),
            )
        },
    );

    debug!(
        lat = point.latitude(),
        lon = point.longitude(),
        buildings = buildings.len(),
        roads = roads.len(),
        pois = pois.len(),
        "Filtered datasets within radius"
    );

    FilteredResult { buildings, roads, pois }
}

/// Keeps the records of `collection` within `radius_m` metres of `point`,
/// preserving their original order.
pub fn filter_collection<'a>(
    collection: &'a FeatureCollection,
    point: &QueryPoint,
    radius_m: f64,
) -> FeatureSubset<'a> {
    let window = SearchWindow::around(point, radius_m);
    let records = collection
        .records()
        .iter()
        .filter(|record| window.may_intersect(&record.geometry))
        .filter(|record| distance_m(point, &record.geometry) <= radius_m)
        .collect();
    FeatureSubset::new(collection, records)
}

/// Lon/lat window enclosing the search circle, padded slightly for rounding.
/// Longitudes are compared as offsets from the query point, so the window
/// keeps working when it straddles the antimeridian.
struct SearchWindow {
    longitude: f64,
    half_lon: f64,
    min_lat: f64,
    max_lat: f64,
}

impl SearchWindow {
    fn around(point: &QueryPoint, radius_m: f64) -> Self {
        let (dlat, dlon) = point.degree_span(radius_m * 1.01);
        Self {
            longitude: point.longitude(),
            half_lon: dlon,
            min_lat: point.latitude() - dlat,
            max_lat: point.latitude() + dlat,
        }
    }

    fn may_intersect(&self, geometry: &Geometry<f64>) -> bool {
        match geometry.bounding_rect() {
            Some(bbox) => self.overlaps_lat(&bbox) && self.overlaps_lon(&bbox),
            None => false,
        }
    }

    fn overlaps_lat(&self, bbox: &Rect<f64>) -> bool {
        bbox.min().y <= self.max_lat && bbox.max().y >= self.min_lat
    }

    fn overlaps_lon(&self, bbox: &Rect<f64>) -> bool {
        if self.half_lon >= 180.0 {
            return true;
        }
        let start = wrap_longitude(bbox.min().x - self.longitude);
        let end = start + (bbox.max().x - bbox.min().x);
        [-360.0, 0.0, 360.0]
            .iter()
            .any(|shift| start + shift <= self.half_lon && end + shift >= -self.half_lon)
    }
}

/// Shortest distance in metres from `point` to `geometry`. Zero when the point
/// lies inside a polygon.
pub fn distance_m(point: &QueryPoint, geometry: &Geometry<f64>) -> f64 {
    if let Geometry::Point(p) = geometry {
        return point.distance_to(*p);
    }

    let origin = Point::new(0.0, 0.0);
    let projected = geometry.map_coords(|c| point.project(c));
    planar_distance(&origin, &projected)
}

fn planar_distance(origin: &Point<f64>, geometry: &Geometry<f64>) -> f64 {
    match geometry {
        Geometry::Point(p) => Euclidean::distance(*origin, *p),
        Geometry::Line(l) => Euclidean::distance(origin, l),
        Geometry::LineString(ls) => Euclidean::distance(origin, ls),
        Geometry::Polygon(poly) => Euclidean::distance(origin, poly),
        Geometry::MultiPoint(mp) => Euclidean::distance(origin, mp),
        Geometry::MultiLineString(mls) => Euclidean::distance(origin, mls),
        Geometry::MultiPolygon(mp) => Euclidean::distance(origin, mp),
        Geometry::Rect(r) => Euclidean::distance(origin, &r.to_polygon()),
        Geometry::Triangle(t) => Euclidean::distance(origin, &t.to_polygon()),
        Geometry::GeometryCollection(gc) => gc
            .iter()
            .map(|g| planar_distance(origin, g))
            .fold(f64::INFINITY, f64::min),
    }
}
