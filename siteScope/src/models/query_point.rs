use geo::{Coord, Distance, Haversine, Point};
use serde::{Deserialize, Serialize};

use crate::config::constants::{
    MAX_LATITUDE, MAX_LONGITUDE, MEAN_EARTH_RADIUS_M, MIN_LATITUDE, MIN_LONGITUDE,
};
use crate::error::ReportError;

/// A validated `(latitude, longitude)` pair in WGS84 degrees.
///
/// The only way to build one is [`QueryPoint::new`], so any value of this type is
/// already known to be inside `[-90, 90] x [-180, 180]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawPoint", into = "RawPoint")]
pub struct QueryPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawPoint {
    lat: f64,
    lon: f64,
}

impl QueryPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ReportError> {
        let lat_ok = latitude.is_finite() && (MIN_LATITUDE..=MAX_LATITUDE).contains(&latitude);
        let lon_ok = longitude.is_finite() && (MIN_LONGITUDE..=MAX_LONGITUDE).contains(&longitude);
        if !lat_ok || !lon_ok {
            return Err(ReportError::InvalidInput { latitude, longitude });
        }
        Ok(Self { latitude, longitude })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// geo uses x = longitude, y = latitude.
    pub fn to_point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// Great-circle distance in metres to a lon/lat point.
    pub fn distance_to(&self, other: Point<f64>) -> f64 {
        Haversine::distance(self.to_point(), other)
    }

    /// Projects a lon/lat coordinate onto a local equirectangular plane in metres,
    /// with this point at the origin. Accurate to well under a metre at the
    /// scale of the search radius.
    pub fn project(&self, coord: Coord<f64>) -> Coord<f64> {
        let lat0 = self.latitude.to_radians();
        let dlon = wrap_longitude(coord.x - self.longitude).to_radians();
        let dlat = (coord.y - self.latitude).to_radians();
        Coord {
            x: MEAN_EARTH_RADIUS_M * dlon * lat0.cos(),
            y: MEAN_EARTH_RADIUS_M * dlat,
        }
    }

    /// Degrees of latitude and longitude spanned by `metres` around this point.
    pub fn degree_span(&self, metres: f64) -> (f64, f64) {
        let dlat = (metres / MEAN_EARTH_RADIUS_M).to_degrees();
        let cos_lat = self.latitude.to_radians().cos().abs().max(1e-6);
        let dlon = (metres / (MEAN_EARTH_RADIUS_M * cos_lat)).to_degrees();
        (dlat, dlon.min(360.0))
    }
}

impl TryFrom<RawPoint> for QueryPoint {
    type Error = ReportError;

    fn try_from(raw: RawPoint) -> Result<Self, Self::Error> {
        QueryPoint::new(raw.lat, raw.lon)
    }
}

impl From<QueryPoint> for RawPoint {
    fn from(point: QueryPoint) -> Self {
        RawPoint { lat: point.latitude, lon: point.longitude }
    }
}

/// Folds a longitude difference into [-180, 180), so points either side of
/// the antimeridian stay close.
pub fn wrap_longitude(delta: f64) -> f64 {
    (delta + 180.0).rem_euclid(360.0) - 180.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_bounds_inclusive() {
        assert!(QueryPoint::new(90.0, 180.0).is_ok());
        assert!(QueryPoint::new(-90.0, -180.0).is_ok());
        assert!(QueryPoint::new(6.580364, 3.362485).is_ok());
    }

    #[test]
    fn rejects_out_of_range_and_non_finite() {
        for (lat, lon) in [(95.0, 3.362485), (-90.5, 0.0), (0.0, 180.1), (0.0, -181.0), (f64::NAN, 0.0), (0.0, f64::INFINITY)] {
            let err = QueryPoint::new(lat, lon).unwrap_err();
            assert!(err.is_invalid_input(), "({lat}, {lon}) should be rejected");
        }
    }

    #[test]
    fn projection_matches_haversine_at_small_scale() {
        let origin = QueryPoint::new(6.580364, 3.362485).unwrap();
        let other = Coord { x: 3.364, y: 6.581 };
        let projected = origin.project(other);
        let planar = (projected.x * projected.x + projected.y * projected.y).sqrt();
        let great_circle = origin.distance_to(Point::from(other));
        assert!((planar - great_circle).abs() < 0.5, "{planar} vs {great_circle}");
    }

    #[test]
    fn projection_wraps_across_antimeridian() {
        let origin = QueryPoint::new(0.0, 179.9998).unwrap();
        let projected = origin.project(Coord { x: -179.9998, y: 0.0 });
        let great_circle = origin.distance_to(Point::new(-179.9998, 0.0));
        assert!(projected.x > 0.0);
        assert!((projected.x - great_circle).abs() < 0.5, "{} vs {}", projected.x, great_circle);
        assert!((wrap_longitude(-359.9996) - 0.0004).abs() < 1e-9);
        assert!((wrap_longitude(359.9996) + 0.0004).abs() < 1e-9);
        assert_eq!(wrap_longitude(180.0), -180.0);
        assert_eq!(wrap_longitude(12.5), 12.5);
    }

    #[test]
    fn deserializes_through_validation() {
        let ok: QueryPoint = serde_json::from_str(r#"{"lat": 1.5, "lon": 2.5}"#).unwrap();
        assert_eq!(ok.latitude(), 1.5);
        assert!(serde_json::from_str::<QueryPoint>(r#"{"lat": 95.0, "lon": 2.5}"#).is_err());
    }
}
