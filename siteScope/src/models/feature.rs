use std::collections::BTreeSet;

use geo::Geometry;
use geojson::GeoJson;
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::ReportError;

/// One geometric record with its attribute table row.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRecord {
    pub geometry: Geometry<f64>,
    pub properties: Map<String, Value>,
}

impl FeatureRecord {
    pub fn new(geometry: Geometry<f64>, properties: Map<String, Value>) -> Self {
        Self { geometry, properties }
    }

    /// Attribute value as a category label. Null and absent values give `None`.
    pub fn label(&self, column: &str) -> Option<String> {
        self.properties.get(column).and_then(value_label)
    }
}

/// Formats an attribute value the way it should appear in a chart or table.
/// Whole numbers drop their fractional part so `12.0` and `12` share a bar.
pub fn value_label(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => Some(format!("{}", f as i64)),
            _ => Some(n.to_string()),
        },
        other => Some(other.to_string()),
    }
}

/// An ordered, read-only set of features plus the attribute columns they carry.
#[derive(Debug, Clone, Default)]
pub struct FeatureCollection {
    name: String,
    records: Vec<FeatureRecord>,
    columns: BTreeSet<String>,
}

impl FeatureCollection {
    pub fn new(name: impl Into<String>, records: Vec<FeatureRecord>) -> Self {
        let columns = records
            .iter()
            .flat_map(|r| r.properties.keys().cloned())
            .collect();
        Self { name: name.into(), records, columns }
    }

    /// Parses a GeoJSON `FeatureCollection`. Features without a usable geometry
    /// are dropped, but their property keys still count as columns.
    pub fn from_geojson_str(name: &str, text: &str) -> Result<Self, ReportError> {
        let load_err = |reason: String| ReportError::DatasetLoad {
            source: name.to_string(),
            reason,
        };

        let geojson: GeoJson = text.parse().map_err(|e: geojson::Error| load_err(e.to_string()))?;
        let collection = match geojson {
            GeoJson::FeatureCollection(fc) => fc,
            _ => return Err(load_err("expected a FeatureCollection".to_string())),
        };

        let mut records = Vec::with_capacity(collection.features.len());
        let mut columns = BTreeSet::new();
        let mut skipped = 0usize;

        for feature in collection.features {
            let properties = feature.properties.unwrap_or_default();
            columns.extend(properties.keys().cloned());

            let Some(geometry) = feature.geometry else {
                skipped += 1;
                continue;
            };
            match Geometry::<f64>::try_from(geometry) {
                Ok(geometry) => records.push(FeatureRecord::new(geometry, properties)),
                Err(_) => skipped += 1,
            }
        }

        if skipped > 0 {
            warn!(dataset = name, skipped, "Dropped features without a usable geometry");
        }

        Ok(Self { name: name.to_string(), records, columns })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn records(&self) -> &[FeatureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }
}

/// The part of a [`FeatureCollection`] that survived a filter.
///
/// Borrows its parent so that an empty subset still knows which columns exist.
#[derive(Debug, Clone)]
pub struct FeatureSubset<'a> {
    parent: &'a FeatureCollection,
    records: Vec<&'a FeatureRecord>,
}

impl<'a> FeatureSubset<'a> {
    pub fn new(parent: &'a FeatureCollection, records: Vec<&'a FeatureRecord>) -> Self {
        Self { parent, records }
    }

    pub fn name(&self) -> &str {
        self.parent.name()
    }

    pub fn records(&self) -> &[&'a FeatureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn require_column(&self, column: &str) -> Result<(), ReportError> {
        if self.parent.has_column(column) {
            Ok(())
        } else {
            Err(ReportError::MissingAttribute {
                dataset: self.parent.name().to_string(),
                attribute: column.to_string(),
            })
        }
    }
}

impl PartialEq for FeatureSubset<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.parent, other.parent) && self.records == other.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {"type": "Feature", "geometry": {"type": "Point", "coordinates": [3.36, 6.58]},
             "properties": {"Name": "Clinic", "Type": "Health"}},
            {"type": "Feature", "geometry": null, "properties": {"Name": "Ghost", "Rating": 3}}
        ]
    }"#;

    #[test]
    fn parses_features_and_collects_columns() {
        let fc = FeatureCollection::from_geojson_str("pois", SAMPLE).unwrap();
        assert_eq!(fc.len(), 1);
        assert!(fc.has_column("Name"));
        assert!(fc.has_column("Rating"));
        assert_eq!(fc.records()[0].label("Type").as_deref(), Some("Health"));
    }

    #[test]
    fn rejects_non_collection_documents() {
        let err = FeatureCollection::from_geojson_str(
            "pois",
            r#"{"type": "Point", "coordinates": [0.0, 0.0]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ReportError::DatasetLoad { .. }));
    }

    #[test]
    fn labels_collapse_whole_numbers() {
        assert_eq!(value_label(&json!(12.0)).as_deref(), Some("12"));
        assert_eq!(value_label(&json!(12)).as_deref(), Some("12"));
        assert_eq!(value_label(&json!(7.5)).as_deref(), Some("7.5"));
        assert_eq!(value_label(&json!(null)), None);
    }

    #[test]
    fn empty_subset_still_knows_columns() {
        let fc = FeatureCollection::from_geojson_str("pois", SAMPLE).unwrap();
        let subset = FeatureSubset::new(&fc, Vec::new());
        assert!(subset.require_column("Name").is_ok());
        assert!(matches!(
            subset.require_column("Height"),
            Err(ReportError::MissingAttribute { .. })
        ));
    }
}
