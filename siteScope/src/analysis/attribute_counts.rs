use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::ReportError;
use crate::models::feature::FeatureSubset;

/// How often each value of one attribute occurs in a subset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCounts {
    pub column: String,
    pub entries: Vec<(String, usize)>, // Sorted by count descending, then label
}

impl CategoryCounts {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_count(&self) -> usize {
        self.entries.iter().map(|(_, n)| *n).max().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.entries.iter().map(|(_, n)| *n).sum()
    }
}

/// Counts the values of `column` across `subset`. Null and absent values are
/// skipped. A column unknown to the whole dataset is an error.
pub fn value_counts(subset: &FeatureSubset<'_>, column: &str) -> Result<CategoryCounts, ReportError> {
    subset.require_column(column)?;

    let mut counts: HashMap<String, usize> = HashMap::new();
    for record in subset.records() {
        if let Some(label) = record.label(column) {
            *counts.entry(label).or_insert(0) += 1;
        }
    }

    let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    Ok(CategoryCounts { column: column.to_string(), entries })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::feature::{FeatureCollection, FeatureRecord};
    use geo::{point, Geometry};
    use serde_json::{json, Map, Value};

    fn record(props: Value) -> FeatureRecord {
        let geometry: Geometry<f64> = point!(x: 0.0, y: 0.0).into();
        let properties: Map<String, Value> = props.as_object().cloned().unwrap_or_default();
        FeatureRecord::new(geometry, properties)
    }

    #[test]
    fn counts_sorted_by_frequency_then_label() {
        let fc = FeatureCollection::new("buildings", vec![
            record(json!({"Use": "Residential", "Height": 2})),
            record(json!({"Use": "Commercial", "Height": 2.0})),
            record(json!({"Use": "Residential", "Height": 3})),
            record(json!({"Use": null, "Height": 1})),
            record(json!({"Use": "Church"})),
        ]);
        let subset = FeatureSubset::new(&fc, fc.records().iter().collect());

        let uses = value_counts(&subset, "Use").unwrap();
        assert_eq!(uses.entries, vec![
            ("Residential".to_string(), 2),
            ("Church".to_string(), 1),
            ("Commercial".to_string(), 1),
        ]);

        let heights = value_counts(&subset, "Height").unwrap();
        assert_eq!(heights.entries[0], ("2".to_string(), 2));
        assert_eq!(heights.total(), 4);
        assert_eq!(heights.max_count(), 2);
    }

    #[test]
    fn empty_subset_has_no_categories() {
        let fc = FeatureCollection::new("roads", vec![record(json!({"Class": "Primary"}))]);
        let subset = FeatureSubset::new(&fc, Vec::new());
        let counts = value_counts(&subset, "Class").unwrap();
        assert!(counts.is_empty());
        assert_eq!(counts.max_count(), 0);
    }

    #[test]
    fn unknown_column_is_missing_attribute() {
        let fc = FeatureCollection::new("roads", vec![record(json!({"Class": "Primary"}))]);
        let subset = FeatureSubset::new(&fc, fc.records().iter().collect());
        match value_counts(&subset, "Condition") {
            Err(ReportError::MissingAttribute { dataset, attribute }) => {
                assert_eq!(dataset, "roads");
                assert_eq!(attribute, "Condition");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }
}
