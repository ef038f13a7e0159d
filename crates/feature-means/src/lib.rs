//! Training-set Feature Means
//!
//! Derives the model column order and per-column means from a training CSV.
//! The output feeds the defaults resource of `feature-schema`; this runs
//! offline and has no runtime contract with the API.

use feature_schema::{is_required, MODEL_COLUMNS};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::io::Read;
use thiserror::Error;
use tracing::debug;

/// Label column of the KOI training set
pub const DEFAULT_TARGET: &str = "koi_disposition";

/// Cell spellings `pandas.read_csv` reads as missing by default (case-sensitive)
pub const NA_MARKERS: [&str; 19] = [
    "", "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Errors while reading the training CSV
#[derive(Debug, Error)]
pub enum MeansError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("Column '{column}' line {line}: '{value}' is not numeric")]
    NotNumeric {
        column: String,
        line: u64,
        value: String,
    },
    #[error("CSV has no feature columns")]
    NoColumns,
}

/// Feature columns in file order with their means.
/// A column with no values has no mean.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMeans {
    columns: Vec<String>,
    means: Vec<Option<f64>>,
    target_found: bool,
}

/// Read a CSV, drop `target` if present, and average every other column.
///
/// Missing cells ([`NA_MARKERS`], or anything parsing to NaN) are skipped,
/// like `DataFrame.mean()`.
pub fn compute<R: Read>(reader: R, target: &str) -> Result<ColumnMeans, MeansError> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers = rdr.headers()?.clone();
    let target_index = headers.iter().position(|h| h == target);
    let keep: Vec<usize> = (0..headers.len())
        .filter(|i| Some(*i) != target_index)
        .collect();
    if keep.is_empty() {
        return Err(MeansError::NoColumns);
    }

    let mut sums = vec![0.0f64; keep.len()];
    let mut counts = vec![0u64; keep.len()];
    let mut rows = 0u64;

    for record in rdr.records() {
        let record = record?;
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        rows += 1;

        for (slot, &col) in keep.iter().enumerate() {
            let cell = record.get(col).unwrap_or("").trim();
            if NA_MARKERS.contains(&cell) {
                continue;
            }
            let value: f64 = cell.parse().map_err(|_| MeansError::NotNumeric {
                column: headers[col].to_string(),
                line,
                value: cell.to_string(),
            })?;
            if value.is_nan() {
                continue;
            }
            sums[slot] += value;
            counts[slot] += 1;
        }
    }
    debug!("Averaged {} rows over {} columns", rows, keep.len());

    Ok(ColumnMeans {
        columns: keep.iter().map(|&i| headers[i].to_string()).collect(),
        means: sums
            .iter()
            .zip(&counts)
            .map(|(sum, &n)| (n > 0).then(|| sum / n as f64))
            .collect(),
        target_found: target_index.is_some(),
    })
}

impl ColumnMeans {
    /// Feature columns in file order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Mean of one column
    pub fn mean(&self, column: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|c| c == column)
            .and_then(|i| self.means[i])
    }

    /// Whether the target column was present and dropped
    pub fn target_found(&self) -> bool {
        self.target_found
    }

    /// Whether the derived column order is exactly the deployed model's
    pub fn matches_model_columns(&self) -> bool {
        self.columns.iter().map(String::as_str).eq(MODEL_COLUMNS.iter().copied())
    }

    /// `column -> mean` for every column, in column order
    pub fn means_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&OrderedMeans {
            means: self,
            optional_only: false,
        })
    }

    /// `column -> mean` for optional features only, ready to use as the
    /// defaults resource
    pub fn defaults_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&OrderedMeans {
            means: self,
            optional_only: true,
        })
    }
}

struct OrderedMeans<'a> {
    means: &'a ColumnMeans,
    optional_only: bool,
}

impl Serialize for OrderedMeans<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let entries: Vec<(&String, &Option<f64>)> = self
            .means
            .columns
            .iter()
            .zip(&self.means.means)
            .filter(|(name, _)| !(self.optional_only && is_required(name)))
            .collect();

        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (name, mean) in entries {
            map.serialize_entry(name, mean)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feature_schema::FeatureDefaults;

    const SAMPLE: &str = "\
koi_period,koi_disposition,koi_depth,ra
10.0,CONFIRMED,100.0,290.0
20.0,FALSE POSITIVE,,292.0
30.0,CANDIDATE,300.0,nan
";

    #[test]
    fn test_target_dropped_and_means_skip_missing() {
        let means = compute(SAMPLE.as_bytes(), DEFAULT_TARGET).unwrap();

        assert!(means.target_found());
        assert_eq!(means.columns(), ["koi_period", "koi_depth", "ra"]);
        assert_eq!(means.mean("koi_period"), Some(20.0));
        assert_eq!(means.mean("koi_depth"), Some(200.0));
        assert_eq!(means.mean("ra"), Some(291.0));
        assert_eq!(means.mean("koi_disposition"), None);
    }

    #[test]
    fn test_without_target_keeps_all_columns() {
        let csv = "a,b\n1,2\n3,4\n";
        let means = compute(csv.as_bytes(), DEFAULT_TARGET).unwrap();

        assert!(!means.target_found());
        assert_eq!(means.columns(), ["a", "b"]);
        assert_eq!(means.mean("b"), Some(3.0));
    }

    #[test]
    fn test_non_numeric_cell_reports_column() {
        let csv = "koi_period,koi_disposition,koi_teq\n1.0,CONFIRMED,hot\n";
        match compute(csv.as_bytes(), DEFAULT_TARGET) {
            Err(MeansError::NotNumeric { column, line, value }) => {
                assert_eq!(column, "koi_teq");
                assert_eq!(line, 2);
                assert_eq!(value, "hot");
            }
            other => panic!("expected NotNumeric, got {other:?}"),
        }
    }

    #[test]
    fn test_every_na_marker_is_skipped() {
        for marker in NA_MARKERS {
            let csv = format!("koi_period,koi_teq\n1.0,{marker}\n3.0,500.0\n");
            let means = compute(csv.as_bytes(), DEFAULT_TARGET)
                .unwrap_or_else(|e| panic!("marker {marker:?}: {e}"));
            assert_eq!(means.mean("koi_teq"), Some(500.0), "marker {marker:?}");
            assert_eq!(means.mean("koi_period"), Some(2.0));
        }
    }

    #[test]
    fn test_na_markers_are_case_sensitive() {
        let csv = "koi_teq\nNa\n";
        assert!(matches!(
            compute(csv.as_bytes(), DEFAULT_TARGET),
            Err(MeansError::NotNumeric { .. })
        ));
    }

    #[test]
    fn test_empty_column_has_no_mean() {
        let csv = "a,b\n1,\n2,\n";
        let means = compute(csv.as_bytes(), DEFAULT_TARGET).unwrap();
        assert_eq!(means.mean("b"), None);
        assert!(means.means_json().unwrap().contains("\"b\": null"));
    }

    #[test]
    fn test_mapping_keeps_column_order() {
        let means = compute(SAMPLE.as_bytes(), DEFAULT_TARGET).unwrap();
        let json = means.means_json().unwrap();

        let period = json.find("koi_period").unwrap();
        let depth = json.find("koi_depth").unwrap();
        let ra = json.find("\"ra\"").unwrap();
        assert!(period < depth && depth < ra);
    }

    #[test]
    fn test_defaults_output_loads_as_schema_defaults() {
        let header = MODEL_COLUMNS.join(",");
        let row = (0..MODEL_COLUMNS.len())
            .map(|i| format!("{}.5", i))
            .collect::<Vec<_>>()
            .join(",");
        let csv = format!("{header},koi_disposition\n{row},CONFIRMED\n");

        let means = compute(csv.as_bytes(), DEFAULT_TARGET).unwrap();
        assert!(means.matches_model_columns());

        let defaults = FeatureDefaults::from_json_str(&means.defaults_json().unwrap()).unwrap();
        assert_eq!(defaults.len(), 31);
        assert_eq!(defaults.get("koi_kepmag"), Some(35.5));
        assert_eq!(defaults.get("koi_period"), None);
    }
}
