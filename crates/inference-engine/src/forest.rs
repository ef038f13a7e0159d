//! Random Forest Artifact
//!
//! The forest is exported from scikit-learn as JSON, one entry per estimator,
//! each holding the flat node arrays of `tree_`:
//!
//! ```text
//! children_left[i]   left child of node i, -1 for a leaf
//! children_right[i]  right child of node i, -1 for a leaf
//! feature[i]         column index tested at node i
//! threshold[i]       go left when row[feature[i]] <= threshold[i]
//! value[i]           per-class weights [not exoplanet, exoplanet]
//! ```
//!
//! Rows are narrowed to `f32` before any split is tested, as scikit-learn
//! does for tree input, so a value within `f32` rounding of a threshold
//! takes the same branch it took during training. Forest probability is the
//! mean of the normalised leaf distributions, matching
//! `RandomForestClassifier.predict_proba`.
//!
//! Exporting a fitted `RandomForestClassifier` (`clf`) to this format:
//!
//! ```text
//! import json
//! trees = [{
//!     "children_left": t.tree_.children_left.tolist(),
//!     "children_right": t.tree_.children_right.tolist(),
//!     "feature": t.tree_.feature.tolist(),
//!     "threshold": t.tree_.threshold.tolist(),
//!     "value": t.tree_.value[:, 0, :].tolist(),
//! } for t in clf.estimators_]
//! with open("model/random_forest.json", "w") as f:
//!     json.dump({"n_features": clf.n_features_in_, "trees": trees}, f)
//! ```
//!
//! `clf.classes_` must be `[0, 1]` so that `value` columns read
//! `[not exoplanet, exoplanet]`.

use crate::classifier::{Classifier, DEFAULT_THRESHOLD};
use crate::InferenceError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

const LEAF: i64 = -1;

/// One fitted decision tree in flat array form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<[f64; 2]>,
}

impl DecisionTree {
    /// Number of nodes
    pub fn node_count(&self) -> usize {
        self.children_left.len()
    }

    /// Check the arrays describe a well-formed tree over `n_features` columns.
    ///
    /// Children must have a larger index than their parent, which rules out
    /// cycles and bounds traversal by the node count.
    fn validate(&self, n_features: usize) -> Result<(), String> {
        let n = self.node_count();
        if n == 0 {
            return Err("tree has no nodes".to_string());
        }
        if [
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
            self.value.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(format!("node arrays differ in length (expected {n})"));
        }

        for i in 0..n {
            let (left, right) = (self.children_left[i], self.children_right[i]);

            if left == LEAF || right == LEAF {
                if left != right {
                    return Err(format!("node {i} has exactly one child"));
                }
                let weights = self.value[i];
                if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                    return Err(format!("leaf {i} has invalid class weights"));
                }
                if weights[0] + weights[1] <= 0.0 {
                    return Err(format!("leaf {i} has zero total weight"));
                }
                continue;
            }

            for child in [left, right] {
                if child <= i as i64 || child >= n as i64 {
                    return Err(format!("node {i} has out-of-order child {child}"));
                }
            }

            let feature = self.feature[i];
            if feature < 0 || feature as usize >= n_features {
                return Err(format!("node {i} tests feature {feature} of {n_features}"));
            }
            if !self.threshold[i].is_finite() {
                return Err(format!("node {i} has a non-finite threshold"));
            }
        }

        Ok(())
    }

    /// Normalised class distribution of the leaf `row` falls into.
    /// `row` holds values already narrowed to `f32` precision.
    fn leaf_distribution(&self, row: &[f64]) -> [f64; 2] {
        let mut node = 0usize;
        while self.children_left[node] != LEAF {
            let x = row[self.feature[node] as usize];
            node = if x <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }

        let [neg, pos] = self.value[node];
        let total = neg + pos;
        [neg / total, pos / total]
    }
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}

/// Random forest binary classifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_features: usize,
    #[serde(default = "default_threshold")]
    threshold: f64,
    trees: Vec<DecisionTree>,
}

impl RandomForest {
    /// Build and validate a forest
    pub fn new(
        n_features: usize,
        threshold: f64,
        trees: Vec<DecisionTree>,
    ) -> Result<Self, InferenceError> {
        let forest = Self {
            n_features,
            threshold,
            trees,
        };
        forest.validate()?;
        Ok(forest)
    }

    /// Load an exported forest from disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InferenceError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            InferenceError::ModelLoadError(format!("{}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    /// Parse an exported forest
    pub fn from_json_str(raw: &str) -> Result<Self, InferenceError> {
        let forest: Self =
            serde_json::from_str(raw).map_err(|e| InferenceError::InvalidModel(e.to_string()))?;
        forest.validate()?;
        debug!(
            "Parsed random forest: {} trees, {} features",
            forest.trees.len(),
            forest.n_features
        );
        Ok(forest)
    }

    /// Number of estimators
    pub fn tree_count(&self) -> usize {
        self.trees.len()
    }

    fn validate(&self) -> Result<(), InferenceError> {
        if self.n_features == 0 {
            return Err(InferenceError::InvalidModel("n_features is zero".to_string()));
        }
        if self.trees.is_empty() {
            return Err(InferenceError::InvalidModel("forest has no trees".to_string()));
        }
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(InferenceError::InvalidModel(format!(
                "threshold {} outside [0, 1]",
                self.threshold
            )));
        }

        for (i, tree) in self.trees.iter().enumerate() {
            tree.validate(self.n_features)
                .map_err(|reason| InferenceError::InvalidModel(format!("tree {i}: {reason}")))?;
        }
        Ok(())
    }
}

impl Classifier for RandomForest {
    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict_proba(&self, row: &[f64]) -> Result<[f64; 2], InferenceError> {
        if row.len() != self.n_features {
            return Err(InferenceError::InvalidInputShape {
                expected: self.n_features,
                actual: row.len(),
            });
        }

        // Values too large for f32 become infinite here
        let narrowed: Vec<f64> = row.iter().map(|&x| f64::from(x as f32)).collect();
        if let Some(i) = narrowed.iter().position(|x| !x.is_finite()) {
            return Err(InferenceError::InferenceFailed(format!(
                "feature {i} is not finite in f32: {}",
                row[i]
            )));
        }

        let mut sum = [0.0f64; 2];
        for tree in &self.trees {
            let [neg, pos] = tree.leaf_distribution(&narrowed);
            sum[0] += neg;
            sum[1] += pos;
        }

        let n = self.trees.len() as f64;
        Ok([sum[0] / n, sum[1] / n])
    }

    fn decision_threshold(&self) -> f64 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io::Write;

    /// Splits on feature 0 at 10.0: left leaf mostly negative, right mostly positive
    fn stump(left: [f64; 2], right: [f64; 2]) -> DecisionTree {
        DecisionTree {
            children_left: vec![1, -1, -1],
            children_right: vec![2, -1, -1],
            feature: vec![0, -2, -2],
            threshold: vec![10.0, -2.0, -2.0],
            value: vec![[10.0, 10.0], left, right],
        }
    }

    fn forest() -> RandomForest {
        RandomForest::new(
            3,
            DEFAULT_THRESHOLD,
            vec![stump([9.0, 1.0], [1.0, 9.0]), stump([0.8, 0.2], [0.2, 0.8])],
        )
        .unwrap()
    }

    #[test]
    fn test_probability_is_mean_of_trees() {
        let [neg, pos] = forest().predict_proba(&[5.0, 0.0, 0.0]).unwrap();
        assert!((pos - 0.15).abs() < 1e-12);
        assert!((neg - 0.85).abs() < 1e-12);

        let p = forest().predict(&[20.0, 0.0, 0.0]).unwrap();
        assert_eq!(p.label, 1);
        assert!((p.probability - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_threshold_boundary_goes_left() {
        let p = forest().predict(&[10.0, 0.0, 0.0]).unwrap();
        assert_eq!(p.label, 0);
    }

    #[test]
    fn test_split_compares_at_f32_precision() {
        let mut tree = stump([1.0, 0.0], [0.0, 1.0]);
        tree.threshold[0] = 0.5;
        let forest = RandomForest::new(1, 0.5, vec![tree]).unwrap();

        // Above 0.5 in f64, exactly 0.5 in f32
        let p = forest.predict(&[0.500000001]).unwrap();
        assert_eq!(p.label, 0);
        assert_eq!(p.probability, 0.0);

        let p = forest.predict(&[0.5001]).unwrap();
        assert_eq!(p.label, 1);
    }

    #[test]
    fn test_value_beyond_f32_range_rejected() {
        let err = forest().predict_proba(&[1e300, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, InferenceError::InferenceFailed(_)));
    }

    #[test]
    fn test_even_split_is_positive() {
        let forest = RandomForest::new(3, 0.5, vec![stump([1.0, 1.0], [1.0, 1.0])]).unwrap();
        let p = forest.predict(&[0.0, 0.0, 0.0]).unwrap();
        assert_eq!(p.probability, 0.5);
        assert_eq!(p.label, 1);
    }

    #[test]
    fn test_custom_threshold_from_json() {
        let raw = r#"{
            "n_features": 1,
            "threshold": 0.9,
            "trees": [{
                "children_left": [-1],
                "children_right": [-1],
                "feature": [-2],
                "threshold": [-2.0],
                "value": [[1.0, 4.0]]
            }]
        }"#;
        let forest = RandomForest::from_json_str(raw).unwrap();
        let p = forest.predict(&[0.0]).unwrap();
        assert!((p.probability - 0.8).abs() < 1e-12);
        assert_eq!(p.label, 0);
    }

    #[test]
    fn test_loads_exported_layout_with_default_threshold() {
        // json.dump output: numpy lists, no top-level threshold
        let raw = r#"{"n_features": 2, "trees": [{"children_left": [1, -1, -1],
            "children_right": [2, -1, -1], "feature": [1, -2, -2],
            "threshold": [0.25, -2.0, -2.0],
            "value": [[0.6, 0.4], [0.75, 0.25], [0.0, 1.0]]}]}"#;
        let forest = RandomForest::from_json_str(raw).unwrap();
        assert_eq!(forest.decision_threshold(), DEFAULT_THRESHOLD);

        let p = forest.predict(&[9.0, 0.1]).unwrap();
        assert_eq!(p.label, 0);
        assert!((p.probability - 0.25).abs() < 1e-12);
        assert_eq!(forest.predict(&[9.0, 0.3]).unwrap().label, 1);
    }

    #[test]
    fn test_rejects_malformed_trees() {
        let mut cyclic = stump([1.0, 0.0], [0.0, 1.0]);
        cyclic.children_right[0] = 0;
        assert!(RandomForest::new(3, 0.5, vec![cyclic]).is_err());

        let mut wide = stump([1.0, 0.0], [0.0, 1.0]);
        wide.feature[0] = 3;
        assert!(RandomForest::new(3, 0.5, vec![wide]).is_err());

        let mut short = stump([1.0, 0.0], [0.0, 1.0]);
        short.value.pop();
        assert!(RandomForest::new(3, 0.5, vec![short]).is_err());

        let empty_leaf = stump([0.0, 0.0], [0.0, 1.0]);
        assert!(RandomForest::new(3, 0.5, vec![empty_leaf]).is_err());

        assert!(RandomForest::new(3, 0.5, vec![]).is_err());
    }

    #[test]
    fn test_non_finite_input_rejected() {
        let err = forest().predict_proba(&[f64::NAN, 0.0, 0.0]).unwrap_err();
        assert!(matches!(err, InferenceError::InferenceFailed(_)));
    }

    #[test]
    fn test_load_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&forest()).unwrap().as_bytes())
            .unwrap();

        let loaded = RandomForest::from_path(file.path()).unwrap();
        assert_eq!(loaded, forest());
    }

    #[test]
    fn test_missing_and_corrupt_files() {
        assert!(matches!(
            RandomForest::from_path("model/absent.json"),
            Err(InferenceError::ModelLoadError(_))
        ));
        assert!(matches!(
            RandomForest::from_json_str("\u{80}pickle"),
            Err(InferenceError::InvalidModel(_))
        ));
    }

    proptest! {
        #[test]
        fn prop_probability_and_label_agree(
            x in -100.0f64..100.0,
            y in -100.0f64..100.0,
            z in -100.0f64..100.0,
        ) {
            let model = forest();
            let row = [x, y, z];
            let first = model.predict(&row).unwrap();
            let second = model.predict(&row).unwrap();

            prop_assert!((0.0..=1.0).contains(&first.probability));
            prop_assert_eq!(first.label == 1, first.probability >= model.decision_threshold());
            prop_assert_eq!(first, second);
        }
    }
}
