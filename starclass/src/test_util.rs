//! Deterministic reference artifacts for tests and local runs.
//!
//! The reference classifier is a single hand-built decision tree that follows
//! the Hertzsprung-Russell regions of the training data closely enough for
//! textbook stars to land where expected:
//!
//! ```text
//! A_M > 16                      -> Brown Dwarf
//! 10 < A_M <= 16, T <= 5000 K   -> Red Dwarf
//! 10 < A_M <= 16, T >  5000 K   -> White Dwarf
//! -6 < A_M <= 10                -> Main Sequence
//! A_M <= -6, R <= 500           -> Supergiant
//! A_M <= -6, R >  500           -> Hypergiant
//! ```
//!
//! Thresholds are stored in scaled units, exactly as a trained model would
//! see them.

use crate::artifacts::{ArtifactError, ArtifactPaths, Artifacts};
use crate::classifier::{ClassifierError, ClassifierModel, DecisionForest, DecisionTree, TreeNode};
use crate::encoding::{EncodingTable, EncodingTableError, OovPolicy};
use crate::pipeline::PredictionPipeline;
use crate::scaling::{ScalingError, ScalingParameters};
use crate::star_type::{StarType, STAR_TYPE_COUNT};
use std::path::Path;
use std::sync::Arc;

#[derive(thiserror::Error, Debug)]
pub enum TestUtilError {
    #[error("Invalid reference scaler: {0}")]
    Scaler(#[from] ScalingError),
    #[error("Invalid reference encoding table: {0}")]
    Encoding(#[from] EncodingTableError),
    #[error("Invalid reference classifier: {0}")]
    Classifier(#[from] ClassifierError),
    #[error("Failed to write reference artifacts: {0}")]
    Artifact(#[from] ArtifactError),
}

/// Colors of the training data after capitalization, in encoder order.
pub const REFERENCE_COLORS: [&str; 14] = [
    "Blue",
    "Blue white",
    "Blue-white",
    "Orange",
    "Orange-red",
    "Pale yellow orange",
    "Red",
    "White",
    "White-yellow",
    "Whitish",
    "Yellow",
    "Yellow-white",
    "Yellowish",
    "Yellowish white",
];

/// Spectral classes of the training data, in encoder order.
pub const REFERENCE_SPECTRAL_CLASSES: [&str; 7] = ["A", "B", "F", "G", "K", "M", "O"];

/// Standardization fit on the training data (mean and standard deviation).
pub const REFERENCE_CENTER: [f64; 4] = [10497.4625, 107188.361635, 237.157781, 4.382396];
pub const REFERENCE_SCALE: [f64; 4] = [9532.502, 179058.574, 516.606, 10.510];

const TEMPERATURE: usize = 0;
const RADIUS: usize = 2;
const ABSOLUTE_MAGNITUDE: usize = 3;

fn reference_tree(scaler: &ScalingParameters) -> DecisionTree {
    let split = |feature: usize, raw: f64, left: usize, right: usize| TreeNode::Split {
        feature,
        threshold: scaler.transform_feature(feature, raw),
        left,
        right,
    };
    let leaf = |star_type: StarType| TreeNode::leaf_for(star_type.code(), STAR_TYPE_COUNT);

    DecisionTree::new(vec![
        split(ABSOLUTE_MAGNITUDE, 16.0, 1, 2), // 0
        split(ABSOLUTE_MAGNITUDE, 10.0, 3, 4), // 1
        leaf(StarType::BrownDwarf),            // 2
        split(ABSOLUTE_MAGNITUDE, -6.0, 5, 6), // 3
        split(TEMPERATURE, 5000.0, 7, 8),      // 4
        split(RADIUS, 500.0, 9, 10),           // 5
        leaf(StarType::MainSequence),          // 6
        leaf(StarType::RedDwarf),              // 7
        leaf(StarType::WhiteDwarf),            // 8
        leaf(StarType::Supergiant),            // 9
        leaf(StarType::Hypergiant),            // 10
    ])
}

/// The reference artifact set.
pub fn reference_artifacts() -> Result<Artifacts, TestUtilError> {
    let scaler = ScalingParameters::new(REFERENCE_CENTER, REFERENCE_SCALE)?;
    let classifier = ClassifierModel::Forest(DecisionForest::new(
        STAR_TYPE_COUNT,
        vec![reference_tree(&scaler)],
    ));
    let colors = EncodingTable::new(REFERENCE_COLORS)?;
    let spectral = EncodingTable::new(REFERENCE_SPECTRAL_CLASSES)?;

    Ok(Artifacts::new(classifier, scaler, colors, spectral)?)
}

/// Pipeline over the reference artifacts.
pub fn reference_pipeline(policy: OovPolicy) -> Result<PredictionPipeline, TestUtilError> {
    Ok(PredictionPipeline::new(Arc::new(reference_artifacts()?), policy))
}

/// Write the reference artifacts into `dir` under the default file names.
pub fn write_reference_artifacts(dir: impl AsRef<Path>) -> Result<ArtifactPaths, TestUtilError> {
    let paths = ArtifactPaths::in_dir(dir);
    reference_artifacts()?.save(&paths)?;
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::StarRecord;

    #[test]
    fn test_reference_stars() {
        let pipeline = reference_pipeline(OovPolicy::Reject).unwrap();
        let cases = [
            (StarRecord::new(2650.0, 0.00069, 0.11, 17.45, "Red", "M"), StarType::BrownDwarf),
            (StarRecord::new(3042.0, 0.0005, 0.1542, 16.0, "Red", "M"), StarType::RedDwarf),
            (StarRecord::new(25000.0, 0.056, 0.0084, 10.58, "Blue White", "B"), StarType::WhiteDwarf),
            (StarRecord::sun(), StarType::MainSequence),
            (StarRecord::new(3600.0, 126000.0, 887.0, -6.5, "Red", "M"), StarType::Hypergiant),
            (StarRecord::new(12000.0, 250000.0, 80.0, -7.0, "Blue", "B"), StarType::Supergiant),
        ];

        for (record, expected) in cases {
            let prediction = pipeline.predict_one(&record).unwrap();
            assert_eq!(prediction.star_type, expected, "record {record:?}");
        }
    }

    #[test]
    fn test_reference_artifacts_round_trip_through_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let paths = write_reference_artifacts(dir.path()).unwrap();
        let loaded = Artifacts::load(&paths).unwrap();
        assert_eq!(loaded.color_encoder().classes().len(), REFERENCE_COLORS.len());
    }

    #[test]
    fn test_write_over_plain_file_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let blocker = dir.path().join("artifacts");
        std::fs::write(&blocker, "not a directory").unwrap();
        let err = write_reference_artifacts(&blocker).unwrap_err();
        assert!(matches!(err, TestUtilError::Artifact(_)));
    }
}
