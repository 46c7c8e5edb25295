//! Frozen classifiers over the assembled feature vector.
//!
//! The feature vector is `[temperature, luminosity, radius, absolute_magnitude,
//! color_code, spectral_class_code]` with the numeric entries already scaled.
//! Classifier artifacts are validated once at load so that prediction itself
//! cannot fail or loop.

pub mod forest;
pub mod linear;

pub use forest::{DecisionForest, DecisionTree, TreeNode};
pub use linear::LinearClassifier;

use serde::{Deserialize, Serialize};

/// Length of the classifier input.
pub const FEATURE_COUNT: usize = 6;

/// Classifier input in training column order.
pub type FeatureVector = [f64; FEATURE_COUNT];

/// Structural problems found while validating a classifier artifact.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ClassifierError {
    #[error("forest has no trees")]
    EmptyForest,
    #[error("tree {tree} has no nodes")]
    EmptyTree { tree: usize },
    #[error("tree {tree} node {node} splits on feature {feature}, which is out of range")]
    FeatureOutOfRange {
        tree: usize,
        node: usize,
        feature: usize,
    },
    #[error("tree {tree} node {node} has a non-finite threshold")]
    NonFiniteThreshold { tree: usize, node: usize },
    #[error("tree {tree} node {node} points to child {child}; children must follow their parent and exist")]
    InvalidChild {
        tree: usize,
        node: usize,
        child: usize,
    },
    #[error("tree {tree} leaf {node}: {reason}")]
    InvalidLeaf {
        tree: usize,
        node: usize,
        reason: String,
    },
    #[error("linear model: {0}")]
    InvalidLinear(String),
    #[error("classifier has {found} classes, expected {expected}")]
    ClassCount { expected: usize, found: usize },
}

/// Decision function mapping a feature vector to a class index.
///
/// Implementations must be pure: equal inputs give equal outputs and no
/// call observes any other.
pub trait Classifier: Send + Sync {
    /// Number of classes; predictions are always below this.
    fn num_classes(&self) -> usize;

    /// Predict the class index for one feature vector.
    fn predict(&self, features: &FeatureVector) -> usize;
}

/// Classifier artifact as stored on disk, tagged by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ClassifierModel {
    Forest(DecisionForest),
    Linear(LinearClassifier),
}

impl ClassifierModel {
    /// Check structural invariants. Must pass before the model is used.
    pub fn validate(&self) -> Result<(), ClassifierError> {
        match self {
            ClassifierModel::Forest(forest) => forest.validate(),
            ClassifierModel::Linear(linear) => linear.validate(),
        }
    }

    /// Short description for startup logs.
    pub fn describe(&self) -> String {
        match self {
            ClassifierModel::Forest(forest) => format!(
                "decision forest ({} trees, {} nodes)",
                forest.trees().len(),
                forest.trees().iter().map(|t| t.nodes().len()).sum::<usize>()
            ),
            ClassifierModel::Linear(linear) => {
                format!("linear model ({} classes)", linear.num_classes())
            }
        }
    }
}

impl Classifier for ClassifierModel {
    fn num_classes(&self) -> usize {
        match self {
            ClassifierModel::Forest(forest) => forest.num_classes(),
            ClassifierModel::Linear(linear) => linear.num_classes(),
        }
    }

    fn predict(&self, features: &FeatureVector) -> usize {
        match self {
            ClassifierModel::Forest(forest) => forest.predict(features),
            ClassifierModel::Linear(linear) => linear.predict(features),
        }
    }
}

/// Index of the first maximal score.
///
/// Ties resolve to the lowest class index. Returns 0 for an empty slice.
pub(crate) fn argmax(scores: &[f64]) -> usize {
    let mut best = 0;
    for (i, &score) in scores.iter().enumerate().skip(1) {
        if score > scores[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_first_max_wins() {
        assert_eq!(argmax(&[0.1, 0.5, 0.5, 0.2]), 1);
        assert_eq!(argmax(&[3.0]), 0);
        assert_eq!(argmax(&[]), 0);
        assert_eq!(argmax(&[-2.0, -1.0, -3.0]), 1);
    }

    #[test]
    fn test_model_json_is_tagged() {
        let json = r#"{
            "kind": "linear",
            "coefficients": [[1, 0, 0, 0, 0, 0], [-1, 0, 0, 0, 0, 0]],
            "intercepts": [0, 0]
        }"#;
        let model: ClassifierModel = serde_json::from_str(json).unwrap();
        model.validate().unwrap();
        assert_eq!(model.num_classes(), 2);
        assert_eq!(model.predict(&[1.0, 0.0, 0.0, 0.0, 0.0, 0.0]), 0);
        assert_eq!(model.predict(&[-1.0, 0.0, 0.0, 0.0, 0.0, 0.0]), 1);
        assert_eq!(model.describe(), "linear model (2 classes)");
    }
}
